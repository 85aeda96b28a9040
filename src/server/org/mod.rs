mod company;
mod invitations;
mod roles;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;
use crate::server::response::ApiError;
use crate::server::user::access::require_permission;
use crate::types::{Module, Permission, User};

/// Organisation management is guarded by the `admin` module.
fn require_org_admin(state: &AppState, user: &User, action: Permission) -> Result<(), ApiError> {
    require_permission(state, user, Module::Admin, action)
}

pub fn org_router() -> Router<Arc<AppState>> {
    Router::new()
        // Company profile
        .route("/company", get(company::get_company))
        .route("/company", patch(company::update_company))
        .route("/subscription", get(company::get_subscription))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", patch(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        // Invitation codes
        .route("/invitations", post(invitations::create_invitation))
        .route("/invitations", get(invitations::list_invitations))
        .route("/invitations/{code}", delete(invitations::delete_invitation))
        // Custom roles
        .route("/roles", post(roles::create_role))
        .route("/roles", get(roles::list_roles))
        .route("/roles/{id}", get(roles::get_role))
        .route("/roles/{id}", put(roles::update_role))
        .route("/roles/{id}", delete(roles::delete_role))
}

mod companies;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Company routes
        .route("/companies", post(companies::create_company))
        .route("/companies", get(companies::list_companies))
        .route("/companies/{id}", get(companies::get_company))
        .route("/companies/{id}", delete(companies::delete_company))
        .route(
            "/companies/{id}/subscription",
            get(companies::get_subscription),
        )
        .route(
            "/companies/{id}/subscription",
            put(companies::set_subscription),
        )
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/tokens", get(users::list_user_tokens))
        .route("/users/{id}/tokens", post(users::create_user_token))
        // Token routes
        .route("/tokens", get(tokens::list_tokens))
        .route("/tokens/{id}", get(tokens::get_token))
        .route("/tokens/{id}", delete(tokens::delete_token))
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::require_org_admin;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{PaginationParams, UpdateUserRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::server::user::access::check_roles;
use crate::server::validation::validate_display_name;
use crate::types::{Permission, User};

fn load_member(state: &AppState, company_id: &str, id: &str) -> Result<User, ApiError> {
    state
        .store
        .get_user(id)
        .api_err("Failed to get user")?
        .filter(|u| u.company_id == company_id)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn list_users(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::VIEW)?;
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state
        .store
        .list_users(Some(&user.company_id), cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::VIEW)?;
    let member = load_member(&state, &user.company_id, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(member)))
}

pub async fn update_user(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::EDIT)?;
    let mut member = load_member(&state, &user.company_id, &id)?;

    if let Some(display_name) = req.display_name {
        validate_display_name(&display_name)?;
        member.display_name = display_name.trim().to_string();
    }
    if let Some(roles) = req.roles {
        if member.id == user.id {
            return Err(ApiError::bad_request("Cannot change your own roles"));
        }
        check_roles(&state, &user.company_id, &roles)?;
        member.roles = roles;
    }
    member.updated_at = Utc::now();

    state
        .store
        .update_user(&member)
        .api_err("Failed to update user")?;

    tracing::info!(user = %member.id, by = %user.id, roles = ?member.roles, "User updated");
    Ok(Json(ApiResponse::success(member)))
}

pub async fn delete_user(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::DELETE)?;
    let member = load_member(&state, &user.company_id, &id)?;

    if member.id == user.id {
        return Err(ApiError::bad_request("Cannot delete yourself"));
    }

    state
        .store
        .delete_user(&member.id)
        .api_err("Failed to delete user")?;

    tracing::info!(user = %member.id, by = %user.id, "User removed");
    Ok(StatusCode::NO_CONTENT)
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::require_org_admin;
use crate::access::is_builtin_role;
use crate::auth::RequireUser;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{RoleRequest, RoleResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_role_name;
use crate::types::{CustomRole, ModuleGrant, Permission};

/// Validates a role body and turns its grants into bitmasks.
fn parse_role(req: &RoleRequest) -> Result<Vec<ModuleGrant>, ApiError> {
    validate_role_name(&req.name)?;
    if is_builtin_role(&req.name) {
        return Err(ApiError::bad_request(format!(
            "'{}' is a built-in role",
            req.name
        )));
    }

    req.grants
        .iter()
        .map(|grant| {
            let allow = Permission::parse_many(&grant.allow)
                .ok_or_else(|| ApiError::bad_request("Invalid permission in allow"))?;
            let deny = Permission::parse_many(&grant.deny)
                .ok_or_else(|| ApiError::bad_request("Invalid permission in deny"))?;
            Ok(ModuleGrant {
                module: grant.module,
                allow,
                deny,
            })
        })
        .collect()
}

fn load_role(state: &AppState, company_id: &str, id: &str) -> Result<CustomRole, ApiError> {
    state
        .store
        .get_role(id)
        .api_err("Failed to get role")?
        .filter(|r| r.company_id == company_id)
        .ok_or_else(|| ApiError::not_found("Role not found"))
}

fn role_conflict(e: Error) -> ApiError {
    match e {
        Error::AlreadyExists => ApiError::conflict("A role with that name already exists"),
        e => {
            tracing::error!("Failed to save role: {e}");
            ApiError::internal("Failed to save role")
        }
    }
}

pub async fn create_role(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RoleRequest>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::CREATE)?;
    let grants = parse_role(&req)?;

    let now = Utc::now();
    let role = CustomRole {
        id: Uuid::new_v4().to_string(),
        company_id: user.company_id.clone(),
        name: req.name,
        description: req.description,
        grants,
        created_at: now,
        updated_at: now,
    };
    state.store.create_role(&role).map_err(role_conflict)?;

    tracing::info!(role = %role.id, company = %role.company_id, "Custom role created");
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(RoleResponse::from(role))),
    ))
}

pub async fn list_roles(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::VIEW)?;

    let roles: Vec<RoleResponse> = state
        .store
        .list_roles(&user.company_id)
        .api_err("Failed to list roles")?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(roles)))
}

pub async fn get_role(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::VIEW)?;
    let role = load_role(&state, &user.company_id, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(RoleResponse::from(role))))
}

pub async fn update_role(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::EDIT)?;
    let mut role = load_role(&state, &user.company_id, &id)?;

    role.grants = parse_role(&req)?;
    role.name = req.name;
    role.description = req.description;
    role.updated_at = Utc::now();
    state.store.update_role(&role).map_err(role_conflict)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(RoleResponse::from(role))))
}

/// Deletes a role and removes it from every user holding it.
pub async fn delete_role(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::DELETE)?;
    let role = load_role(&state, &user.company_id, &id)?;

    let members = state
        .store
        .list_users(Some(&user.company_id), "", i32::MAX)
        .api_err("Failed to list users")?;
    for mut member in members.into_iter().filter(|m| m.roles.contains(&role.id)) {
        member.roles.retain(|r| r != &role.id);
        member.updated_at = Utc::now();
        state
            .store
            .update_user(&member)
            .api_err("Failed to update user")?;
    }

    state
        .store
        .delete_role(&role.id)
        .api_err("Failed to delete role")?;

    tracing::info!(role = %role.id, company = %role.company_id, "Custom role deleted");
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

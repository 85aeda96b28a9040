use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use super::require_org_admin;
use crate::auth::{RequireUser, generate_code};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::CreateInvitationRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::user::access::check_roles;
use crate::types::{InvitationCode, Permission};

const INVITATION_CODE_LEN: usize = 8;
const DEFAULT_EXPIRY_DAYS: i64 = 7;
const MAX_CODE_RETRIES: u32 = 3;

pub async fn create_invitation(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInvitationRequest>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::CREATE)?;
    check_roles(&state, &user.company_id, std::slice::from_ref(&req.role))?;

    let max_uses = req.max_uses.unwrap_or(1);
    if max_uses < 1 {
        return Err(ApiError::bad_request("max_uses must be at least 1"));
    }
    let days = req.expires_in_days.unwrap_or(DEFAULT_EXPIRY_DAYS);
    if days < 1 {
        return Err(ApiError::bad_request("expires_in_days must be at least 1"));
    }

    let now = Utc::now();
    for _ in 0..MAX_CODE_RETRIES {
        let invite = InvitationCode {
            code: generate_code(INVITATION_CODE_LEN),
            company_id: user.company_id.clone(),
            role: req.role.clone(),
            created_by: Some(user.id.clone()),
            max_uses,
            uses: 0,
            expires_at: Some(now + Duration::days(days)),
            created_at: now,
        };

        match state.store.create_invitation(&invite) {
            Ok(()) => {
                tracing::info!(company = %invite.company_id, role = %invite.role, "Invitation created");
                return Ok((StatusCode::CREATED, Json(ApiResponse::success(invite))));
            }
            Err(Error::AlreadyExists) => continue,
            Err(e) => {
                tracing::error!("Failed to create invitation: {e}");
                return Err(ApiError::internal("Failed to create invitation"));
            }
        }
    }

    Err(ApiError::internal("Failed to create invitation after retries"))
}

pub async fn list_invitations(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::VIEW)?;

    let invitations = state
        .store
        .list_invitations(&user.company_id)
        .api_err("Failed to list invitations")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(invitations)))
}

pub async fn delete_invitation(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::DELETE)?;

    let invite = state
        .store
        .get_invitation(&code)
        .api_err("Failed to get invitation")?
        .filter(|i| i.company_id == user.company_id)
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    state
        .store
        .delete_invitation(&invite.code)
        .api_err("Failed to delete invitation")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

//! Session endpoints: password login, invitation sign-up, logout and the
//! caller's profile.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::dto::{LoginRequest, MeResponse, RegisterRequest, SessionResponse};
use super::response::{ApiError, ApiResponse, StoreResultExt};
use super::validation::{normalize_email, validate_display_name, validate_email, validate_password};
use crate::access;
use crate::auth::{RequireAuth, RequireUser, TokenGenerator};
use crate::error::Error;
use crate::server::AppState;
use crate::store::RecordStore;
use crate::types::{Company, Subscription, Token, User};

const SESSION_DAYS: i64 = 30;
const MAX_TOKEN_RETRIES: u32 = 3;

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
}

/// Issues a new token for a user, retrying on lookup collisions.
pub(crate) fn issue_user_token(
    state: &AppState,
    user_id: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(String, Token), ApiError> {
    let generator = TokenGenerator::new();

    for _ in 0..MAX_TOKEN_RETRIES {
        let (raw_token, lookup, hash) = generator
            .generate()
            .map_err(|_| ApiError::internal("Failed to generate token"))?;

        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            is_admin: false,
            user_id: Some(user_id.to_string()),
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };

        match state.store.create_token(&token) {
            Ok(()) => return Ok((raw_token, token)),
            Err(Error::TokenLookupCollision) => continue,
            Err(e) => {
                tracing::error!("Failed to create token: {e}");
                return Err(ApiError::internal("Failed to create token"));
            }
        }
    }

    Err(ApiError::internal("Failed to create token after retries"))
}

fn session(state: &AppState, user: User) -> Result<SessionResponse, ApiError> {
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    let (token, _) = issue_user_token(state, &user.id, Some(expires_at))?;
    Ok(SessionResponse {
        token,
        expires_at,
        user,
    })
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .store
        .get_user_by_email(&normalize_email(&req.email))
        .api_err("Failed to look up user")?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    let valid = TokenGenerator::new()
        .verify(&req.password, hash)
        .api_err("Failed to verify password")?;
    if !valid {
        tracing::info!(user = %user.id, "Rejected login");
        return Err(invalid());
    }

    tracing::info!(user = %user.id, "User logged in");
    Ok(Json(ApiResponse::success(session(&state, user)?)))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_password(&req.password)?;
    validate_display_name(&req.display_name)?;

    let code = req.code.trim().to_ascii_uppercase();
    let invite = state
        .store
        .get_invitation(&code)
        .api_err("Failed to look up invitation")?
        .filter(|i| i.is_usable(Utc::now()))
        .ok_or_else(|| ApiError::bad_request("Invalid or expired invitation code"))?;

    if !access::is_assignable_role(state.store.as_ref(), &invite.company_id, &invite.role)
        .api_err("Failed to check role")?
    {
        return Err(ApiError::bad_request("Invitation role no longer exists"));
    }

    let subscription = state
        .store
        .get_record::<Subscription>(&invite.company_id)
        .api_err("Failed to load subscription")?
        .filter(|s| s.data.is_active(Utc::now().date_naive()))
        .ok_or_else(|| ApiError::forbidden("Company has no active subscription"))?;
    let users = state
        .store
        .count_company_users(&invite.company_id)
        .api_err("Failed to count users")?;
    if !Subscription::allows_another(subscription.data.max_users, users) {
        return Err(ApiError::forbidden(
            "User limit of the subscription plan reached",
        ));
    }

    if state
        .store
        .get_user_by_email(&email)
        .api_err("Failed to look up user")?
        .is_some()
    {
        return Err(ApiError::conflict("Email is already registered"));
    }

    if !state
        .store
        .redeem_invitation(&invite.code)
        .api_err("Failed to redeem invitation")?
    {
        return Err(ApiError::bad_request("Invalid or expired invitation code"));
    }

    let password_hash = TokenGenerator::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        company_id: invite.company_id.clone(),
        email,
        display_name: req.display_name.trim().to_string(),
        roles: vec![invite.role.clone()],
        password_hash: Some(password_hash),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_user(&user)
        .api_err("Failed to create user")?;

    tracing::info!(user = %user.id, company = %user.company_id, role = %invite.role, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(session(&state, user)?)),
    ))
}

pub async fn me(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let profile = access::resolve(state.store.as_ref(), &user).api_err("Failed to resolve roles")?;
    let company = state
        .store
        .get_record::<Company>(&user.company_id)
        .api_err("Failed to load company")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(MeResponse {
        departments: profile.departments(),
        permissions: profile.to_map(),
        company,
        user,
    })))
}

/// Revokes the token the request was made with.
pub async fn logout(
    RequireAuth(token): RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state
        .store
        .delete_token(&token.id)
        .api_err("Failed to revoke token")?;

    tracing::info!(token = %token.id, "Token revoked on logout");
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

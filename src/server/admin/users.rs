use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::server::AppState;
use crate::server::auth::issue_user_token;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserResponse, TokenResponse, UserListParams,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::user::access::check_roles;
use crate::server::validation::{
    normalize_email, validate_display_name, validate_email, validate_password,
};
use crate::store::RecordStore;
use crate::types::{Company, User};

fn load_user(state: &AppState, id: &str) -> Result<User, ApiError> {
    state
        .store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")
}

/// Creates a user, usually a company's first administrator, and a
/// non-expiring token for it.
pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    state
        .store
        .get_record::<Company>(&req.company_id)
        .api_err("Failed to get company")?
        .ok_or_else(|| ApiError::bad_request("Company does not exist"))?;

    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_display_name(&req.display_name)?;
    let roles = req.roles.unwrap_or_else(|| vec!["admin".to_string()]);
    check_roles(&state, &req.company_id, &roles)?;

    let password_hash = match req.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(
                TokenGenerator::new()
                    .hash(password)
                    .api_err("Failed to hash password")?,
            )
        }
        None => None,
    };

    if state
        .store
        .get_user_by_email(&email)
        .api_err("Failed to check existing user")?
        .is_some()
    {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        company_id: req.company_id,
        email,
        display_name: req.display_name.trim().to_string(),
        roles,
        password_hash,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_user(&user)
        .api_err("Failed to create user")?;

    let (token, _) = issue_user_token(&state, &user.id, None)?;

    tracing::info!(user = %user.id, company = %user.company_id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateUserResponse { user, token })),
    ))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state
        .store
        .list_users(params.company_id.as_deref(), cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = load_user(&state, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = load_user(&state, &id)?;

    state
        .store
        .delete_user(&user.id)
        .api_err("Failed to delete user")?;

    tracing::info!(user = %user.id, "User deleted");
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = load_user(&state, &id)?;

    let tokens: Vec<TokenResponse> = state
        .store
        .list_user_tokens(&user.id)
        .api_err("Failed to list user tokens")?
        .into_iter()
        .map(TokenResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(tokens)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = load_user(&state, &id)?;
    let (raw_token, token) = issue_user_token(&state, &user.id, None)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: TokenResponse::from(token),
        })),
    ))
}

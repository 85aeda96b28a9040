//! Session and system token administration.
//!
//! Listings resolve each user token to its owner and company so support can
//! revoke a company's sessions without cross-referencing ids.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{TokenListParams, TokenOwner, TokenResponse};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::store::RecordStore;
use crate::types::{Company, Token};

/// Company names looked up while describing a batch of tokens.
type CompanyNames = HashMap<String, Option<String>>;

fn describe(
    state: &AppState,
    token: Token,
    companies: &mut CompanyNames,
) -> Result<TokenResponse, ApiError> {
    let Some(user_id) = token.user_id.clone() else {
        return Ok(TokenResponse::from(token));
    };
    let Some(user) = state.store.get_user(&user_id).api_err("Failed to get token owner")? else {
        return Ok(TokenResponse::from(token));
    };

    let company_name = match companies.get(&user.company_id) {
        Some(name) => name.clone(),
        None => {
            let name = state
                .store
                .get_record::<Company>(&user.company_id)
                .api_err("Failed to get company")?
                .map(|c| c.data.name);
            companies.insert(user.company_id.clone(), name.clone());
            name
        }
    };

    Ok(TokenResponse::from(token).with_owner(Some(TokenOwner {
        email: user.email,
        display_name: user.display_name,
        company_id: user.company_id,
        company_name,
    })))
}

pub async fn list_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<TokenListParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let tokens = state
        .store
        .list_tokens(params.company_id.as_deref(), cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list tokens")?;

    let (tokens, next_cursor, has_more) =
        paginate(tokens, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    let mut companies = CompanyNames::new();
    let responses = tokens
        .into_iter()
        .map(|t| describe(&state, t, &mut companies))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        responses,
        next_cursor,
        has_more,
    )))
}

pub async fn get_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let token = state
        .store
        .get_token_by_id(&id)
        .api_err("Failed to get token")?
        .or_not_found("Token not found")?;

    let response = describe(&state, token, &mut CompanyNames::new())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

/// Revokes a token. The system token making the request cannot revoke itself.
pub async fn delete_token(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let token = state
        .store
        .get_token_by_id(&id)
        .api_err("Failed to get token")?
        .or_not_found("Token not found")?;

    if token.id == admin.0.id {
        return Err(ApiError::bad_request("Cannot delete current token"));
    }

    state
        .store
        .delete_token(&token.id)
        .api_err("Failed to delete token")?;
    tracing::info!(token = %token.id, user = ?token.user_id, "Revoked token");

    Ok(StatusCode::NO_CONTENT)
}

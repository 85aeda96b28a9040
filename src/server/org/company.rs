use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::{Map, Value};

use super::require_org_admin;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::user::access::load_record;
use crate::store::{RecordStore, merge_patch};
use crate::types::{Company, Document, Permission, Subscription};

pub async fn get_company(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let company = load_record::<Company>(&state, &user.company_id, &user.company_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(company)))
}

pub async fn update_company(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<Map<String, Value>>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::EDIT)?;

    let mut company = load_record::<Company>(&state, &user.company_id, &user.company_id)?;
    company.data = merge_patch(&company.data, patch).api_err("Failed to apply update")?;
    company.data.validate().map_err(ApiError::bad_request)?;
    state
        .store
        .save_record(&mut company)
        .api_err("Failed to update company")?;

    tracing::info!(company = %company.id, user = %user.id, "Company profile updated");
    Ok::<_, ApiError>(Json(ApiResponse::success(company)))
}

pub async fn get_subscription(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_org_admin(&state, &user, Permission::VIEW)?;

    let subscription = state
        .store
        .get_record::<Subscription>(&user.company_id)
        .api_err("Failed to load subscription")?
        .or_not_found("Subscription not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subscription)))
}

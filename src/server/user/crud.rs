//! Generic handlers shared by every document collection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Map, Value};

use super::access::{list_query, load_record, require_permission};
use super::resource::Resource;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::StatusRequest;
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::store::{RecordStore, merge_patch};
use crate::types::{Lifecycle, Permission, Record, Tracked};

const STORE_FIELDS: &[&str] = &["id", "company_id", "created_at", "updated_at", "deleted"];

/// Parses a new document, ignoring fields the server owns.
pub(crate) fn parse_new<T: Resource>(mut body: Map<String, Value>) -> Result<T, ApiError> {
    body.retain(|key, _| {
        !STORE_FIELDS.contains(&key.as_str()) && !T::PROTECTED.contains(&key.as_str())
    });
    let data: T = serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::bad_request(format!("Invalid {}: {e}", T::COLLECTION)))?;
    data.validate().map_err(ApiError::bad_request)?;
    Ok(data)
}

/// Validates, checks and stores a new document on behalf of `user`.
pub(crate) fn insert<T: Resource>(
    state: &Arc<AppState>,
    user: &crate::types::User,
    mut data: T,
) -> Result<Record<T>, ApiError> {
    T::check(state, &user.company_id, None, &data)?;
    T::on_create(state, user, &mut data)?;
    let record = state
        .store
        .create_record(&user.company_id, data)
        .api_err("Failed to create record")?;
    T::after_write(state, &record);
    Ok(record)
}

pub async fn list<T: Resource>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::VIEW)?;

    let query = list_query::<T>(&user.company_id, &params)?.limit(DEFAULT_PAGE_SIZE + 1);
    let records = state
        .store
        .list_records::<T>(&query)
        .api_err("Failed to list records")?;

    let (records, next_cursor, has_more) =
        paginate(records, DEFAULT_PAGE_SIZE as usize, |r| r.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(records, next_cursor, has_more)))
}

pub async fn get<T: Resource>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::VIEW)?;
    let record = load_record::<T>(&state, &user.company_id, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(record)))
}

pub async fn create<T: Resource>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Map<String, Value>>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::CREATE)?;

    let data = parse_new::<T>(body)?;
    let record = insert(&state, &user, data)?;

    tracing::info!(
        collection = %T::COLLECTION,
        id = %record.id,
        user = %user.id,
        "Created record"
    );

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

pub async fn update<T: Resource>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::EDIT)?;

    let mut record = load_record::<T>(&state, &user.company_id, &id)?;
    record.data = merge_patch(&record.data, patch).api_err("Failed to apply update")?;
    record.data.validate().map_err(ApiError::bad_request)?;
    T::check(&state, &user.company_id, Some(&record.id), &record.data)?;

    state
        .store
        .save_record(&mut record)
        .api_err("Failed to update record")?;
    T::after_write(&state, &record);

    Ok::<_, ApiError>(Json(ApiResponse::success(record)))
}

pub async fn delete<T: Resource>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::DELETE)?;

    let mut record = load_record::<T>(&state, &user.company_id, &id)?;
    state
        .store
        .delete_record::<T>(&record.id)
        .api_err("Failed to delete record")?;
    record.deleted = true;
    T::after_delete(&state, &record);

    tracing::info!(
        collection = %T::COLLECTION,
        id = %record.id,
        user = %user.id,
        "Deleted record"
    );

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Moves a document along its lifecycle.
pub async fn set_status<T: Resource + Tracked>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest<T::Status>>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::EDIT)?;

    let mut record = load_record::<T>(&state, &user.company_id, &id)?;
    let current = record.data.status();
    if current != req.status {
        if !current.can_transition_to(req.status) {
            return Err(ApiError::conflict(format!(
                "Cannot change status from {current} to {}",
                req.status
            )));
        }
        record.data.set_status(req.status);
        state
            .store
            .save_record(&mut record)
            .api_err("Failed to update status")?;
        T::after_write(&state, &record);

        tracing::info!(
            collection = %T::COLLECTION,
            id = %record.id,
            from = %current,
            to = %req.status,
            "Status changed"
        );
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(record)))
}

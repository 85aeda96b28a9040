use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::access;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{Module, Notification, Record, User};

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: usize,
}

/// Notifications addressed to the user or to one of their departments.
fn visible_notifications(
    state: &AppState,
    user: &User,
    cursor: Option<&str>,
) -> Result<Vec<Record<Notification>>, ApiError> {
    let departments: Vec<Module> = access::resolve(state.store.as_ref(), user)
        .api_err("Failed to resolve roles")?
        .departments();

    let mut query = DocumentQuery::for_company(&user.company_id);
    if let Some(cursor) = cursor {
        query = query.after(cursor);
    }
    let all: Vec<Record<Notification>> = state
        .store
        .list_records(&query)
        .api_err("Failed to list notifications")?;

    Ok(all
        .into_iter()
        .filter(|n| {
            n.data.user_id.as_deref() == Some(user.id.as_str())
                || n.data.department.is_some_and(|d| departments.contains(&d))
        })
        .collect())
}

pub async fn list_notifications(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let unread_only = params.get("unread").is_some_and(|v| v == "true");
    let mut notifications =
        visible_notifications(&state, &user, params.get("cursor").map(String::as_str))?;
    if unread_only {
        notifications.retain(|n| !n.data.read);
    }

    let (notifications, next_cursor, has_more) =
        paginate(notifications, DEFAULT_PAGE_SIZE as usize, |n| n.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        notifications,
        next_cursor,
        has_more,
    )))
}

pub async fn mark_read(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut notification = visible_notifications(&state, &user, None)?
        .into_iter()
        .find(|n| n.id == id)
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    if !notification.data.read {
        notification.data.read = true;
        state
            .store
            .save_record(&mut notification)
            .api_err("Failed to update notification")?;
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(notification)))
}

pub async fn mark_all_read(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let mut updated = 0;
    for mut notification in visible_notifications(&state, &user, None)? {
        if notification.data.read {
            continue;
        }
        notification.data.read = true;
        state
            .store
            .save_record(&mut notification)
            .api_err("Failed to update notification")?;
        updated += 1;
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(MarkedRead { updated })))
}

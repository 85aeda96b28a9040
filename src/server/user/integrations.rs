use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::auth::RequireUser;
use crate::integrations::{ProxyKind, SearchRequest, fetch, validate_proxy_url};
use crate::server::AppState;
use crate::server::dto::{PlacesParams, ProxyParams};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

const PROXY_CACHE_CONTROL: &str = "public, max-age=86400";

fn not_configured(service: &str) -> ApiError {
    ApiError::service_unavailable(format!("{service} is not configured"))
}

pub async fn weather(
    _user: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(location_key): Path<String>,
) -> impl IntoResponse {
    let client = state
        .integrations
        .weather
        .as_ref()
        .ok_or_else(|| not_configured("Weather"))?;
    let forecast = client
        .forecast(&location_key)
        .await
        .api_err("Failed to fetch weather forecast")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(forecast)))
}

pub async fn places(
    _user: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlacesParams>,
) -> impl IntoResponse {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty"));
    }
    let client = state
        .integrations
        .places
        .as_ref()
        .ok_or_else(|| not_configured("Places search"))?;
    let results = client
        .search(params.q.trim())
        .await
        .api_err("Failed to search places")?;

    Ok(Json(ApiResponse::success(results)))
}

pub async fn search(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(index): Path<String>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    let client = state
        .integrations
        .search
        .as_ref()
        .ok_or_else(|| not_configured("Search"))?;
    let results = client
        .query(&index, &user.company_id, &req)
        .await
        .api_err("Failed to query search index")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(results)))
}

async fn proxy(
    state: &AppState,
    raw_url: &str,
    kind: ProxyKind,
) -> Result<Response, ApiError> {
    let proxy = &state.integrations.proxy;
    let url = validate_proxy_url(raw_url, &proxy.allowed_hosts).api_err("Invalid proxy url")?;

    let file = fetch(&state.integrations.proxy_http, url, kind, proxy.max_bytes)
        .await
        .api_err("Failed to fetch file")?;

    let headers = [
        (header::CONTENT_TYPE, file.content_type),
        (header::CACHE_CONTROL, PROXY_CACHE_CONTROL.to_string()),
    ];
    Ok((StatusCode::OK, headers, file.body).into_response())
}

pub async fn proxy_image(
    _user: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProxyParams>,
) -> impl IntoResponse {
    proxy(&state, &params.url, ProxyKind::Image).await
}

pub async fn proxy_pdf(
    _user: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProxyParams>,
) -> impl IntoResponse {
    proxy(&state, &params.url, ProxyKind::Pdf).await
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;

use super::access::{load_record, require_permission};
use crate::auth::RequireUser;
use crate::cms::{LoopConfig, assign_content, build_timeline, loops_between};
use crate::server::AppState;
use crate::server::dto::{ProductTimelineParams, TimelineRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{Module, Permission, Product, Record, ScreenSchedule};

/// Lays out spots for an ad-hoc loop configuration.
pub async fn timeline(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<TimelineRequest>,
) -> impl IntoResponse {
    require_permission(&state, &user, Module::Cms, Permission::VIEW)?;

    let cfg = LoopConfig {
        start: req.start,
        spot_duration_secs: req.spot_duration_secs,
        spots_per_loop: req.spots_per_loop,
    };
    cfg.validate().api_err("Invalid loop configuration")?;

    let loops = match (req.loops, req.end) {
        (Some(loops), _) => loops,
        (None, Some(end)) => loops_between(&cfg, end),
        (None, None) => 1,
    };
    let spots = build_timeline(&cfg, loops).api_err("Failed to build timeline")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(spots)))
}

/// Timeline of a digital site with the content playing on `date`.
pub async fn product_timeline(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ProductTimelineParams>,
) -> impl IntoResponse {
    require_permission(&state, &user, Module::Cms, Permission::VIEW)?;

    let product = load_record::<Product>(&state, &user.company_id, &id)?;
    let cms = product
        .data
        .cms
        .ok_or_else(|| ApiError::bad_request("Product has no cms settings"))?;
    let cfg = LoopConfig::from(&cms);

    // Without an explicit count, play the operating window up to the spot limit.
    let loops = params
        .loops
        .unwrap_or_else(|| loops_between(&cfg, cms.end_time).min(cfg.max_loops()).max(1));
    let spots = build_timeline(&cfg, loops).api_err("Failed to build timeline")?;

    let schedules: Vec<Record<ScreenSchedule>> = state
        .store
        .list_records(&DocumentQuery::for_company(&user.company_id).filter("product_id", &product.id))
        .api_err("Failed to list schedules")?;

    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok::<_, ApiError>(Json(ApiResponse::success(assign_content(
        spots, &schedules, date,
    ))))
}

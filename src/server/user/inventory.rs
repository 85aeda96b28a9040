use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use serde::Serialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use super::access::require_permission;
use crate::auth::RequireUser;
use crate::inventory::StockLevel;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{InventoryItem, ItemStatus, Module, Permission, Record};

#[derive(Debug, Serialize)]
pub struct LowStockItem {
    #[serde(flatten)]
    pub item: Record<InventoryItem>,
    pub level: StockLevel,
}

pub async fn low_stock(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_permission(&state, &user, Module::It, Permission::VIEW)?;

    let items: Vec<Record<InventoryItem>> = state
        .store
        .list_records(&DocumentQuery::for_company(&user.company_id))
        .api_err("Failed to list inventory")?;

    let mut low: Vec<LowStockItem> = items
        .into_iter()
        .filter(|item| item.data.status != ItemStatus::Retired)
        .filter_map(|item| {
            let level = state.stock_monitor.level(&item.data);
            (level != StockLevel::Ok).then_some(LowStockItem { item, level })
        })
        .collect();
    low.sort_by(|a, b| b.level.cmp(&a.level).then(a.item.data.stock.cmp(&b.item.data.stock)));

    Ok::<_, ApiError>(Json(ApiResponse::success(low)))
}

/// Server-sent stream of stock alerts for the caller's company.
pub async fn alert_stream(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_permission(&state, &user, Module::It, Permission::VIEW)?;

    let company_id = user.company_id.clone();
    let stream = BroadcastStream::new(state.stock_monitor.subscribe()).filter_map(move |msg| {
        match msg {
            Ok(alert) if alert.company_id == company_id => {
                Some(Event::default().event("stock_alert").json_data(&alert))
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Stock alert stream lagged");
                None
            }
        }
    });

    Ok::<_, ApiError>(Sse::new(stream).keep_alive(KeepAlive::default()))
}

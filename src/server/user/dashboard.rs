use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::auth::RequireUser;
use crate::inventory::StockLevel;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{
    Booking, BookingStatus, InventoryItem, ItemStatus, JobOrder, JobOrderStatus, Product, Proposal,
    Record, SalesStatus,
};

#[derive(Debug, Serialize)]
pub struct DashboardCounts {
    pub products: i64,
    pub bookings: BTreeMap<&'static str, i64>,
    pub proposals: BTreeMap<&'static str, i64>,
    pub open_job_orders: i64,
    pub low_stock_items: usize,
}

const OPEN_JOB_ORDER_STATUSES: [JobOrderStatus; 3] = [
    JobOrderStatus::Pending,
    JobOrderStatus::Approved,
    JobOrderStatus::InProgress,
];

pub async fn dashboard(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let company = || DocumentQuery::for_company(&user.company_id);

    let products = store
        .count_records::<Product>(&company())
        .api_err("Failed to count products")?;

    let mut bookings = BTreeMap::new();
    for status in BookingStatus::ALL {
        let count = store
            .count_records::<Booking>(&company().filter("status", status.as_str()))
            .api_err("Failed to count bookings")?;
        bookings.insert(status.as_str(), count);
    }

    let mut proposals = BTreeMap::new();
    for status in SalesStatus::ALL {
        let count = store
            .count_records::<Proposal>(&company().filter("status", status.as_str()))
            .api_err("Failed to count proposals")?;
        proposals.insert(status.as_str(), count);
    }

    let mut open_job_orders = 0;
    for status in OPEN_JOB_ORDER_STATUSES {
        open_job_orders += store
            .count_records::<JobOrder>(&company().filter("status", status.as_str()))
            .api_err("Failed to count job orders")?;
    }

    let items: Vec<Record<InventoryItem>> = store
        .list_records(&company())
        .api_err("Failed to list inventory")?;
    let low_stock_items = items
        .iter()
        .filter(|item| item.data.status != ItemStatus::Retired)
        .filter(|item| state.stock_monitor.level(&item.data) != StockLevel::Ok)
        .count();

    Ok::<_, ApiError>(Json(ApiResponse::success(DashboardCounts {
        products,
        bookings,
        proposals,
        open_job_orders,
        low_stock_items,
    })))
}

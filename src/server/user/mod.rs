pub mod access;
mod cms;
pub mod crud;
mod dashboard;
mod emails;
mod integrations;
mod inventory;
mod notifications;
pub mod resource;
mod sales;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use self::resource::Resource;
use crate::server::AppState;
use crate::server::auth::me;
use crate::types::{
    Booking, Client, CostEstimate, Email, InventoryItem, JobOrder, Product, Proposal,
    ProposalTemplate, Quotation, ScreenSchedule, ServiceAssignment, Tracked,
};

/// List, create, get, patch and delete routes for one collection.
fn documents<T: Resource>(router: Router<Arc<AppState>>, path: &str) -> Router<Arc<AppState>> {
    let item = format!("{path}/{{id}}");
    router
        .route(path, get(crud::list::<T>))
        .route(path, post(crud::create::<T>))
        .route(&item, get(crud::get::<T>))
        .route(&item, patch(crud::update::<T>))
        .route(&item, delete(crud::delete::<T>))
}

/// Documents with a lifecycle also get `PATCH {path}/{id}/status`.
fn tracked<T: Resource + Tracked>(
    router: Router<Arc<AppState>>,
    path: &str,
) -> Router<Arc<AppState>> {
    documents::<T>(router, path).route(
        &format!("{path}/{{id}}/status"),
        patch(crud::set_status::<T>),
    )
}

pub fn user_router() -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/me", get(me))
        .route("/dashboard", get(dashboard::dashboard))
        // Inventory reports are registered before the item routes.
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route("/inventory/alerts/stream", get(inventory::alert_stream))
        // Sales documents
        .route(
            "/proposals/{id}/access-code",
            put(sales::set_access_code::<Proposal>),
        )
        .route(
            "/cost-estimates/{id}/access-code",
            put(sales::set_access_code::<CostEstimate>),
        )
        .route("/proposals/{id}/quotation", post(sales::create_quotation))
        .route("/proposals/{id}/send", post(sales::send_proposal))
        // CMS
        .route("/cms/timeline", post(cms::timeline))
        .route("/products/{id}/timeline", get(cms::product_timeline))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        // Email
        .route("/emails/send", post(emails::compose_and_send))
        .route("/emails/{id}/send", post(emails::send_email))
        // Managed services
        .route("/weather/{location_key}", get(integrations::weather))
        .route("/places", get(integrations::places))
        .route("/search/{index}", post(integrations::search))
        .route("/proxy/image", get(integrations::proxy_image))
        .route("/proxy/pdf", get(integrations::proxy_pdf));

    let router = documents::<Client>(router, "/clients");
    let router = documents::<Product>(router, "/products");
    let router = documents::<ProposalTemplate>(router, "/proposal-templates");
    let router = documents::<ScreenSchedule>(router, "/screen-schedules");
    let router = documents::<InventoryItem>(router, "/inventory");
    let router = documents::<Email>(router, "/emails");
    let router = tracked::<Booking>(router, "/bookings");
    let router = tracked::<JobOrder>(router, "/job-orders");
    let router = tracked::<ServiceAssignment>(router, "/service-assignments");
    let router = tracked::<Proposal>(router, "/proposals");
    let router = tracked::<Quotation>(router, "/quotations");
    tracked::<CostEstimate>(router, "/cost-estimates")
}

//! Per-collection rules layered over the generic document handlers.

use std::sync::Arc;

use chrono::Utc;

use super::access::{load_record, next_number};
use crate::integrations::PRODUCTS_INDEX;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{
    Booking, Client, ContentType, CostEstimate, Document, Email, InventoryItem, JobOrder, Product,
    Proposal, ProposalTemplate, Quotation, Record, ScreenSchedule, ServiceAssignment,
    Subscription, User,
};

/// A document type exposed through the generic CRUD routes.
///
/// Hooks run inside the request; the defaults do nothing.
pub trait Resource: Document {
    /// Fills server-owned fields of a new document. Runs after `check`
    /// so a rejected document never takes a sequence number.
    fn on_create(_state: &AppState, _user: &User, _data: &mut Self) -> Result<(), ApiError> {
        Ok(())
    }

    /// Cross-document checks run before every create or update.
    /// `id` is `None` for a document that does not exist yet.
    fn check(
        _state: &AppState,
        _company_id: &str,
        _id: Option<&str>,
        _data: &Self,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    fn after_write(_state: &Arc<AppState>, _record: &Record<Self>) {}

    fn after_delete(_state: &Arc<AppState>, _record: &Record<Self>) {}
}

impl Resource for Client {}

impl Resource for ProposalTemplate {}

impl Resource for Email {}

impl Resource for Product {
    fn on_create(state: &AppState, user: &User, _data: &mut Self) -> Result<(), ApiError> {
        let subscription = state
            .store
            .get_record::<Subscription>(&user.company_id)
            .api_err("Failed to load subscription")?
            .filter(|s| s.data.is_active(Utc::now().date_naive()))
            .ok_or_else(|| ApiError::forbidden("Company has no active subscription"))?;

        let current = state
            .store
            .count_records::<Product>(&DocumentQuery::for_company(&user.company_id))
            .api_err("Failed to count products")?;
        if !Subscription::allows_another(subscription.data.max_products, current) {
            return Err(ApiError::forbidden(
                "Product limit of the subscription plan reached",
            ));
        }
        Ok(())
    }

    fn after_write(state: &Arc<AppState>, record: &Record<Self>) {
        if state.integrations.search.is_none() {
            return;
        }
        let state = Arc::clone(state);
        let record = record.clone();
        tokio::spawn(async move {
            if let Some(search) = &state.integrations.search {
                if let Err(e) = search
                    .index_record(PRODUCTS_INDEX, &record.id, &record.company_id, &record.data)
                    .await
                {
                    tracing::warn!(product = %record.id, "Failed to index product: {e}");
                }
            }
        });
    }

    fn after_delete(state: &Arc<AppState>, record: &Record<Self>) {
        if state.integrations.search.is_none() {
            return;
        }
        let state = Arc::clone(state);
        let id = record.id.clone();
        tokio::spawn(async move {
            if let Some(search) = &state.integrations.search {
                if let Err(e) = search.delete_record(PRODUCTS_INDEX, &id).await {
                    tracing::warn!(product = %id, "Failed to remove product from index: {e}");
                }
            }
        });
    }
}

impl Resource for Booking {
    fn check(
        state: &AppState,
        company_id: &str,
        id: Option<&str>,
        data: &Self,
    ) -> Result<(), ApiError> {
        load_record::<Product>(state, company_id, &data.product_id)
            .map_err(|_| ApiError::bad_request("Booking refers to an unknown product"))?;

        let others: Vec<Record<Booking>> = state
            .store
            .list_records(
                &DocumentQuery::for_company(company_id).filter("product_id", &data.product_id),
            )
            .api_err("Failed to check bookings")?;

        if let Some(other) = others
            .iter()
            .find(|other| Some(other.id.as_str()) != id && data.conflicts_with(&other.data))
        {
            return Err(ApiError::conflict(format!(
                "Site is already booked from {} to {}",
                other.data.start_date, other.data.end_date
            )));
        }
        Ok(())
    }
}

impl Resource for JobOrder {
    fn on_create(state: &AppState, user: &User, data: &mut Self) -> Result<(), ApiError> {
        data.jo_number = next_number(state, &user.company_id, Self::COLLECTION, "JO")?;
        data.requested_by = Some(user.id.clone());
        Ok(())
    }

    fn check(
        state: &AppState,
        company_id: &str,
        _id: Option<&str>,
        data: &Self,
    ) -> Result<(), ApiError> {
        load_record::<Product>(state, company_id, &data.product_id)
            .map_err(|_| ApiError::bad_request("Job order refers to an unknown product"))?;
        Ok(())
    }
}

impl Resource for ServiceAssignment {
    fn on_create(state: &AppState, user: &User, data: &mut Self) -> Result<(), ApiError> {
        data.sa_number = next_number(state, &user.company_id, Self::COLLECTION, "SA")?;
        Ok(())
    }

    fn check(
        state: &AppState,
        company_id: &str,
        _id: Option<&str>,
        data: &Self,
    ) -> Result<(), ApiError> {
        if let Some(job_order_id) = &data.job_order_id {
            load_record::<JobOrder>(state, company_id, job_order_id).map_err(|_| {
                ApiError::bad_request("Service assignment refers to an unknown job order")
            })?;
        }
        Ok(())
    }
}

impl Resource for Proposal {
    fn on_create(state: &AppState, user: &User, data: &mut Self) -> Result<(), ApiError> {
        data.proposal_number = next_number(state, &user.company_id, Self::COLLECTION, "PP")?;
        Ok(())
    }
}

impl Resource for Quotation {
    fn on_create(state: &AppState, user: &User, data: &mut Self) -> Result<(), ApiError> {
        data.quotation_number = next_number(state, &user.company_id, Self::COLLECTION, "QT")?;
        Ok(())
    }
}

impl Resource for CostEstimate {
    fn on_create(state: &AppState, user: &User, data: &mut Self) -> Result<(), ApiError> {
        data.ce_number = next_number(state, &user.company_id, Self::COLLECTION, "CE")?;
        Ok(())
    }
}

impl Resource for InventoryItem {
    fn after_write(state: &Arc<AppState>, record: &Record<Self>) {
        state.stock_monitor.record(state.store.as_ref(), record);
    }

    fn after_delete(state: &Arc<AppState>, record: &Record<Self>) {
        state.stock_monitor.forget(&record.id);
    }
}

impl Resource for ScreenSchedule {
    fn check(
        state: &AppState,
        company_id: &str,
        id: Option<&str>,
        data: &Self,
    ) -> Result<(), ApiError> {
        let product = load_record::<Product>(state, company_id, &data.product_id)
            .map_err(|_| ApiError::bad_request("Schedule refers to an unknown product"))?;
        let cms = match (&product.data.content_type, &product.data.cms) {
            (ContentType::Digital, Some(cms)) => *cms,
            _ => {
                return Err(ApiError::bad_request(
                    "Schedules need a digital site with cms settings",
                ));
            }
        };
        if data.spot_number > cms.spots_per_loop {
            return Err(ApiError::bad_request(format!(
                "spot_number must be between 1 and {}",
                cms.spots_per_loop
            )));
        }

        let others: Vec<Record<ScreenSchedule>> = state
            .store
            .list_records(
                &DocumentQuery::for_company(company_id).filter("product_id", &data.product_id),
            )
            .api_err("Failed to check schedules")?;
        if others
            .iter()
            .any(|other| Some(other.id.as_str()) != id && data.overlaps(&other.data))
        {
            return Err(ApiError::conflict(format!(
                "Spot {} is already scheduled in that period",
                data.spot_number
            )));
        }
        Ok(())
    }
}

//! Unauthenticated views of sales documents shared with clients.
//!
//! Drafts are never shown. A document with an access code requires the
//! code as the `code` query parameter.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use super::dto::{Decision, PublicViewParams, RespondRequest};
use super::response::{ApiError, ApiResponse, StoreResultExt};
use crate::auth::TokenGenerator;
use crate::server::AppState;
use crate::store::RecordStore;
use crate::types::{
    Company, CostEstimate, Lifecycle, Module, Notification, NotificationKind, Proposal, Record,
    SalesStatus, Tracked,
};

#[derive(Debug, Serialize)]
pub struct PublicDocument<T: Serialize> {
    pub document: Record<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
}

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/proposals/{id}", get(view::<Proposal>))
        .route("/proposals/{id}/respond", post(respond))
        .route("/cost-estimates/{id}", get(view::<CostEstimate>))
}

/// Loads a shared document after checking its visibility and access code.
fn open<T: Tracked<Status = SalesStatus>>(
    state: &AppState,
    id: &str,
    code: Option<&str>,
) -> Result<Record<T>, ApiError> {
    let not_found = || ApiError::not_found("Document not found");

    let record = state
        .store
        .get_record::<T>(id)
        .api_err("Failed to get document")?
        .ok_or_else(not_found)?;
    if !record.data.status().is_public() {
        return Err(not_found());
    }

    let hash = state
        .store
        .get_access_code(T::COLLECTION, &record.id)
        .api_err("Failed to check access code")?;
    if let Some(hash) = hash {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Access code required"))?;
        let valid = TokenGenerator::new()
            .verify(code, &hash)
            .api_err("Failed to check access code")?;
        if !valid {
            return Err(ApiError::forbidden("Invalid access code"));
        }
    }

    Ok(record)
}

fn notify_sales(state: &AppState, company_id: &str, title: String, message: String, link: String) {
    let mut notification =
        Notification::for_department(Module::Sales, NotificationKind::Proposal, title, message);
    notification.link = Some(link);
    if let Err(e) = state.store.create_record(company_id, notification) {
        tracing::warn!(company = %company_id, "Failed to store notification: {e}");
    }
}

pub async fn view<T: Tracked<Status = SalesStatus>>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PublicViewParams>,
) -> impl IntoResponse {
    let mut record = open::<T>(&state, &id, params.code.as_deref())?;

    if record.data.status() == SalesStatus::Sent {
        record.data.set_status(SalesStatus::Viewed);
        state
            .store
            .save_record(&mut record)
            .api_err("Failed to update document")?;

        tracing::info!(collection = %T::COLLECTION, id = %record.id, "Shared document opened");
        notify_sales(
            &state,
            &record.company_id,
            format!("A client opened a shared {}", T::COLLECTION),
            format!("Document {} was viewed for the first time.", record.id),
            format!("/sales/{}/{}", T::COLLECTION, record.id),
        );
    }

    let company = state
        .store
        .get_record::<Company>(&record.company_id)
        .api_err("Failed to get company")?
        .map(|c| c.data);

    Ok::<_, ApiError>(Json(ApiResponse::success(PublicDocument {
        document: record,
        company,
    })))
}

/// Records the client's decision on a shared proposal.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> impl IntoResponse {
    let mut proposal = open::<Proposal>(&state, &id, req.code.as_deref())?;

    let next = match req.decision {
        Decision::Approve => SalesStatus::Approved,
        Decision::Reject => SalesStatus::Rejected,
    };
    if !proposal.data.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!(
            "Proposal is already {}",
            proposal.data.status
        )));
    }
    proposal.data.status = next;
    state
        .store
        .save_record(&mut proposal)
        .api_err("Failed to update proposal")?;

    tracing::info!(proposal = %proposal.id, decision = %next, "Client responded to proposal");
    notify_sales(
        &state,
        &proposal.company_id,
        format!("Proposal {} {next}", proposal.data.proposal_number),
        format!(
            "{} {next} proposal {}.",
            proposal.data.client.name, proposal.data.title
        ),
        format!("/sales/proposals/{}", proposal.id),
    );

    Ok(Json(ApiResponse::success(proposal)))
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Map, Value};

use super::access::{load_record, require_permission};
use super::crud::{insert, parse_new};
use crate::auth::RequireUser;
use crate::integrations::{OutgoingAttachment, OutgoingEmail};
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::RecordStore;
use crate::types::{Email, EmailStatus, Module, Permission, Record, User};

fn outgoing(email: &Email) -> OutgoingEmail {
    OutgoingEmail {
        from: email.from.clone(),
        to: email.to.clone(),
        cc: email.cc.clone(),
        subject: email.subject.clone(),
        html: email.body.clone(),
        attachments: email
            .attachments
            .iter()
            .map(|a| OutgoingAttachment {
                filename: a.filename.clone(),
                path: a.url.clone(),
            })
            .collect(),
    }
}

/// Sends a stored email and records the outcome on it.
pub(crate) async fn dispatch(
    state: &AppState,
    user: &User,
    record: &mut Record<Email>,
) -> Result<(), ApiError> {
    let mailer = state
        .integrations
        .mailer
        .clone()
        .ok_or_else(|| ApiError::service_unavailable("Email delivery is not configured"))?;

    let result = mailer.send(&outgoing(&record.data)).await;

    record.data.sent_by = Some(user.id.clone());
    match &result {
        Ok(provider_id) => {
            record.data.status = EmailStatus::Sent;
            record.data.provider_id = Some(provider_id.clone());
            record.data.sent_at = Some(Utc::now());
            record.data.error = None;
        }
        Err(e) => {
            record.data.status = EmailStatus::Failed;
            record.data.error = Some(e.to_string());
        }
    }
    state
        .store
        .save_record(record)
        .api_err("Failed to update email")?;

    result.map(|_| ()).api_err("Failed to send email")?;
    tracing::info!(email = %record.id, user = %user.id, "Email sent");
    Ok(())
}

pub async fn send_email(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &user, Module::Sales, Permission::EDIT)?;

    let mut record = load_record::<Email>(&state, &user.company_id, &id)?;
    if record.data.status == EmailStatus::Sent {
        return Err(ApiError::conflict("Email has already been sent"));
    }

    dispatch(&state, &user, &mut record).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// Stores and sends a new email in one step.
pub async fn compose_and_send(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Map<String, Value>>,
) -> impl IntoResponse {
    require_permission(&state, &user, Module::Sales, Permission::CREATE)?;

    let email = parse_new::<Email>(body)?;
    if state.integrations.mailer.is_none() {
        return Err(ApiError::service_unavailable(
            "Email delivery is not configured",
        ));
    }
    let mut record = insert(&state, &user, email)?;

    dispatch(&state, &user, &mut record).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

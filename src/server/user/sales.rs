use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::access::{load_record, require_permission};
use super::crud::insert;
use super::emails::dispatch;
use super::resource::Resource;
use crate::auth::{RequireUser, TokenGenerator, generate_code};
use crate::server::AppState;
use crate::server::dto::{AccessCodeRequest, AccessCodeResponse, SendDocumentRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::RecordStore;
use crate::types::{
    Collection, DEFAULT_VAT_RATE, Document, Email, EmailStatus, LineItem, Permission, Proposal,
    Quotation, RelatedDocument, SalesStatus, Totals,
};

const GENERATED_CODE_LEN: usize = 6;
const MIN_CODE_LEN: usize = 4;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Sets, regenerates or clears the code that unlocks a document's public view.
///
/// The plain code is returned once; only its hash is stored.
pub async fn set_access_code<T: Resource>(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AccessCodeRequest>,
) -> impl IntoResponse {
    require_permission(&state, &user, T::MODULE, Permission::EDIT)?;
    let record = load_record::<T>(&state, &user.company_id, &id)?;

    let code = match req.code {
        Some(code) if code.trim().is_empty() => None,
        Some(code) => {
            let code = code.trim().to_string();
            if code.chars().count() < MIN_CODE_LEN {
                return Err(ApiError::bad_request(format!(
                    "Access code must be at least {MIN_CODE_LEN} characters"
                )));
            }
            Some(code)
        }
        None => Some(generate_code(GENERATED_CODE_LEN)),
    };

    let hash = code
        .as_deref()
        .map(|c| TokenGenerator::new().hash(c))
        .transpose()
        .api_err("Failed to hash access code")?;
    state
        .store
        .set_access_code(T::COLLECTION, &record.id, hash.as_deref())
        .api_err("Failed to store access code")?;

    tracing::info!(
        collection = %T::COLLECTION,
        id = %record.id,
        cleared = code.is_none(),
        "Access code updated"
    );

    Ok(Json(ApiResponse::success(AccessCodeResponse { code })))
}

/// Creates a draft quotation from a proposal's sites.
pub async fn create_quotation(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_permission(&state, &user, Quotation::MODULE, Permission::CREATE)?;
    let proposal = load_record::<Proposal>(&state, &user.company_id, &id)?;

    let quotation = Quotation {
        quotation_number: String::new(),
        proposal_id: Some(proposal.id.clone()),
        client: proposal.data.client.clone(),
        items: proposal
            .data
            .products
            .iter()
            .map(|p| LineItem {
                description: p.name.clone(),
                product_id: Some(p.product_id.clone()),
                category: None,
                quantity: 1.0,
                unit_price: p.price,
            })
            .collect(),
        start_date: None,
        end_date: proposal.data.valid_until,
        vat_rate: DEFAULT_VAT_RATE,
        totals: Totals::default(),
        status: SalesStatus::Draft,
    };
    quotation.validate().map_err(ApiError::bad_request)?;

    let record = insert(&state, &user, quotation)?;
    tracing::info!(proposal = %proposal.id, quotation = %record.id, "Converted proposal to quotation");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// Emails the client a link to the public proposal and marks it sent.
pub async fn send_proposal(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SendDocumentRequest>,
) -> impl IntoResponse {
    require_permission(&state, &user, Proposal::MODULE, Permission::EDIT)?;
    let mut proposal = load_record::<Proposal>(&state, &user.company_id, &id)?;

    if proposal.data.status.is_final() {
        return Err(ApiError::conflict(format!(
            "Proposal is already {}",
            proposal.data.status
        )));
    }

    let to = match req.to {
        Some(to) if !to.is_empty() => to,
        _ => proposal
            .data
            .client
            .email
            .clone()
            .into_iter()
            .collect(),
    };
    if to.is_empty() {
        return Err(ApiError::bad_request("No recipient for the proposal"));
    }
    if state.integrations.mailer.is_none() {
        return Err(ApiError::service_unavailable(
            "Email delivery is not configured",
        ));
    }

    let link = state.public_link("proposals", &proposal.id);
    let mut body = format!(
        "<p>Dear {},</p>",
        escape_html(&proposal.data.client.name)
    );
    if let Some(message) = req.message.as_deref().filter(|m| !m.trim().is_empty()) {
        body.push_str(&format!("<p>{}</p>", escape_html(message)));
    }
    body.push_str(&format!(
        "<p>Please review proposal {} ({}) at <a href=\"{link}\">{link}</a>.</p>",
        escape_html(&proposal.data.proposal_number),
        escape_html(&proposal.data.title),
    ));

    let email = Email {
        from: None,
        to,
        cc: req.cc,
        subject: format!(
            "Proposal {}: {}",
            proposal.data.proposal_number, proposal.data.title
        ),
        body,
        attachments: Vec::new(),
        related: Some(RelatedDocument {
            collection: Collection::Proposals,
            id: proposal.id.clone(),
        }),
        status: EmailStatus::Draft,
        provider_id: None,
        sent_at: None,
        sent_by: None,
        error: None,
    };
    email.validate().map_err(ApiError::bad_request)?;
    let mut email = insert(&state, &user, email)?;
    dispatch(&state, &user, &mut email).await?;

    if proposal.data.status == SalesStatus::Draft {
        proposal.data.status = SalesStatus::Sent;
        state
            .store
            .save_record(&mut proposal)
            .api_err("Failed to update proposal")?;
    }

    Ok(Json(ApiResponse::success(proposal)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }
}

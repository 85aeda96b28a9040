use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    CompanyResponse, CreateCompanyRequest, PaginationParams, SubscriptionRequest,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{Company, Document, Record, Subscription};

fn load_company(state: &AppState, id: &str) -> Result<Record<Company>, ApiError> {
    state
        .store
        .get_record::<Company>(id)
        .api_err("Failed to get company")?
        .or_not_found("Company not found")
}

pub async fn create_company(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCompanyRequest>,
) -> impl IntoResponse {
    req.company.validate().map_err(ApiError::bad_request)?;

    // A company's id doubles as its tenant id.
    let id = Uuid::new_v4().to_string();
    let company = state
        .store
        .create_record_with_id(&id, &id, req.company)
        .api_err("Failed to create company")?;

    let subscription = match req.plan {
        Some(plan) => Some(
            state
                .store
                .create_record_with_id(&id, &id, Subscription::new(plan, Utc::now().date_naive()))
                .api_err("Failed to create subscription")?,
        ),
        None => None,
    };

    tracing::info!(company = %company.id, name = %company.data.name, "Company created");
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CompanyResponse {
            company,
            subscription,
        })),
    ))
}

pub async fn list_companies(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let mut query = DocumentQuery::default().limit(DEFAULT_PAGE_SIZE + 1);
    if let Some(cursor) = params.cursor {
        query = query.after(cursor);
    }

    let companies = state
        .store
        .list_records::<Company>(&query)
        .api_err("Failed to list companies")?;

    let (companies, next_cursor, has_more) =
        paginate(companies, DEFAULT_PAGE_SIZE as usize, |c| c.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        companies,
        next_cursor,
        has_more,
    )))
}

pub async fn get_company(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let company = load_company(&state, &id)?;
    let subscription = state
        .store
        .get_record::<Subscription>(&id)
        .api_err("Failed to get subscription")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(CompanyResponse {
        company,
        subscription,
    })))
}

/// Soft-deletes a company and removes all of its users.
pub async fn delete_company(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let company = load_company(&state, &id)?;

    let users = state
        .store
        .list_users(Some(&company.id), "", i32::MAX)
        .api_err("Failed to list users")?;
    for user in &users {
        state
            .store
            .delete_user(&user.id)
            .api_err("Failed to delete user")?;
    }
    state
        .store
        .delete_record::<Company>(&company.id)
        .api_err("Failed to delete company")?;

    tracing::info!(company = %company.id, users = users.len(), "Company deleted");
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn get_subscription(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let company = load_company(&state, &id)?;
    let subscription = state
        .store
        .get_record::<Subscription>(&company.id)
        .api_err("Failed to get subscription")?
        .or_not_found("Subscription not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subscription)))
}

/// Creates or replaces a company's subscription. Limits default to the plan's.
pub async fn set_subscription(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    let company = load_company(&state, &id)?;

    let mut data = Subscription::new(
        req.plan,
        req.start_date.unwrap_or_else(|| Utc::now().date_naive()),
    );
    data.end_date = req.end_date;
    if req.max_products.is_some() {
        data.max_products = req.max_products;
    }
    if req.max_users.is_some() {
        data.max_users = req.max_users;
    }
    data.validate().map_err(ApiError::bad_request)?;

    let existing = state
        .store
        .get_document(Subscription::COLLECTION, &company.id)
        .api_err("Failed to get subscription")?;

    let subscription = match existing {
        Some(doc) => {
            let mut record = Record {
                id: doc.id,
                company_id: doc.company_id,
                created_at: doc.created_at,
                updated_at: doc.updated_at,
                deleted: false,
                data,
            };
            state
                .store
                .save_record(&mut record)
                .api_err("Failed to update subscription")?;
            record
        }
        None => state
            .store
            .create_record_with_id(&company.id, &company.id, data)
            .api_err("Failed to create subscription")?,
    };

    tracing::info!(
        company = %company.id,
        plan = ?subscription.data.plan,
        "Subscription updated"
    );
    Ok::<_, ApiError>(Json(ApiResponse::success(subscription)))
}

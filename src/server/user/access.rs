use std::collections::HashMap;

use crate::access::{is_assignable_role, user_has_permission};
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::{DocumentQuery, RecordStore};
use crate::types::{Collection, Document, Module, Permission, Record, User};

/// Fails with 403 unless one of the user's roles grants `action` on `module`.
pub fn require_permission(
    state: &AppState,
    user: &User,
    module: Module,
    action: Permission,
) -> Result<(), ApiError> {
    let allowed = user_has_permission(state.store.as_ref(), user, module, action)
        .api_err("Failed to check permissions")?;
    if !allowed {
        return Err(ApiError::forbidden(format!(
            "Missing {action} permission on {module}"
        )));
    }
    Ok(())
}

/// Loads a live record owned by `company_id`. Records of other companies
/// are reported as missing.
pub fn load_record<T: Document>(
    state: &AppState,
    company_id: &str,
    id: &str,
) -> Result<Record<T>, ApiError> {
    state
        .store
        .get_record::<T>(id)
        .api_err("Failed to get record")?
        .filter(|r| r.company_id == company_id)
        .ok_or_else(|| ApiError::not_found(format!("{} record not found", T::COLLECTION)))
}

/// Builds a company-scoped query from list parameters.
///
/// `cursor` pages through results; any other key must be one of the
/// document's filterable fields.
pub fn list_query<T: Document>(
    company_id: &str,
    params: &HashMap<String, String>,
) -> Result<DocumentQuery, ApiError> {
    let mut query = DocumentQuery::for_company(company_id);
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    for key in keys {
        let value = &params[key];
        if key == "cursor" {
            query = query.after(value.clone());
        } else if T::FILTERABLE.contains(&key.as_str()) {
            query = query.filter(key.clone(), value.clone());
        } else {
            return Err(ApiError::bad_request(format!(
                "Cannot filter {} by '{key}'",
                T::COLLECTION
            )));
        }
    }
    Ok(query)
}

/// Next document number for a company, such as `PP-00001`.
pub fn next_number(
    state: &AppState,
    company_id: &str,
    collection: Collection,
    prefix: &str,
) -> Result<String, ApiError> {
    let n = state
        .store
        .next_sequence(&format!("{company_id}:{collection}"))
        .api_err("Failed to assign document number")?;
    Ok(format!("{prefix}-{n:05}"))
}

/// Rejects empty role lists and roles the company cannot assign.
pub fn check_roles(
    state: &AppState,
    company_id: &str,
    roles: &[String],
) -> Result<(), ApiError> {
    if roles.is_empty() {
        return Err(ApiError::bad_request("A user needs at least one role"));
    }
    for role in roles {
        if !is_assignable_role(state.store.as_ref(), company_id, role)
            .api_err("Failed to check role")?
        {
            return Err(ApiError::bad_request(format!("Unknown role: {role}")));
        }
    }
    Ok(())
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Module;

/// Named collections in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Companies,
    Clients,
    Products,
    Bookings,
    JobOrders,
    ServiceAssignments,
    Proposals,
    Quotations,
    CostEstimates,
    ItInventory,
    Notifications,
    Emails,
    Subscriptions,
    ProposalTemplates,
    ScreenSchedules,
}

impl Collection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Companies => "companies",
            Collection::Clients => "clients",
            Collection::Products => "products",
            Collection::Bookings => "bookings",
            Collection::JobOrders => "job_orders",
            Collection::ServiceAssignments => "service_assignments",
            Collection::Proposals => "proposals",
            Collection::Quotations => "quotations",
            Collection::CostEstimates => "cost_estimates",
            Collection::ItInventory => "it_inventory",
            Collection::Notifications => "notifications",
            Collection::Emails => "emails",
            Collection::Subscriptions => "subscriptions",
            Collection::ProposalTemplates => "proposal_templates",
            Collection::ScreenSchedules => "screen_schedules",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed document stored as JSON in a collection.
///
/// Documents are schema-less in storage; this trait is where the shape is
/// checked on the way in.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    /// Module whose permissions guard this collection.
    const MODULE: Module;

    /// Top-level fields that may be used as equality filters when listing.
    const FILTERABLE: &'static [&'static str] = &[];

    /// Top-level fields that generic updates may not touch.
    const PROTECTED: &'static [&'static str] = &[];

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Recomputes derived fields before every write.
    fn prepare(&mut self) {}
}

/// A status enum with a fixed set of allowed moves.
pub trait Lifecycle:
    Copy + PartialEq + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn can_transition_to(self, next: Self) -> bool;
}

/// A document whose `status` field follows a [`Lifecycle`].
pub trait Tracked: Document {
    type Status: Lifecycle;

    fn status(&self) -> Self::Status;
    fn set_status(&mut self, status: Self::Status);
}

/// A stored document together with its bookkeeping fields.
#[derive(Debug, Clone, Serialize)]
pub struct Record<T> {
    pub id: String,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
    #[serde(flatten)]
    pub data: T,
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{field} must be a non-negative number"));
    }
    Ok(())
}

/// Rounds a monetary amount to centavos.
#[must_use]
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Turns a stored enum value into display text: `digital` → `Digital`,
/// `roll_up` → `Roll Up`.
#[must_use]
pub fn display_label(raw: &str) -> String {
    raw.split(['_', ' ', '-'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::document::{require_non_negative, require_text, round_money};
use super::{Collection, Document, Lifecycle, Module, Tracked};

pub const DEFAULT_VAT_RATE: f64 = 0.12;

fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

fn default_quantity() -> f64 {
    1.0
}

/// Lifecycle shared by proposals, quotations and cost estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesStatus {
    #[default]
    Draft,
    Sent,
    Viewed,
    Approved,
    Rejected,
}

impl SalesStatus {
    pub const ALL: [SalesStatus; 5] = [
        SalesStatus::Draft,
        SalesStatus::Sent,
        SalesStatus::Viewed,
        SalesStatus::Approved,
        SalesStatus::Rejected,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SalesStatus::Draft => "draft",
            SalesStatus::Sent => "sent",
            SalesStatus::Viewed => "viewed",
            SalesStatus::Approved => "approved",
            SalesStatus::Rejected => "rejected",
        }
    }

    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, SalesStatus::Approved | SalesStatus::Rejected)
    }

    /// Drafts are never shown outside the company.
    #[must_use]
    pub const fn is_public(self) -> bool {
        !matches!(self, SalesStatus::Draft)
    }
}

impl Lifecycle for SalesStatus {
    fn can_transition_to(self, next: SalesStatus) -> bool {
        matches!(
            (self, next),
            (SalesStatus::Draft, SalesStatus::Sent)
                | (SalesStatus::Sent, SalesStatus::Viewed)
                | (SalesStatus::Sent, SalesStatus::Approved)
                | (SalesStatus::Sent, SalesStatus::Rejected)
                | (SalesStatus::Viewed, SalesStatus::Approved)
                | (SalesStatus::Viewed, SalesStatus::Rejected)
        )
    }
}

impl fmt::Display for SalesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized client details copied onto sales documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ClientRef {
    fn validate(&self) -> Result<(), String> {
        require_text("client name", &self.name)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("invalid email address: {email}")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

impl Document for Client {
    const COLLECTION: Collection = Collection::Clients;
    const MODULE: Module = Module::Sales;
    const FILTERABLE: &'static [&'static str] = &["industry", "company_name"];

    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    #[must_use]
    pub fn amount(&self) -> f64 {
        round_money(self.quantity * self.unit_price)
    }

    fn validate(&self) -> Result<(), String> {
        require_text("item description", &self.description)?;
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err("item quantity must be positive".to_string());
        }
        require_non_negative("item unit_price", self.unit_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total: f64,
}

impl Totals {
    #[must_use]
    pub fn compute(items: &[LineItem], vat_rate: f64) -> Self {
        let subtotal = round_money(items.iter().map(LineItem::amount).sum());
        let vat_amount = round_money(subtotal * vat_rate);
        Self {
            subtotal,
            vat_rate,
            vat_amount,
            total: round_money(subtotal + vat_amount),
        }
    }
}

fn validate_vat_rate(rate: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&rate) {
        return Err("vat_rate must be between 0 and 1".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalProduct {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default)]
    pub proposal_number: String,
    pub title: String,
    pub client: ClientRef,
    pub products: Vec<ProposalProduct>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub status: SalesStatus,
}

impl Document for Proposal {
    const COLLECTION: Collection = Collection::Proposals;
    const MODULE: Module = Module::Sales;
    const FILTERABLE: &'static [&'static str] = &["status", "template_id"];
    const PROTECTED: &'static [&'static str] = &["status", "proposal_number", "total_amount"];

    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title)?;
        self.client.validate()?;
        if self.products.is_empty() {
            return Err("proposal needs at least one product".to_string());
        }
        for product in &self.products {
            require_text("product_id", &product.product_id)?;
            require_non_negative("product price", product.price)?;
        }
        Ok(())
    }

    fn prepare(&mut self) {
        self.total_amount = round_money(self.products.iter().map(|p| p.price).sum());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(default)]
    pub quotation_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<String>,
    pub client: ClientRef,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    #[serde(default)]
    pub totals: Totals,
    #[serde(default)]
    pub status: SalesStatus,
}

impl Tracked for Proposal {
    type Status = SalesStatus;

    fn status(&self) -> SalesStatus {
        self.status
    }

    fn set_status(&mut self, status: SalesStatus) {
        self.status = status;
    }
}

impl Document for Quotation {
    const COLLECTION: Collection = Collection::Quotations;
    const MODULE: Module = Module::Sales;
    const FILTERABLE: &'static [&'static str] = &["status", "proposal_id"];
    const PROTECTED: &'static [&'static str] = &["status", "quotation_number", "totals"];

    fn validate(&self) -> Result<(), String> {
        self.client.validate()?;
        if self.items.is_empty() {
            return Err("quotation needs at least one item".to_string());
        }
        for item in &self.items {
            item.validate()?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err("end_date cannot be before start_date".to_string());
            }
        }
        validate_vat_rate(self.vat_rate)
    }

    fn prepare(&mut self) {
        self.totals = Totals::compute(&self.items, self.vat_rate);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    #[serde(default)]
    pub ce_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<String>,
    pub title: String,
    pub client: ClientRef,
    pub items: Vec<LineItem>,
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    #[serde(default)]
    pub totals: Totals,
    #[serde(default)]
    pub status: SalesStatus,
}

impl Tracked for Quotation {
    type Status = SalesStatus;

    fn status(&self) -> SalesStatus {
        self.status
    }

    fn set_status(&mut self, status: SalesStatus) {
        self.status = status;
    }
}

impl Document for CostEstimate {
    const COLLECTION: Collection = Collection::CostEstimates;
    const MODULE: Module = Module::Sales;
    const FILTERABLE: &'static [&'static str] = &["status", "proposal_id"];
    const PROTECTED: &'static [&'static str] = &["status", "ce_number", "totals"];

    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title)?;
        self.client.validate()?;
        if self.items.is_empty() {
            return Err("cost estimate needs at least one item".to_string());
        }
        for item in &self.items {
            item.validate()?;
        }
        validate_vat_rate(self.vat_rate)
    }

    fn prepare(&mut self) {
        self.totals = Totals::compute(&self.items, self.vat_rate);
    }
}

impl Tracked for CostEstimate {
    type Status = SalesStatus;

    fn status(&self) -> SalesStatus {
        self.status
    }

    fn set_status(&mut self, status: SalesStatus) {
        self.status = status;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Document for ProposalTemplate {
    const COLLECTION: Collection = Collection::ProposalTemplates;
    const MODULE: Module = Module::Sales;

    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, unit_price: f64) -> LineItem {
        LineItem {
            description: "EDSA northbound LED".to_string(),
            product_id: None,
            category: None,
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_totals_apply_vat() {
        let totals = Totals::compute(&[item(2.0, 50_000.0), item(1.0, 12_500.5)], DEFAULT_VAT_RATE);
        assert_eq!(totals.subtotal, 112_500.5);
        assert_eq!(totals.vat_amount, 13_500.06);
        assert_eq!(totals.total, 126_000.56);
    }

    #[test]
    fn test_status_transitions() {
        use SalesStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Viewed));
        assert!(Viewed.can_transition_to(Approved));
        assert!(Sent.can_transition_to(Rejected));

        assert!(!Draft.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Viewed.can_transition_to(Sent));
        assert!(Rejected.is_final());
        assert!(!Draft.is_public());
    }

    #[test]
    fn test_quotation_validation() {
        let mut quotation = Quotation {
            quotation_number: String::new(),
            proposal_id: None,
            client: ClientRef {
                name: "Acme Foods".to_string(),
                ..ClientRef::default()
            },
            items: vec![item(1.0, 1000.0)],
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            vat_rate: DEFAULT_VAT_RATE,
            totals: Totals::default(),
            status: SalesStatus::Draft,
        };
        assert!(quotation.validate().is_err());

        quotation.end_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        assert!(quotation.validate().is_ok());

        quotation.items[0].quantity = 0.0;
        assert!(quotation.validate().is_err());
    }

    #[test]
    fn test_proposal_prepare_sums_prices() {
        let mut proposal = Proposal {
            proposal_number: String::new(),
            title: "Q3 campaign".to_string(),
            client: ClientRef {
                name: "Acme".to_string(),
                email: Some("buyer@acme.ph".to_string()),
                ..ClientRef::default()
            },
            products: vec![
                ProposalProduct {
                    product_id: "p1".to_string(),
                    name: "Site 1".to_string(),
                    location: None,
                    price: 10.25,
                },
                ProposalProduct {
                    product_id: "p2".to_string(),
                    name: "Site 2".to_string(),
                    location: None,
                    price: 20.0,
                },
            ],
            total_amount: 0.0,
            valid_until: None,
            notes: None,
            template_id: None,
            status: SalesStatus::Draft,
        };
        proposal.prepare();
        assert!((proposal.total_amount - 30.25).abs() < 0.001);

        proposal.client.email = Some("not-an-email".to_string());
        assert!(proposal.validate().is_err());
    }
}

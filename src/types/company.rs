use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::document::require_text;
use super::sales::validate_email;
use super::{Collection, Document, Module};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

impl Document for Company {
    const COLLECTION: Collection = Collection::Companies;
    const MODULE: Module = Module::Admin;

    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        if let Some(email) = &self.contact_email {
            validate_email(email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Trial,
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionPlan {
    /// Default `(max_products, max_users)` for the plan; `None` is unlimited.
    #[must_use]
    pub const fn default_limits(self) -> (Option<u32>, Option<u32>) {
        match self {
            SubscriptionPlan::Trial => (Some(5), Some(3)),
            SubscriptionPlan::Basic => (Some(20), Some(10)),
            SubscriptionPlan::Premium => (Some(100), Some(50)),
            SubscriptionPlan::Enterprise => (None, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: SubscriptionPlan,
    #[serde(default)]
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_products: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_users: Option<u32>,
}

impl Subscription {
    #[must_use]
    pub fn new(plan: SubscriptionPlan, start_date: NaiveDate) -> Self {
        let (max_products, max_users) = plan.default_limits();
        Self {
            plan,
            status: SubscriptionStatus::Active,
            start_date,
            end_date: None,
            max_products,
            max_users,
        }
    }

    #[must_use]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.status == SubscriptionStatus::Active
            && self.start_date <= today
            && self.end_date.is_none_or(|end| today <= end)
    }

    /// Whether one more item fits under `limit` given `current` usage.
    #[must_use]
    pub fn allows_another(limit: Option<u32>, current: i64) -> bool {
        limit.is_none_or(|max| current < i64::from(max))
    }
}

impl Document for Subscription {
    const COLLECTION: Collection = Collection::Subscriptions;
    const MODULE: Module = Module::Admin;
    const FILTERABLE: &'static [&'static str] = &["status", "plan"];

    fn validate(&self) -> Result<(), String> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err("end_date cannot be before start_date".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_subscription_active_window() {
        let mut sub = Subscription::new(SubscriptionPlan::Basic, day(2026, 1, 1));
        sub.end_date = Some(day(2026, 12, 31));

        assert!(sub.is_active(day(2026, 6, 1)));
        assert!(sub.is_active(day(2026, 12, 31)));
        assert!(!sub.is_active(day(2027, 1, 1)));
        assert!(!sub.is_active(day(2025, 12, 31)));

        sub.status = SubscriptionStatus::Cancelled;
        assert!(!sub.is_active(day(2026, 6, 1)));
    }

    #[test]
    fn test_plan_limits() {
        let sub = Subscription::new(SubscriptionPlan::Trial, day(2026, 1, 1));
        assert!(Subscription::allows_another(sub.max_products, 4));
        assert!(!Subscription::allows_another(sub.max_products, 5));

        let unlimited = Subscription::new(SubscriptionPlan::Enterprise, day(2026, 1, 1));
        assert!(Subscription::allows_another(unlimited.max_users, 10_000));
    }
}

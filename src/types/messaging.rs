use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::require_text;
use super::sales::validate_email;
use super::{Collection, Document, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Alert,
    Proposal,
    JobOrder,
    Stock,
}

/// A notification addressed either to one user or to a whole department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Module>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    #[must_use]
    pub fn for_department(
        department: Module,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: None,
            department: Some(department),
            title: title.into(),
            message: message.into(),
            kind,
            link: None,
            read: false,
        }
    }
}

impl Document for Notification {
    const COLLECTION: Collection = Collection::Notifications;
    const MODULE: Module = Module::Admin;
    const FILTERABLE: &'static [&'static str] = &["user_id", "department", "read", "kind"];

    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title)?;
        if self.user_id.is_none() && self.department.is_none() {
            return Err("notification needs a user_id or a department".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    #[default]
    Draft,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// Points an email at the sales document it was sent for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub collection: Collection,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedDocument>,
    #[serde(default)]
    pub status: EmailStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Document for Email {
    const COLLECTION: Collection = Collection::Emails;
    const MODULE: Module = Module::Sales;
    const FILTERABLE: &'static [&'static str] = &["status", "sent_by"];
    const PROTECTED: &'static [&'static str] =
        &["status", "provider_id", "sent_at", "sent_by", "error"];

    fn validate(&self) -> Result<(), String> {
        if self.to.is_empty() {
            return Err("email needs at least one recipient".to_string());
        }
        for address in self.to.iter().chain(&self.cc) {
            validate_email(address)?;
        }
        require_text("subject", &self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_requires_valid_recipients() {
        let mut email = Email {
            from: None,
            to: vec!["client@acme.ph".to_string()],
            cc: vec!["bad-address".to_string()],
            subject: "Proposal".to_string(),
            body: String::new(),
            attachments: Vec::new(),
            related: None,
            status: EmailStatus::Draft,
            provider_id: None,
            sent_at: None,
            sent_by: None,
            error: None,
        };
        assert!(email.validate().is_err());

        email.cc.clear();
        assert!(email.validate().is_ok());

        email.to.clear();
        assert!(email.validate().is_err());
    }

    #[test]
    fn test_notification_needs_audience() {
        let mut notification =
            Notification::for_department(Module::It, NotificationKind::Stock, "Low stock", "");
        assert!(notification.validate().is_ok());

        notification.department = None;
        assert!(notification.validate().is_err());
    }
}

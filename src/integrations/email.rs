use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ensure_success;
use crate::config::ResendConfig;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingAttachment {
    pub filename: String,
    /// Remote URL the provider downloads the file from.
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<OutgoingAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email and returns the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

/// Resend HTTP API.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, config: &ResendConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let mut payload = email.clone();
        payload.from.get_or_insert_with(|| self.from.clone());

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let body: SendResponse = ensure_success("resend", response).await?.json().await?;
        tracing::info!(to = ?email.to, id = %body.id, "Email sent");
        Ok(body.id)
    }
}

//! Thin clients for the managed services the server relays to.

mod email;
mod places;
mod proxy;
mod search;
mod weather;

use std::sync::Arc;
use std::time::Duration;

pub use email::{Mailer, OutgoingAttachment, OutgoingEmail, ResendMailer};
pub use places::{Place, PlacesClient};
pub use proxy::{ProxiedFile, ProxyKind, fetch, validate_proxy_url};
pub use search::{PRODUCTS_INDEX, SearchClient, SearchRequest};
pub use weather::{DailyForecast, WeatherClient};

use crate::config::{IntegrationsConfig, ProxyConfig};
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("oohdesk/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Client for the image and PDF proxy. Redirects are not followed so a
/// fetch never leaves the allow-listed host.
pub fn proxy_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("oohdesk/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

/// Fails with an integration error unless the upstream answered 2xx.
async fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(service, %status, "Upstream request failed: {body}");
    Err(Error::Integration(format!("{service} returned {status}")))
}

/// Path segments we splice into upstream URLs.
fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 128
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && value != "."
        && value != ".."
}

/// The configured set of service clients. Unconfigured services are `None`.
pub struct Integrations {
    pub http: reqwest::Client,
    pub proxy_http: reqwest::Client,
    pub weather: Option<WeatherClient>,
    pub places: Option<PlacesClient>,
    pub search: Option<SearchClient>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub proxy: ProxyConfig,
}

impl Integrations {
    pub fn from_config(config: &IntegrationsConfig) -> Result<Self> {
        let http = http_client()?;
        Ok(Self {
            weather: config
                .accuweather
                .as_ref()
                .map(|c| WeatherClient::new(http.clone(), c)),
            places: config
                .google_maps
                .as_ref()
                .map(|c| PlacesClient::new(http.clone(), c)),
            search: config
                .algolia
                .as_ref()
                .map(|c| SearchClient::new(http.clone(), c)),
            mailer: config.resend.as_ref().map(|c| {
                Arc::new(ResendMailer::new(http.clone(), c)) as Arc<dyn Mailer>
            }),
            proxy: config.proxy.clone(),
            proxy_http: proxy_client()?,
            http,
        })
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }
}

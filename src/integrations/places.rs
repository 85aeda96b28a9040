use serde::{Deserialize, Serialize};

use super::ensure_success;
use crate::config::GoogleMapsConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<RawPlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct RawPlace {
    place_id: String,
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: RawGeometry,
}

#[derive(Deserialize)]
struct RawGeometry {
    location: RawLocation,
}

#[derive(Deserialize)]
struct RawLocation {
    lat: f64,
    lng: f64,
}

/// Google Places text search, used to pin billboard sites.
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PlacesClient {
    pub fn new(http: reqwest::Client, config: &GoogleMapsConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::BadRequest("query cannot be empty".to_string()));
        }

        let response = self
            .http
            .get(format!("{}/maps/api/place/textsearch/json", self.base_url))
            .query(&[("query", query), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let body: TextSearchResponse = ensure_success("google places", response).await?.json().await?;
        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            status => {
                let detail = body.error_message.unwrap_or_default();
                tracing::error!(status, "Places search failed: {detail}");
                return Err(Error::Integration(format!("google places returned {status}")));
            }
        }

        Ok(body
            .results
            .into_iter()
            .map(|p| Place {
                place_id: p.place_id,
                name: p.name,
                address: p.formatted_address,
                lat: p.geometry.location.lat,
                lng: p.geometry.location.lng,
            })
            .collect())
    }
}

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{ensure_success, is_safe_segment};
use crate::config::AccuWeatherConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub min_c: f64,
    pub max_c: f64,
    pub day_phrase: String,
    pub night_phrase: String,
    pub precipitation: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ForecastResponse {
    daily_forecasts: Vec<RawDay>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDay {
    date: DateTime<FixedOffset>,
    temperature: RawTemperature,
    day: RawPeriod,
    night: RawPeriod,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTemperature {
    minimum: RawValue,
    maximum: RawValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawValue {
    value: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPeriod {
    icon_phrase: String,
    #[serde(default)]
    has_precipitation: bool,
}

impl From<RawDay> for DailyForecast {
    fn from(day: RawDay) -> Self {
        Self {
            date: day.date.date_naive(),
            min_c: day.temperature.minimum.value,
            max_c: day.temperature.maximum.value,
            day_phrase: day.day.icon_phrase,
            night_phrase: day.night.icon_phrase,
            precipitation: day.day.has_precipitation || day.night.has_precipitation,
        }
    }
}

/// AccuWeather five-day forecast client.
pub struct WeatherClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WeatherClient {
    pub fn new(http: reqwest::Client, config: &AccuWeatherConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
        }
    }

    pub async fn forecast(&self, location_key: &str) -> Result<Vec<DailyForecast>> {
        if !is_safe_segment(location_key) {
            return Err(Error::BadRequest(format!(
                "invalid location key: {location_key}"
            )));
        }

        let url = format!("{}/forecasts/v1/daily/5day/{location_key}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("metric", "true")])
            .send()
            .await?;

        let body: ForecastResponse = ensure_success("accuweather", response).await?.json().await?;
        Ok(body.daily_forecasts.into_iter().map(DailyForecast::from).collect())
    }
}

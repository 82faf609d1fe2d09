//! Open-Meteo hourly weather client.
//!
//! Fetches hourly weather and soil variables for a coordinate. Dates in the
//! future come from the forecast endpoint; past dates (and today) come from
//! the historical archive, covering the lookback window before the date.
//! See: https://open-meteo.com/en/docs and https://open-meteo.com/en/docs/historical-weather-api

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::conditions::{HourlyArrays, WeatherSeries};

pub const FORECAST_API_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const ARCHIVE_API_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Hourly variables requested from both endpoints.
const HOURLY_VARIABLES: &str = "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m,\
soil_temperature_0_to_7cm,soil_moisture_0_to_7cm";

/// Days of history fetched before a past reference date.
pub const LOOKBACK_DAYS: i64 = 7;

/// Which Open-Meteo API serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherEndpoint {
    Forecast,
    Archive,
}

/// Endpoint and inclusive date range for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherWindow {
    pub endpoint: WeatherEndpoint,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Choose the endpoint and window for a target date.
///
/// A date after `today` is a forecast for that single day. Any other date
/// uses the archive for the `LOOKBACK_DAYS` before it, inclusive.
pub fn window_for_date(date: NaiveDate, today: NaiveDate) -> WeatherWindow {
    if date > today {
        WeatherWindow {
            endpoint: WeatherEndpoint::Forecast,
            start: date,
            end: date,
        }
    } else {
        WeatherWindow {
            endpoint: WeatherEndpoint::Archive,
            start: date - Duration::days(LOOKBACK_DAYS),
            end: date,
        }
    }
}

/// Client for the Open-Meteo forecast and archive APIs.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    forecast_url: String,
    archive_url: String,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: HourlyArrays,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoErrorBody {
    reason: Option<String>,
}

impl OpenMeteoClient {
    pub fn new(forecast_url: &str, archive_url: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("BloomWatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            forecast_url: forecast_url.to_string(),
            archive_url: archive_url.to_string(),
        })
    }

    /// Fetch the hourly series for a coordinate and window.
    ///
    /// Any transport, HTTP or decoding failure is reported as an
    /// `ExternalServiceError`; there is no retry.
    pub async fn fetch_hourly(
        &self,
        latitude: f64,
        longitude: f64,
        window: &WeatherWindow,
    ) -> Result<WeatherSeries, AppError> {
        let url = match window.endpoint {
            WeatherEndpoint::Forecast => &self.forecast_url,
            WeatherEndpoint::Archive => &self.archive_url,
        };

        let start = window.start.format("%Y-%m-%d").to_string();
        let end = window.end.format("%Y-%m-%d").to_string();

        let response = self
            .client
            .get(url)
            .query(&[
                ("latitude", format!("{:.4}", latitude)),
                ("longitude", format!("{:.4}", longitude)),
                ("start_date", start),
                ("end_date", end),
                ("hourly", HOURLY_VARIABLES.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Open-Meteo request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // Open-Meteo explains rejected requests in a JSON `reason` field
            let reason = response
                .json::<OpenMeteoErrorBody>()
                .await
                .ok()
                .and_then(|b| b.reason)
                .unwrap_or_else(|| "no reason given".to_string());
            tracing::warn!("Open-Meteo returned HTTP {}: {}", status, reason);
            return Err(AppError::ExternalServiceError(format!(
                "Open-Meteo returned HTTP {}: {}",
                status, reason
            )));
        }

        let body: OpenMeteoResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Open-Meteo JSON parse error: {}", e))
        })?;

        let series = WeatherSeries::try_from(body.hourly).map_err(|e| {
            tracing::warn!("Open-Meteo hourly data malformed: {}", e);
            AppError::ExternalServiceError(format!("Open-Meteo hourly data malformed: {}", e))
        })?;

        tracing::debug!(
            "Received {} hourly readings from {}",
            series.len(),
            series.time().first().map(String::as_str).unwrap_or("an untimed series")
        );
        Ok(series)
    }

    /// Fetch the series relevant to a target date (see `window_for_date`).
    pub async fn fetch_for_date(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<WeatherSeries, AppError> {
        let window = window_for_date(date, today);
        tracing::debug!(
            "Fetching {:?} weather for ({:.4}, {:.4}) {}..={}",
            window.endpoint,
            latitude,
            longitude,
            window.start,
            window.end
        );
        self.fetch_hourly(latitude, longitude, &window).await
    }
}

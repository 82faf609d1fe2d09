//! Hourly weather series and the averaged condition summary derived from it.
//!
//! `WeatherSeries` is the validated form of the provider's `hourly` object:
//! every column has one entry per hour. `summarize_conditions` turns it into
//! the `ConditionSummary` consumed by the risk evaluator.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::helpers::{mean_present, round_1dp, round_dp, sum_present};
use crate::services::variation::WeatherVariation;

/// Errors raised while validating or summarizing a weather series.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("weather series is empty")]
    Empty,
    #[error("column '{column}' has {found} entries, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("column '{0}' has no readings")]
    NoReadings(&'static str),
}

/// Raw hourly arrays, as returned by Open-Meteo or posted by a client.
///
/// Column aliases match the provider's variable names so the `hourly`
/// object deserializes directly. Optional columns may be left empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct HourlyArrays {
    /// ISO 8601 hour stamps (optional)
    #[serde(default)]
    pub time: Vec<String>,
    /// Air temperature at 2 m, °C
    #[serde(default, alias = "temperature_2m")]
    pub temperature_c: Vec<Option<f64>>,
    /// Relative humidity at 2 m, %
    #[serde(default, alias = "relative_humidity_2m")]
    pub humidity_pct: Vec<Option<f64>>,
    /// Wind speed at 10 m, km/h
    #[serde(default, alias = "wind_speed_10m")]
    pub wind_speed: Vec<Option<f64>>,
    /// Hourly precipitation, mm
    #[serde(default, alias = "precipitation")]
    pub precipitation_mm: Vec<Option<f64>>,
    /// Soil temperature 0-7 cm, °C
    #[serde(default, alias = "soil_temperature_0_to_7cm")]
    pub soil_temperature_c: Vec<Option<f64>>,
    /// Soil moisture 0-7 cm, m³/m³
    #[serde(default, alias = "soil_moisture_0_to_7cm")]
    pub soil_moisture: Vec<Option<f64>>,
}

/// An hourly weather series whose columns are aligned by index.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSeries {
    time: Vec<String>,
    temperature_c: Vec<Option<f64>>,
    humidity_pct: Vec<Option<f64>>,
    wind_speed: Vec<Option<f64>>,
    precipitation_mm: Vec<Option<f64>>,
    soil_temperature_c: Vec<Option<f64>>,
    soil_moisture: Vec<Option<f64>>,
}

impl WeatherSeries {
    /// Number of hourly entries.
    pub fn len(&self) -> usize {
        self.temperature_c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperature_c.is_empty()
    }

    pub fn time(&self) -> &[String] {
        &self.time
    }

    pub fn temperature_c(&self) -> &[Option<f64>] {
        &self.temperature_c
    }

    pub fn humidity_pct(&self) -> &[Option<f64>] {
        &self.humidity_pct
    }

    pub fn wind_speed(&self) -> &[Option<f64>] {
        &self.wind_speed
    }

    pub fn precipitation_mm(&self) -> &[Option<f64>] {
        &self.precipitation_mm
    }

    pub fn soil_temperature_c(&self) -> &[Option<f64>] {
        &self.soil_temperature_c
    }

    pub fn soil_moisture(&self) -> &[Option<f64>] {
        &self.soil_moisture
    }
}

/// Required column: must have exactly `expected` entries.
fn required<T>(column: &'static str, values: Vec<T>, expected: usize) -> Result<Vec<T>, SeriesError> {
    if values.len() != expected {
        return Err(SeriesError::LengthMismatch {
            column,
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

/// Optional column: an empty column is padded to `expected` missing entries.
fn optional<T: Clone>(
    column: &'static str,
    values: Vec<T>,
    expected: usize,
    missing: T,
) -> Result<Vec<T>, SeriesError> {
    if values.is_empty() {
        return Ok(vec![missing; expected]);
    }
    required(column, values, expected)
}

impl TryFrom<HourlyArrays> for WeatherSeries {
    type Error = SeriesError;

    fn try_from(raw: HourlyArrays) -> Result<Self, Self::Error> {
        let n = raw.temperature_c.len();
        if n == 0 {
            return Err(SeriesError::Empty);
        }
        Ok(Self {
            time: if raw.time.is_empty() {
                Vec::new()
            } else {
                required("time", raw.time, n)?
            },
            temperature_c: raw.temperature_c,
            humidity_pct: required("humidity_pct", raw.humidity_pct, n)?,
            wind_speed: required("wind_speed", raw.wind_speed, n)?,
            precipitation_mm: optional("precipitation_mm", raw.precipitation_mm, n, None)?,
            soil_temperature_c: optional("soil_temperature_c", raw.soil_temperature_c, n, None)?,
            soil_moisture: optional("soil_moisture", raw.soil_moisture, n, None)?,
        })
    }
}

/// Averaged weather and soil conditions over a window.
///
/// `weather_score` and `weather_description` are filled in from the
/// variation analyzer when the caller ran it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ConditionSummary {
    /// Mean air temperature, °C
    pub temp: f64,
    /// Mean relative humidity, %
    pub humidity: f64,
    /// Mean wind speed
    pub wind: f64,
    /// Total precipitation over the window, mm
    #[serde(default)]
    pub precip: Option<f64>,
    /// Mean soil temperature, °C (absent when the provider had no soil data)
    #[serde(default)]
    pub soil_temp: Option<f64>,
    /// Mean soil moisture
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    /// Instability score 0-3
    #[serde(default)]
    pub weather_score: Option<u8>,
    /// Instability description
    #[serde(default)]
    pub weather_description: Option<String>,
}

/// Rounding applied to summary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Full precision (backtesting).
    None,
    /// One decimal place (user-facing forecasts). Soil moisture is a volume
    /// fraction and keeps three places.
    Tenth,
}

impl Rounding {
    fn apply(self, v: f64) -> f64 {
        match self {
            Rounding::None => v,
            Rounding::Tenth => round_1dp(v),
        }
    }

    fn apply_fraction(self, v: f64) -> f64 {
        match self {
            Rounding::None => v,
            Rounding::Tenth => round_dp(v, 3),
        }
    }
}

/// Average a weather series into a condition summary.
///
/// Means skip missing hours. Temperature, humidity and wind must have at
/// least one reading; soil fields are `None` when the series has none.
pub fn summarize_conditions(
    series: &WeatherSeries,
    rounding: Rounding,
) -> Result<ConditionSummary, SeriesError> {
    let temp = mean_present(series.temperature_c()).ok_or(SeriesError::NoReadings("temperature_c"))?;
    let humidity =
        mean_present(series.humidity_pct()).ok_or(SeriesError::NoReadings("humidity_pct"))?;
    let wind = mean_present(series.wind_speed()).ok_or(SeriesError::NoReadings("wind_speed"))?;
    let precip = sum_present(series.precipitation_mm());

    Ok(ConditionSummary {
        temp: rounding.apply(temp),
        humidity: rounding.apply(humidity),
        wind: rounding.apply(wind),
        precip: Some(rounding.apply(precip)),
        soil_temp: mean_present(series.soil_temperature_c()).map(|v| rounding.apply(v)),
        soil_moisture: mean_present(series.soil_moisture()).map(|v| rounding.apply_fraction(v)),
        weather_score: None,
        weather_description: None,
    })
}

/// Attach the instability features from a variation analysis.
pub fn with_variation(mut summary: ConditionSummary, variation: &WeatherVariation) -> ConditionSummary {
    summary.weather_score = Some(variation.weather_score);
    summary.weather_description = Some(variation.weather_description.clone());
    summary
}

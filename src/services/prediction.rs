//! Bloom risk prediction service.
//!
//! Runs the per-date pipeline: fetch the weather window for a date, analyze
//! its short-term variation, average it into a condition summary, and
//! evaluate the risk flag. `predict_week` does this for each day of the
//! forecast horizon in parallel.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::conditions::{summarize_conditions, with_variation, Rounding, WeatherSeries};
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::risk::{
    evaluate, EchoedConditions, LakeType, RiskAssessment, RiskConfig, RiskFlag, Stratification,
};
use crate::services::variation::analyze_variation;

/// Where a lake is and how its thresholds are chosen.
#[derive(Debug, Clone, Copy)]
pub struct LakeSite {
    pub latitude: f64,
    pub longitude: f64,
    pub lake_type: LakeType,
    pub stratification: Option<Stratification>,
}

/// Risk prediction for one date.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyPrediction {
    /// Date the prediction applies to
    pub date: NaiveDate,
    /// Risk flag: "low", "moderate" or "high"
    pub flag: RiskFlag,
    /// Explanation of the flag
    pub message: String,
    /// Averaged conditions behind the flag
    pub conditions: EchoedConditions,
}

/// Evaluate a fetched series: variation analysis, summary, risk rules.
///
/// This is the pure part of the pipeline (no I/O). Forecasts round the
/// summary to one decimal; backtests evaluate the raw means.
pub fn assess_series(
    series: &WeatherSeries,
    site: &LakeSite,
    config: &RiskConfig,
    rounding: Rounding,
) -> Result<RiskAssessment, AppError> {
    let variation = analyze_variation(series);
    let summary = summarize_conditions(series, rounding).map_err(|e| {
        AppError::ExternalServiceError(format!("Weather data unusable: {}", e))
    })?;
    let conditions = with_variation(summary, &variation);
    Ok(evaluate(&conditions, site.lake_type, site.stratification, config)?)
}

/// Predict the bloom risk flag for one date.
pub async fn predict_for_date(
    client: &OpenMeteoClient,
    site: &LakeSite,
    date: NaiveDate,
    today: NaiveDate,
    config: &RiskConfig,
) -> Result<DailyPrediction, AppError> {
    let series = client
        .fetch_for_date(site.latitude, site.longitude, date, today)
        .await?;
    let assessment = assess_series(&series, site, config, Rounding::Tenth)?;

    tracing::debug!("Prediction for {}: {}", date, assessment.flag);

    Ok(DailyPrediction {
        date,
        flag: assessment.flag,
        message: assessment.message,
        conditions: assessment.conditions,
    })
}

/// Dates covered by a forecast starting today.
pub fn forecast_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..i64::from(days)).map(|i| today + Duration::days(i)).collect()
}

/// Predict the flags for `days` consecutive dates starting today.
///
/// All dates are fetched in parallel; the result is ordered by date. Any
/// failing date fails the whole forecast.
pub async fn predict_week(
    client: &OpenMeteoClient,
    site: &LakeSite,
    today: NaiveDate,
    days: u32,
    config: &RiskConfig,
) -> Result<Vec<DailyPrediction>, AppError> {
    let futures = forecast_dates(today, days)
        .into_iter()
        .map(|date| predict_for_date(client, site, date, today, config));

    let mut predictions = futures::future::join_all(futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    predictions.sort_by_key(|p| p.date);
    Ok(predictions)
}

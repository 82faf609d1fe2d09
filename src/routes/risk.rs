//! Stateless analysis endpoints.
//!
//! - POST /api/v1/risk/evaluate
//! - POST /api/v1/weather/variation

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::services::conditions::{
    summarize_conditions, with_variation, ConditionSummary, HourlyArrays, Rounding, WeatherSeries,
};
use crate::services::risk::{evaluate, LakeType, RiskAssessment, RiskConfig, Stratification};
use crate::services::variation::{analyze_variation, WeatherVariation};

/// Request body for evaluating already-averaged conditions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EvaluateRequest {
    pub conditions: ConditionSummary,
    /// Catchment land use: "forest", "agriculture" or "urban"
    pub lake_type: String,
    /// Thermal stratification: "strong", "weak" or "none"
    pub stratification: Option<String>,
    /// Rule set: "baseline" (default), "stratified" or "instability"
    pub model: Option<String>,
}

/// Variation analysis of an hourly series with its averaged conditions.
#[derive(Debug, Serialize, ToSchema)]
pub struct VariationResponse {
    pub variation: WeatherVariation,
    /// Window means rounded to one decimal, with the instability fields set
    pub conditions: ConditionSummary,
}

/// Evaluate the bloom risk flag for given conditions.
///
/// Pure computation; no weather data is fetched.
#[utoipa::path(
    post,
    path = "/api/v1/risk/evaluate",
    tag = "Risk",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Risk flag, score and echoed conditions", body = RiskAssessment),
        (status = 400, description = "Unknown lake type, stratification or model", body = ErrorResponse),
    )
)]
pub async fn evaluate_risk(Json(req): Json<EvaluateRequest>) -> Result<Json<RiskAssessment>, AppError> {
    let lake_type: LakeType = req.lake_type.parse()?;
    let stratification = req
        .stratification
        .as_deref()
        .map(str::parse::<Stratification>)
        .transpose()?;
    let config = match req.model.as_deref() {
        Some(name) => name.parse()?,
        None => RiskConfig::BASELINE,
    };

    Ok(Json(evaluate(&req.conditions, lake_type, stratification, &config)?))
}

/// Analyze an hourly series for short-term weather instability.
#[utoipa::path(
    post,
    path = "/api/v1/weather/variation",
    tag = "Risk",
    request_body = HourlyArrays,
    responses(
        (status = 200, description = "Variation statistics and averaged conditions", body = VariationResponse),
        (status = 400, description = "Empty series or misaligned columns", body = ErrorResponse),
    )
)]
pub async fn analyze_weather_variation(
    Json(hourly): Json<HourlyArrays>,
) -> Result<Json<VariationResponse>, AppError> {
    let series = WeatherSeries::try_from(hourly)?;
    let variation = analyze_variation(&series);
    let conditions = with_variation(summarize_conditions(&series, Rounding::Tenth)?, &variation);
    Ok(Json(VariationResponse {
        variation,
        conditions,
    }))
}

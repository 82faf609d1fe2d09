//! Ad-hoc prediction endpoint.
//!
//! - POST /api/v1/predictions

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{today, validate_coordinates, AppState};
use crate::errors::{AppError, ErrorResponse};
use crate::services::prediction::{predict_week, DailyPrediction, LakeSite};
use crate::services::risk::{LakeType, Stratification};

/// Optional overrides accepted by forecast endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ForecastQuery {
    /// Rule set: "baseline", "stratified" or "instability" (server default when omitted)
    pub model: Option<String>,
    /// Number of days starting today (1-16, server default when omitted)
    pub days: Option<u32>,
}

/// Request body for an ad-hoc forecast.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PredictionRequest {
    /// Latitude (WGS84)
    pub latitude: f64,
    /// Longitude (WGS84)
    pub longitude: f64,
    /// Catchment land use: "forest", "agriculture" or "urban"
    pub lake_type: String,
    /// Thermal stratification: "strong", "weak" or "none"
    pub stratification: Option<String>,
    /// Rule set: "baseline", "stratified" or "instability"
    pub model: Option<String>,
    /// Number of days starting today (1-16)
    pub days: Option<u32>,
}

/// A multi-day bloom risk forecast.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastResponse {
    /// Lake name, for registered lakes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lake: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Date the forecast was computed on
    pub generated_on: NaiveDate,
    /// One prediction per day, ascending by date
    pub forecast: Vec<DailyPrediction>,
}

/// Parse the lake description of a request, failing on unknown names.
pub(crate) fn parse_site(
    latitude: f64,
    longitude: f64,
    lake_type: &str,
    stratification: Option<&str>,
) -> Result<LakeSite, AppError> {
    validate_coordinates(latitude, longitude)?;
    Ok(LakeSite {
        latitude,
        longitude,
        lake_type: lake_type.parse::<LakeType>()?,
        stratification: stratification.map(str::parse::<Stratification>).transpose()?,
    })
}

/// Forecast bloom risk for an arbitrary location.
#[utoipa::path(
    post,
    path = "/api/v1/predictions",
    tag = "Predictions",
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "Daily risk flags, ascending by date", body = ForecastResponse),
        (status = 400, description = "Unknown lake type, stratification or model, or invalid coordinates", body = ErrorResponse),
        (status = 502, description = "Open-Meteo unreachable or returned unusable data", body = ErrorResponse),
    )
)]
pub async fn create_prediction(
    State(state): State<AppState>,
    Json(req): Json<PredictionRequest>,
) -> Result<Json<ForecastResponse>, AppError> {
    let site = parse_site(
        req.latitude,
        req.longitude,
        &req.lake_type,
        req.stratification.as_deref(),
    )?;
    let config = state.risk_model(req.model.as_deref())?;
    let days = state.forecast_days(req.days)?;

    let generated_on = today();
    let forecast = predict_week(&state.client, &site, generated_on, days, &config).await?;

    Ok(Json(ForecastResponse {
        lake: None,
        latitude: site.latitude,
        longitude: site.longitude,
        generated_on,
        forecast,
    }))
}

//! Backtest endpoint.
//!
//! - POST /api/v1/backtest

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use super::predictions::parse_site;
use super::{today, AppState};
use crate::errors::{AppError, ErrorResponse};
use crate::services::backtest::{run_backtest, BacktestReport, BacktestSite};
use crate::services::lab_data::load_lab_samples;
use crate::services::toxin::LabCalibration;

/// Request body for a backtest.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BacktestRequest {
    /// Reservoir code used in the lab spreadsheet (e.g. "BHR")
    pub reservoir_id: String,
    /// Latitude (WGS84)
    pub latitude: f64,
    /// Longitude (WGS84)
    pub longitude: f64,
    /// Catchment land use: "forest", "agriculture" or "urban"
    pub lake_type: String,
    /// Thermal stratification: "strong", "weak" or "none"
    pub stratification: Option<String>,
    /// Lab thresholds: "backtest" (default) or "screening"
    pub calibration: Option<LabCalibration>,
    /// Rule set: "baseline", "stratified" or "instability"
    pub model: Option<String>,
}

/// Compare weather-derived flags with lab-derived flags for a reservoir.
///
/// Every sampled date in the lab file is re-evaluated from the weather of
/// the week before it.
#[utoipa::path(
    post,
    path = "/api/v1/backtest",
    tag = "Backtest",
    request_body = BacktestRequest,
    responses(
        (status = 200, description = "Transition counts and per-date flags", body = BacktestReport),
        (status = 400, description = "Unknown lake type, stratification or model", body = ErrorResponse),
        (status = 404, description = "No lab samples for the reservoir", body = ErrorResponse),
        (status = 500, description = "Lab file missing or malformed", body = ErrorResponse),
        (status = 502, description = "Open-Meteo unreachable or returned unusable data", body = ErrorResponse),
    )
)]
pub async fn create_backtest(
    State(state): State<AppState>,
    Json(req): Json<BacktestRequest>,
) -> Result<Json<BacktestReport>, AppError> {
    let lake = parse_site(
        req.latitude,
        req.longitude,
        &req.lake_type,
        req.stratification.as_deref(),
    )?;
    let config = state.risk_model(req.model.as_deref())?;
    let calibration = req.calibration.unwrap_or(LabCalibration::Backtest);

    let samples = load_lab_samples(&state.config.lab_data_path, &req.reservoir_id).await?;
    if samples.is_empty() {
        return Err(AppError::NotFound(format!(
            "No lab samples for reservoir '{}'",
            req.reservoir_id
        )));
    }

    let site = BacktestSite {
        reservoir_id: req.reservoir_id,
        lake,
    };
    let report = run_backtest(&state.client, &site, &samples, calibration, &config, today()).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;
    use crate::services::risk::RiskFlag;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LAB_CSV: &str = "\
date,reservoir,density_cells/ml,toxin
2012-07-15,BHR,60,1
2012-07-15,BHR,30,0
2012-08-02,BHR,10,1
2012-08-02,BRR,500,1
";

    fn request(reservoir_id: &str) -> BacktestRequest {
        BacktestRequest {
            reservoir_id: reservoir_id.to_string(),
            latitude: 37.3386,
            longitude: -83.4707,
            lake_type: "urban".to_string(),
            stratification: None,
            calibration: Some(LabCalibration::Screening),
            model: Some("baseline".to_string()),
        }
    }

    #[tokio::test]
    async fn test_backtest_from_lab_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "temperature_2m": [20.0, 20.0],
                    "relative_humidity_2m": [50, 50],
                    "wind_speed_10m": [15.0, 15.0]
                }
            })))
            .expect(2)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lab_samples.csv"), LAB_CSV).unwrap();
        let state = test_state(&server.uri(), dir.path());

        let Json(report) = create_backtest(State(state), Json(request("BHR")))
            .await
            .unwrap();
        assert_eq!(report.reservoir_id, "BHR");
        assert_eq!(report.rows.len(), 2);
        // 60 toxic cells/ml: moderate with screening thresholds
        assert_eq!(report.rows[0].toxic_density, 60.0);
        assert_eq!(report.rows[0].total_density, 90.0);
        assert_eq!(report.rows[0].lab_flag, RiskFlag::Moderate);
        assert_eq!(report.rows[1].lab_flag, RiskFlag::Low);
        assert!(report.rows.iter().all(|r| r.weather_flag == RiskFlag::Low));
        assert_eq!(report.transitions.low, 1);
        assert_eq!(report.transitions.moderate_as_low, 1);
    }

    #[tokio::test]
    async fn test_unknown_reservoir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lab_samples.csv"), LAB_CSV).unwrap();
        let state = test_state("http://localhost:1", dir.path());

        let err = create_backtest(State(state), Json(request("XYZ")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_lab_file_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://localhost:1", dir.path());

        let err = create_backtest(State(state), Json(request("BHR")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }

    #[tokio::test]
    async fn test_negative_lab_density_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lab_samples.csv"),
            "date,reservoir,density_cells/ml,toxin\n2012-07-15,BHR,60,1\n2012-07-15,BHR,-50,0\n",
        )
        .unwrap();
        let state = test_state("http://localhost:1", dir.path());

        match create_backtest(State(state), Json(request("BHR"))).await {
            Err(AppError::InternalError(msg)) => assert!(msg.contains("density"), "{}", msg),
            other => panic!("expected InternalError, got {:?}", other.map(|_| ())),
        }
    }
}

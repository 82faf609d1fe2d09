//! Lake registry endpoints.
//!
//! - GET  /api/v1/owners/:owner/lakes
//! - POST /api/v1/owners/:owner/lakes
//! - GET  /api/v1/owners/:owner/lakes/:name/forecast?model=..&days=N

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::predictions::{ForecastQuery, ForecastResponse};
use super::{today, validate_coordinates, AppState};
use crate::errors::{AppError, ErrorResponse};
use crate::services::prediction::predict_week;
use crate::store::models::{LakeProfile, NewLake};

/// List the lakes registered by an owner.
#[utoipa::path(
    get,
    path = "/api/v1/owners/{owner}/lakes",
    tag = "Lakes",
    params(
        ("owner" = String, Path, description = "Owner name"),
    ),
    responses(
        (status = 200, description = "Lakes in registration order", body = Vec<LakeProfile>),
    )
)]
pub async fn list_lakes(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Json<Vec<LakeProfile>> {
    let store = state.lakes.read().await;
    Json(store.lakes_for(&owner).to_vec())
}

/// Register a lake for an owner.
#[utoipa::path(
    post,
    path = "/api/v1/owners/{owner}/lakes",
    tag = "Lakes",
    params(
        ("owner" = String, Path, description = "Owner name"),
    ),
    request_body = NewLake,
    responses(
        (status = 201, description = "Lake registered", body = LakeProfile),
        (status = 400, description = "Empty name or invalid coordinates", body = ErrorResponse),
        (status = 409, description = "Owner already has a lake with this name", body = ErrorResponse),
    )
)]
pub async fn create_lake(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Json(lake): Json<NewLake>,
) -> Result<(StatusCode, Json<LakeProfile>), AppError> {
    if lake.name.trim().is_empty() {
        return Err(AppError::BadRequest("lake name must not be empty".to_string()));
    }
    validate_coordinates(lake.latitude, lake.longitude)?;

    let profile = state.lakes.write().await.add_lake(&owner, lake).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Forecast bloom risk for a registered lake.
#[utoipa::path(
    get,
    path = "/api/v1/owners/{owner}/lakes/{name}/forecast",
    tag = "Lakes",
    params(
        ("owner" = String, Path, description = "Owner name"),
        ("name" = String, Path, description = "Lake name"),
        ForecastQuery,
    ),
    responses(
        (status = 200, description = "Daily risk flags, ascending by date", body = ForecastResponse),
        (status = 400, description = "Unknown model, bad horizon, or stratified model without stratification", body = ErrorResponse),
        (status = 404, description = "Lake not found", body = ErrorResponse),
        (status = 502, description = "Open-Meteo unreachable or returned unusable data", body = ErrorResponse),
    )
)]
pub async fn get_lake_forecast(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, AppError> {
    let lake = state
        .lakes
        .read()
        .await
        .find(&owner, &name)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Lake '{}' not found for owner '{}'", name, owner)))?;

    let config = state.risk_model(params.model.as_deref())?;
    let days = state.forecast_days(params.days)?;

    let generated_on = today();
    let forecast = predict_week(&state.client, &lake.site(), generated_on, days, &config).await?;

    Ok(Json(ForecastResponse {
        lake: Some(lake.name),
        latitude: lake.latitude,
        longitude: lake.longitude,
        generated_on,
        forecast,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;
    use crate::services::risk::{LakeType, RiskError, RiskFlag};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn new_lake(name: &str) -> NewLake {
        NewLake {
            name: name.to_string(),
            latitude: 45.75,
            longitude: 1.86,
            lake_type: LakeType::Urban,
            stratification: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://localhost:1", dir.path());

        let (status, Json(created)) = create_lake(
            State(state.clone()),
            Path("alice".to_string()),
            Json(new_lake("Vassiviere")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(listed) = list_lakes(State(state.clone()), Path("alice".to_string())).await;
        assert_eq!(listed, vec![created]);
        let Json(other) = list_lakes(State(state), Path("bob".to_string())).await;
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_lake_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://localhost:1", dir.path());
        let owner = || Path("alice".to_string());

        create_lake(State(state.clone()), owner(), Json(new_lake("Vassiviere")))
            .await
            .unwrap();
        let err = create_lake(State(state), owner(), Json(new_lake("Vassiviere")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://localhost:1", dir.path());
        let err = create_lake(State(state), Path("alice".to_string()), Json(new_lake("  ")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_forecast_unknown_lake_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://localhost:1", dir.path());
        let err = get_lake_forecast(
            State(state),
            Path(("alice".to_string(), "Nowhere".to_string())),
            Query(ForecastQuery::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stratified_forecast_needs_stratification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "temperature_2m": [20.0],
                    "relative_humidity_2m": [50],
                    "wind_speed_10m": [15.0]
                }
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&server.uri(), dir.path());
        create_lake(State(state.clone()), Path("alice".to_string()), Json(new_lake("Vassiviere")))
            .await
            .unwrap();

        let err = get_lake_forecast(
            State(state),
            Path(("alice".to_string(), "Vassiviere".to_string())),
            Query(ForecastQuery {
                model: Some("stratified".to_string()),
                days: Some(1),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Configuration(RiskError::MissingStratification)
        ));
    }

    #[tokio::test]
    async fn test_lake_forecast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "temperature_2m": [20.0, 20.0],
                    "relative_humidity_2m": [50, 50],
                    "wind_speed_10m": [15.0, 15.0],
                    "precipitation": [0.0, 0.0]
                }
            })))
            .expect(3)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&server.uri(), dir.path());
        create_lake(State(state.clone()), Path("alice".to_string()), Json(new_lake("Vassiviere")))
            .await
            .unwrap();

        let Json(resp) = get_lake_forecast(
            State(state),
            Path(("alice".to_string(), "Vassiviere".to_string())),
            Query(ForecastQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(resp.lake.as_deref(), Some("Vassiviere"));
        assert_eq!(resp.forecast.len(), 3);
        assert!(resp.forecast.iter().all(|p| p.flag == RiskFlag::Low));
    }
}

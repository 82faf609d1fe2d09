pub mod backtest;
pub mod health;
pub mod lakes;
pub mod predictions;
pub mod risk;

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::config::{AppConfig, MAX_FORECAST_DAYS};
use crate::errors::AppError;
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::risk::RiskConfig;
use crate::store::SharedLakeStore;

/// Shared application state for all endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) client: OpenMeteoClient,
    pub(crate) lakes: SharedLakeStore,
    pub(crate) config: Arc<AppConfig>,
}

impl AppState {
    /// Rule set named by a request, or the configured default.
    pub(crate) fn risk_model(&self, requested: Option<&str>) -> Result<RiskConfig, AppError> {
        match requested {
            Some(name) => Ok(name.parse()?),
            None => Ok(self.config.risk_model),
        }
    }

    /// Forecast horizon named by a request, or the configured default.
    pub(crate) fn forecast_days(&self, requested: Option<u32>) -> Result<u32, AppError> {
        match requested {
            None => Ok(self.config.forecast_days),
            Some(days) if (1..=MAX_FORECAST_DAYS).contains(&days) => Ok(days),
            Some(days) => Err(AppError::BadRequest(format!(
                "days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, days
            ))),
        }
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::BadRequest(format!(
            "latitude must be between -90 and 90, got {}",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::BadRequest(format!(
            "longitude must be between -180 and 180, got {}",
            longitude
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::LakeStore;

    /// State pointing at a mock Open-Meteo server and a lake file in `dir`.
    pub(crate) fn test_state(base_url: &str, dir: &std::path::Path) -> AppState {
        let config = AppConfig {
            port: 0,
            lakes_file: dir.join("lakes.json"),
            lab_data_path: dir.join("lab_samples.csv"),
            forecast_url: format!("{}/v1/forecast", base_url),
            archive_url: format!("{}/v1/archive", base_url),
            forecast_days: 3,
            risk_model: RiskConfig::INSTABILITY,
        };
        AppState {
            client: OpenMeteoClient::new(&config.forecast_url, &config.archive_url).unwrap(),
            lakes: LakeStore::open(&config.lakes_file).unwrap().shared(),
            config: Arc::new(config),
        }
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(37.3, -83.4).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(91.0, 0.0),
            Err(AppError::BadRequest(_))
        ));
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_request_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://localhost:1", dir.path());
        assert_eq!(state.risk_model(None).unwrap(), RiskConfig::INSTABILITY);
        assert_eq!(state.risk_model(Some("baseline")).unwrap(), RiskConfig::BASELINE);
        assert!(matches!(
            state.risk_model(Some("bogus")),
            Err(AppError::Configuration(_))
        ));
        assert_eq!(state.forecast_days(None).unwrap(), 3);
        assert_eq!(state.forecast_days(Some(16)).unwrap(), 16);
        assert!(state.forecast_days(Some(0)).is_err());
        assert!(state.forecast_days(Some(17)).is_err());
    }
}

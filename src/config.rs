use std::path::PathBuf;

use crate::services::open_meteo::{ARCHIVE_API_URL, FORECAST_API_URL};
use crate::services::risk::RiskConfig;

/// Longest horizon the Open-Meteo forecast endpoint serves.
pub const MAX_FORECAST_DAYS: u32 = 16;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// JSON snapshot of registered lakes.
    pub lakes_file: PathBuf,
    /// CSV export of lab samples used by backtests.
    pub lab_data_path: PathBuf,
    pub forecast_url: String,
    pub archive_url: String,
    /// Days covered by a forecast, starting today.
    pub forecast_days: u32,
    /// Rule set used when a request does not name one.
    pub risk_model: RiskConfig,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let port = var_or("PORT", "8080")
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let forecast_days: u32 = var_or("FORECAST_DAYS", "7")
            .parse()
            .map_err(|_| "FORECAST_DAYS must be a positive integer".to_string())?;
        if forecast_days == 0 || forecast_days > MAX_FORECAST_DAYS {
            return Err(format!(
                "FORECAST_DAYS must be between 1 and {}",
                MAX_FORECAST_DAYS
            ));
        }

        let risk_model = var_or("RISK_MODEL", "instability")
            .parse()
            .map_err(|e| format!("RISK_MODEL: {}", e))?;

        Ok(Self {
            port,
            lakes_file: var_or("LAKES_FILE", "./data/lakes.json").into(),
            lab_data_path: var_or("LAB_DATA_PATH", "./data/lab_samples.csv").into(),
            forecast_url: var_or("OPEN_METEO_FORECAST_URL", FORECAST_API_URL),
            archive_url: var_or("OPEN_METEO_ARCHIVE_URL", ARCHIVE_API_URL),
            forecast_days,
            risk_model,
        })
    }
}

// Bloom Watch API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;
mod store;

use config::AppConfig;
use routes::AppState;
use services::open_meteo::OpenMeteoClient;
use store::LakeStore;

/// Bloom Watch API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bloom Watch API",
        version = "0.1.0",
        description = "Cyanobacteria bloom risk forecasting for lakes and reservoirs. \
            Fetches hourly weather and soil data from Open-Meteo, scores short-term \
            weather instability, and maps averaged conditions to a low / moderate / high \
            risk flag per day. Lab toxin samples can be used to backtest the weather rules.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Lakes", description = "Lake registry and per-lake forecasts"),
        (name = "Predictions", description = "Ad-hoc forecasts for any location"),
        (name = "Risk", description = "Stateless risk evaluation and variation analysis"),
        (name = "Backtest", description = "Weather flags versus lab flags"),
    ),
    paths(
        routes::health::health_check,
        routes::lakes::list_lakes,
        routes::lakes::create_lake,
        routes::lakes::get_lake_forecast,
        routes::predictions::create_prediction,
        routes::risk::evaluate_risk,
        routes::risk::analyze_weather_variation,
        routes::backtest::create_backtest,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::predictions::PredictionRequest,
            routes::predictions::ForecastResponse,
            routes::risk::EvaluateRequest,
            routes::risk::VariationResponse,
            routes::backtest::BacktestRequest,
            store::models::LakeProfile,
            store::models::NewLake,
            services::prediction::DailyPrediction,
            services::risk::RiskFlag,
            services::risk::LakeType,
            services::risk::Stratification,
            services::risk::RiskAssessment,
            services::risk::EchoedConditions,
            services::conditions::HourlyArrays,
            services::conditions::ConditionSummary,
            services::variation::WeatherVariation,
            services::toxin::LabCalibration,
            services::backtest::BacktestReport,
            services::backtest::BacktestRow,
            services::backtest::TransitionSummary,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bloom_watch_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    tracing::info!(
        "Risk model {:?}, {}-day forecasts, lab data at {}",
        config.risk_model,
        config.forecast_days,
        config.lab_data_path.display()
    );

    let client = OpenMeteoClient::new(&config.forecast_url, &config.archive_url)
        .expect("Failed to build Open-Meteo client");

    let lakes = LakeStore::open(&config.lakes_file).expect("Failed to load lake file");
    tracing::info!(
        "Loaded {} lakes from {}",
        lakes.len(),
        config.lakes_file.display()
    );

    let port = config.port;
    let app_state = AppState {
        client,
        lakes: lakes.shared(),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/owners/:owner/lakes",
            get(routes::lakes::list_lakes).post(routes::lakes::create_lake),
        )
        .route(
            "/api/v1/owners/:owner/lakes/:name/forecast",
            get(routes::lakes::get_lake_forecast),
        )
        .route(
            "/api/v1/predictions",
            post(routes::predictions::create_prediction),
        )
        .route("/api/v1/risk/evaluate", post(routes::risk::evaluate_risk))
        .route(
            "/api/v1/weather/variation",
            post(routes::risk::analyze_weather_variation),
        )
        .route("/api/v1/backtest", post(routes::backtest::create_backtest))
        .with_state(app_state);

    let app = Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_all_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/health",
            "/api/v1/owners/{owner}/lakes",
            "/api/v1/owners/{owner}/lakes/{name}/forecast",
            "/api/v1/predictions",
            "/api/v1/risk/evaluate",
            "/api/v1/weather/variation",
            "/api/v1/backtest",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}

pub mod handlers;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

use clinical_risk_domain::auth::token::TokenSettings;
use clinical_risk_domain::config::{AggregationConfig, ModelClientConfig};
use clinical_risk_domain::health::HealthService;
use clinical_risk_domain::services::create_default_prediction_service;

pub use routes::create_app;

/// Build the application from environment configuration.
///
/// Requires the database pool to be initialized first. Fails when the model
/// credentials or token secret are missing or malformed.
pub async fn create_application() -> anyhow::Result<Router> {
    let model_config = ModelClientConfig::from_env().context("Risk model configuration")?;
    let aggregation_config = AggregationConfig::from_env().context("Aggregation configuration")?;
    let token_settings = TokenSettings::from_env().context("Token configuration")?;

    let model_description = format!("{} via {}", model_config.model, model_config.base_url);
    let prediction_service = create_default_prediction_service(model_config, aggregation_config)
        .context("Prediction service setup")?;

    let health_service = HealthService::from_global_pool(Some(model_description));

    info!("Application services initialized");

    Ok(create_app(
        Arc::new(prediction_service),
        Arc::new(token_settings),
        Arc::new(health_service),
    ))
}

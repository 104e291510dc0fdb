use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::debug;

use clinical_risk_domain::auth::{auth_info, auth_middleware, token::TokenSettings};
use crate::api::handlers::{health, predictions};
use crate::api::handlers::health::HealthServiceHandle;
use crate::api::handlers::predictions::PredictionServiceHandle;
use crate::openapi::configure_swagger_routes;

/// Create the application router
pub fn create_app(
    prediction_service: PredictionServiceHandle,
    token_settings: Arc<TokenSettings>,
    health_service: HealthServiceHandle,
) -> Router {
    debug!("Creating application router");

    // Prediction routes require a valid bearer token
    let api_routes = Router::new()
        .route("/predictions", get(predictions::list_predictions))
        .route("/predictions/generate/:patient_id", post(predictions::generate_prediction))
        .route("/predictions/patient/:patient_id", get(predictions::list_patient_predictions))
        .route(
            "/predictions/:prediction_id",
            get(predictions::get_prediction).put(predictions::update_prediction),
        )
        .route("/predictions/:prediction_id/review", patch(predictions::review_prediction))
        .route_layer(middleware::from_fn_with_state(token_settings.clone(), auth_middleware))
        .with_state(prediction_service);

    debug!("API routes configured");

    // Mounted under /api/v1 with the prediction routes
    let auth_routes = Router::new()
        .route("/auth/info", get(auth_info))
        .route_layer(middleware::from_fn_with_state(token_settings, auth_middleware));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .layer(Extension(health_service));

    let app = Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes.merge(auth_routes))
        .merge(configure_swagger_routes());

    debug!("Routes merged");

    health::initialize_server_start_time();

    apply_security_layers(app)
}

/// CORS and security response headers
pub fn apply_security_layers(app: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    app.layer(security_headers).layer(cors)
}

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer token scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // Prediction endpoints
        crate::api::handlers::predictions::list_predictions,
        crate::api::handlers::predictions::generate_prediction,
        crate::api::handlers::predictions::list_patient_predictions,
        crate::api::handlers::predictions::get_prediction,
        crate::api::handlers::predictions::review_prediction,
        crate::api::handlers::predictions::update_prediction,

        // Auth endpoints
        clinical_risk_domain::auth::auth_info
    ),
    components(
        schemas(
            // Entities
            crate::entities::common::ErrorResponse,
            crate::entities::prediction::PublicRiskPrediction,
            crate::entities::prediction::PublicPredictionSummary,
            crate::entities::prediction::ReviewPredictionRequest,
            crate::entities::prediction::UpdatePredictionRequest,
            clinical_risk_domain::entities::RiskLevel,

            // Health handlers
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentHealthStatus,

            // Auth schemas
            clinical_risk_domain::auth::AuthInfoResponse,
            clinical_risk_domain::entities::UserRole
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "predictions", description = "AI health-risk prediction endpoints"),
        (name = "auth", description = "Authenticated caller information")
    ),
    info(
        title = "ClinicalRisk API",
        version = "0.1.0",
        description = "Health-risk prediction pipeline for clinical records",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "ClinicalRisk API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "predictions"));

        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/api/v1/auth/info"));
        assert!(paths.contains_key("/api/v1/predictions"));
        assert!(paths.contains_key("/api/v1/predictions/generate/{patient_id}"));
        assert!(paths.contains_key("/api/v1/predictions/patient/{patient_id}"));
        assert!(paths.contains_key("/api/v1/predictions/{prediction_id}"));
        assert!(paths.contains_key("/api/v1/predictions/{prediction_id}/review"));

        let components = openapi.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("PublicRiskPrediction"));
        assert!(components.schemas.contains_key("PublicPredictionSummary"));
    }
}

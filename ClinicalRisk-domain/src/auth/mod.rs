//! Authentication module for the ClinicalRisk API
//!
//! Bearer-token middleware, the role policy used by the prediction service,
//! and structured auth event logging.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::entities::{AuthenticatedUser, UserRole};

// JWT handling
pub mod token;

// Role-based access policy
pub mod authorize;

// Auth event logging
pub mod logging;

use logging::log_token_validation;
use token::{SecurityError, TokenSettings};

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject (numeric user ID as a string)
    pub sub: String,
    /// Caller role: doctor, patient or official
    pub role: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

impl Claims {
    /// Caller context carried by these claims
    pub fn to_authenticated_user(&self) -> Result<AuthenticatedUser, SecurityError> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| SecurityError::InvalidClaims(format!("subject '{}' is not a user id", self.sub)))?;
        let role = self.role.parse::<UserRole>().map_err(SecurityError::InvalidClaims)?;

        Ok(AuthenticatedUser::new(id, role))
    }
}

/// Authenticated caller details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthInfoResponse {
    /// User ID
    pub user_id: i64,
    /// User role
    pub role: UserRole,
    /// Whether this caller may use the prediction endpoints
    pub can_manage_predictions: bool,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message,
        })),
    )
        .into_response()
}

/// Authentication middleware for protected routes.
///
/// Validates the bearer token and stores the `AuthenticatedUser` in the
/// request extensions for handlers to extract.
pub async fn auth_middleware(
    State(settings): State<Arc<TokenSettings>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();
    let elapsed = |start: std::time::Instant| start.elapsed().as_millis() as u64;

    let auth_header = match req.headers().get(header::AUTHORIZATION).map(|v| v.to_str()) {
        Some(Ok(value)) => value.to_string(),
        Some(Err(_)) => {
            warn!("Invalid Authorization header format");
            log_token_validation(None, &request_path, false, "Invalid Authorization header format", elapsed(start_time));
            return unauthorized("Invalid Authorization header");
        }
        None => {
            debug!("Missing Authorization header");
            log_token_validation(None, &request_path, false, "Missing Authorization header", elapsed(start_time));
            return unauthorized("Authentication required");
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        warn!("Authorization header does not contain Bearer token");
        log_token_validation(None, &request_path, false, "Authorization header does not contain Bearer token", elapsed(start_time));
        return unauthorized("Bearer token required");
    };

    let user = match token::validate_token(&settings, token).and_then(|claims| claims.to_authenticated_user()) {
        Ok(user) => user,
        Err(e) => {
            warn!("Token rejected: {}", e);
            log_token_validation(None, &request_path, false, &e.to_string(), elapsed(start_time));
            return unauthorized("Invalid or expired token");
        }
    };

    log_token_validation(Some(&user.id.to_string()), &request_path, true, "JWT validation successful", elapsed(start_time));

    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Get the authenticated caller
#[utoipa::path(
    get,
    path = "/api/v1/auth/info",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated caller", body = AuthInfoResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn auth_info(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthInfoResponse> {
    Json(AuthInfoResponse {
        user_id: user.id,
        role: user.role,
        can_manage_predictions: authorize::CLINICAL_ROLES.contains(&user.role),
    })
}

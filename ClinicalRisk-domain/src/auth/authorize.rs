use tracing::debug;

use crate::auth::logging::{log_access_denied, log_access_granted};
use crate::entities::{AuthenticatedUser, UserRole};
use crate::services::errors::PredictionError;

/// Roles allowed to generate, list and review predictions
pub const CLINICAL_ROLES: &[UserRole] = &[UserRole::Doctor, UserRole::Official];

/// Role-based access policy.
///
/// Grants access when the caller holds any of `required_roles`, otherwise
/// logs the denial and fails with `Forbidden`. Called once at the top of each
/// service operation, before any collaborator is touched.
pub fn authorize(
    required_roles: &[UserRole],
    user: &AuthenticatedUser,
    resource: &str,
) -> Result<(), PredictionError> {
    if required_roles.contains(&user.role) {
        debug!("User {} ({}) authorized for {}", user.id, user.role, resource);
        log_access_granted(&user.id.to_string(), resource);
        return Ok(());
    }

    let required: Vec<String> = required_roles.iter().map(|r| r.to_string()).collect();
    log_access_denied(&user.id.to_string(), resource, &required);

    Err(PredictionError::Forbidden(format!(
        "Role '{}' may not access {}",
        user.role, resource
    )))
}

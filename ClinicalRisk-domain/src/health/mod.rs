//! Domain layer health check functionality
//! Reports on the database pool and the configured risk model endpoint

use clinical_risk_data::database::{self, DatabasePool};
use std::collections::HashMap;
use async_trait::async_trait;
use tracing::warn;

/// System health status
#[derive(Debug, Clone, PartialEq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is functioning but with reduced performance
    Degraded,
    /// Component is not functioning
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    /// Status of the component
    pub status: ComponentStatus,
    /// Optional details about the component status
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    /// Overall system status
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

impl SystemHealth {
    /// Overall status is the worst component status
    pub fn from_components(components: HashMap<String, HealthComponent>) -> Self {
        let status = if components.values().any(|c| c.status == ComponentStatus::Unhealthy) {
            SystemStatus::Unhealthy
        } else if components.values().any(|c| c.status == ComponentStatus::Degraded) {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        };

        Self { status, components }
    }
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check the status of the database
    /// Returns an error if the check could not be performed
    async fn check_database_status(&self) -> Result<String, String>;
}

/// Health service over the database pool and the risk model client
#[derive(Debug, Clone)]
pub struct HealthService {
    database: Option<DatabasePool>,
    /// Description of the configured model endpoint
    risk_model: Option<String>,
}

impl HealthService {
    pub fn new(database: Option<DatabasePool>, risk_model: Option<String>) -> Self {
        Self { database, risk_model }
    }

    /// Use the process-wide pool, if one has been initialized
    pub fn from_global_pool(risk_model: Option<String>) -> Self {
        Self::new(database::get_db_pool().ok(), risk_model)
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = HashMap::new();

        let database = match self.check_database_status().await {
            Ok(info) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(info),
            },
            Err(e) => {
                warn!("Database health check failed: {}", e);
                HealthComponent {
                    status: ComponentStatus::Unhealthy,
                    details: Some(e),
                }
            }
        };
        components.insert("database".to_string(), database);

        let risk_model = match &self.risk_model {
            Some(description) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(description.clone()),
            },
            None => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Risk model client is not configured".to_string()),
            },
        };
        components.insert("risk_model".to_string(), risk_model);

        components.insert(
            "api".to_string(),
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: None,
            },
        );

        SystemHealth::from_components(components)
    }

    async fn check_database_status(&self) -> Result<String, String> {
        let pool = self
            .database
            .as_ref()
            .ok_or_else(|| "Database pool not initialized".to_string())?;

        database::describe_pool(pool).map_err(|e| format!("Database connection error: {}", e))
    }
}

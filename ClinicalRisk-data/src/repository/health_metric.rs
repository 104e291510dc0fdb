use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::format_timestamp;
use crate::models::health_metric::{CreateHealthMetricRequest, HealthMetricRecord};
use super::errors::RepositoryError;
use super::storage::DatabaseStorage;
use super::StorageBackend;

/// Repository trait for health metric history
#[async_trait]
pub trait HealthMetricRepositoryTrait: Send + Sync {
    /// Record a new metric sample
    async fn create(&self, request: CreateHealthMetricRequest) -> Result<HealthMetricRecord, RepositoryError>;

    /// Samples for a patient taken at or after `since`, newest first, at most `limit`
    async fn get_recent_for_patient(
        &self,
        patient_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<HealthMetricRecord>, RepositoryError>;
}

/// Repository for health metric samples
#[derive(Debug, Clone)]
pub struct HealthMetricRepository {
    backend: StorageBackend,
}

impl HealthMetricRepository {
    /// Create a new repository over the given backend
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl HealthMetricRepositoryTrait for HealthMetricRepository {
    async fn create(&self, request: CreateHealthMetricRequest) -> Result<HealthMetricRecord, RepositoryError> {
        if request.metric_type.trim().is_empty() {
            return Err(RepositoryError::Validation("metric_type must not be empty".to_string()));
        }

        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::insert_metric(pool, request).await,
            StorageBackend::Memory(storage) => storage.insert_metric(request).await,
        }
    }

    async fn get_recent_for_patient(
        &self,
        patient_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<HealthMetricRecord>, RepositoryError> {
        let since = format_timestamp(&since);
        debug!("Fetching metrics for patient {} from {}", patient_id, since);

        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::recent_metrics(pool, patient_id, &since, limit).await,
            StorageBackend::Memory(storage) => storage.recent_metrics(patient_id, &since, limit).await,
        }
    }
}

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::models::prediction::{
    NewPredictionRecord, PredictionChanges, PredictionFilter, PredictionRecord, PredictionSummaryRecord,
};
use super::errors::RepositoryError;
use super::storage::DatabaseStorage;
use super::StorageBackend;

/// Repository trait for persisted risk predictions
#[async_trait]
pub trait PredictionRepositoryTrait: Send + Sync {
    /// Persist a new prediction; review fields start unset
    async fn save(&self, prediction: NewPredictionRecord) -> Result<PredictionRecord, RepositoryError>;

    /// All predictions for a patient, newest first
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<PredictionRecord>, RepositoryError>;

    /// Predictions across all patients that pass `filter`, most recently updated first
    async fn list(&self, filter: PredictionFilter) -> Result<Vec<PredictionSummaryRecord>, RepositoryError>;

    /// Get a prediction by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<PredictionRecord>, RepositoryError>;

    /// Merge `changes` into an existing prediction and refresh `updated_at`.
    /// Fails with `NotFound` when the ID is unknown, and with `Conflict` when
    /// `only_if_unreviewed` is set on a reviewed row.
    async fn update(&self, id: i64, changes: PredictionChanges) -> Result<PredictionRecord, RepositoryError>;
}

/// Repository for risk predictions
#[derive(Debug, Clone)]
pub struct PredictionRepository {
    backend: StorageBackend,
}

impl PredictionRepository {
    /// Create a new repository over the given backend
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PredictionRepositoryTrait for PredictionRepository {
    async fn save(&self, prediction: NewPredictionRecord) -> Result<PredictionRecord, RepositoryError> {
        let now = Utc::now();

        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::insert_prediction(pool, prediction, now).await,
            StorageBackend::Memory(storage) => storage.insert_prediction(prediction, now).await,
        }
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<PredictionRecord>, RepositoryError> {
        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::predictions_for_patient(pool, patient_id).await,
            StorageBackend::Memory(storage) => storage.predictions_for_patient(patient_id).await,
        }
    }

    async fn list(&self, filter: PredictionFilter) -> Result<Vec<PredictionSummaryRecord>, RepositoryError> {
        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::list_predictions(pool, filter).await,
            StorageBackend::Memory(storage) => storage.list_predictions(filter).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PredictionRecord>, RepositoryError> {
        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::get_prediction(pool, id).await,
            StorageBackend::Memory(storage) => storage.get_prediction(id).await,
        }
    }

    async fn update(&self, id: i64, changes: PredictionChanges) -> Result<PredictionRecord, RepositoryError> {
        debug!("Updating prediction {}", id);
        let now = Utc::now();

        let updated = match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::update_prediction(pool, id, changes, now).await?,
            StorageBackend::Memory(storage) => storage.update_prediction(id, changes, now).await?,
        };

        updated.ok_or_else(|| {
            warn!("Prediction {} not found for update", id);
            RepositoryError::NotFound(format!("prediction {}", id))
        })
    }
}

use async_trait::async_trait;
use tracing::debug;

use crate::models::patient::{CreatePatientRequest, PatientRecord};
use super::errors::RepositoryError;
use super::storage::DatabaseStorage;
use super::StorageBackend;

/// Repository trait for patient demographics
#[async_trait]
pub trait PatientRepositoryTrait: Send + Sync {
    /// Register a new patient
    async fn create(&self, request: CreatePatientRequest) -> Result<PatientRecord, RepositoryError>;

    /// Get a patient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<PatientRecord>, RepositoryError>;
}

/// Repository for patients
#[derive(Debug, Clone)]
pub struct PatientRepository {
    backend: StorageBackend,
}

impl PatientRepository {
    /// Create a new repository over the given backend
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PatientRepositoryTrait for PatientRepository {
    async fn create(&self, request: CreatePatientRequest) -> Result<PatientRecord, RepositoryError> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(RepositoryError::Validation("patient name must not be empty".to_string()));
        }

        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::insert_patient(pool, request).await,
            StorageBackend::Memory(storage) => storage.insert_patient(request).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Looking up patient {}", id);

        match &self.backend {
            StorageBackend::Database(pool) => DatabaseStorage::get_patient(pool, id).await,
            StorageBackend::Memory(storage) => storage.get_patient(id).await,
        }
    }
}

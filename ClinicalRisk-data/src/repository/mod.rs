// Repository module structure
pub mod errors;
mod health_metric;
mod in_memory;
mod patient;
mod prediction;
mod storage;

use crate::database::{get_db_pool, DatabasePool};

// Re-export commonly used types
pub use errors::RepositoryError;
pub use health_metric::{HealthMetricRepository, HealthMetricRepositoryTrait};
pub use in_memory::InMemoryStorage;
pub use patient::{PatientRepository, PatientRepositoryTrait};
pub use prediction::{PredictionRepository, PredictionRepositoryTrait};

/// Where a repository keeps its rows
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// SQLite through the connection pool
    Database(DatabasePool),
    /// Process-local maps, used by tests and the `mock` feature
    Memory(InMemoryStorage),
}

impl StorageBackend {
    /// Use the process-wide pool set up by `initialize_database_pool`
    pub fn from_global_pool() -> Result<Self, RepositoryError> {
        Ok(StorageBackend::Database(get_db_pool()?))
    }

    /// Fresh, empty in-memory storage
    pub fn in_memory() -> Self {
        StorageBackend::Memory(InMemoryStorage::new())
    }
}

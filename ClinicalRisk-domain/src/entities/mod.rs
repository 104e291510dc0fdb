// Domain entities and value objects
pub mod conversions;
pub mod features;
pub mod patient;
pub mod prediction;
pub mod user;

// Re-export common types for easier imports
pub use features::{PatientFeatureRecord, RecentMetricSample};
pub use patient::{HealthMetric, MetricCategory, MetricValues, Patient};
pub use prediction::{
    ParsedModelResponse, PredictionListFilter, PredictionSummary, PredictionUpdate, RiskLevel,
    RiskPrediction,
};
pub use user::{AuthenticatedUser, UserRole};

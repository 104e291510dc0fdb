pub mod aggregator;
pub mod errors;
pub mod prediction;
pub mod risk_model;

// Domain services
// The prediction pipeline: aggregation, model assessment, persistence.

// Re-export service traits and factory functions
pub use aggregator::{FeatureAggregator, MetricAggregator};
pub use errors::{ErrorKind, PredictionError};
pub use prediction::{create_default_prediction_service, PredictionService, PredictionServiceTrait};
pub use risk_model::{CompletionBackend, OpenAiCompletionClient, RiskAssessor, RiskModelClient};

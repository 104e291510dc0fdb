// Testing utilities and stub implementations for the domain layer
// This module is only available when the "mock" feature is enabled

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use clinical_risk_data::models::format_timestamp;
use clinical_risk_data::models::health_metric::CreateHealthMetricRequest;
use clinical_risk_data::models::patient::CreatePatientRequest;
use clinical_risk_data::repository::{
    HealthMetricRepository, HealthMetricRepositoryTrait, PatientRepository, PatientRepositoryTrait,
    PredictionRepository, RepositoryError, StorageBackend,
};

use crate::config::AggregationConfig;
use crate::entities::MetricValues;
use crate::health::{ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth};
use crate::services::aggregator::MetricAggregator;
use crate::services::errors::PredictionError;
use crate::services::prediction::PredictionService;
use crate::services::risk_model::{CompletionBackend, PromptPair, RiskModelClient};

/// A model reply that parses to a high-risk assessment with confidence 0.9
pub const HIGH_RISK_REPLY: &str = r#"```json
{
  "risk_level": "high",
  "predicted_conditions": ["type 2 diabetes", "obesity"],
  "recommendations": ["endocrinology referral"],
  "confidence_score": 0.9,
  "next_checkup_date": "2024-08-01",
  "lifestyle_changes": ["reduce refined sugar"],
  "medication_suggestions": []
}
```"#;

/// Completion backend answering every prompt with a canned reply
#[derive(Debug)]
pub struct StubCompletionBackend {
    reply: Result<String, PredictionError>,
    calls: AtomicUsize,
}

impl StubCompletionBackend {
    /// Always reply with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail as if the endpoint were unreachable
    pub fn unavailable() -> Self {
        Self {
            reply: Err(PredictionError::ServiceUnavailable("Risk model endpoint unreachable".to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of prompts received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for StubCompletionBackend {
    async fn complete(&self, _prompt: &PromptPair) -> Result<String, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }

    fn describe(&self) -> String {
        "stub completion backend".to_string()
    }
}

/// A prediction service wired to in-memory storage and a stub model
pub struct InMemoryPipeline {
    pub service: Arc<PredictionService>,
    pub backend: Arc<StubCompletionBackend>,
    pub storage: StorageBackend,
}

impl InMemoryPipeline {
    pub fn new(backend: StubCompletionBackend) -> Self {
        Self::with_storage(StorageBackend::in_memory(), backend)
    }

    pub fn with_storage(storage: StorageBackend, backend: StubCompletionBackend) -> Self {
        let backend = Arc::new(backend);

        let aggregator = MetricAggregator::new(
            Arc::new(PatientRepository::new(storage.clone())),
            Arc::new(HealthMetricRepository::new(storage.clone())),
            AggregationConfig::default(),
        );
        let assessor = RiskModelClient::new(backend.clone(), Duration::from_secs(2));
        let service = PredictionService::new(
            Arc::new(aggregator),
            Arc::new(assessor),
            Arc::new(PredictionRepository::new(storage.clone())),
        );

        Self {
            service: Arc::new(service),
            backend,
            storage,
        }
    }

    /// Register a patient and return its id
    pub async fn seed_patient(&self, date_of_birth: &str, gender: &str) -> Result<i64, RepositoryError> {
        self.seed_named_patient("Test", "Patient", date_of_birth, gender).await
    }

    pub async fn seed_named_patient(
        &self,
        first_name: &str,
        last_name: &str,
        date_of_birth: &str,
        gender: &str,
    ) -> Result<i64, RepositoryError> {
        let patient = PatientRepository::new(self.storage.clone())
            .create(CreatePatientRequest {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                date_of_birth: date_of_birth.to_string(),
                gender: gender.to_string(),
            })
            .await?;

        Ok(patient.id)
    }

    /// Record a metric sample taken `days_ago` days before now
    pub async fn seed_metric(
        &self,
        patient_id: i64,
        metric_type: &str,
        values: MetricValues,
        days_ago: i64,
    ) -> Result<i64, RepositoryError> {
        let recorded_at = Utc::now() - chrono::Duration::days(days_ago);
        let metric = HealthMetricRepository::new(self.storage.clone())
            .create(CreateHealthMetricRequest {
                patient_id,
                metric_type: metric_type.to_string(),
                values,
                notes: None,
                recorded_by: None,
                created_at: Some(format_timestamp(&recorded_at)),
            })
            .await?;

        Ok(metric.id)
    }
}

/// Health service reporting a fixed status for every component
#[derive(Debug, Clone)]
pub struct MockHealthService {
    status: ComponentStatus,
}

impl MockHealthService {
    pub fn healthy() -> Self {
        Self { status: ComponentStatus::Healthy }
    }

    pub fn with_status(status: ComponentStatus) -> Self {
        Self { status }
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let components: HashMap<String, HealthComponent> = ["database", "risk_model", "api"]
            .into_iter()
            .map(|name| {
                (
                    name.to_string(),
                    HealthComponent {
                        status: self.status.clone(),
                        details: None,
                    },
                )
            })
            .collect();

        SystemHealth::from_components(components)
    }

    async fn check_database_status(&self) -> Result<String, String> {
        match self.status {
            ComponentStatus::Unhealthy => Err("Database connection error".to_string()),
            _ => Ok("mock database".to_string()),
        }
    }
}

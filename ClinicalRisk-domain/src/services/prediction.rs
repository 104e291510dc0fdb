use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use clinical_risk_data::models::prediction::PredictionChanges;
use clinical_risk_data::repository::{
    HealthMetricRepository, PatientRepository, PredictionRepository, PredictionRepositoryTrait, RepositoryError,
    StorageBackend,
};

use crate::auth::authorize::{authorize, CLINICAL_ROLES};
use crate::config::{AggregationConfig, ModelClientConfig};
use crate::entities::conversions;
use crate::entities::{
    AuthenticatedUser, ParsedModelResponse, PredictionListFilter, PredictionSummary, PredictionUpdate, RiskPrediction,
};
use crate::services::aggregator::{FeatureAggregator, MetricAggregator};
use crate::services::errors::PredictionError;
use crate::services::risk_model::{OpenAiCompletionClient, RiskAssessor, RiskModelClient};

/// Category stored on every generated prediction
pub const PREDICTION_TYPE: &str = "health_risk_assessment";

/// Operations the HTTP layer calls on predictions
#[async_trait]
pub trait PredictionServiceTrait: Send + Sync {
    /// Aggregate, assess and persist a new prediction for a patient
    async fn generate(&self, patient_id: i64, user: &AuthenticatedUser) -> Result<RiskPrediction, PredictionError>;

    /// Predictions for a patient, newest first
    async fn list_for_patient(&self, patient_id: i64, user: &AuthenticatedUser)
        -> Result<Vec<RiskPrediction>, PredictionError>;

    /// Predictions across all patients, most recently updated first
    async fn list_predictions(&self, filter: PredictionListFilter, user: &AuthenticatedUser)
        -> Result<Vec<PredictionSummary>, PredictionError>;

    /// A single prediction
    async fn get_prediction(&self, prediction_id: i64, user: &AuthenticatedUser)
        -> Result<RiskPrediction, PredictionError>;

    /// Mark a prediction reviewed by `reviewer_id`. The first reviewer wins.
    async fn review(
        &self,
        prediction_id: i64,
        reviewer_id: i64,
        is_reviewed: bool,
        user: &AuthenticatedUser,
    ) -> Result<RiskPrediction, PredictionError>;

    /// Administrative partial update; review state is not editable here
    async fn update_prediction(
        &self,
        prediction_id: i64,
        update: PredictionUpdate,
        user: &AuthenticatedUser,
    ) -> Result<RiskPrediction, PredictionError>;
}

/// Orchestrates aggregation, model assessment and persistence
pub struct PredictionService {
    aggregator: Arc<dyn FeatureAggregator>,
    assessor: Arc<dyn RiskAssessor>,
    store: Arc<dyn PredictionRepositoryTrait>,
}

impl PredictionService {
    pub fn new(
        aggregator: Arc<dyn FeatureAggregator>,
        assessor: Arc<dyn RiskAssessor>,
        store: Arc<dyn PredictionRepositoryTrait>,
    ) -> Self {
        Self { aggregator, assessor, store }
    }

    async fn load(&self, prediction_id: i64) -> Result<RiskPrediction, PredictionError> {
        let record = self
            .store
            .get_by_id(prediction_id)
            .await?
            .ok_or_else(|| PredictionError::NotFound(format!("Prediction {}", prediction_id)))?;

        to_domain(record)
    }

    async fn apply(&self, prediction_id: i64, changes: PredictionChanges) -> Result<RiskPrediction, PredictionError> {
        let record = self.store.update(prediction_id, changes).await?;
        to_domain(record)
    }
}

fn to_domain(
    record: clinical_risk_data::models::prediction::PredictionRecord,
) -> Result<RiskPrediction, PredictionError> {
    conversions::convert_to_domain_prediction(record).map_err(|e| {
        error!("Stored prediction is unreadable: {}", e);
        PredictionError::Storage(e)
    })
}

fn require_positive_id(id: i64, what: &str) -> Result<(), PredictionError> {
    if id <= 0 {
        return Err(PredictionError::InvalidInput(format!("{} must be a positive integer", what)));
    }
    Ok(())
}

/// Free-text explanation stored alongside a generated prediction
pub fn build_explanation(response: &ParsedModelResponse) -> String {
    let mut explanation = format!(
        "AI analysis based on patient health data. Risk level: {}.",
        response.risk_level.as_str()
    );

    if let Some(date) = response.next_checkup_date.as_deref().filter(|d| !d.trim().is_empty()) {
        explanation.push_str(&format!(" Suggested next checkup: {}.", date));
    }
    if !response.lifestyle_changes.is_empty() {
        explanation.push_str(&format!(" Lifestyle changes: {}.", response.lifestyle_changes.join("; ")));
    }
    if !response.medication_suggestions.is_empty() {
        explanation.push_str(&format!(" Medication to discuss: {}.", response.medication_suggestions.join("; ")));
    }

    explanation
}

fn validation_message(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect::<Vec<String>>()
        .join("; ")
}

#[async_trait]
impl PredictionServiceTrait for PredictionService {
    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn generate(&self, patient_id: i64, user: &AuthenticatedUser) -> Result<RiskPrediction, PredictionError> {
        authorize(CLINICAL_ROLES, user, "predictions:generate")?;
        require_positive_id(patient_id, "patient_id")?;

        let features = self.aggregator.build_feature_record(patient_id).await?;
        let response = self.assessor.assess(&features).await.map_err(|e| {
            warn!("Risk assessment failed for patient {}: {}", patient_id, e);
            e
        })?;

        let record = conversions::convert_to_data_new_prediction(
            patient_id,
            PREDICTION_TYPE,
            response.risk_level,
            response.confidence_score,
            response.predicted_conditions.clone(),
            build_explanation(&response),
            response.recommendations.clone(),
        );

        let saved = to_domain(self.store.save(record).await?)?;
        info!(
            "Saved prediction {} for patient {}: risk={}, alert={}",
            saved.id, patient_id, saved.risk_level.as_str(), saved.is_alert
        );

        Ok(saved)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn list_for_patient(&self, patient_id: i64, user: &AuthenticatedUser)
        -> Result<Vec<RiskPrediction>, PredictionError>
    {
        authorize(CLINICAL_ROLES, user, "predictions:list")?;
        require_positive_id(patient_id, "patient_id")?;

        self.store
            .list_by_patient(patient_id)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn list_predictions(&self, filter: PredictionListFilter, user: &AuthenticatedUser)
        -> Result<Vec<PredictionSummary>, PredictionError>
    {
        authorize(CLINICAL_ROLES, user, "predictions:list_all")?;

        let rows = self.store.list(conversions::convert_to_data_filter(filter)).await?;
        debug!("Listing {} predictions", rows.len());

        rows.into_iter()
            .map(|row| {
                conversions::convert_to_domain_summary(row).map_err(|e| {
                    error!("Stored prediction is unreadable: {}", e);
                    PredictionError::Storage(e)
                })
            })
            .collect()
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn get_prediction(&self, prediction_id: i64, user: &AuthenticatedUser)
        -> Result<RiskPrediction, PredictionError>
    {
        authorize(CLINICAL_ROLES, user, "predictions:read")?;
        require_positive_id(prediction_id, "prediction_id")?;

        self.load(prediction_id).await
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn review(
        &self,
        prediction_id: i64,
        reviewer_id: i64,
        is_reviewed: bool,
        user: &AuthenticatedUser,
    ) -> Result<RiskPrediction, PredictionError> {
        authorize(CLINICAL_ROLES, user, "predictions:review")?;
        require_positive_id(prediction_id, "prediction_id")?;

        let current = self.load(prediction_id).await?;

        match (current.is_reviewed, is_reviewed) {
            (true, false) => Err(PredictionError::InvalidInput(
                "A reviewed prediction cannot be returned to unreviewed".to_string(),
            )),
            (true, true) | (false, false) => Ok(current),
            (false, true) => {
                let changes = PredictionChanges {
                    is_reviewed: Some(true),
                    reviewed_by: Some(reviewer_id),
                    only_if_unreviewed: true,
                    ..Default::default()
                };
                match self.store.update(prediction_id, changes).await {
                    Ok(record) => {
                        info!("Prediction {} reviewed by user {}", prediction_id, reviewer_id);
                        to_domain(record)
                    }
                    // Lost the race to another reviewer; their stamp stands
                    Err(RepositoryError::Conflict(msg)) => {
                        warn!("Review by user {} skipped: {}", reviewer_id, msg);
                        self.load(prediction_id).await
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    #[instrument(skip(self, update, user), fields(user_id = user.id))]
    async fn update_prediction(
        &self,
        prediction_id: i64,
        update: PredictionUpdate,
        user: &AuthenticatedUser,
    ) -> Result<RiskPrediction, PredictionError> {
        authorize(CLINICAL_ROLES, user, "predictions:update")?;
        require_positive_id(prediction_id, "prediction_id")?;

        if update.is_empty() {
            return Err(PredictionError::InvalidInput("No fields to update".to_string()));
        }
        update
            .validate()
            .map_err(|e| PredictionError::InvalidInput(validation_message(e)))?;

        let non_finite = [update.risk_percentage, update.confidence_score]
            .into_iter()
            .flatten()
            .any(|v| !v.is_finite());
        if non_finite {
            return Err(PredictionError::InvalidInput("Numeric fields must be finite".to_string()));
        }

        let updated = self.apply(prediction_id, conversions::convert_to_data_changes(update)).await?;
        info!("Prediction {} updated by user {}", prediction_id, user.id);
        Ok(updated)
    }
}

/// Build the production service on the process-wide database pool
pub fn create_default_prediction_service(
    model_config: ModelClientConfig,
    aggregation_config: AggregationConfig,
) -> Result<PredictionService, PredictionError> {
    let backend = StorageBackend::from_global_pool()?;
    let timeout = model_config.timeout;

    let aggregator = MetricAggregator::new(
        Arc::new(PatientRepository::new(backend.clone())),
        Arc::new(HealthMetricRepository::new(backend.clone())),
        aggregation_config,
    );
    let assessor = RiskModelClient::new(Arc::new(OpenAiCompletionClient::new(model_config)?), timeout);

    Ok(PredictionService::new(
        Arc::new(aggregator),
        Arc::new(assessor),
        Arc::new(PredictionRepository::new(backend)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;
    use mockall::mock;

    use clinical_risk_data::models::format_timestamp;
    use clinical_risk_data::models::health_metric::CreateHealthMetricRequest;
    use clinical_risk_data::models::patient::CreatePatientRequest;
    use clinical_risk_data::models::prediction::{
        NewPredictionRecord, PredictionFilter, PredictionRecord, PredictionSummaryRecord,
    };
    use clinical_risk_data::repository::{HealthMetricRepositoryTrait, PatientRepositoryTrait};

    use crate::config::AggregationConfig;
    use crate::entities::{MetricValues, PatientFeatureRecord, RiskLevel, UserRole};
    use crate::services::aggregator::MockFeatureAggregator;
    use crate::services::risk_model::{MockCompletionBackend, MockRiskAssessor};

    mock! {
        Store {}

        #[async_trait]
        impl PredictionRepositoryTrait for Store {
            async fn save(&self, prediction: NewPredictionRecord) -> Result<PredictionRecord, RepositoryError>;
            async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<PredictionRecord>, RepositoryError>;
            async fn get_by_id(&self, id: i64) -> Result<Option<PredictionRecord>, RepositoryError>;
            async fn update(&self, id: i64, changes: PredictionChanges) -> Result<PredictionRecord, RepositoryError>;
            async fn list(&self, filter: PredictionFilter) -> Result<Vec<PredictionSummaryRecord>, RepositoryError>;
        }
    }

    fn doctor() -> AuthenticatedUser {
        AuthenticatedUser::new(7, UserRole::Doctor)
    }

    fn record(id: i64, is_reviewed: bool) -> PredictionRecord {
        let now = format_timestamp(&chrono::Utc::now());
        PredictionRecord {
            id,
            patient_id: 1,
            prediction_type: PREDICTION_TYPE.to_string(),
            risk_level: "moderate".to_string(),
            risk_percentage: 60.0,
            confidence_score: 0.6,
            factors: vec!["hypertension".to_string()],
            explanation: "AI analysis based on patient health data. Risk level: moderate.".to_string(),
            recommendations: vec![],
            is_alert: false,
            is_reviewed,
            reviewed_by: if is_reviewed { Some(7) } else { None },
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn parsed(level: RiskLevel, confidence: f64) -> ParsedModelResponse {
        ParsedModelResponse {
            risk_level: level,
            predicted_conditions: vec!["type 2 diabetes".to_string()],
            recommendations: vec!["repeat HbA1c in 3 months".to_string()],
            confidence_score: confidence,
            next_checkup_date: Some("2024-09-01".to_string()),
            lifestyle_changes: vec![],
            medication_suggestions: vec![],
        }
    }

    fn service(aggregator: MockFeatureAggregator, assessor: MockRiskAssessor, store: MockStore) -> PredictionService {
        PredictionService::new(Arc::new(aggregator), Arc::new(assessor), Arc::new(store))
    }

    #[tokio::test]
    async fn test_patient_role_forbidden_before_any_call() {
        let mut aggregator = MockFeatureAggregator::new();
        aggregator.expect_build_feature_record().times(0);
        let mut assessor = MockRiskAssessor::new();
        assessor.expect_assess().times(0);
        let mut store = MockStore::new();
        store.expect_save().times(0);

        let service = service(aggregator, assessor, store);
        let result = service.generate(1, &AuthenticatedUser::new(3, UserRole::Patient)).await;

        assert!(matches!(result, Err(PredictionError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_non_positive_patient_id_is_invalid_input() {
        let mut aggregator = MockFeatureAggregator::new();
        aggregator.expect_build_feature_record().times(0);

        let service = service(aggregator, MockRiskAssessor::new(), MockStore::new());
        let result = service.generate(0, &doctor()).await;

        assert!(matches!(result, Err(PredictionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_invalid_model_response_persists_nothing() {
        let mut aggregator = MockFeatureAggregator::new();
        aggregator
            .expect_build_feature_record()
            .returning(|_| Ok(PatientFeatureRecord::default()));
        let mut assessor = MockRiskAssessor::new();
        assessor
            .expect_assess()
            .returning(|_| Err(PredictionError::InvalidResponse("No JSON object in model reply".to_string())));
        let mut store = MockStore::new();
        store.expect_save().times(0);

        let service = service(aggregator, assessor, store);
        let result = service.generate(1, &doctor()).await;

        assert!(matches!(result, Err(PredictionError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_patient_propagates_not_found() {
        let mut aggregator = MockFeatureAggregator::new();
        aggregator
            .expect_build_feature_record()
            .returning(|id| Err(PredictionError::NotFound(format!("Patient {}", id))));
        let mut assessor = MockRiskAssessor::new();
        assessor.expect_assess().times(0);

        let service = service(aggregator, assessor, MockStore::new());
        assert!(matches!(service.generate(99, &doctor()).await, Err(PredictionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_generate_saves_derived_fields() {
        let mut aggregator = MockFeatureAggregator::new();
        aggregator
            .expect_build_feature_record()
            .returning(|_| Ok(PatientFeatureRecord::default()));
        let mut assessor = MockRiskAssessor::new();
        assessor.expect_assess().returning(|_| Ok(parsed(RiskLevel::High, 0.9)));

        let mut store = MockStore::new();
        store
            .expect_save()
            .withf(|new| {
                new.risk_level == "high"
                    && (new.risk_percentage - 90.0).abs() < 1e-9
                    && new.is_alert
                    && new.prediction_type == PREDICTION_TYPE
                    && new.factors == vec!["type 2 diabetes".to_string()]
            })
            .times(1)
            .returning(|new| {
                let mut saved = record(11, false);
                saved.risk_level = new.risk_level;
                saved.risk_percentage = new.risk_percentage;
                saved.confidence_score = new.confidence_score;
                saved.is_alert = new.is_alert;
                Ok(saved)
            });

        let service = service(aggregator, assessor, store);
        let prediction = service.generate(1, &doctor()).await.unwrap();

        assert_eq!(prediction.id, 11);
        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert!(prediction.is_alert);
    }

    #[tokio::test]
    async fn test_review_unknown_prediction_is_not_found() {
        let mut store = MockStore::new();
        store.expect_get_by_id().returning(|_| Ok(None));
        store.expect_update().times(0);

        let service = service(MockFeatureAggregator::new(), MockRiskAssessor::new(), store);
        let result = service.review(404, 7, true, &doctor()).await;

        assert!(matches!(result, Err(PredictionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_review_cannot_be_undone() {
        let mut store = MockStore::new();
        store.expect_get_by_id().returning(|id| Ok(Some(record(id, true))));
        store.expect_update().times(0);

        let service = service(MockFeatureAggregator::new(), MockRiskAssessor::new(), store);

        assert!(matches!(
            service.review(5, 7, false, &doctor()).await,
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(service.review(5, 8, true, &doctor()).await.unwrap().is_reviewed);
    }

    #[tokio::test]
    async fn test_concurrent_review_keeps_first_reviewer() {
        let reads = AtomicUsize::new(0);
        let mut store = MockStore::new();
        store.expect_get_by_id().times(2).returning(move |id| {
            // The second read happens after another reviewer committed
            if reads.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Some(record(id, false)))
            } else {
                let mut reviewed = record(id, true);
                reviewed.reviewed_by = Some(99);
                Ok(Some(reviewed))
            }
        });
        store
            .expect_update()
            .withf(|_, changes| changes.only_if_unreviewed && changes.reviewed_by == Some(7))
            .times(1)
            .returning(|id, _| Err(RepositoryError::Conflict(format!("prediction {} is already reviewed", id))));

        let service = service(MockFeatureAggregator::new(), MockRiskAssessor::new(), store);
        let prediction = service.review(5, 7, true, &doctor()).await.unwrap();

        assert!(prediction.is_reviewed);
        assert_eq!(prediction.reviewed_by, Some(99));
    }

    #[tokio::test]
    async fn test_listing_requires_clinical_role() {
        let mut store = MockStore::new();
        store.expect_list().times(0);

        let service = service(MockFeatureAggregator::new(), MockRiskAssessor::new(), store);
        let result = service
            .list_predictions(PredictionListFilter::default(), &AuthenticatedUser::new(3, UserRole::Patient))
            .await;

        assert!(matches!(result, Err(PredictionError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_listing_passes_storage_filter() {
        let mut store = MockStore::new();
        store
            .expect_list()
            .withf(|filter| {
                filter.risk_level.as_deref() == Some("moderate")
                    && filter.prediction_type.is_none()
                    && filter.search.as_deref() == Some("haddad")
            })
            .times(1)
            .returning(|_| {
                Ok(vec![PredictionSummaryRecord {
                    prediction: record(3, false),
                    patient_name: "Haddad, Samir".to_string(),
                }])
            });

        let service = service(MockFeatureAggregator::new(), MockRiskAssessor::new(), store);
        let filter = PredictionListFilter {
            risk_level: Some(RiskLevel::Moderate),
            prediction_type: Some(String::new()),
            search: Some("haddad".to_string()),
        };
        let listed = service.list_predictions(filter, &doctor()).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].prediction.id, 3);
        assert_eq!(listed[0].patient_name, "Haddad, Samir");
    }

    #[tokio::test]
    async fn test_update_rejects_out_of_range_and_empty() {
        let mut store = MockStore::new();
        store.expect_update().times(0);
        let service = service(MockFeatureAggregator::new(), MockRiskAssessor::new(), store);

        let too_high = PredictionUpdate { risk_percentage: Some(120.0), ..Default::default() };
        assert!(matches!(
            service.update_prediction(1, too_high, &doctor()).await,
            Err(PredictionError::InvalidInput(_))
        ));

        let nan = PredictionUpdate { confidence_score: Some(f64::NAN), ..Default::default() };
        assert!(matches!(
            service.update_prediction(1, nan, &doctor()).await,
            Err(PredictionError::InvalidInput(_))
        ));

        assert!(matches!(
            service.update_prediction(1, PredictionUpdate::default(), &doctor()).await,
            Err(PredictionError::InvalidInput(_))
        ));
    }

    async fn in_memory_service(reply: &'static str) -> (PredictionService, i64) {
        let backend = StorageBackend::in_memory();
        let patients = PatientRepository::new(backend.clone());
        let metrics = HealthMetricRepository::new(backend.clone());

        let patient = patients
            .create(CreatePatientRequest {
                first_name: "Samir".to_string(),
                last_name: "Haddad".to_string(),
                date_of_birth: "1962-11-30".to_string(),
                gender: "male".to_string(),
            })
            .await
            .unwrap();

        let samples = [
            ("blood_sugar", MetricValues { hba1c: Some(7.2), ..Default::default() }, Some("feels tired, constant thirst")),
            ("anthropometric", MetricValues { bmi: Some(31.4), weight_kg: Some(97.0), ..Default::default() }, None),
        ];
        for (days_ago, (metric_type, values, notes)) in samples.into_iter().enumerate() {
            metrics
                .create(CreateHealthMetricRequest {
                    patient_id: patient.id,
                    metric_type: metric_type.to_string(),
                    values,
                    notes: notes.map(str::to_string),
                    recorded_by: Some(7),
                    created_at: Some(format_timestamp(&(chrono::Utc::now() - Duration::days(days_ago as i64 + 1)))),
                })
                .await
                .unwrap();
        }

        let mut backend_mock = MockCompletionBackend::new();
        backend_mock.expect_complete().returning(move |prompt| {
            assert!(prompt.user.contains("\"hba1c\": 7.2"));
            assert!(prompt.user.contains("\"bmi\": 31.4"));
            Ok(reply.to_string())
        });

        let service = PredictionService::new(
            Arc::new(MetricAggregator::new(Arc::new(patients), Arc::new(metrics), AggregationConfig::default())),
            Arc::new(RiskModelClient::new(Arc::new(backend_mock), std::time::Duration::from_secs(1))),
            Arc::new(PredictionRepository::new(backend)),
        );

        (service, patient.id)
    }

    #[tokio::test]
    async fn test_end_to_end_high_risk_prediction() {
        let reply = r#"```json
{"risk_level":"high","predicted_conditions":["type 2 diabetes","obesity"],"recommendations":["endocrinology referral"],"confidence_score":0.9,"next_checkup_date":"2024-08-01","lifestyle_changes":["reduce refined sugar"],"medication_suggestions":[]}
```"#;
        let (service, patient_id) = in_memory_service(reply).await;

        let prediction = service.generate(patient_id, &doctor()).await.unwrap();

        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert!((prediction.risk_percentage - 90.0).abs() < 1e-9);
        assert!(prediction.is_alert);
        assert!(!prediction.is_reviewed);
        assert_eq!(prediction.reviewed_by, None);
        assert_eq!(prediction.factors, vec!["type 2 diabetes", "obesity"]);
        assert!(prediction.explanation.contains("Risk level: high"));

        let listed = service.list_for_patient(patient_id, &doctor()).await.unwrap();
        assert_eq!(listed, vec![prediction.clone()]);

        let high = PredictionListFilter { risk_level: Some(RiskLevel::High), ..Default::default() };
        let summaries = service.list_predictions(high, &doctor()).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].prediction, prediction);
        assert_eq!(summaries[0].patient_name, "Haddad, Samir");

        let low = PredictionListFilter { risk_level: Some(RiskLevel::Low), ..Default::default() };
        assert!(service.list_predictions(low, &doctor()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_stamps_reviewer_and_advances_updated_at() {
        let reply = r#"{"risk_level":"moderate","predicted_conditions":[],"recommendations":[],"confidence_score":0.5,"next_checkup_date":"","lifestyle_changes":[],"medication_suggestions":[]}"#;
        let (service, patient_id) = in_memory_service(reply).await;

        let created = service.generate(patient_id, &doctor()).await.unwrap();
        let official = AuthenticatedUser::new(21, UserRole::Official);
        let reviewed = service.review(created.id, official.id, true, &official).await.unwrap();

        assert!(reviewed.is_reviewed);
        assert_eq!(reviewed.reviewed_by, Some(21));
        assert!(reviewed.updated_at > created.updated_at);
        assert_eq!(reviewed.created_at, created.created_at);

        let again = service.review(created.id, 7, true, &doctor()).await.unwrap();
        assert_eq!(again.reviewed_by, Some(21));
    }

    #[tokio::test]
    async fn test_update_rederives_alert() {
        let reply = r#"{"risk_level":"low","predicted_conditions":[],"recommendations":[],"confidence_score":0.3,"next_checkup_date":"","lifestyle_changes":[],"medication_suggestions":[]}"#;
        let (service, patient_id) = in_memory_service(reply).await;

        let created = service.generate(patient_id, &doctor()).await.unwrap();
        assert!(!created.is_alert);

        let update = PredictionUpdate { risk_level: Some(RiskLevel::High), ..Default::default() };
        let updated = service.update_prediction(created.id, update, &doctor()).await.unwrap();

        assert_eq!(updated.risk_level, RiskLevel::High);
        assert!(updated.is_alert);
        assert!(!updated.is_reviewed);
    }
}

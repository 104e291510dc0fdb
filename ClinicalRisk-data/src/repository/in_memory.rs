use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::models::format_timestamp;
use crate::models::health_metric::{CreateHealthMetricRequest, HealthMetricRecord};
use crate::models::patient::{CreatePatientRequest, PatientRecord};
use crate::models::prediction::{
    patient_display_name, NewPredictionRecord, PredictionChanges, PredictionFilter, PredictionRecord,
    PredictionSummaryRecord,
};
use super::errors::RepositoryError;

/// In-memory storage shared by every repository built on the same instance.
///
/// Clones share state, so a patient created through one repository is visible
/// to the metric and prediction repositories holding a clone.
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    patients: Arc<Mutex<HashMap<i64, PatientRecord>>>,
    metrics: Arc<Mutex<Vec<HealthMetricRecord>>>,
    predictions: Arc<Mutex<HashMap<i64, PredictionRecord>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self {
            patients: Arc::new(Mutex::new(HashMap::new())),
            metrics: Arc::new(Mutex::new(Vec::new())),
            predictions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_patient(&self, patient_id: i64) -> Result<(), RepositoryError> {
        let patients = self.patients.lock()?;
        if patients.contains_key(&patient_id) {
            Ok(())
        } else {
            Err(RepositoryError::Validation(format!("patient {} does not exist", patient_id)))
        }
    }

    pub async fn insert_patient(&self, request: CreatePatientRequest) -> Result<PatientRecord, RepositoryError> {
        let record = PatientRecord {
            id: self.allocate_id(),
            first_name: request.first_name,
            last_name: request.last_name,
            date_of_birth: request.date_of_birth,
            gender: request.gender,
            created_at: format_timestamp(&Utc::now()),
        };

        self.patients.lock()?.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn get_patient(&self, id: i64) -> Result<Option<PatientRecord>, RepositoryError> {
        Ok(self.patients.lock()?.get(&id).cloned())
    }

    pub async fn insert_metric(&self, request: CreateHealthMetricRequest) -> Result<HealthMetricRecord, RepositoryError> {
        self.ensure_patient(request.patient_id)?;

        let record = HealthMetricRecord {
            id: self.allocate_id(),
            patient_id: request.patient_id,
            metric_type: request.metric_type,
            values: request.values,
            notes: request.notes,
            recorded_by: request.recorded_by,
            created_at: request.created_at.unwrap_or_else(|| format_timestamp(&Utc::now())),
        };

        self.metrics.lock()?.push(record.clone());
        Ok(record)
    }

    /// Samples for a patient taken at or after `since`, newest first
    pub async fn recent_metrics(
        &self,
        patient_id: i64,
        since: &str,
        limit: usize,
    ) -> Result<Vec<HealthMetricRecord>, RepositoryError> {
        let store = self.metrics.lock()?;

        let mut metrics: Vec<HealthMetricRecord> = store.iter()
            .filter(|m| m.patient_id == patient_id && m.created_at.as_str() >= since)
            .cloned()
            .collect();

        metrics.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        metrics.truncate(limit);

        Ok(metrics)
    }

    pub async fn insert_prediction(
        &self,
        prediction: NewPredictionRecord,
        now: DateTime<Utc>,
    ) -> Result<PredictionRecord, RepositoryError> {
        self.ensure_patient(prediction.patient_id)?;

        let stamp = format_timestamp(&now);
        let record = PredictionRecord {
            id: self.allocate_id(),
            patient_id: prediction.patient_id,
            prediction_type: prediction.prediction_type,
            risk_level: prediction.risk_level,
            risk_percentage: prediction.risk_percentage,
            confidence_score: prediction.confidence_score,
            factors: prediction.factors,
            explanation: prediction.explanation,
            recommendations: prediction.recommendations,
            is_alert: prediction.is_alert,
            is_reviewed: false,
            reviewed_by: None,
            created_at: stamp.clone(),
            updated_at: stamp,
        };

        self.predictions.lock()?.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn predictions_for_patient(&self, patient_id: i64) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let store = self.predictions.lock()?;

        let mut predictions: Vec<PredictionRecord> = store.values()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect();

        predictions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(predictions)
    }

    /// Predictions across all patients matching `filter`, most recently updated first
    pub async fn list_predictions(&self, filter: PredictionFilter) -> Result<Vec<PredictionSummaryRecord>, RepositoryError> {
        let patients = self.patients.lock()?;
        let store = self.predictions.lock()?;

        let mut summaries: Vec<PredictionSummaryRecord> = store.values()
            .filter_map(|p| {
                let patient = patients.get(&p.patient_id)?;
                filter.matches(p, patient).then(|| PredictionSummaryRecord {
                    prediction: p.clone(),
                    patient_name: patient_display_name(&patient.first_name, &patient.last_name),
                })
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.prediction.updated_at.cmp(&a.prediction.updated_at)
                .then(b.prediction.id.cmp(&a.prediction.id))
        });
        Ok(summaries)
    }

    pub async fn get_prediction(&self, id: i64) -> Result<Option<PredictionRecord>, RepositoryError> {
        Ok(self.predictions.lock()?.get(&id).cloned())
    }

    /// Apply `changes` under the store lock so concurrent updates serialize
    pub async fn update_prediction(
        &self,
        id: i64,
        changes: PredictionChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<PredictionRecord>, RepositoryError> {
        let mut store = self.predictions.lock()?;

        match store.get_mut(&id) {
            Some(record) if !changes.permits(&*record) => {
                Err(RepositoryError::Conflict(format!("prediction {} is already reviewed", id)))
            }
            Some(record) => {
                changes.apply_to(record, now);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }
}

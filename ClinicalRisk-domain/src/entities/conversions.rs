use chrono::{DateTime, Utc};

use clinical_risk_data::models::health_metric::HealthMetricRecord;
use clinical_risk_data::models::parse_timestamp;
use clinical_risk_data::models::patient::PatientRecord;
use clinical_risk_data::models::prediction::{
    NewPredictionRecord, PredictionChanges, PredictionFilter, PredictionRecord, PredictionSummaryRecord,
};

use crate::entities::patient::{HealthMetric, MetricCategory, Patient};
use crate::entities::prediction::{
    PredictionListFilter, PredictionSummary, PredictionUpdate, RiskLevel, RiskPrediction,
};

/// Conversion functions between domain entities and data models
/// These functions follow the pattern convert_to_[target_layer]_[model_name]

fn parse_stored_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).map_err(|e| format!("Invalid {} timestamp '{}': {}", field, raw, e))
}

/// Convert from data model to domain entity for a patient
pub fn convert_to_domain_patient(record: PatientRecord) -> Patient {
    Patient {
        id: record.id,
        first_name: record.first_name,
        last_name: record.last_name,
        date_of_birth: record.date_of_birth,
        gender: record.gender,
    }
}

/// Convert from data model to domain entity for a metric sample
pub fn convert_to_domain_metric(record: HealthMetricRecord) -> Result<HealthMetric, String> {
    Ok(HealthMetric {
        id: record.id,
        patient_id: record.patient_id,
        category: MetricCategory::from_tag(&record.metric_type),
        values: record.values,
        notes: record.notes,
        recorded_at: parse_stored_timestamp(&record.created_at, "created_at")?,
    })
}

/// Convert from data model to domain entity for a prediction
pub fn convert_to_domain_prediction(record: PredictionRecord) -> Result<RiskPrediction, String> {
    let risk_level = RiskLevel::from_label(&record.risk_level)
        .ok_or_else(|| format!("Invalid stored risk level '{}'", record.risk_level))?;

    Ok(RiskPrediction {
        id: record.id,
        patient_id: record.patient_id,
        prediction_type: record.prediction_type,
        risk_level,
        risk_percentage: record.risk_percentage,
        confidence_score: record.confidence_score,
        factors: record.factors,
        explanation: record.explanation,
        recommendations: record.recommendations,
        is_alert: record.is_alert,
        is_reviewed: record.is_reviewed,
        reviewed_by: record.reviewed_by,
        created_at: parse_stored_timestamp(&record.created_at, "created_at")?,
        updated_at: parse_stored_timestamp(&record.updated_at, "updated_at")?,
    })
}

/// Build the data model for a freshly generated prediction
pub fn convert_to_data_new_prediction(
    patient_id: i64,
    prediction_type: &str,
    risk_level: RiskLevel,
    confidence_score: f64,
    factors: Vec<String>,
    explanation: String,
    recommendations: Vec<String>,
) -> NewPredictionRecord {
    NewPredictionRecord {
        patient_id,
        prediction_type: prediction_type.to_string(),
        risk_level: risk_level.as_str().to_string(),
        risk_percentage: confidence_score * 100.0,
        confidence_score,
        factors,
        explanation,
        recommendations,
        is_alert: risk_level.is_alert(),
    }
}

/// Convert an administrative update into storage changes, re-deriving the alert flag
pub fn convert_to_data_changes(update: PredictionUpdate) -> PredictionChanges {
    PredictionChanges {
        prediction_type: update.prediction_type,
        risk_level: update.risk_level.map(|level| level.as_str().to_string()),
        risk_percentage: update.risk_percentage,
        confidence_score: update.confidence_score,
        factors: update.factors,
        explanation: update.explanation,
        recommendations: update.recommendations,
        is_alert: update.risk_level.map(|level| level.is_alert()),
        is_reviewed: None,
        reviewed_by: None,
        only_if_unreviewed: false,
    }
}

/// Convert listing criteria into the storage filter. Blank text counts as no filter.
pub fn convert_to_data_filter(filter: PredictionListFilter) -> PredictionFilter {
    let non_blank = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    PredictionFilter {
        risk_level: filter.risk_level.map(|level| level.as_str().to_string()),
        prediction_type: non_blank(filter.prediction_type),
        search: non_blank(filter.search),
    }
}

/// Convert from data model to domain entity for a listing row
pub fn convert_to_domain_summary(record: PredictionSummaryRecord) -> Result<PredictionSummary, String> {
    Ok(PredictionSummary {
        prediction: convert_to_domain_prediction(record.prediction)?,
        patient_name: record.patient_name,
    })
}

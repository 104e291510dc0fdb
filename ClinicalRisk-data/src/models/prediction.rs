use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::patient::PatientRecord;
use super::{format_timestamp, parse_timestamp};

/// Storage model for a persisted risk prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    pub id: i64,
    pub patient_id: i64,
    pub prediction_type: String,
    /// Lower-case risk tier: `low`, `moderate` or `high`
    pub risk_level: String,
    pub risk_percentage: f64,
    pub confidence_score: f64,
    pub factors: Vec<String>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub is_alert: bool,
    pub is_reviewed: bool,
    pub reviewed_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input data for saving a freshly generated prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPredictionRecord {
    pub patient_id: i64,
    pub prediction_type: String,
    pub risk_level: String,
    pub risk_percentage: f64,
    pub confidence_score: f64,
    pub factors: Vec<String>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub is_alert: bool,
}

/// Partial update for a stored prediction. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionChanges {
    pub prediction_type: Option<String>,
    pub risk_level: Option<String>,
    pub risk_percentage: Option<f64>,
    pub confidence_score: Option<f64>,
    pub factors: Option<Vec<String>>,
    pub explanation: Option<String>,
    pub recommendations: Option<Vec<String>>,
    pub is_alert: Option<bool>,
    pub is_reviewed: Option<bool>,
    pub reviewed_by: Option<i64>,
    /// Refuse the update with `Conflict` if the row is already reviewed
    #[serde(default)]
    pub only_if_unreviewed: bool,
}

impl PredictionChanges {
    /// Whether these changes may be merged into `record`
    pub fn permits(&self, record: &PredictionRecord) -> bool {
        !(self.only_if_unreviewed && record.is_reviewed)
    }

    /// Merge the provided fields into `record` and stamp `updated_at`
    pub fn apply_to(self, record: &mut PredictionRecord, now: DateTime<Utc>) {
        if let Some(v) = self.prediction_type { record.prediction_type = v; }
        if let Some(v) = self.risk_level { record.risk_level = v; }
        if let Some(v) = self.risk_percentage { record.risk_percentage = v; }
        if let Some(v) = self.confidence_score { record.confidence_score = v; }
        if let Some(v) = self.factors { record.factors = v; }
        if let Some(v) = self.explanation { record.explanation = v; }
        if let Some(v) = self.recommendations { record.recommendations = v; }
        if let Some(v) = self.is_alert { record.is_alert = v; }
        if let Some(v) = self.is_reviewed { record.is_reviewed = v; }
        if let Some(v) = self.reviewed_by { record.reviewed_by = Some(v); }

        record.updated_at = next_update_timestamp(&record.updated_at, now);
    }
}

/// Filters for the cross-patient listing. `None` matches every row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionFilter {
    /// Lower-case risk tier
    pub risk_level: Option<String>,
    pub prediction_type: Option<String>,
    /// Case-insensitive substring of the patient's first or last name or the prediction type
    pub search: Option<String>,
}

impl PredictionFilter {
    /// Whether a prediction and its patient pass every filter
    pub fn matches(&self, prediction: &PredictionRecord, patient: &PatientRecord) -> bool {
        if let Some(level) = &self.risk_level {
            if &prediction.risk_level != level {
                return false;
            }
        }
        if let Some(kind) = &self.prediction_type {
            if &prediction.prediction_type != kind {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&patient.first_name, &patient.last_name, &prediction.prediction_type]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// A prediction joined with its patient's display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionSummaryRecord {
    pub prediction: PredictionRecord,
    /// `Last, First`
    pub patient_name: String,
}

/// Display name used in listings
pub fn patient_display_name(first_name: &str, last_name: &str) -> String {
    format!("{}, {}", last_name, first_name)
}

/// `updated_at` must move forward on every update, even when two writes land
/// within the same microsecond.
pub fn next_update_timestamp(previous: &str, now: DateTime<Utc>) -> String {
    match parse_timestamp(previous) {
        Ok(prev) if now <= prev => format_timestamp(&(prev + Duration::microseconds(1))),
        _ => format_timestamp(&now),
    }
}

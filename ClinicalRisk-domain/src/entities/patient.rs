use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Measured values are shared with the storage layer unchanged
pub use clinical_risk_data::models::health_metric::MetricValues;

/// Patient demographics used for risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Raw stored birth date; parsed leniently when computing age
    pub date_of_birth: String,
    pub gender: String,
}

/// Tracked metric categories
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricCategory {
    BloodPressure,
    BloodSugar,
    Cholesterol,
    Anthropometric,
    VitalSigns,
    LiverFunction,
    KidneyFunction,
    /// Any other tag; kept in recent samples but never mapped to a feature
    Other(String),
}

impl MetricCategory {
    /// Map a stored `metric_type` tag to its category
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "blood_pressure" => MetricCategory::BloodPressure,
            "blood_sugar" => MetricCategory::BloodSugar,
            "cholesterol" => MetricCategory::Cholesterol,
            "anthropometric" => MetricCategory::Anthropometric,
            "vital_signs" => MetricCategory::VitalSigns,
            "liver_function" => MetricCategory::LiverFunction,
            "kidney_function" => MetricCategory::KidneyFunction,
            other => MetricCategory::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            MetricCategory::BloodPressure => "blood_pressure",
            MetricCategory::BloodSugar => "blood_sugar",
            MetricCategory::Cholesterol => "cholesterol",
            MetricCategory::Anthropometric => "anthropometric",
            MetricCategory::VitalSigns => "vital_signs",
            MetricCategory::LiverFunction => "liver_function",
            MetricCategory::KidneyFunction => "kidney_function",
            MetricCategory::Other(tag) => tag,
        }
    }
}

/// One recorded health metric sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub id: i64,
    pub patient_id: i64,
    pub category: MetricCategory,
    pub values: MetricValues,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

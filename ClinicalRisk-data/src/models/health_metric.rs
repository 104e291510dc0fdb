use serde::{Deserialize, Serialize};

/// Measured values carried by a health metric sample.
///
/// Which fields are populated depends on the sample's `metric_type`; a blood
/// pressure sample only fills the two pressure fields, a lipid panel the four
/// cholesterol fields, and so on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricValues {
    pub systolic_pressure: Option<f64>,
    pub diastolic_pressure: Option<f64>,
    pub blood_sugar_fasting: Option<f64>,
    pub blood_sugar_random: Option<f64>,
    pub hba1c: Option<f64>,
    pub total_cholesterol: Option<f64>,
    pub hdl_cholesterol: Option<f64>,
    pub ldl_cholesterol: Option<f64>,
    pub triglycerides: Option<f64>,
    pub bmi: Option<f64>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub heart_rate: Option<i64>,
    pub oxygen_saturation: Option<f64>,
    pub alt_enzyme: Option<f64>,
    pub ast_enzyme: Option<f64>,
    pub creatinine: Option<f64>,
    pub egfr: Option<f64>,
}

/// Storage model for a single health metric sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthMetricRecord {
    pub id: i64,
    pub patient_id: i64,
    /// Category tag such as `blood_pressure` or `blood_sugar`
    pub metric_type: String,
    #[serde(flatten)]
    pub values: MetricValues,
    /// Free-text clinical notes, scanned for symptom keywords
    pub notes: Option<String>,
    pub recorded_by: Option<i64>,
    pub created_at: String,
}

/// Input data for recording a health metric sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHealthMetricRequest {
    pub patient_id: i64,
    pub metric_type: String,
    #[serde(flatten)]
    pub values: MetricValues,
    pub notes: Option<String>,
    pub recorded_by: Option<i64>,
    /// When the sample was taken. Defaults to the current time if not provided.
    pub created_at: Option<String>,
}

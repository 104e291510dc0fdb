use serde::{Deserialize, Serialize};

/// Flat summary of a patient's demographics and latest measurements.
///
/// Built fresh for every prediction request and embedded in the model
/// prompt as JSON. Absent measurements are omitted from the JSON rather
/// than serialized as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientFeatureRecord {
    pub age: u32,
    pub gender: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_systolic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_diastolic: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_sugar_fasting: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_sugar_random: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hba1c: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cholesterol: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdl_cholesterol: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldl_cholesterol: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triglycerides: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_enzyme: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast_enzyme: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creatinine: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egfr: Option<f64>,

    /// De-duplicated symptom tags found in metric notes
    pub symptoms: Vec<String>,
    /// Most recent raw samples, newest first
    pub recent_metrics: Vec<RecentMetricSample>,
}

/// A raw sample as shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentMetricSample {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

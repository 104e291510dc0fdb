use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Risk tier assigned to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Case-insensitive match on the model's label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "moderate" => Some(RiskLevel::Moderate),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    /// Lower-case form used in storage and prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }

    /// Alerts are raised for high risk only
    pub fn is_alert(&self) -> bool {
        matches!(self, RiskLevel::High)
    }
}

/// A persisted risk prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub id: i64,
    pub patient_id: i64,
    pub prediction_type: String,
    pub risk_level: RiskLevel,
    /// 0–100
    pub risk_percentage: f64,
    /// 0–1
    pub confidence_score: f64,
    pub factors: Vec<String>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub is_alert: bool,
    pub is_reviewed: bool,
    pub reviewed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated reply from the risk model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedModelResponse {
    pub risk_level: RiskLevel,
    pub predicted_conditions: Vec<String>,
    pub recommendations: Vec<String>,
    /// Canonical 0–1 scale
    pub confidence_score: f64,
    pub next_checkup_date: Option<String>,
    pub lifestyle_changes: Vec<String>,
    pub medication_suggestions: Vec<String>,
}

/// Administrative partial update of a prediction.
///
/// Review state only changes through the review action, and `is_alert`
/// follows `risk_level`, so neither appears here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PredictionUpdate {
    #[validate(length(min = 1, max = 50, message = "prediction_type must be 1-50 characters"))]
    pub prediction_type: Option<String>,
    pub risk_level: Option<RiskLevel>,
    #[validate(range(min = 0.0, max = 100.0, message = "risk_percentage must be between 0 and 100"))]
    pub risk_percentage: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0, message = "confidence_score must be between 0 and 1"))]
    pub confidence_score: Option<f64>,
    pub factors: Option<Vec<String>>,
    pub explanation: Option<String>,
    pub recommendations: Option<Vec<String>>,
}

impl PredictionUpdate {
    pub fn is_empty(&self) -> bool {
        self == &PredictionUpdate::default()
    }
}

/// Criteria for the cross-patient prediction listing. `None` means no filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionListFilter {
    pub risk_level: Option<RiskLevel>,
    pub prediction_type: Option<String>,
    /// Case-insensitive match on patient name or prediction type
    pub search: Option<String>,
}

/// A prediction as it appears in the cross-patient listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub prediction: RiskPrediction,
    /// "Last, First"
    pub patient_name: String,
}

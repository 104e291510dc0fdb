use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use clinical_risk_domain::entities::{
    PredictionListFilter, PredictionSummary, PredictionUpdate, RiskLevel, RiskPrediction,
};

/// Risk prediction as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicRiskPrediction {
    pub id: i64,
    pub patient_id: i64,
    /// Prediction category, `health_risk_assessment` for generated predictions
    pub prediction_type: String,
    pub risk_level: RiskLevel,
    /// 0–100
    pub risk_percentage: f64,
    /// 0–1
    pub confidence_score: f64,
    /// Conditions the model flagged
    pub factors: Vec<String>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    /// Set for HIGH risk
    pub is_alert: bool,
    pub is_reviewed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<i64>,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub updated_at: String,
}

impl From<RiskPrediction> for PublicRiskPrediction {
    fn from(p: RiskPrediction) -> Self {
        Self {
            id: p.id,
            patient_id: p.patient_id,
            prediction_type: p.prediction_type,
            risk_level: p.risk_level,
            risk_percentage: p.risk_percentage,
            confidence_score: p.confidence_score,
            factors: p.factors,
            explanation: p.explanation,
            recommendations: p.recommendations,
            is_alert: p.is_alert,
            is_reviewed: p.is_reviewed,
            reviewed_by: p.reviewed_by,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// Row of the cross-patient prediction listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicPredictionSummary {
    #[serde(flatten)]
    pub prediction: PublicRiskPrediction,
    /// `Last, First`
    pub patient_name: String,
}

impl From<PredictionSummary> for PublicPredictionSummary {
    fn from(summary: PredictionSummary) -> Self {
        Self {
            prediction: summary.prediction.into(),
            patient_name: summary.patient_name,
        }
    }
}

/// Query string of the cross-patient listing. `all` or an empty value disables a filter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PredictionListQuery {
    /// LOW, MODERATE, HIGH or all
    pub risk_level: Option<String>,
    /// Exact prediction type, or all
    pub prediction_type: Option<String>,
    /// Matches patient first or last name and prediction type, case-insensitive
    pub search: Option<String>,
}

fn unless_all(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl TryFrom<PredictionListQuery> for PredictionListFilter {
    type Error = String;

    fn try_from(query: PredictionListQuery) -> Result<Self, Self::Error> {
        let risk_level = match unless_all(query.risk_level) {
            Some(label) => Some(
                RiskLevel::from_label(&label).ok_or_else(|| format!("Unknown risk_level '{}'", label))?,
            ),
            None => None,
        };

        Ok(PredictionListFilter {
            risk_level,
            prediction_type: unless_all(query.prediction_type),
            search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        })
    }
}

/// Body of a review request; the reviewer is the authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewPredictionRequest {
    pub is_reviewed: bool,
}

/// Administrative field update. Review state and the alert flag are not accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatePredictionRequest {
    #[schema(max_length = 50)]
    pub prediction_type: Option<String>,
    pub risk_level: Option<RiskLevel>,
    #[schema(minimum = 0.0, maximum = 100.0)]
    pub risk_percentage: Option<f64>,
    #[schema(minimum = 0.0, maximum = 1.0)]
    pub confidence_score: Option<f64>,
    pub factors: Option<Vec<String>>,
    pub explanation: Option<String>,
    pub recommendations: Option<Vec<String>>,
}

impl From<UpdatePredictionRequest> for PredictionUpdate {
    fn from(req: UpdatePredictionRequest) -> Self {
        PredictionUpdate {
            prediction_type: req.prediction_type,
            risk_level: req.risk_level,
            risk_percentage: req.risk_percentage,
            confidence_score: req.confidence_score,
            factors: req.factors,
            explanation: req.explanation,
            recommendations: req.recommendations,
        }
    }
}

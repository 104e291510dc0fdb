use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument, warn};

use crate::config::ModelClientConfig;
use crate::entities::{ParsedModelResponse, PatientFeatureRecord, RiskLevel};
use crate::services::errors::PredictionError;

const SYSTEM_PROMPT: &str = r#"You are a medical AI assistant that analyzes patient health data and returns a structured JSON prediction for chronic disease risk.

Analyze the provided health data and return ONLY a JSON response with the following structure (no markdown, no explanation, just the JSON):
{
  "risk_level": "low|moderate|high",
  "predicted_conditions": ["condition1", "condition2"],
  "recommendations": ["recommendation1", "recommendation2"],
  "confidence_score": 0.85,
  "next_checkup_date": "2024-02-15",
  "lifestyle_changes": ["change1", "change2"],
  "medication_suggestions": ["medication1", "medication2"]
}

Consider factors like age, gender, blood pressure, cholesterol, blood sugar, BMI, and recent health trends."#;

const USER_PROMPT_PREFIX: &str =
    "Analyze this patient's health data and provide a comprehensive risk assessment. Return ONLY the JSON response:";

/// System instruction plus the user message embedding the feature data
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Render the prompt pair for a feature record
pub fn build_prompt(features: &PatientFeatureRecord) -> Result<PromptPair, PredictionError> {
    let data = serde_json::to_string_pretty(features)
        .map_err(|e| PredictionError::InvalidInput(format!("Feature record not serializable: {}", e)))?;

    Ok(PromptPair {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("{}\n{}", USER_PROMPT_PREFIX, data),
    })
}

/// Raw text-generation transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Return the model's text reply for a prompt pair
    async fn complete(&self, prompt: &PromptPair) -> Result<String, PredictionError>;

    /// Short label for health reporting
    fn describe(&self) -> String;
}

/// Chat-completions client over HTTPS
pub struct OpenAiCompletionClient {
    client: Client,
    config: ModelClientConfig,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(config: ModelClientConfig) -> Result<Self, PredictionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PredictionError::ServiceUnavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn complete(&self, prompt: &PromptPair) -> Result<String, PredictionError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": 0,
            "max_tokens": self.config.max_tokens,
            "stream": false,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Risk model request failed: {}", e);
                if e.is_timeout() {
                    PredictionError::ServiceUnavailable("Risk model request timed out".to_string())
                } else {
                    PredictionError::ServiceUnavailable("Risk model endpoint unreachable".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Risk model returned status {}", status);
            return Err(PredictionError::ServiceUnavailable(format!(
                "Risk model returned status {}",
                status.as_u16()
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Undecodable completion payload: {}", e);
            PredictionError::InvalidResponse("Completion payload could not be decoded".to_string())
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PredictionError::InvalidResponse("Completion contained no message".to_string()))
    }

    fn describe(&self) -> String {
        format!("{} via {}", self.config.model, self.config.base_url)
    }
}

/// Turns a feature record into a validated risk assessment
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn assess(&self, features: &PatientFeatureRecord) -> Result<ParsedModelResponse, PredictionError>;
}

/// Calls the completion backend under a timeout and parses its reply.
///
/// Single attempt per call; retries are left to the caller.
pub struct RiskModelClient {
    backend: Arc<dyn CompletionBackend>,
    timeout: Duration,
}

impl RiskModelClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }
}

#[async_trait]
impl RiskAssessor for RiskModelClient {
    #[instrument(skip(self, features), fields(age = features.age))]
    async fn assess(&self, features: &PatientFeatureRecord) -> Result<ParsedModelResponse, PredictionError> {
        let prompt = build_prompt(features)?;

        let raw = tokio::time::timeout(self.timeout, self.backend.complete(&prompt))
            .await
            .map_err(|_| {
                warn!("Risk model did not answer within {:?}", self.timeout);
                PredictionError::ServiceUnavailable("Risk model request timed out".to_string())
            })??;

        debug!("Risk model replied with {} characters", raw.len());
        parse_model_reply(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    risk_level: String,
    predicted_conditions: Vec<String>,
    recommendations: Vec<String>,
    confidence_score: f64,
    next_checkup_date: String,
    lifestyle_changes: Vec<String>,
    medication_suggestions: Vec<String>,
}

/// Cut the JSON object out of a reply that may carry code fences or commentary
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Validate a raw model reply into a `ParsedModelResponse`.
///
/// All seven contract fields must be present; extra keys are ignored.
/// Unknown risk labels become `Low` with a warning. A confidence score on the
/// 0–100 scale is brought down to 0–1; anything else outside 0–1 is rejected.
/// Error messages never include the reply text.
pub fn parse_model_reply(raw: &str) -> Result<ParsedModelResponse, PredictionError> {
    let unfenced = raw.replace("```json", "").replace("```", "");
    let json = extract_json_object(&unfenced)
        .ok_or_else(|| PredictionError::InvalidResponse("No JSON object in model reply".to_string()))?;

    let reply: ModelReply = serde_json::from_str(json).map_err(|e| {
        PredictionError::InvalidResponse(format!(
            "Model reply does not match the expected schema (line {}, column {})",
            e.line(),
            e.column()
        ))
    })?;

    let risk_level = RiskLevel::from_label(&reply.risk_level).unwrap_or_else(|| {
        warn!("Unrecognized risk level '{}', defaulting to low", reply.risk_level);
        RiskLevel::Low
    });

    Ok(ParsedModelResponse {
        risk_level,
        predicted_conditions: reply.predicted_conditions,
        recommendations: reply.recommendations,
        confidence_score: normalize_confidence(reply.confidence_score)?,
        next_checkup_date: Some(reply.next_checkup_date.trim().to_string()).filter(|d| !d.is_empty()),
        lifestyle_changes: reply.lifestyle_changes,
        medication_suggestions: reply.medication_suggestions,
    })
}

fn normalize_confidence(score: f64) -> Result<f64, PredictionError> {
    if !score.is_finite() {
        return Err(PredictionError::InvalidResponse("confidence_score is not a number".to_string()));
    }
    if (0.0..=1.0).contains(&score) {
        return Ok(score);
    }
    if score > 1.0 && score <= 100.0 {
        warn!("confidence_score {} looks like a percentage, scaling to 0-1", score);
        return Ok(score / 100.0);
    }
    Err(PredictionError::InvalidResponse(format!("confidence_score {} out of range", score)))
}

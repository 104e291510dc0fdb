use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::{info, instrument, warn};

use clinical_risk_domain::entities::{AuthenticatedUser, PredictionListFilter};
use clinical_risk_domain::services::PredictionServiceTrait;

use crate::entities::common::ErrorResponse;
use crate::entities::prediction::{
    PredictionListQuery, PublicPredictionSummary, PublicRiskPrediction, ReviewPredictionRequest,
    UpdatePredictionRequest,
};

/// Service type for dependency injection
pub type PredictionServiceHandle = Arc<dyn PredictionServiceTrait + Send + Sync>;

/// Path identifiers are integers; anything else is rejected before the service runs
fn parse_id(raw: &str, name: &str) -> Result<i64, ErrorResponse> {
    raw.trim().parse::<i64>().map_err(|_| {
        warn!("Rejected non-numeric {}: {}", name, raw);
        ErrorResponse::invalid_input(format!("{} must be a positive integer", name))
    })
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ErrorResponse> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ErrorResponse::invalid_input(rejection.body_text()))
}

/// Generate a risk prediction for a patient
#[utoipa::path(
    post,
    path = "/api/v1/predictions/generate/{patient_id}",
    params(
        ("patient_id" = i64, Path, description = "Patient ID")
    ),
    responses(
        (status = 201, description = "Prediction generated and stored", body = PublicRiskPrediction),
        (status = 400, description = "Invalid patient ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller role may not generate predictions", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
        (status = 502, description = "Risk model returned an unusable response", body = ErrorResponse),
        (status = 503, description = "Risk model unavailable", body = ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "predictions"
)]
#[instrument(skip(service, user), fields(user_id = user.id))]
pub async fn generate_prediction(
    State(service): State<PredictionServiceHandle>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(patient_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let patient_id = parse_id(&patient_id, "patient_id")?;
    info!("Generating prediction for patient {}", patient_id);

    let prediction = service.generate(patient_id, &user).await?;
    Ok((StatusCode::CREATED, Json(PublicRiskPrediction::from(prediction))))
}

/// List predictions across patients, most recently updated first
#[utoipa::path(
    get,
    path = "/api/v1/predictions",
    params(PredictionListQuery),
    responses(
        (status = 200, description = "Matching predictions with patient names", body = [PublicPredictionSummary]),
        (status = 400, description = "Unknown risk level or malformed query", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller role may not read predictions", body = ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "predictions"
)]
#[instrument(skip(service, user, query), fields(user_id = user.id))]
pub async fn list_predictions(
    State(service): State<PredictionServiceHandle>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<PredictionListQuery>, QueryRejection>,
) -> Result<Json<Vec<PublicPredictionSummary>>, ErrorResponse> {
    let Query(query) = query.map_err(|rejection| ErrorResponse::invalid_input(rejection.body_text()))?;
    let filter = PredictionListFilter::try_from(query).map_err(ErrorResponse::invalid_input)?;

    let summaries = service.list_predictions(filter, &user).await?;
    Ok(Json(summaries.into_iter().map(PublicPredictionSummary::from).collect()))
}

/// List a patient's predictions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/predictions/patient/{patient_id}",
    params(
        ("patient_id" = i64, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Predictions for the patient", body = [PublicRiskPrediction]),
        (status = 400, description = "Invalid patient ID", body = ErrorResponse),
        (status = 403, description = "Caller role may not read predictions", body = ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "predictions"
)]
#[instrument(skip(service, user), fields(user_id = user.id))]
pub async fn list_patient_predictions(
    State(service): State<PredictionServiceHandle>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<PublicRiskPrediction>>, ErrorResponse> {
    let patient_id = parse_id(&patient_id, "patient_id")?;

    let predictions = service.list_for_patient(patient_id, &user).await?;
    Ok(Json(predictions.into_iter().map(PublicRiskPrediction::from).collect()))
}

/// Get a single prediction
#[utoipa::path(
    get,
    path = "/api/v1/predictions/{prediction_id}",
    params(
        ("prediction_id" = i64, Path, description = "Prediction ID")
    ),
    responses(
        (status = 200, description = "Prediction found", body = PublicRiskPrediction),
        (status = 400, description = "Invalid prediction ID", body = ErrorResponse),
        (status = 403, description = "Caller role may not read predictions", body = ErrorResponse),
        (status = 404, description = "Prediction not found", body = ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "predictions"
)]
#[instrument(skip(service, user), fields(user_id = user.id))]
pub async fn get_prediction(
    State(service): State<PredictionServiceHandle>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(prediction_id): Path<String>,
) -> Result<Json<PublicRiskPrediction>, ErrorResponse> {
    let prediction_id = parse_id(&prediction_id, "prediction_id")?;

    let prediction = service.get_prediction(prediction_id, &user).await?;
    Ok(Json(prediction.into()))
}

/// Mark a prediction as reviewed by the caller
#[utoipa::path(
    patch,
    path = "/api/v1/predictions/{prediction_id}/review",
    params(
        ("prediction_id" = i64, Path, description = "Prediction ID")
    ),
    request_body = ReviewPredictionRequest,
    responses(
        (status = 200, description = "Review state recorded", body = PublicRiskPrediction),
        (status = 400, description = "Invalid ID or attempt to un-review", body = ErrorResponse),
        (status = 403, description = "Caller role may not review predictions", body = ErrorResponse),
        (status = 404, description = "Prediction not found", body = ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "predictions"
)]
#[instrument(skip(service, user, payload), fields(user_id = user.id))]
pub async fn review_prediction(
    State(service): State<PredictionServiceHandle>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(prediction_id): Path<String>,
    payload: Result<Json<ReviewPredictionRequest>, JsonRejection>,
) -> Result<Json<PublicRiskPrediction>, ErrorResponse> {
    let prediction_id = parse_id(&prediction_id, "prediction_id")?;
    let request = json_body(payload)?;

    let prediction = service.review(prediction_id, user.id, request.is_reviewed, &user).await?;
    Ok(Json(prediction.into()))
}

/// Update prediction fields
#[utoipa::path(
    put,
    path = "/api/v1/predictions/{prediction_id}",
    params(
        ("prediction_id" = i64, Path, description = "Prediction ID")
    ),
    request_body = UpdatePredictionRequest,
    responses(
        (status = 200, description = "Prediction updated", body = PublicRiskPrediction),
        (status = 400, description = "Invalid ID or field values", body = ErrorResponse),
        (status = 403, description = "Caller role may not update predictions", body = ErrorResponse),
        (status = 404, description = "Prediction not found", body = ErrorResponse),
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "predictions"
)]
#[instrument(skip(service, user, payload), fields(user_id = user.id))]
pub async fn update_prediction(
    State(service): State<PredictionServiceHandle>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(prediction_id): Path<String>,
    payload: Result<Json<UpdatePredictionRequest>, JsonRejection>,
) -> Result<Json<PublicRiskPrediction>, ErrorResponse> {
    let prediction_id = parse_id(&prediction_id, "prediction_id")?;
    let request = json_body(payload)?;

    let prediction = service.update_prediction(prediction_id, request.into(), &user).await?;
    Ok(Json(prediction.into()))
}

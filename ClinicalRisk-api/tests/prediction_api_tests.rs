use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use clinical_risk_api::api::create_app;
use clinical_risk_domain::auth::token::{generate_token, TokenSettings};
use clinical_risk_domain::entities::{MetricValues, UserRole};
use clinical_risk_domain::health::ComponentStatus;
use clinical_risk_domain::testing::{InMemoryPipeline, MockHealthService, StubCompletionBackend, HIGH_RISK_REPLY};

const SECRET: &str = "integration-test-secret-with-enough-length";
const ISSUER: &str = "ClinicalRisk-api";
const DOCTOR_ID: i64 = 42;

struct TestApp {
    router: Router,
    pipeline: InMemoryPipeline,
    tokens: Arc<TokenSettings>,
}

impl TestApp {
    fn new(backend: StubCompletionBackend) -> Self {
        Self::with_health(backend, MockHealthService::healthy())
    }

    fn with_health(backend: StubCompletionBackend, health: MockHealthService) -> Self {
        let pipeline = InMemoryPipeline::new(backend);
        let tokens = Arc::new(TokenSettings::new(SECRET, ISSUER, chrono::Duration::minutes(15)));
        let router = create_app(pipeline.service.clone(), tokens.clone(), Arc::new(health));

        Self { router, pipeline, tokens }
    }

    fn token(&self, user_id: i64, role: UserRole) -> String {
        generate_token(&self.tokens, user_id, role).unwrap()
    }

    async fn seed_high_risk_patient(&self) -> i64 {
        let patient_id = self.pipeline.seed_patient("1970-03-15", "female").await.unwrap();
        self.pipeline
            .seed_metric(
                patient_id,
                "blood_sugar",
                MetricValues { hba1c: Some(7.2), ..Default::default() },
                3,
            )
            .await
            .unwrap();
        self.pipeline
            .seed_metric(
                patient_id,
                "anthropometric",
                MetricValues { weight_kg: Some(88.0), bmi: Some(31.4), ..Default::default() },
                5,
            )
            .await
            .unwrap();
        patient_id
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }
}

#[tokio::test]
async fn test_health_endpoint_is_public() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));

    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unhealthy_dependencies_report_error() {
    let app = TestApp::with_health(
        StubCompletionBackend::replying(HIGH_RISK_REPLY),
        MockHealthService::with_status(ComponentStatus::Unhealthy),
    );

    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));

    let (status, body) = app.send(Method::POST, "/api/v1/predictions/generate/1", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(app.pipeline.backend.calls(), 0);
}

#[tokio::test]
async fn test_patient_role_cannot_generate() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let patient_id = app.seed_high_risk_patient().await;
    let token = app.token(7, UserRole::Patient);

    let uri = format!("/api/v1/predictions/generate/{}", patient_id);
    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert_eq!(app.pipeline.backend.calls(), 0);

    let list_uri = format!("/api/v1/predictions/patient/{}", patient_id);
    let (status, _) = app.send(Method::GET, &list_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_generate_list_get_and_review() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let patient_id = app.seed_high_risk_patient().await;
    let token = app.token(DOCTOR_ID, UserRole::Doctor);

    let uri = format!("/api/v1/predictions/generate/{}", patient_id);
    let (status, created) = app.send(Method::POST, &uri, Some(&token), None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["patient_id"], patient_id);
    assert_eq!(created["prediction_type"], "health_risk_assessment");
    assert_eq!(created["risk_level"], "HIGH");
    assert!((created["risk_percentage"].as_f64().unwrap() - 90.0).abs() < 1e-9);
    assert_eq!(created["is_alert"], true);
    assert_eq!(created["is_reviewed"], false);
    assert!(created.get("reviewed_by").is_none());
    assert_eq!(created["factors"], json!(["type 2 diabetes", "obesity"]));
    assert_eq!(app.pipeline.backend.calls(), 1);

    let prediction_id = created["id"].as_i64().unwrap();

    let list_uri = format!("/api/v1/predictions/patient/{}", patient_id);
    let (status, listed) = app.send(Method::GET, &list_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(|items| items.len()), Some(1));
    assert_eq!(listed[0]["id"], prediction_id);

    let get_uri = format!("/api/v1/predictions/{}", prediction_id);
    let (status, fetched) = app.send(Method::GET, &get_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["explanation"], created["explanation"]);

    let review_uri = format!("/api/v1/predictions/{}/review", prediction_id);
    let (status, reviewed) = app
        .send(Method::PATCH, &review_uri, Some(&token), Some(json!({ "is_reviewed": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["is_reviewed"], true);
    assert_eq!(reviewed["reviewed_by"], DOCTOR_ID);

    let (status, body) = app
        .send(Method::PATCH, &review_uri, Some(&token), Some(json!({ "is_reviewed": false })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_official_can_update_prediction() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let patient_id = app.seed_high_risk_patient().await;
    let doctor = app.token(DOCTOR_ID, UserRole::Doctor);
    let official = app.token(3, UserRole::Official);

    let uri = format!("/api/v1/predictions/generate/{}", patient_id);
    let (_, created) = app.send(Method::POST, &uri, Some(&doctor), None).await;
    let prediction_id = created["id"].as_i64().unwrap();

    let update_uri = format!("/api/v1/predictions/{}", prediction_id);
    let (status, updated) = app
        .send(Method::PUT, &update_uri, Some(&official), Some(json!({ "risk_level": "MODERATE" })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["risk_level"], "MODERATE");
    assert_eq!(updated["is_alert"], false);

    let (status, body) = app
        .send(Method::PUT, &update_uri, Some(&official), Some(json!({ "is_reviewed": true })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_non_numeric_id_is_rejected() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let token = app.token(DOCTOR_ID, UserRole::Doctor);

    let (status, body) = app
        .send(Method::POST, "/api/v1/predictions/generate/abc", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(app.pipeline.backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_patient_and_prediction_are_not_found() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let token = app.token(DOCTOR_ID, UserRole::Doctor);

    let (status, body) = app
        .send(Method::POST, "/api/v1/predictions/generate/999", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(app.pipeline.backend.calls(), 0);

    let (status, _) = app.send(Method::GET, "/api/v1/predictions/999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unusable_model_reply_is_bad_gateway() {
    let raw_reply = "I am unable to assess this patient SECRET-MARKER";
    let app = TestApp::new(StubCompletionBackend::replying(raw_reply));
    let patient_id = app.seed_high_risk_patient().await;
    let token = app.token(DOCTOR_ID, UserRole::Doctor);

    let uri = format!("/api/v1/predictions/generate/{}", patient_id);
    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "invalid_response");
    assert!(!body.to_string().contains("SECRET-MARKER"));

    let list_uri = format!("/api/v1/predictions/patient/{}", patient_id);
    let (_, listed) = app.send(Method::GET, &list_uri, Some(&token), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_unavailable_model_is_service_unavailable() {
    let app = TestApp::new(StubCompletionBackend::unavailable());
    let patient_id = app.seed_high_risk_patient().await;
    let token = app.token(DOCTOR_ID, UserRole::Doctor);

    let uri = format!("/api/v1/predictions/generate/{}", patient_id);
    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
}

#[tokio::test]
async fn test_auth_info_reports_caller() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let token = app.token(DOCTOR_ID, UserRole::Doctor);

    let (status, body) = app.send(Method::GET, "/api/v1/auth/info", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], DOCTOR_ID);
    assert_eq!(body["role"], "doctor");
    assert_eq!(body["can_manage_predictions"], true);
}

#[tokio::test]
async fn test_listing_filters_across_patients() {
    let app = TestApp::new(StubCompletionBackend::replying(HIGH_RISK_REPLY));
    let doctor = app.token(DOCTOR_ID, UserRole::Doctor);
    let official = app.token(3, UserRole::Official);

    let first = app.pipeline.seed_named_patient("Mei", "Tanaka", "1958-06-02", "female").await.unwrap();
    let second = app.pipeline.seed_named_patient("Tomas", "Okafor", "1981-01-20", "male").await.unwrap();

    let (_, a) = app
        .send(Method::POST, &format!("/api/v1/predictions/generate/{}", first), Some(&doctor), None)
        .await;
    let (_, b) = app
        .send(Method::POST, &format!("/api/v1/predictions/generate/{}", second), Some(&doctor), None)
        .await;

    // Downgrading b also makes it the most recently updated
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/predictions/{}", b["id"]),
            Some(&official),
            Some(json!({ "risk_level": "LOW" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = app.send(Method::GET, "/api/v1/predictions", Some(&doctor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["id"], b["id"]);
    assert_eq!(listed[0]["patient_name"], "Okafor, Tomas");
    assert_eq!(listed[1]["id"], a["id"]);
    assert_eq!(listed[1]["patient_name"], "Tanaka, Mei");

    let (_, high) = app
        .send(Method::GET, "/api/v1/predictions?risk_level=HIGH&prediction_type=all", Some(&doctor), None)
        .await;
    assert_eq!(high.as_array().map(|items| items.len()), Some(1));
    assert_eq!(high[0]["id"], a["id"]);
    assert_eq!(high[0]["risk_level"], "HIGH");

    let (_, searched) = app.send(Method::GET, "/api/v1/predictions?search=okaf", Some(&doctor), None).await;
    assert_eq!(searched.as_array().map(|items| items.len()), Some(1));
    assert_eq!(searched[0]["patient_id"], second);

    let (_, none) = app
        .send(Method::GET, "/api/v1/predictions?prediction_type=screening", Some(&doctor), None)
        .await;
    assert_eq!(none, json!([]));

    let (status, body) = app
        .send(Method::GET, "/api/v1/predictions?risk_level=severe", Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let patient = app.token(7, UserRole::Patient);
    let (status, _) = app.send(Method::GET, "/api/v1/predictions", Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

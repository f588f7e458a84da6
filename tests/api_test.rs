mod common;

use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use tempfile::tempdir;

use optigrade::api::configure;
use optigrade::model::UNAVAILABLE_MESSAGE;
use optigrade::recommendation::{CannedRecommendations, RecommendationError, RecommendationProvider};
use optigrade::{Forecaster, PolicyKind, Predictor};

struct FailingProvider;

impl RecommendationProvider for FailingProvider {
    fn generate(&self, _prompt: &str) -> Result<String, RecommendationError> {
        Err(RecommendationError::Provider("quota exceeded".to_string()))
    }
}

fn ready(policy: PolicyKind) -> web::Data<Forecaster> {
    web::Data::new(Forecaster::new(common::trained_model().into(), policy))
}

fn disabled() -> web::Data<Forecaster> {
    let dir = tempdir().unwrap();
    web::Data::new(Forecaster::new(
        Predictor::load(dir.path().join("missing.json")),
        PolicyKind::ZeroFill,
    ))
}

fn canned() -> web::Data<dyn RecommendationProvider> {
    let provider: Arc<dyn RecommendationProvider> = Arc::new(CannedRecommendations);
    web::Data::from(provider)
}

macro_rules! service {
    ($forecaster:expr) => {
        service!($forecaster, canned())
    };
    ($forecaster:expr, $provider:expr) => {
        test::init_service(
            App::new()
                .app_data($forecaster)
                .app_data($provider)
                .configure(configure),
        )
        .await
    };
}

fn scenario_body() -> Value {
    json!({
        "input": {
            "Current GPA": 3.4,
            "Attendance %": 80,
            "Study Hours per Week": "10",
            "Assignments Completed": 85,
            "Midterm Score": 75,
            "Lecture Engagement": 80
        },
        "current_cgpa": 3.4
    })
}

#[actix_web::test]
async fn health_check_responds() {
    let app = service!(disabled());
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn predict_returns_report() {
    let app = service!(ready(PolicyKind::ZeroFill));
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(scenario_body())
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;

    let display = body["display_cgpa"].as_f64().unwrap();
    assert!((0.0..=5.0).contains(&display));
    assert_eq!(body["previous_cgpa"], json!(3.4));
    assert_eq!(
        body["features"]["vector"],
        json!({
            "GPA_last_semester": 3.4,
            "credit_load": 85.0,
            "current_CGPA": 3.4,
            "study_hours": 10.0,
            "attendance": 80.0,
            "engagement": 80.0,
            "midterm_score": 75.0
        })
    );
    assert_eq!(body["features"]["defaulted"], json!([]));
}

#[actix_web::test]
async fn predict_treats_non_numeric_values_as_zero() {
    let app = service!(ready(PolicyKind::ZeroFill));
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({ "input": { "Attendance %": true, "Current GPA": 3.4 } }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["features"]["vector"]["attendance"], json!(0.0));
    assert_eq!(body["features"]["vector"]["current_CGPA"], json!(3.4));
}

#[actix_web::test]
async fn predict_is_unavailable_without_a_model() {
    let app = service!(disabled());
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(scenario_body())
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!(UNAVAILABLE_MESSAGE));
}

#[actix_web::test]
async fn reject_policy_reports_missing_fields() {
    let app = service!(ready(PolicyKind::Reject));
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({ "input": { "Current GPA": 3.4 } }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("study_hours"));
}

#[actix_web::test]
async fn model_info_reflects_predictor_state() {
    let app = service!(disabled());
    let req = test::TestRequest::get().uri("/model/info").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["available"], json!(false));
    assert_eq!(body["feature_names"], json!([]));

    let app = service!(ready(PolicyKind::ImputeMean));
    let req = test::TestRequest::get().uri("/model/info").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["available"], json!(true));
    assert_eq!(body["format"], json!("enveloped"));
    assert_eq!(body["missing_feature_policy"], json!("impute_mean"));
    assert_eq!(body["feature_names"].as_array().unwrap().len(), 7);
}

#[actix_web::test]
async fn wizard_forecasts_on_the_results_page() {
    let app = service!(ready(PolicyKind::ZeroFill));

    let req = test::TestRequest::post()
        .uri("/wizard")
        .set_json(json!({
            "event": {
                "type": "submit_previous_semester",
                "courses": [{
                    "course_id": "MATH101",
                    "grade": 72,
                    "study_hours": 12,
                    "attendance": 90,
                    "course_units": 3
                }],
                "semester_gpa": 3.1,
                "current_cgpa": 3.3
            }
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"]["page"], json!("current_semester"));
    assert!(body["forecast"].is_null());

    let req = test::TestRequest::post()
        .uri("/wizard")
        .set_json(json!({
            "state": body["state"],
            "event": {
                "type": "submit_current_semester",
                "courses": [{ "course_id": "CSC201", "course_units": 4 }]
            }
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"]["page"], json!("results"));
    assert_eq!(body["forecast"]["previous_cgpa"], json!(3.3));
    assert_eq!(body["forecast"]["features"]["vector"]["GPA_last_semester"], json!(3.1));
}

#[actix_web::test]
async fn wizard_without_model_carries_the_message() {
    let app = service!(disabled());
    let state = json!({
        "page": "current_semester",
        "previous_courses": []
    });
    let req = test::TestRequest::post()
        .uri("/wizard")
        .set_json(json!({
            "state": state,
            "event": {
                "type": "submit_current_semester",
                "courses": [{ "course_id": "CSC201", "course_units": 4 }]
            }
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"]["page"], json!("results"));
    assert!(body["forecast"].is_null());
    assert_eq!(body["message"], json!(UNAVAILABLE_MESSAGE));
}

#[actix_web::test]
async fn recommendations_fall_back_to_apology() {
    let provider: Arc<dyn RecommendationProvider> = Arc::new(FailingProvider);
    let app = service!(disabled(), web::Data::from(provider));
    let req = test::TestRequest::post()
        .uri("/recommendations")
        .set_json(json!({
            "name": "Tolu John",
            "id": "1",
            "current_cgpa": 3.4,
            "courses": [{ "course_id": "CSC201", "course_units": 4 }]
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["recommendations"],
        json!(optigrade::recommendation::APOLOGY)
    );
}

#[actix_web::test]
async fn recommendations_use_the_provider() {
    let app = service!(disabled());
    let req = test::TestRequest::post()
        .uri("/recommendations")
        .set_json(json!({
            "name": "Tolu John",
            "id": "1",
            "current_cgpa": 3.4,
            "courses": []
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    let text = body["recommendations"].as_str().unwrap();
    assert!(!text.is_empty());
    assert_ne!(text, optigrade::recommendation::APOLOGY);
}

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::OptiGradeError;
use crate::features::{PolicyKind, RawStudentInput, SessionContext};
use crate::forecast::{ForecastReport, Forecaster};
use crate::model::{ArtifactFormat, TrainingMetrics, UNAVAILABLE_MESSAGE};
use crate::recommendation::{recommend, RecommendationProvider, StudentSummary};
use crate::session::{apply, AppState, Event, WizardPage};

#[derive(Deserialize)]
pub struct PredictRequest {
    pub input: RawStudentInput,
    #[serde(default)]
    pub last_semester_gpa: Option<f64>,
    #[serde(default)]
    pub current_cgpa: Option<f64>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ModelInfo<'a> {
    available: bool,
    format: Option<ArtifactFormat>,
    feature_names: &'a [String],
    missing_feature_policy: PolicyKind,
    metrics: Option<&'a TrainingMetrics>,
    reason: Option<&'a str>,
}

#[derive(Deserialize)]
pub struct WizardRequest {
    #[serde(default)]
    pub state: AppState,
    pub event: Event,
}

#[derive(Serialize)]
struct WizardResponse {
    state: AppState,
    forecast: Option<ForecastReport>,
    message: Option<String>,
}

#[derive(Serialize)]
struct RecommendationResponse {
    recommendations: String,
}

fn error_response(err: &OptiGradeError) -> HttpResponse {
    match err {
        OptiGradeError::Unavailable(reason) => {
            warn!("Prediction requested while disabled: {}", reason);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: UNAVAILABLE_MESSAGE.to_string(),
            })
        }
        OptiGradeError::Mapping(e) => HttpResponse::UnprocessableEntity().json(ErrorResponse { error: e.to_string() }),
        other => HttpResponse::InternalServerError().json(ErrorResponse {
            error: other.to_string(),
        }),
    }
}

async fn predict(req: web::Json<PredictRequest>, forecaster: web::Data<Forecaster>) -> HttpResponse {
    let context = SessionContext {
        last_semester_gpa: req.last_semester_gpa,
        current_cgpa: req.current_cgpa,
    };

    match forecaster.forecast(&req.input, &context) {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => error_response(&e),
    }
}

// Client holds the state; each call applies one event.
async fn wizard(req: web::Json<WizardRequest>, forecaster: web::Data<Forecaster>) -> HttpResponse {
    let WizardRequest { state, event } = req.into_inner();
    let state = apply(state, event);

    let (forecast, message) = if state.page == WizardPage::Results {
        match forecaster.forecast(&state.raw_input(), &state.context()) {
            Ok(report) => (Some(report), None),
            Err(OptiGradeError::Unavailable(_)) => (None, Some(UNAVAILABLE_MESSAGE.to_string())),
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        (None, None)
    };

    HttpResponse::Ok().json(WizardResponse {
        state,
        forecast,
        message,
    })
}

async fn recommendations(
    req: web::Json<StudentSummary>,
    provider: web::Data<dyn RecommendationProvider>,
) -> HttpResponse {
    let text = recommend(provider.get_ref(), &req);
    HttpResponse::Ok().json(RecommendationResponse { recommendations: text })
}

async fn get_model_info(forecaster: web::Data<Forecaster>) -> HttpResponse {
    let predictor = forecaster.predictor();
    let model = predictor.model();

    HttpResponse::Ok().json(ModelInfo {
        available: predictor.is_available(),
        format: model.map(|m| m.format()),
        feature_names: predictor.feature_names(),
        missing_feature_policy: forecaster.policy_kind(),
        metrics: model.and_then(|m| m.metrics()),
        reason: predictor.unavailable_reason(),
    })
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("OptiGrade CGPA Forecaster API is running!")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/model/info", web::get().to(get_model_info))
        .route("/predict", web::post().to(predict))
        .route("/wizard", web::post().to(wizard))
        .route("/recommendations", web::post().to(recommendations));
}

pub async fn start_api(
    host: &str,
    port: u16,
    forecaster: Forecaster,
    provider: Arc<dyn RecommendationProvider>,
) -> std::io::Result<()> {
    let forecaster = web::Data::new(forecaster);
    let provider: web::Data<dyn RecommendationProvider> = web::Data::from(provider);

    info!("Starting OptiGrade API on http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .app_data(forecaster.clone())
            .app_data(provider.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}

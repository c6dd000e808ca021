//! # API REST
//!
//! REST API for no-show prediction.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON rejections, status codes, CORS)
//!
//! Uses `api-shared` for the wire types and `noshow-core` for everything else.

#![warn(rust_2018_idioms)]

use api_shared::{
    ErrorRes, GenerationStartRes, GenerationStatusRes, HealthRes, HealthService, PredictReq,
    PredictRes,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use noshow_core::{CoreError, PredictionError, PredictionService, ProcessController};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, Json<ErrorRes>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

/// Application state shared across REST handlers.
///
/// The prediction service is read-only and cloned freely. The process controller is mutable
/// and sits behind a mutex; its operations may block while a generator shuts down, so handlers
/// drive it from the blocking thread pool.
#[derive(Clone)]
pub struct AppState {
    pub prediction: PredictionService,
    pub controller: Arc<Mutex<ProcessController>>,
}

impl AppState {
    pub fn new(prediction: PredictionService, controller: ProcessController) -> Self {
        Self {
            prediction,
            controller: Arc::new(Mutex::new(controller)),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        predict,
        start_generation,
        stop_generation,
        generation_status
    ),
    components(schemas(
        HealthRes,
        PredictReq,
        PredictRes,
        ErrorRes,
        GenerationStartRes,
        GenerationStatusRes
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/generation/start", post(start_generation))
        .route("/generation/stop", post(stop_generation))
        .route("/generation/status", get(generation_status))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness check. Answers the same whether or not a model is loaded.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/predict",
    request_body = PredictReq,
    responses(
        (status = 200, description = "No-show prediction", body = PredictRes),
        (status = 400, description = "Invalid request; the message names the field", body = ErrorRes),
        (status = 500, description = "Prediction failed inside the model", body = ErrorRes),
        (status = 503, description = "No model is loaded", body = ErrorRes)
    )
)]
/// Predict whether an appointment will be missed
///
/// Validates the appointment features and scores them with the model loaded at startup.
/// Categorical values the model has never seen are accepted.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictReq>, JsonRejection>,
) -> Result<Json<PredictRes>, ApiError> {
    let Json(req) =
        payload.map_err(|rejection| api_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    match state.prediction.predict(&req) {
        Ok(res) => Ok(Json(res)),
        Err(e @ PredictionError::BadRequest { .. }) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ PredictionError::ServiceUnavailable) => {
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
        Err(e @ PredictionError::Internal(_)) => {
            tracing::error!("Predict error: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/generation/start",
    responses(
        (status = 200, description = "Generation session started", body = GenerationStartRes),
        (status = 409, description = "A session is already active", body = ErrorRes),
        (status = 500, description = "The generator could not be launched", body = ErrorRes)
    )
)]
/// Start streaming synthetic appointments into the dataset
async fn start_generation(
    State(state): State<AppState>,
) -> Result<Json<GenerationStartRes>, ApiError> {
    let handle = with_controller(&state, |ctl| ctl.start()).await?;

    match handle {
        Ok(handle) => Ok(Json(GenerationStartRes {
            session_id: handle.to_string(),
        })),
        Err(e @ CoreError::GeneratorAlreadyActive) => {
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => {
            tracing::error!("Start generation error: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/generation/stop",
    responses(
        (status = 200, description = "Generation stopped (or was not running)", body = GenerationStatusRes)
    )
)]
/// Stop the active generation session, if any
async fn stop_generation(
    State(state): State<AppState>,
) -> Result<Json<GenerationStatusRes>, ApiError> {
    let res = with_controller(&state, |ctl| {
        ctl.stop_active();
        status_res(ctl)
    })
    .await?;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/generation/status",
    responses(
        (status = 200, description = "Current generation status", body = GenerationStatusRes)
    )
)]
/// Report whether a generation session is active
async fn generation_status(
    State(state): State<AppState>,
) -> Result<Json<GenerationStatusRes>, ApiError> {
    let res = with_controller(&state, |ctl| status_res(ctl)).await?;
    Ok(Json(res))
}

fn status_res(ctl: &ProcessController) -> GenerationStatusRes {
    let session = ctl.active_session();
    GenerationStatusRes {
        status: ctl.status().as_str().to_string(),
        session_id: session.map(|s| s.handle.to_string()),
        started_at: session.map(|s| s.started_at.to_rfc3339()),
    }
}

/// Runs `f` against the locked controller on the blocking pool.
async fn with_controller<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut ProcessController) -> T + Send + 'static,
{
    let controller = Arc::clone(&state.controller);
    tokio::task::spawn_blocking(move || -> Result<T, ApiError> {
        let mut ctl = controller.lock().map_err(|_| {
            tracing::error!("Process controller lock poisoned");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?;
        Ok(f(&mut *ctl))
    })
    .await
    .map_err(|e| {
        tracing::error!("Process controller task failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use noshow_core::training::train_on_records;
    use noshow_core::{GeneratorCommand, Synthesizer, TrainingConfig};
    use std::path::PathBuf;
    use std::sync::OnceLock;
    use std::time::Duration;
    use tower::ServiceExt;

    fn controller() -> ProcessController {
        ProcessController::new(GeneratorCommand::new(
            PathBuf::from("sleep"),
            vec!["30".into()],
        ))
        .with_grace_period(Duration::from_secs(2))
    }

    fn trained() -> PredictionService {
        static SERVICE: OnceLock<PredictionService> = OnceLock::new();
        SERVICE
            .get_or_init(|| {
                let records = Synthesizer::seeded(42).unwrap().generate(2_000, 1).unwrap();
                let report = train_on_records(&records, &TrainingConfig::default(), 42).unwrap();
                PredictionService::new(Arc::new(report.artifact))
            })
            .clone()
    }

    fn app(prediction: PredictionService) -> Router {
        router(AppState::new(prediction, controller()))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    const NEUTRAL: &str = r#"{
        "age": 45, "sex": "Femenino", "sector": "Norte", "coverage_tier": "Fonasa B",
        "specialty": "Medicina General", "weekday": "Lunes", "shift": "Mañana",
        "lead_time_days": 5, "prior_no_shows": 0
    }"#;

    #[tokio::test]
    async fn test_health_without_model() {
        for uri in ["/", "/health"] {
            let (status, json) = send(app(PredictionService::unavailable()), "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["ok"], true);
        }
    }

    #[tokio::test]
    async fn test_predict_without_model_is_503() {
        let (status, json) =
            send(app(PredictionService::unavailable()), "POST", "/predict", Some(NEUTRAL)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(json["error"].as_str().unwrap().contains("not available"));
    }

    #[tokio::test]
    async fn test_predict_with_model() {
        let (status, json) = send(app(trained()), "POST", "/predict", Some(NEUTRAL)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["label"] == 0 || json["label"] == 1);
        let p = json["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[tokio::test]
    async fn test_predict_unknown_sector_is_ok() {
        let body = NEUTRAL.replace("Norte", "UnknownZone");
        let (status, _) = send(app(trained()), "POST", "/predict", Some(&body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_bad_requests_are_400() {
        let body = NEUTRAL.replace("\"age\": 45", "\"age\": 130");
        let (status, json) = send(app(trained()), "POST", "/predict", Some(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("age"));

        let body = NEUTRAL.replace("\"shift\": \"Mañana\",", "");
        let (status, json) = send(app(trained()), "POST", "/predict", Some(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("shift"));

        let (status, _) = send(app(trained()), "POST", "/predict", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generation_stop_when_inactive() {
        let (status, json) =
            send(app(PredictionService::unavailable()), "POST", "/generation/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "inactive");
        assert!(json["session_id"].is_null());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generation_lifecycle() {
        let app = app(PredictionService::unavailable());

        let (status, json) = send(app.clone(), "POST", "/generation/start", None).await;
        assert_eq!(status, StatusCode::OK);
        let session_id = json["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(app.clone(), "POST", "/generation/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, json) = send(app.clone(), "GET", "/generation/status", None).await;
        assert_eq!(json["status"], "active");
        assert_eq!(json["session_id"], session_id.as_str());
        assert!(json["started_at"].is_string());

        let (status, json) = send(app.clone(), "POST", "/generation/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "inactive");

        let (_, json) = send(app, "GET", "/generation/status", None).await;
        assert_eq!(json["status"], "inactive");
    }
}

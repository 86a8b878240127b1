use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{ApiError, GenerationError},
    gateway::Gateway,
    models::{
        AskAiRequest, GenerateCourseRequest, GenerateImageRequest, GenerateProblemRequest,
        GenerateQuizExamRequest, Generated, GenerationMetadata,
    },
};

const GENERATION_TIME: HeaderName = HeaderName::from_static("x-generation-time");

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub development: bool,
}

impl AppState {
    fn fail(&self, error: GenerationError) -> ApiError {
        if error.status_code().is_server_error() {
            tracing::error!(kind = error.kind(), error = %error, "❌ Generation failed");
        } else {
            tracing::warn!(kind = error.kind(), error = %error, "Rejected request");
        }
        ApiError { error, expose_details: self.development }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-course", post(generate_course))
        .route("/api/generate-problem", post(generate_problem).get(problem_service_info))
        .route("/api/generate-quiz-exam", post(generate_quiz_exam))
        .route("/api/get-ask-ai", post(ask_ai))
        .route("/api/generate-image", post(generate_image))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    data: T,
    metadata: GenerationMetadata,
}

fn body<T: DeserializeOwned>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GenerationError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|e| GenerationError::invalid(format!("Invalid JSON in request body: {}", e.body_text())))
}

fn generated<T: Serialize>(generated: Generated<T>) -> Response {
    let elapsed = generated.metadata.generation_time.clone();
    (
        [(header::CACHE_CONTROL, "no-store".to_string()), (GENERATION_TIME, elapsed)],
        Json(Success { success: true, data: generated.data, metadata: generated.metadata }),
    )
        .into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub async fn generate_course(
    State(state): State<AppState>,
    payload: Result<Json<GenerateCourseRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload).map_err(|e| state.fail(e))?;
    tracing::info!("🚀 Generating course: {:?}", request.name);
    let course = state.gateway.generate_course(request).await.map_err(|e| state.fail(e))?;
    tracing::info!("✅ Course {} generated with {} chapters", course.data.course_id, course.data.chapters.len());
    Ok(generated(course))
}

pub async fn generate_problem(
    State(state): State<AppState>,
    payload: Result<Json<GenerateProblemRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload).map_err(|e| state.fail(e))?;
    let problem = state.gateway.generate_problem(request).await.map_err(|e| state.fail(e))?;
    tracing::info!("✅ Problem '{}' generated in {}", problem.data.title, problem.metadata.generation_time);
    Ok(generated(problem))
}

pub async fn generate_quiz_exam(
    State(state): State<AppState>,
    payload: Result<Json<GenerateQuizExamRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload).map_err(|e| state.fail(e))?;
    let questions = state.gateway.generate_quiz_exam(request).await.map_err(|e| state.fail(e))?;
    tracing::info!(
        "✅ Generated {} quiz and {} exam questions in {}",
        questions.data.quiz.len(),
        questions.data.exam.len(),
        questions.metadata.generation_time
    );
    Ok(generated(questions))
}

pub async fn ask_ai(
    State(state): State<AppState>,
    payload: Result<Json<AskAiRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload).map_err(|e| state.fail(e))?;
    let reply = state.gateway.ask_ai(request).await.map_err(|e| state.fail(e))?;
    tracing::info!(model = %reply.model, chars = reply.text.chars().count(), "✅ Ask-AI answered");
    Ok(Json(json!({ "success": true, "text": reply.text })).into_response())
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload).map_err(|e| state.fail(e))?;
    let image = state.gateway.generate_image(request).await.map_err(|e| state.fail(e))?;
    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({ "success": true, "image": image })),
    )
        .into_response())
}

pub async fn problem_service_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "Problem Generator API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": { "generate": "POST /api/generate-problem" },
        "models": state.gateway.models(),
    }))
}

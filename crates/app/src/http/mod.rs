//! Axum HTTP binding of the course services.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/health` | Health check |
//! | GET | `/api/modules` | Module catalog |
//! | GET | `/api/modules/{moduleId}/lessons` | Lessons of one module |
//! | GET | `/api/quizzes/{quizId}` | Quiz without answers |
//! | POST | `/api/quizzes/{quizId}/submit` | Grade and record an attempt |
//! | GET | `/api/scenarios/{scenarioId}` | Scenario definition |
//! | POST | `/api/scenarios/{scenarioId}/start` | Initial step of a fresh run |
//! | POST | `/api/scenarios/{scenarioId}/choice` | Client-driven step |
//! | POST | `/api/scenarios/{scenarioId}/sessions` | Open a server-held run |
//! | POST | `/api/scenario-sessions/{sessionId}/choice` | Server-held step |
//! | GET | `/api/progress` | Raw progress document |
//! | GET | `/api/progress/summary` | Derived progress report |
//! | GET | `/api/progress/badges` | Earned badge ids |
//! | POST | `/api/progress/lesson-complete` | Mark a lesson done |
//! | POST | `/api/progress/reset` | Discard all progress |
//! | GET | `/api/glossary` | Glossary document |
//! | GET | `/api/capstone` | Capstone definition |
//! | POST | `/api/capstone/save` | Merge capstone state |

mod error;

use std::collections::BTreeSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use course_core::derivation::ProgressReport;
use course_core::grading::AnswerSet;
use course_core::model::{
    BadgeId, LearnerQuiz, Lesson, LessonId, Module, ModuleId, Progress, QuizId,
    ScenarioDefinition, ScenarioId, ScenarioSessionId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use services::{
    AppServices, ChoiceRequest, ChoiceResponse, QuizSubmission, ScenarioStart,
    SessionChoiceResponse, SessionStart,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, error_response};

pub type AppState = AppServices;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn create_router(services: AppServices, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/health", get(handle_health_check))
        .route("/api/modules", get(handle_list_modules))
        .route("/api/modules/{module_id}/lessons", get(handle_module_lessons))
        .route("/api/quizzes/{quiz_id}", get(handle_get_quiz))
        .route("/api/quizzes/{quiz_id}/submit", post(handle_submit_quiz))
        .route("/api/scenarios/{scenario_id}", get(handle_get_scenario))
        .route("/api/scenarios/{scenario_id}/start", post(handle_start_scenario))
        .route("/api/scenarios/{scenario_id}/choice", post(handle_scenario_choice))
        .route("/api/scenarios/{scenario_id}/sessions", post(handle_open_session))
        .route(
            "/api/scenario-sessions/{session_id}/choice",
            post(handle_session_choice),
        )
        .route("/api/progress", get(handle_get_progress))
        .route("/api/progress/summary", get(handle_progress_summary))
        .route("/api/progress/badges", get(handle_badges))
        .route("/api/progress/lesson-complete", post(handle_lesson_complete))
        .route("/api/progress/reset", post(handle_reset))
        .route("/api/glossary", get(handle_glossary))
        .route("/api/capstone", get(handle_get_capstone))
        .route("/api/capstone/save", post(handle_save_capstone))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(services)
}

// ── Request/Response types ──────────────────────────────────────────

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizSubmitRequest {
    #[serde(default)]
    answers: AnswerSet,
    module_id: ModuleId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionChoiceRequest {
    choice_index: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonCompleteRequest {
    module_id: ModuleId,
    lesson_id: LessonId,
}

#[derive(Serialize)]
struct ModulesResponse<'a> {
    modules: &'a [Module],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LessonsResponse<'a> {
    module_id: ModuleId,
    lessons: &'a [Lesson],
}

#[derive(Serialize)]
struct BadgesResponse {
    badges: BTreeSet<BadgeId>,
}

// ── GET handlers ────────────────────────────────────────────────────

async fn handle_health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_list_modules(State(services): State<AppState>) -> Json<Value> {
    let catalog = services.catalog();
    Json(json!(ModulesResponse {
        modules: catalog.modules()
    }))
}

async fn handle_module_lessons(
    State(services): State<AppState>,
    Path(module_id): Path<ModuleId>,
) -> ApiResult<Value> {
    let catalog = services.catalog();
    let lessons = catalog.lessons(&module_id)?;
    Ok(Json(json!(LessonsResponse { module_id, lessons })))
}

async fn handle_get_quiz(
    State(services): State<AppState>,
    Path(quiz_id): Path<QuizId>,
) -> ApiResult<LearnerQuiz> {
    Ok(Json(services.catalog().quiz(&quiz_id)?))
}

async fn handle_get_scenario(
    State(services): State<AppState>,
    Path(scenario_id): Path<ScenarioId>,
) -> ApiResult<ScenarioDefinition> {
    Ok(Json(services.catalog().scenario(&scenario_id)?.clone()))
}

async fn handle_get_progress(State(services): State<AppState>) -> ApiResult<Progress> {
    Ok(Json(services.progress().progress().await?))
}

async fn handle_progress_summary(State(services): State<AppState>) -> ApiResult<ProgressReport> {
    Ok(Json(services.progress().report().await?))
}

async fn handle_badges(State(services): State<AppState>) -> ApiResult<BadgesResponse> {
    let badges = services.progress().badges().await?;
    Ok(Json(BadgesResponse { badges }))
}

async fn handle_glossary(State(services): State<AppState>) -> ApiResult<Value> {
    Ok(Json(services.catalog().glossary()?.clone()))
}

async fn handle_get_capstone(State(services): State<AppState>) -> ApiResult<Map<String, Value>> {
    Ok(Json(services.catalog().capstone()?.clone()))
}

// ── POST handlers ───────────────────────────────────────────────────

async fn handle_submit_quiz(
    State(services): State<AppState>,
    Path(quiz_id): Path<QuizId>,
    payload: Result<Json<QuizSubmitRequest>, JsonRejection>,
) -> ApiResult<QuizSubmission> {
    let Json(req) = payload?;
    let submission = services
        .quizzes()
        .submit(&quiz_id, &req.module_id, &req.answers)
        .await?;
    Ok(Json(submission))
}

async fn handle_start_scenario(
    State(services): State<AppState>,
    Path(scenario_id): Path<ScenarioId>,
) -> ApiResult<ScenarioStart> {
    Ok(Json(services.scenarios().start(&scenario_id)?))
}

async fn handle_scenario_choice(
    State(services): State<AppState>,
    Path(scenario_id): Path<ScenarioId>,
    payload: Result<Json<ChoiceRequest>, JsonRejection>,
) -> ApiResult<ChoiceResponse> {
    let Json(req) = payload?;
    let response = services.scenarios().submit_choice(&scenario_id, &req).await?;
    Ok(Json(response))
}

async fn handle_open_session(
    State(services): State<AppState>,
    Path(scenario_id): Path<ScenarioId>,
) -> ApiResult<SessionStart> {
    Ok(Json(services.scenarios().start_session(&scenario_id)?))
}

async fn handle_session_choice(
    State(services): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SessionChoiceRequest>, JsonRejection>,
) -> ApiResult<SessionChoiceResponse> {
    let session_id: ScenarioSessionId = session_id
        .parse()
        .map_err(|_| ApiError::new(StatusCode::NOT_FOUND, "scenario session not found"))?;
    let Json(req) = payload?;
    let response = services
        .scenarios()
        .choose(session_id, req.choice_index)
        .await?;
    Ok(Json(response))
}

async fn handle_lesson_complete(
    State(services): State<AppState>,
    payload: Result<Json<LessonCompleteRequest>, JsonRejection>,
) -> ApiResult<Progress> {
    let Json(req) = payload?;
    let progress = services
        .progress()
        .mark_lesson_complete(&req.module_id, &req.lesson_id)
        .await?;
    Ok(Json(progress))
}

async fn handle_reset(State(services): State<AppState>) -> ApiResult<Progress> {
    Ok(Json(services.progress().reset().await?))
}

async fn handle_save_capstone(
    State(services): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Progress> {
    let Json(update) = payload?;
    Ok(Json(services.progress().save_capstone(update).await?))
}

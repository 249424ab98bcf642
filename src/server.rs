//! HTTP API.
//!
//! Exposes document upload, summary, chat, and challenge actions as a JSON
//! API. One uploaded document is one session; deleting it is the "start
//! over" action.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version and model) |
//! | `POST`   | `/documents` | Upload `{name, contentType?, content}` (base64 body) |
//! | `GET`    | `/documents/{id}` | Session: document, summary, messages, challenges |
//! | `DELETE` | `/documents/{id}` | Reset the session |
//! | `POST`   | `/documents/{id}/summary` | Summarize (cached after first success) |
//! | `GET`    | `/documents/{id}/messages` | Chat log |
//! | `POST`   | `/documents/{id}/messages` | Ask `{question}` |
//! | `POST`   | `/documents/{id}/challenges` | Generate a fresh set of challenge questions |
//! | `POST`   | `/documents/{id}/challenges/{index}/answer` | Evaluate `{answer}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `payload_too_large` (413), `unsupported_media_type` (415), `internal` (500).
//!
//! Malformed JSON bodies and non-numeric challenge indexes are reported
//! through the same envelope as `bad_request`.
//!
//! Model failures are not errors at this layer: the actions substitute a
//! fallback message and the request still succeeds.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::actions::{self, ActionError};
use crate::config::Config;
use crate::extract::{self, ExtractError};
use crate::llm::{create_model, LanguageModel};
use crate::models::{Challenge, Document, Message, Role, Session};
use crate::session::{SessionError, SessionStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    model: Arc<dyn LanguageModel>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            config: Arc::new(config),
            model,
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

/// Starts the server with the provider named in the config.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let model: Arc<dyn LanguageModel> = Arc::from(create_model(&config.model)?);
    run_server_with_model(config, model).await
}

/// Starts the server with a caller-supplied model.
pub async fn run_server_with_model(
    config: &Config,
    model: Arc<dyn LanguageModel>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    info!(model = model.model_name(), "using language model");

    let app = router(AppState::new(config.clone(), model));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("DocuSense listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router. Exposed so callers can serve it on their own listener.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Uploads arrive base64-encoded inside JSON.
    let body_limit = json_body_limit(state.config.server.max_upload_bytes);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload))
        .route(
            "/documents/{id}",
            get(handle_get_session).delete(handle_reset),
        )
        .route("/documents/{id}/summary", post(handle_summary))
        .route(
            "/documents/{id}/messages",
            get(handle_list_messages).post(handle_ask),
        )
        .route("/documents/{id}/challenges", post(handle_generate_challenges))
        .route(
            "/documents/{id}/challenges/{index}/answer",
            post(handle_evaluate),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Request body limit for a base64 upload of `max_upload_bytes`, plus room
/// for the JSON envelope.
fn json_body_limit(max_upload_bytes: usize) -> usize {
    (max_upload_bytes / 3)
        .saturating_add(1)
        .saturating_mul(4)
        .saturating_add(64 * 1024)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::ChallengeOutOfRange { .. } => {
                AppError::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            SessionError::AlreadyEvaluated(_)
            | SessionError::EvaluationInProgress(_)
            | SessionError::ChallengeReplaced(_) => {
                AppError::new(StatusCode::CONFLICT, "conflict", err.to_string())
            }
        }
    }
}

impl From<ActionError> for AppError {
    fn from(err: ActionError) -> Self {
        bad_request(err.to_string())
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedContentType(_) => AppError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                err.to_string(),
            ),
            ExtractError::TooLarge { .. } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                err.to_string(),
            ),
            ExtractError::Pdf(_) | ExtractError::Empty => bad_request(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                rejection.body_text(),
            ),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                rejection.body_text(),
            ),
            _ => bad_request(rejection.body_text()),
        }
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| bad_request(format!("invalid document id: {}", raw)))
}

fn parse_index(raw: &str) -> Result<usize, AppError> {
    raw.parse()
        .map_err(|_| bad_request(format!("invalid challenge index: {}", raw)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.model.model_name().to_string(),
    })
}

// ============ Documents ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    name: String,
    #[serde(default)]
    content_type: Option<String>,
    /// Base64-encoded file bytes.
    content: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let Json(req) = payload?;
    if req.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(req.content.trim())
        .map_err(|e| bad_request(format!("content is not valid base64: {}", e)))?;

    let (content_type, text) = extract::extract_upload(
        &req.name,
        req.content_type.as_deref(),
        &bytes,
        state.config.server.max_upload_bytes,
    )
    .inspect_err(|e| warn!(name = %req.name, error = %e, "rejected upload"))?;

    let session = state
        .sessions
        .create(Document {
            name: req.name,
            content_type: content_type.to_string(),
            content: text,
        })
        .await;
    info!(id = %session.id, name = %session.document.name, chars = session.document.content.len(), "document uploaded");

    Ok((StatusCode::CREATED, Json(session)))
}

async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.sessions.get(id).await?))
}

async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.sessions.reset(id).await {
        info!(%id, "session reset");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SessionError::NotFound(id).into())
    }
}

// ============ Summary ============

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
    cached: bool,
}

async fn handle_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SummaryResponse>, AppError> {
    let id = parse_id(&id)?;
    let session = state.sessions.get(id).await?;
    if let Some(summary) = session.summary {
        return Ok(Json(SummaryResponse {
            summary,
            cached: true,
        }));
    }

    let out = actions::summarize(state.model.as_ref(), &session.document.content).await?;
    if out.summary != actions::SUMMARY_FALLBACK {
        state.sessions.set_summary(id, out.summary.clone()).await?;
    }
    Ok(Json(SummaryResponse {
        summary: out.summary,
        cached: false,
    }))
}

// ============ Chat ============

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

async fn handle_list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    let id = parse_id(&id)?;
    let session = state.sessions.get(id).await?;
    Ok(Json(MessagesResponse {
        messages: session.messages,
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    question: Message,
    answer: Message,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = payload?;
    let id = parse_id(&id)?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ActionError::EmptyInput("question").into());
    }

    // History is taken before the new question is appended.
    let history = state
        .sessions
        .history(id, state.config.chat.max_history)
        .await?;
    let document = state.sessions.get(id).await?.document;
    let user_message = state
        .sessions
        .push_message(id, Role::User, question, None)
        .await?;

    let answer = actions::ask(state.model.as_ref(), &document.content, question, &history).await?;
    let ai_message = state
        .sessions
        .push_message(id, Role::Ai, answer.answer, answer.reference)
        .await?;

    Ok(Json(AskResponse {
        question: user_message,
        answer: ai_message,
    }))
}

// ============ Challenges ============

#[derive(Serialize)]
struct ChallengesResponse {
    challenges: Vec<Challenge>,
}

async fn handle_generate_challenges(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChallengesResponse>, AppError> {
    let id = parse_id(&id)?;
    let document = state.sessions.get(id).await?.document;
    let questions =
        actions::generate_challenge_questions(state.model.as_ref(), &document.content).await?;
    let challenges = state.sessions.set_challenges(id, questions).await?;
    Ok(Json(ChallengesResponse { challenges }))
}

#[derive(Deserialize)]
struct EvaluateRequest {
    answer: String,
}

#[derive(Serialize)]
struct EvaluateResponse {
    challenge: Challenge,
}

async fn handle_evaluate(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let id = parse_id(&id)?;
    let index = parse_index(&index)?;
    let Json(req) = payload?;
    let answer = req.answer.trim();
    if answer.is_empty() {
        return Err(ActionError::EmptyInput("answer").into());
    }

    let (question, document) = state.sessions.begin_evaluation(id, index, answer).await?;
    let evaluation =
        match actions::evaluate_answer(state.model.as_ref(), &document, &question, answer).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                state.sessions.abort_evaluation(id, index, &question).await;
                return Err(e.into());
            }
        };
    let challenge = state
        .sessions
        .finish_evaluation(id, index, &question, evaluation)
        .await
        .inspect_err(|e| warn!(%id, index, error = %e, "discarding stale evaluation"))?;

    Ok(Json(EvaluateResponse { challenge }))
}

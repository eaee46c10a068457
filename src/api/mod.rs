//! REST API for the inbox: emails, prompts, drafts, processing, and chat.

pub mod chat;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::error::{DatabaseError, PipelineError};
use crate::llm::ModelGateway;
use crate::models::{NewDraft, NewPrompt};
use crate::pipeline::EmailProcessor;
use crate::seed;
use crate::store::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub processor: Arc<EmailProcessor>,
    /// Used directly by chat; the processor holds its own handle.
    pub gateway: Arc<ModelGateway>,
}

/// Build the Axum router with every REST route.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/emails", get(list_emails))
        .route("/emails/{id}/process", post(process_email))
        .route("/prompts", get(list_prompts).post(upsert_prompt))
        .route("/drafts", get(list_drafts).post(create_draft))
        .route("/ingest/mock", post(ingest_mock))
        .route("/ingest/process", post(process_inbox))
        .route("/chat", post(chat))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiResponse = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> ApiResponse {
    (status, Json(serde_json::json!({ "error": message.to_string() })))
}

fn db_error(context: &str, e: DatabaseError) -> ApiResponse {
    match e {
        DatabaseError::NotFound { .. } => error_response(StatusCode::NOT_FOUND, e),
        other => {
            error!(error = %other, "{context} failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}

fn ok_json<T: serde::Serialize>(value: T) -> ApiResponse {
    (StatusCode::OK, Json(serde_json::json!(value)))
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inbox-triage"
    }))
}

// ── Emails ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

async fn list_emails(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match state.db.list_emails(params.skip, params.limit).await {
        Ok(emails) => ok_json(emails),
        Err(e) => db_error("list_emails", e),
    }
}

async fn process_email(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.processor.process_email_by_id(&id).await {
        Ok(result) => ok_json(result),
        Err(PipelineError::EmailNotFound(id)) => {
            error_response(StatusCode::NOT_FOUND, format!("Email {id} not found"))
        }
        Err(PipelineError::Persistence(e)) => db_error("process_email", e),
    }
}

// ── Prompts ─────────────────────────────────────────────────────────

async fn list_prompts(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.list_prompts().await {
        Ok(prompts) => ok_json(prompts),
        Err(e) => db_error("list_prompts", e),
    }
}

async fn upsert_prompt(
    State(state): State<AppState>,
    Json(body): Json<NewPrompt>,
) -> impl IntoResponse {
    if body.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Prompt name is required");
    }
    match state.db.upsert_prompt(&body).await {
        Ok(prompt) => {
            info!(name = %prompt.name, "Prompt saved");
            ok_json(prompt)
        }
        Err(e) => db_error("upsert_prompt", e),
    }
}

// ── Drafts ──────────────────────────────────────────────────────────

async fn list_drafts(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.list_drafts().await {
        Ok(drafts) => ok_json(drafts),
        Err(e) => db_error("list_drafts", e),
    }
}

async fn create_draft(
    State(state): State<AppState>,
    Json(body): Json<NewDraft>,
) -> impl IntoResponse {
    match state.db.insert_draft(&body).await {
        Ok(draft) => ok_json(draft),
        Err(e) => db_error("create_draft", e),
    }
}

// ── Ingest ──────────────────────────────────────────────────────────

async fn ingest_mock(State(state): State<AppState>) -> impl IntoResponse {
    let emails = match seed::create_mock_emails(state.db.as_ref()).await {
        Ok(n) => n,
        Err(e) => return db_error("create_mock_emails", e),
    };
    let prompts = match seed::create_default_prompts(state.db.as_ref()).await {
        Ok(n) => n,
        Err(e) => return db_error("create_default_prompts", e),
    };
    ok_json(serde_json::json!({
        "message": "Mock data loaded",
        "emails_created": emails,
        "prompts_created": prompts,
    }))
}

async fn process_inbox(State(state): State<AppState>) -> impl IntoResponse {
    match state.processor.process_all().await {
        Ok(report) => ok_json(report),
        Err(PipelineError::Persistence(e)) => db_error("process_all", e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

// ── Chat ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    email_id: Option<String>,
}

async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> impl IntoResponse {
    let context = match &body.email_id {
        Some(id) => match state.db.get_email(id).await {
            Ok(Some(email)) => chat::email_context(&email),
            Ok(None) => {
                warn!(email_id = %id, "Chat about unknown email");
                return error_response(StatusCode::NOT_FOUND, format!("Email {id} not found"));
            }
            Err(e) => return db_error("chat", e),
        },
        None => match state.db.list_emails(0, chat::OVERVIEW_EMAILS).await {
            Ok(emails) => chat::inbox_context(&emails),
            Err(e) => return db_error("chat", e),
        },
    };

    let prompt = chat::build_chat_prompt(&context, &body.query);
    let response = state.gateway.complete(prompt).await;
    ok_json(serde_json::json!({ "response": response }))
}

//! Axum-based HTTP gateway for the notes API.
//!
//! Routes, bearer-token authentication, and the ownership check on deletion
//! live here. All responses are JSON. Failures render through the closed
//! [`ApiError`] taxonomy — handlers return `Result<_, ApiError>` and the
//! status mapping happens in exactly one place.
//!
//! Hardening, in the gateway's usual manner:
//! - Request body size limit (64KB)
//! - Request timeout (30s) against slow-loris clients
//! - Permissive CORS for the browser frontend

use crate::auth::{self, TokenSigner};
use crate::config::Config;
use crate::error::ApiError;
use crate::store::{Note, NoteStore, NoteSummary, User};
use anyhow::{Context, Result};
use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Username length bounds, in characters.
const USERNAME_MIN_CHARS: usize = 4;
const USERNAME_MAX_CHARS: usize = 18;
/// Minimum note content length, in characters.
const NOTE_MIN_CHARS: usize = 5;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<NoteStore>,
    pub signer: Arc<TokenSigner>,
}

/// Open the store, bind, and serve until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let store = NoteStore::open(&config.database_path).with_context(|| {
        format!(
            "failed to open note store at {}",
            config.database_path.display()
        )
    })?;
    let state = AppState {
        store: Arc::new(store),
        signer: Arc::new(TokenSigner::new(&config.secret)),
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("notes API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the full route table with middleware layers.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api/login", post(handle_login))
        .route("/api/users", post(handle_create_user))
        .route("/api/users", get(handle_list_users))
        .route("/api/notes", get(handle_list_notes))
        .route("/api/notes", post(handle_create_note))
        .route("/api/notes/{id}", get(handle_get_note))
        .route("/api/notes/{id}", put(handle_update_note))
        .route("/api/notes/{id}", delete(handle_delete_note))
        .fallback(handle_unknown_endpoint)
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

// ══════════════════════════════════════════════════════════════════════════════
// REQUEST / RESPONSE SHAPES
// ══════════════════════════════════════════════════════════════════════════════

/// Request body for login.
#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

/// Request body for registration. Fields are optional so validation can
/// answer with its own messages instead of deserializer noise.
#[derive(Deserialize)]
struct CreateUserBody {
    username: Option<String>,
    name: Option<String>,
    password: Option<String>,
}

/// Request body for note creation.
#[derive(Deserialize)]
struct CreateNoteBody {
    content: Option<String>,
    important: Option<bool>,
    date: Option<DateTime<Utc>>,
}

/// Request body for note update. Omitted fields keep their current value.
#[derive(Deserialize)]
struct UpdateNoteBody {
    content: Option<String>,
    important: Option<bool>,
}

/// User as the API renders it: the owned-note projection included, the
/// password hash structurally absent.
#[derive(Debug, Serialize)]
struct UserView {
    id: String,
    username: String,
    name: Option<String>,
    notes: Vec<NoteSummary>,
}

impl UserView {
    fn assemble(user: User, notes: Vec<NoteSummary>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            notes,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// POST /api/login — verify credentials and mint a token.
async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(invalid_body)?;

    let user = match state.store.find_user_by_username(&body.username)? {
        Some(user) => user,
        None => {
            // Burn one verification so the unknown-user path costs the same
            // as the wrong-password path.
            let _ = auth::password::verify(&body.password, auth::password::DUMMY_HASH);
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !auth::password::verify(&body.password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.signer.issue(&user.username, &user.id);
    tracing::info!(username = %user.username, "login");

    Ok(Json(serde_json::json!({
        "token": token,
        "username": user.username,
        "name": user.name,
    })))
}

/// POST /api/users — register a new user.
async fn handle_create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserBody>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let Json(body) = body.map_err(invalid_body)?;

    let username = body.username.unwrap_or_default();
    let length = username.chars().count();
    if length < USERNAME_MIN_CHARS || length > USERNAME_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
        )));
    }

    let password = body.password.unwrap_or_default();
    if password.is_empty() {
        return Err(ApiError::Validation("password missing".to_string()));
    }

    let password_hash = auth::password::hash(&password)?;
    let user = state
        .store
        .create_user(&username, body.name.as_deref(), &password_hash)?;
    tracing::info!(username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserView::assemble(user, Vec::new())),
    ))
}

/// GET /api/users — all users, each with their owned-note summaries.
async fn handle_list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.store.list_users()?;
    let mut views = Vec::with_capacity(users.len());
    for user in users {
        let notes = state.store.notes_for_user(&user.id)?;
        views.push(UserView::assemble(user, notes));
    }
    Ok(Json(views))
}

/// GET /api/notes — all notes.
async fn handle_list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.store.list_notes()?))
}

/// GET /api/notes/:id — a single note.
async fn handle_get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&id)?;
    match state.store.find_note(&id)? {
        Some(note) => Ok(Json(note)),
        None => Err(ApiError::NoteNotFound),
    }
}

/// POST /api/notes — create a note owned by the authenticated caller.
async fn handle_create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateNoteBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let user = require_user(&state, &headers)?;
    let Json(body) = body.map_err(invalid_body)?;

    let content = validate_content(body.content)?;
    let important = body.important.unwrap_or(false);
    let date = body.date.unwrap_or_else(Utc::now);

    let note = state
        .store
        .create_note(&content, important, date, Some(&user.id))?;
    tracing::info!(username = %user.username, note_id = %note.id, "note created");

    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /api/notes/:id — update content/importance. Unauthenticated by
/// contract: the legacy client toggles importance without a token, so the
/// published interface keeps this one route open while deletion stays
/// owner-only.
async fn handle_update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateNoteBody>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&id)?;
    let Json(body) = body.map_err(invalid_body)?;

    let existing = state.store.find_note(&id)?.ok_or(ApiError::NoteNotFound)?;
    let content = validate_content(Some(body.content.unwrap_or(existing.content)))?;
    let important = body.important.unwrap_or(existing.important);

    let note = state
        .store
        .update_note(&id, &content, important)?
        .ok_or(ApiError::NoteNotFound)?;
    Ok(Json(note))
}

/// DELETE /api/notes/:id — owner-only.
async fn handle_delete_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = require_user(&state, &headers)?;
    let id = parse_note_id(&id)?;

    // Absence takes precedence over ownership: a non-owner probing a deleted
    // id learns "not found", the same as everyone else.
    let note = state.store.find_note(&id)?.ok_or(ApiError::NoteNotFound)?;
    auth::authorize_delete(&user, &note)?;

    state.store.delete_note(&id)?;
    tracing::info!(username = %user.username, note_id = %note.id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Fallback for unknown paths.
async fn handle_unknown_endpoint() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "unknown endpoint" })),
    )
}

// ══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ══════════════════════════════════════════════════════════════════════════════

/// Extract bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Resolve the caller's identity, in order: bearer token present → signature
/// and expiry verified → claims id resolves to a live user. Each failure is
/// its own taxonomy variant; there is no retry and no fallback.
fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = extract_bearer_token(headers).ok_or(ApiError::TokenMissing)?;
    let claims = state.signer.verify(token)?;
    state
        .store
        .find_user_by_id(&claims.id)?
        .ok_or(ApiError::UserNotFound)
}

/// Note ids are UUIDs. Parsing also normalizes the textual form so lookups
/// compare canonical strings.
fn parse_note_id(raw: &str) -> Result<String, ApiError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| ApiError::MalformedId)
}

/// Content is required and must reach the minimum length.
fn validate_content(content: Option<String>) -> Result<String, ApiError> {
    let Some(content) = content else {
        return Err(ApiError::Validation("content missing".to_string()));
    };
    if content.chars().count() < NOTE_MIN_CHARS {
        return Err(ApiError::Validation(format!(
            "content must be at least {NOTE_MIN_CHARS} characters"
        )));
    }
    Ok(content)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(format!("invalid request body: {rejection}"))
}

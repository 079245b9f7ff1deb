//! Version 1 of the Tauri IPC API.
//!
//! Commands are intentionally thin wrappers that validate input, execute
//! work on background threads where needed, and return JSON-friendly
//! payloads to the UI. The session lock is never held across a network
//! dispatch; `generate` takes a ticket, releases the lock, and re-acquires
//! it to apply the outcome.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tauri::{async_runtime::spawn_blocking, State};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::db::DbPool;
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::errors::AiError;
use crate::logging::log_event;
use crate::models;
use crate::providers::{pollinations, ChatResult, DEFAULT_TIMEOUT_MS};
use crate::session::{BufferKind, Session, SourceBundle, TranscriptEntry};
use crate::settings::{self, SettingsSnapshot, SettingsUpdate};

pub type SharedSession = Arc<Mutex<Session>>;

pub fn shared_session() -> SharedSession {
    Arc::new(Mutex::new(Session::new()))
}

/// Shared state injected into each Tauri command handler.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub dispatcher: Arc<Dispatcher>,
    pub session: SharedSession,
    pub http: reqwest::Client,
}

/// Simple health-check endpoint for UI components.
#[tauri::command]
pub fn ping() -> serde_json::Value {
    json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

/// Everything the UI needs to render the editor and chat panes.
#[derive(Serialize)]
pub struct SessionSnapshot {
    pub buffers: SourceBundle,
    pub transcript: Vec<TranscriptEntry>,
    pub busy: bool,
}

fn snapshot_of(session: &Session) -> SessionSnapshot {
    SessionSnapshot {
        buffers: session.buffers().clone(),
        transcript: session.transcript().to_vec(),
        busy: session.is_dispatching(),
    }
}

#[tauri::command]
pub async fn session_snapshot(state: State<'_, ApiState>) -> Result<SessionSnapshot, String> {
    let session = state.session.lock().await;
    Ok(snapshot_of(&session))
}

#[derive(Deserialize)]
pub struct SetBufferInput {
    pub kind: BufferKind,
    pub content: String,
}

/// Apply a direct user edit to one buffer.
#[tauri::command]
pub async fn set_buffer(
    state: State<'_, ApiState>,
    input: SetBufferInput,
) -> Result<SessionSnapshot, String> {
    let mut session = state.session.lock().await;
    session.set_buffer(input.kind, input.content);
    Ok(snapshot_of(&session))
}

/// Assemble the current buffers into the sandboxed preview document.
#[tauri::command]
pub async fn preview_document(state: State<'_, ApiState>) -> Result<String, String> {
    let session = state.session.lock().await;
    Ok(session.preview_document())
}

#[derive(Serialize)]
pub struct ExportedFile {
    pub name: String,
    pub content: String,
}

/// Hand the buffers to the UI as named files for download/zip packaging.
#[tauri::command]
pub async fn export_bundle(state: State<'_, ApiState>) -> Result<Vec<ExportedFile>, String> {
    let session = state.session.lock().await;
    let buffers = session.buffers();
    Ok(vec![
        ExportedFile { name: "index.html".into(), content: buffers.markup.clone() },
        ExportedFile { name: "styles.css".into(), content: buffers.stylesheet.clone() },
        ExportedFile { name: "script.js".into(), content: buffers.script.clone() },
    ])
}

/// Hard session reset; any in-flight generation result becomes stale.
#[tauri::command]
pub async fn new_session(state: State<'_, ApiState>) -> Result<SessionSnapshot, String> {
    let mut session = state.session.lock().await;
    session.new_session();
    Ok(snapshot_of(&session))
}

#[derive(Deserialize)]
pub struct GenerateInput {
    pub instruction: String,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Run one instruction through the dispatcher and apply the reply.
#[tauri::command]
pub async fn generate(
    state: State<'_, ApiState>,
    input: GenerateInput,
) -> Result<SessionSnapshot, String> {
    let pool = state.db.clone();
    let preferred = spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        settings::preferred_provider(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())??;

    let ticket = {
        let mut session = state.session.lock().await;
        session.begin_generation(&input.instruction).map_err(|e| e.to_string())?
    };

    let attempted_model = input
        .model
        .clone()
        .unwrap_or_else(|| pollinations::DEFAULT_MODEL.to_string());
    let opts = DispatchOptions {
        preferred,
        model: input.model,
        timeout_ms: input.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
    };
    let outcome = state.dispatcher.dispatch(&ticket.messages, &opts).await;
    log_dispatch_outcome(&state.db, &outcome, &attempted_model);

    let mut session = state.session.lock().await;
    session.finish_generation(&ticket, outcome, &attempted_model);
    Ok(snapshot_of(&session))
}

fn log_dispatch_outcome(pool: &DbPool, outcome: &Result<ChatResult, AiError>, model: &str) {
    let pool = pool.clone();
    let model = model.to_string();
    let (level, code, message, data) = match outcome {
        Ok(result) => {
            let preview = result.content.chars().take(200).collect::<String>();
            (
                "info",
                "AI-0200",
                "AI dispatch succeeded",
                json!({
                    "provider": result.provider.as_str(),
                    "model": result.model,
                    "preview": preview,
                }),
            )
        }
        Err(err) => (
            "warn",
            err.code(),
            "AI dispatch failed",
            json!({
                "model": model,
                "error": err.to_string(),
            }),
        ),
    };
    tokio::spawn(async move {
        if let Ok(conn) = pool.get() {
            let _ = log_event(&conn, level, Some(code), "ai.dispatch", message, Some(data));
        }
    });
}

/// Fetch the current settings snapshot via a blocking thread pool.
#[tauri::command]
pub async fn settings_get(state: State<'_, ApiState>) -> Result<SettingsSnapshot, String> {
    let pool = state.db.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        settings::get_settings(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

/// Update persisted preferences from the settings UI.
#[tauri::command]
pub async fn settings_update(
    state: State<'_, ApiState>,
    input: SettingsUpdate,
) -> Result<SettingsSnapshot, String> {
    let pool = state.db.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        settings::update_settings(&conn, input).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

#[derive(Deserialize)]
pub struct ListModelsInput {
    /// `"image"` selects the image catalog; anything else the text catalog.
    pub source: Option<String>,
}

/// List model identifiers for the settings UI.
#[tauri::command]
pub async fn ai_list_models(
    state: State<'_, ApiState>,
    input: Option<ListModelsInput>,
) -> Result<Vec<String>, String> {
    let url = match input.and_then(|i| i.source).as_deref() {
        Some("image") => models::IMAGE_MODELS_URL,
        _ => models::TEXT_MODELS_URL,
    };
    models::fetch_model_ids(&state.http, url)
        .await
        .map_err(|e| e.to_string())
}

/// Structured AI runtime event surfaced in the debugger UI.
#[derive(Serialize)]
pub struct AiRuntimeEvent {
    pub id: String,
    pub ts: i64,
    pub level: String,
    pub code: Option<String>,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Return recent dispatch events for diagnostics.
#[tauri::command]
pub async fn list_ai_events(
    state: State<'_, ApiState>,
    limit: Option<usize>,
) -> Result<Vec<AiRuntimeEvent>, String> {
    let pool = state.db.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let limit = limit.unwrap_or(100) as i64;
        let mut stmt = conn
            .prepare(
                "SELECT id, ts, level, code, message, data FROM event_log WHERE module = 'ai.dispatch' ORDER BY ts DESC LIMIT ?1",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([limit], |row| {
                let data_str: Option<String> = row.get(5)?;
                let data = data_str.and_then(|raw| serde_json::from_str(&raw).ok());
                Ok(AiRuntimeEvent {
                    id: row.get(0)?,
                    ts: row.get(1)?,
                    level: row.get(2)?,
                    code: row.get(3)?,
                    message: row.get(4)?,
                    data,
                })
            })
            .map_err(|e| e.to_string())?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(|e| e.to_string())?);
        }
        Ok(events)
    })
    .await
    .map_err(|e| e.to_string())?
}

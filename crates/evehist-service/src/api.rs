//! REST API endpoints for the evehist-service.
//!
//! The history fields of each accessory are exposed as JSON wrappers around
//! the same base64 payloads the companion app exchanges:
//!
//! | Endpoint | Field |
//! |----------|-------|
//! | `GET /api/accessories/{id}/history/status` | status |
//! | `PUT /api/accessories/{id}/history/request` | request |
//! | `GET /api/accessories/{id}/history/entries` | entries |
//! | `PUT /api/accessories/{id}/history/time` | set time |
//! | `POST /api/accessories/{id}/reset-total` | reset total |
//!
//! `GET|PUT /api/accessories/{id}/values` reads and feeds the live sensor
//! characteristics.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Malformed
//! payloads and operations a sensor does not offer return HTTP 400.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use evehist_types::{SensorKind, Uuid, uuids};

use crate::state::{AccessoryHandle, AppState, SensorValues};

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/accessories", get(list_accessories))
        .route("/api/accessories/{id}/history/status", get(history_status))
        .route("/api/accessories/{id}/history/request", put(history_request))
        .route("/api/accessories/{id}/history/entries", get(history_entries))
        .route("/api/accessories/{id}/history/time", put(history_time))
        .route("/api/accessories/{id}/reset-total", post(reset_total))
        .route("/api/accessories/{id}/values", get(get_values).put(put_values))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Summary of one accessory's history.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessoryResponse {
    pub id: String,
    pub kind: SensorKind,
    /// History service type.
    pub service: Uuid,
    /// Characteristic types the service exposes.
    pub characteristics: Vec<Uuid>,
    /// Retained entries, markers included.
    pub used_memory: u32,
    /// Logical index before the oldest retained entry.
    pub first_entry: u32,
    /// Logical index of the newest entry.
    pub last_entry: u32,
    /// Whether a transfer is in progress.
    pub transferring: bool,
}

async fn describe(handle: &AccessoryHandle) -> AccessoryResponse {
    let (used_memory, first_entry, last_entry, transferring) = handle
        .accessory
        .with(|a| {
            let history = a.history();
            let store = history.store();
            (
                store.used_count(),
                store.first_index(),
                store.last_index(),
                history.session().is_active(),
            )
        })
        .await;
    AccessoryResponse {
        id: handle.config.id.clone(),
        kind: handle.config.kind,
        service: uuids::HISTORY_SERVICE,
        characteristics: uuids::characteristics_for(handle.config.kind),
        used_memory,
        first_entry,
        last_entry,
        transferring,
    }
}

/// List every accessory.
async fn list_accessories(State(state): State<Arc<AppState>>) -> Json<Vec<AccessoryResponse>> {
    let mut accessories = Vec::with_capacity(state.accessories.len());
    for handle in state.accessories.values() {
        accessories.push(describe(handle).await);
    }
    Json(accessories)
}

/// An opaque base64 field value.
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
}

/// Response to a transfer request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestResponse {
    /// Requested starting index (0 = oldest retained).
    pub requested: u32,
}

/// Response to a clock update.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimeResponse {
    /// Host clock as Unix seconds.
    pub unix_time: u32,
}

fn find<'a>(state: &'a AppState, id: &str) -> Result<&'a AccessoryHandle, AppError> {
    state
        .accessory(id)
        .ok_or_else(|| AppError::NotFound(format!("Accessory not found: {}", id)))
}

/// Read the status field.
async fn history_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FieldValue>, AppError> {
    let handle = find(&state, &id)?;
    Ok(Json(FieldValue {
        value: handle.accessory.status().await,
    }))
}

/// Write the request field, starting a transfer.
async fn history_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<FieldValue>,
) -> Result<Json<RequestResponse>, AppError> {
    let handle = find(&state, &id)?;
    let requested = handle
        .accessory
        .write_request(&body.value)
        .await
        .inspect_err(|e| warn!("Ignoring history request for {}: {}", id, e))?;
    Ok(Json(RequestResponse { requested }))
}

/// Read the next chunk of the entries field.
async fn history_entries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FieldValue>, AppError> {
    let handle = find(&state, &id)?;
    Ok(Json(FieldValue {
        value: handle.accessory.read_entries().await,
    }))
}

/// Write the set-time field.
async fn history_time(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<FieldValue>,
) -> Result<Json<TimeResponse>, AppError> {
    let handle = find(&state, &id)?;
    let unix_time = handle.accessory.write_time(&body.value).await?;
    Ok(Json(TimeResponse { unix_time }))
}

/// Zero the energy totals of a consumption or power accessory.
async fn reset_total(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let handle = find(&state, &id)?;
    handle.accessory.reset_total().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Read the live characteristics.
async fn get_values(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SensorValues>, AppError> {
    let handle = find(&state, &id)?;
    Ok(Json(handle.characteristics.values()))
}

/// Feed new characteristic values.
///
/// Value changes reach event-driven adapters through their subscriptions.
async fn put_values(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(values): Json<SensorValues>,
) -> Result<Json<SensorValues>, AppError> {
    let handle = find(&state, &id)?;
    handle.characteristics.apply(&values).map_err(|fields| {
        AppError::BadRequest(format!(
            "{} sensors have no {}",
            handle.config.kind,
            fields.join(", ")
        ))
    })?;
    Ok(Json(handle.characteristics.values()))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Core(evehist_core::Error),
}

impl From<evehist_core::Error> for AppError {
    fn from(e: evehist_core::Error) -> Self {
        AppError::Core(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use evehist_core::Error;

        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Core(e @ (Error::Decode(_) | Error::Unsupported { .. })) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

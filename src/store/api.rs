use crate::domain::{validate_record, PersistedRecord, ProcessedAgentData};
use crate::store::records::{RecordStore, StoreError};
use crate::store::registry::SubscriptionRegistry;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub records: Arc<RecordStore>,
    pub registry: Arc<SubscriptionRegistry>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Batch ingestion response
#[derive(Serialize)]
struct BatchResponse {
    created: usize,
    failed: usize,
    results: Vec<BatchResult>,
}

#[derive(Serialize)]
struct BatchResult {
    id: Option<i64>,
    error: Option<String>,
}

/// Create the CRUD router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/processed_agent_data/",
            get(list_records).post(create_records),
        )
        .route(
            "/processed_agent_data/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(state)
}

/// POST /processed_agent_data/ - Ingest one record or a batch
///
/// The body is either a single record of the ingestion format or a JSON
/// array of them (the uplink wire format). A single record returns the
/// stored row; an array is processed per record so one malformed element
/// never aborts the rest, and the response reports each outcome.
async fn create_records(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(AppError::Validation(
                    "batch must contain at least one record".to_string(),
                ));
            }

            info!(count = items.len(), "ingesting record batch");

            let mut results = Vec::new();
            let mut created = 0;
            let mut failed = 0;

            for item in items {
                match ingest_one(&state, item) {
                    Ok(record) => {
                        created += 1;
                        results.push(BatchResult {
                            id: Some(record.id),
                            error: None,
                        });
                    }
                    Err(e) => {
                        failed += 1;
                        results.push(BatchResult {
                            id: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            Ok(Json(BatchResponse {
                created,
                failed,
                results,
            })
            .into_response())
        }
        single => {
            let record = ingest_one(&state, single).map_err(AppError::from)?;
            Ok(Json(record).into_response())
        }
    }
}

/// Validates, persists, and broadcasts one record. Broadcast happens exactly
/// once per successful create, inside the store's critical section, so
/// subscribers observe records in id-assignment order even under concurrent
/// creates for the same user.
fn ingest_one(state: &AppState, value: Value) -> Result<PersistedRecord, IngestError> {
    let data: ProcessedAgentData =
        serde_json::from_value(value).map_err(|e| IngestError::Validation(e.to_string()))?;
    validate_record(&data).map_err(|e| IngestError::Validation(e.to_string()))?;

    let record = state
        .records
        .create_with(&data, |record| state.registry.publish(record))?;
    info!(
        id = record.id,
        user_id = record.user_id,
        road_state = record.road_state.as_str(),
        "record created"
    );
    Ok(record)
}

/// GET /processed_agent_data/:id
async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PersistedRecord>, AppError> {
    Ok(Json(state.records.get(id)?))
}

/// GET /processed_agent_data/ - List all records
async fn list_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PersistedRecord>>, AppError> {
    Ok(Json(state.records.list()?))
}

/// PUT /processed_agent_data/:id - Full field replacement
async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<PersistedRecord>, AppError> {
    let data: ProcessedAgentData = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    validate_record(&data).map_err(|e| AppError::Validation(e.to_string()))?;

    Ok(Json(state.records.update(id, &data)?))
}

/// DELETE /processed_agent_data/:id - Returns the deleted record
async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PersistedRecord>, AppError> {
    let record = state.records.delete(id)?;
    info!(id, "record deleted");
    Ok(Json(record))
}

/// Per-record ingestion failure, reported inside a batch response.
enum IngestError {
    Validation(String),
    Store(StoreError),
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        IngestError::Store(e)
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Validation(msg) => write!(f, "validation failed: {}", msg),
            IngestError::Store(e) => write!(f, "persistence failed: {}", e),
        }
    }
}

/// Application error types
enum AppError {
    Validation(String),
    NotFound,
    Database(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Validation(msg) => AppError::Validation(msg),
            IngestError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound => (StatusCode::NOT_FOUND, "record not found".to_string()),
            AppError::Database(msg) => {
                error!(error = %msg, "persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        let body = Json(ErrorResponse {
            error: error_message,
        });
        (status, body).into_response()
    }
}

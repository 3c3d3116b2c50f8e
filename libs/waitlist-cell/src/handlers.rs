// libs/waitlist-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use directory_cell::DirectoryError;
use shared_models::error::AppError;

use crate::models::{RegisterWaitlistRequest, WaitlistError, WaitlistFilter};
use crate::services::WaitlistService;

impl From<WaitlistError> for AppError {
    fn from(error: WaitlistError) -> Self {
        match error {
            WaitlistError::EntryNotFound(_) => AppError::NotFound(error.to_string()),
            WaitlistError::Directory(DirectoryError::SeedError(msg)) => AppError::Internal(msg),
            WaitlistError::Directory(e) => AppError::NotFound(e.to_string()),
            WaitlistError::InvalidInput(msg) => AppError::BadRequest(msg),
            WaitlistError::AlreadyWaiting(_) => AppError::Conflict(error.to_string()),
            WaitlistError::InvalidState(msg) => AppError::InvalidState(msg),
            WaitlistError::ConcurrentModification(msg) => AppError::Conflict(msg),
            WaitlistError::StoreError(msg) => AppError::Internal(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn register_waitlist_entry(
    State(service): State<Arc<WaitlistService>>,
    Json(request): Json<RegisterWaitlistRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let entry = service.register(request).await?;

    Ok((StatusCode::CREATED, Json(json!(entry))))
}

#[axum::debug_handler]
pub async fn get_waitlist_entry(
    State(service): State<Arc<WaitlistService>>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entry = service.get(entry_id).await?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn list_waitlist(
    State(service): State<Arc<WaitlistService>>,
    Query(filter): Query<WaitlistFilter>,
) -> Result<Json<Value>, AppError> {
    let entries = service.list(&filter).await?;

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len(),
    })))
}

#[axum::debug_handler]
pub async fn next_in_line(
    State(service): State<Arc<WaitlistService>>,
    Query(filter): Query<WaitlistFilter>,
) -> Result<Json<Value>, AppError> {
    let entry = service
        .next_in_line(&filter)
        .await?
        .ok_or_else(|| AppError::NotFound("No active waitlist entry matches the filters".to_string()))?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn remove_waitlist_entry(
    State(service): State<Arc<WaitlistService>>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.remove(entry_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// libs/appointment-cell/src/handlers.rs
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

use crate::models::{AcceptOfferRequest, AppointmentError, AppointmentQuery, BookAppointmentRequest};
use crate::router::AppointmentState;

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound(_) | AppointmentError::WaitlistEntryNotFound(_) => {
                AppError::NotFound(error.to_string())
            }
            AppointmentError::Directory(DirectoryError::SeedError(msg)) => AppError::Internal(msg),
            AppointmentError::Directory(e) => AppError::NotFound(e.to_string()),
            AppointmentError::InvalidInput(msg) => AppError::BadRequest(msg),
            AppointmentError::Conflict(msg) => AppError::Conflict(msg),
            AppointmentError::InvalidState(msg) => AppError::InvalidState(msg),
            AppointmentError::Expired(msg) => AppError::Expired(msg),
            AppointmentError::ConcurrentModification(msg) => AppError::Conflict(msg),
            AppointmentError::StoreError(msg) => AppError::Internal(msg),
        }
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state.booking.book_appointment(request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.booking.list_appointments(&query).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.confirm_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.cancel_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn withdraw_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.withdraw_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.complete_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// WAITLIST OFFER HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn accept_offer(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<AcceptOfferRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .coordinator
        .accept_offer(appointment_id, request.waitlist_entry_id)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn check_offer_consistency(
    State(state): State<Arc<AppointmentState>>,
) -> Result<Json<Value>, AppError> {
    let report = state.checker.check().await?;

    Ok(Json(json!({
        "consistent": report.is_consistent(),
        "report": report,
    })))
}

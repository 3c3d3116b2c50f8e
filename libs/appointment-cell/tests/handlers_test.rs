mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    Json, Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::handlers::*;
use appointment_cell::*;
use common::Harness;
use shared_models::error::AppError;

fn state_for(harness: &Harness) -> State<Arc<AppointmentState>> {
    State(Arc::new(AppointmentState::new(harness.booking.clone())))
}

fn app_for(harness: &Harness) -> Router {
    appointment_routes(Arc::new(AppointmentState::new(harness.booking.clone())))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ==============================================================================
// DIRECT HANDLER CALLS
// ==============================================================================

#[tokio::test]
async fn test_book_appointment_handler_returns_created() {
    let harness = Harness::new().await;
    let patient_id = harness.patient("Ana").await;
    let request = harness.request(patient_id, harness.now + Duration::days(2));

    let (status, Json(body)) = book_appointment(state_for(&harness), Json(request)).await.unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending_confirmation");
    assert_eq!(body["patient_id"], json!(patient_id));
}

#[tokio::test]
async fn test_book_appointment_handler_maps_conflict() {
    let harness = Harness::new().await;
    let existing = harness.pending(Duration::days(2)).await;
    let other = harness.patient("Carla").await;

    let result = book_appointment(
        state_for(&harness),
        Json(harness.request(other, existing.scheduled_at)),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn test_get_unknown_appointment_is_not_found() {
    let harness = Harness::new().await;

    let result = get_appointment(state_for(&harness), Path(Uuid::new_v4())).await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn test_confirm_after_deadline_maps_to_gone() {
    let harness = Harness::new().await;
    // Deadline already behind the wall clock.
    let appointment = harness.pending(Duration::minutes(10)).await;

    let error = confirm_appointment(state_for(&harness), Path(appointment.id))
        .await
        .unwrap_err();

    assert_matches!(error, AppError::Expired(_));
    assert_eq!(error.into_response().status(), StatusCode::GONE);
}

#[tokio::test]
async fn test_accept_offer_handler_reassigns_slot() {
    let harness = Harness::new().await;
    let appointment = harness.scheduled(Duration::days(2)).await;
    let entry = harness.waiting(0, 60, false).await;
    harness.booking.withdraw_appointment(appointment.id).await.unwrap();

    let Json(body) = accept_offer(
        state_for(&harness),
        Path(appointment.id),
        Json(AcceptOfferRequest { waitlist_entry_id: entry.id }),
    )
    .await
    .unwrap();

    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["patient_id"], json!(entry.patient_id));
}

#[tokio::test]
async fn test_accept_offer_on_scheduled_slot_is_invalid_state() {
    let harness = Harness::new().await;
    let appointment = harness.scheduled(Duration::days(2)).await;
    let entry = harness.waiting(0, 60, false).await;

    let error = accept_offer(
        state_for(&harness),
        Path(appointment.id),
        Json(AcceptOfferRequest { waitlist_entry_id: entry.id }),
    )
    .await
    .unwrap_err();

    assert_matches!(error, AppError::InvalidState(_));
    assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_appointments_handler_reports_total() {
    let harness = Harness::new().await;
    harness.pending(Duration::days(1)).await;
    harness.scheduled(Duration::days(2)).await;

    let Json(body) = list_appointments(
        state_for(&harness),
        Query(AppointmentQuery { patient_id: None, status: Some(AppointmentStatus::Scheduled) }),
    )
    .await
    .unwrap();

    assert_eq!(body["total"], 1);
    assert_eq!(body["appointments"][0]["status"], "scheduled");
}

#[tokio::test]
async fn test_consistency_handler_reports_clean_state() {
    let harness = Harness::new().await;
    let appointment = harness.scheduled(Duration::days(2)).await;
    harness.waiting(0, 60, false).await;
    harness.booking.withdraw_appointment(appointment.id).await.unwrap();

    let Json(body) = check_offer_consistency(state_for(&harness)).await.unwrap();

    assert_eq!(body["consistent"], true);
    assert_eq!(body["report"]["appointments_checked"], 1);
    assert_eq!(body["report"]["entries_checked"], 1);
}

// ==============================================================================
// ROUTER
// ==============================================================================

#[tokio::test]
async fn test_router_books_and_confirms_through_http() {
    let harness = Harness::new().await;
    let patient_id = harness.patient("Ana").await;
    let app = app_for(&harness);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&harness.request(patient_id, harness.now + Duration::days(2))).unwrap(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    // The link sent in confirmation requests is a plain GET.
    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}/confirm", id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "scheduled");
}

#[tokio::test]
async fn test_router_error_body_carries_kind() {
    let harness = Harness::new().await;
    let app = app_for(&harness);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/withdraw", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["kind"], "not_found");
}

#[tokio::test]
async fn test_router_rejects_booking_in_the_past() {
    let harness = Harness::new().await;
    let patient_id = harness.patient("Ana").await;
    let app = app_for(&harness);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&harness.request(patient_id, harness.now - Duration::hours(1))).unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "invalid_input");
}

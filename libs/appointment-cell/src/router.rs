// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::{AppointmentBookingService, OfferConsistencyChecker, SlotReleaseCoordinator};

pub struct AppointmentState {
    pub booking: Arc<AppointmentBookingService>,
    pub coordinator: Arc<SlotReleaseCoordinator>,
    pub checker: Arc<OfferConsistencyChecker>,
}

impl AppointmentState {
    pub fn new(booking: Arc<AppointmentBookingService>) -> Self {
        let coordinator = booking.coordinator();
        let checker = Arc::new(OfferConsistencyChecker::new(
            coordinator.appointments(),
            coordinator.waitlist(),
        ));

        Self { booking, coordinator, checker }
    }
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::book_appointment))
        .route("/consistency/check", get(handlers::check_offer_consistency))
        .route("/{appointment_id}", get(handlers::get_appointment))
        // GET so the link in confirmation requests works from a browser
        .route(
            "/{appointment_id}/confirm",
            get(handlers::confirm_appointment).post(handlers::confirm_appointment),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/withdraw", post(handlers::withdraw_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/accept-offer", post(handlers::accept_offer))
        .with_state(state)
}

use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentState};
use waitlist_cell::{waitlist_routes, WaitlistService};

pub fn create_router(appointments: Arc<AppointmentState>, waitlist: Arc<WaitlistService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Slot release API is running!" }))
        .nest("/appointments", appointment_routes(appointments))
        .nest("/waitlist", waitlist_routes(waitlist))
}

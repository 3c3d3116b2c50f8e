// libs/waitlist-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use crate::handlers;
use crate::services::WaitlistService;

pub fn waitlist_routes(service: Arc<WaitlistService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_waitlist).post(handlers::register_waitlist_entry))
        .route("/next", get(handlers::next_in_line))
        .route(
            "/{entry_id}",
            get(handlers::get_waitlist_entry).delete(handlers::remove_waitlist_entry),
        )
        .with_state(service)
}

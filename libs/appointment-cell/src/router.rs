// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::session_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        // Slot availability for the time picker
        .route("/doctors/{doctor_id}/available-times", get(handlers::get_available_times))
        // Booking and management
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        // Profile view
        .route("/users/{user_id}/appointments", get(handlers::get_user_appointments))
        .layer(middleware::from_fn(session_middleware))
        .with_state(state)
}

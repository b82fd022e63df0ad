use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;

pub fn create_router(state: Arc<AppointmentState>) -> Router {
    let directory = state.store.directory_handle();

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .merge(doctor_routes(directory))
        .merge(appointment_routes(state))
}

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::DoctorDirectory;

pub fn doctor_routes(directory: Arc<DoctorDirectory>) -> Router {
    // The directory is public; nothing here needs a session.
    Router::new()
        .route("/doctors", get(handlers::list_doctors))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor))
        .with_state(directory)
}

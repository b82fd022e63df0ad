use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::DoctorSummary;
use crate::services::DoctorDirectory;

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub specialty: Option<String>,
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(directory): State<Arc<DoctorDirectory>>,
    Query(query): Query<DoctorListQuery>,
) -> Json<Value> {
    let doctors: Vec<DoctorSummary> = match query.specialty.as_deref() {
        Some(specialty) => directory
            .by_specialty(specialty)
            .into_iter()
            .map(DoctorSummary::from)
            .collect(),
        None => directory
            .list_doctors()
            .iter()
            .map(DoctorSummary::from)
            .collect(),
    };

    debug!("Listing {} doctors", doctors.len());

    Json(json!({
        "doctors": doctors,
        "total": doctors.len(),
    }))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(directory): State<Arc<DoctorDirectory>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor = directory
        .find_doctor(&doctor_id)
        .ok_or_else(|| AppError::NotFound(format!("Doctor {} not found", doctor_id)))?;

    Ok(Json(json!({
        "doctor": DoctorSummary::from(doctor),
    })))
}

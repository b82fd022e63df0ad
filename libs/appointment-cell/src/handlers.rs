// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthContext;
use shared_models::error::AppError;
use shared_utils::extractor::require_user;

use crate::models::{Appointment, AvailableTimesQuery, BookAppointmentRequest, SchedulingError, TimeSlot};
use crate::services::booking::AppointmentBookingService;
use crate::services::store::SchedulingStore;

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub store: Arc<SchedulingStore>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, store: Arc<SchedulingStore>) -> Self {
        Self { config, store }
    }

    fn booking_service(&self) -> AppointmentBookingService {
        AppointmentBookingService::new(Arc::clone(&self.store), &self.config)
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::NotFound(_) | SchedulingError::DoctorNotFound(_) => AppError::NotFound(err.to_string()),
            SchedulingError::SlotConflict { .. } | SchedulingError::InvalidStatusTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            SchedulingError::OutOfWindow(_) | SchedulingError::ValidationError(_) => {
                AppError::ValidationError(err.to_string())
            }
            SchedulingError::InvalidTimeSlot(_) => AppError::BadRequest(err.to_string()),
            SchedulingError::PersistenceError(_) => AppError::Storage(err.to_string()),
        }
    }
}

fn labels(times: &[TimeSlot]) -> Vec<&'static str> {
    times.iter().map(TimeSlot::label).collect()
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_times(
    State(state): State<Arc<AppointmentState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .store
        .directory()
        .find_doctor(&doctor_id)
        .ok_or_else(|| SchedulingError::DoctorNotFound(doctor_id.clone()))?;

    let window = state.booking_service().current_window();
    let times = state.store.get_available_times(&doctor_id, query.date).await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "available_times": labels(&times),
        "is_doctor_available": doctor.is_available_on(query.date),
        "is_within_window": window.contains(query.date),
    })))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = require_user(&auth, &state.config.login_path)?;

    let appointment = state
        .booking_service()
        .book_appointment(&user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "redirect_to": state.config.profile_path,
            "message": "Appointment booked successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user = require_user(&auth, &state.config.login_path)?;

    let appointment = state.store.get_appointment(appointment_id).await?;

    // Other users' bookings are reported as missing
    if appointment.user_id != user.id {
        return Err(SchedulingError::NotFound(appointment_id).into());
    }

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user = require_user(&auth, &state.config.login_path)?;

    let existing = state.store.get_appointment(appointment_id).await?;
    if existing.user_id != user.id {
        return Err(SchedulingError::NotFound(appointment_id).into());
    }

    let appointment = state.store.cancel_appointment(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn get_user_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = require_user(&auth, &state.config.login_path)?;

    if user.id != user_id {
        return Err(AppError::Forbidden("Not authorized to view these appointments".to_string()));
    }

    let summary = state.store.get_user_appointment_summary(&user_id).await;
    let lifecycle = state.store.lifecycle();

    let entry = |apt: &Appointment| {
        json!({
            "appointment": apt,
            "can_cancel": lifecycle.can_offer_cancel(apt.status),
        })
    };

    Ok(Json(json!({
        "upcoming": summary.upcoming.iter().map(entry).collect::<Vec<_>>(),
        "past": summary.past.iter().map(entry).collect::<Vec<_>>(),
        "total": summary.upcoming.len() + summary.past.len(),
    })))
}

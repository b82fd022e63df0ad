// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{Appointment, BookAppointmentRequest, NewAppointment, SchedulingError, TimeSlot};
use crate::services::availability::BookingWindow;
use crate::services::store::SchedulingStore;

/// Input-legality gates in front of the store commit. Date window and weekday
/// are checked here; slot integrity is left to the store.
pub struct AppointmentBookingService {
    store: Arc<SchedulingStore>,
    window_days: i64,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<SchedulingStore>, config: &AppConfig) -> Self {
        Self {
            store,
            window_days: config.booking_window_days,
        }
    }

    pub fn with_window_days(store: Arc<SchedulingStore>, window_days: i64) -> Self {
        Self { store, window_days }
    }

    pub fn current_window(&self) -> BookingWindow {
        BookingWindow::from_today(self.window_days)
    }

    /// Rejects dates outside `window` or off the doctor's weekdays.
    pub fn validate_date(
        &self,
        window: &BookingWindow,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<(), SchedulingError> {
        let doctor = self
            .store
            .directory()
            .find_doctor(doctor_id)
            .ok_or_else(|| SchedulingError::DoctorNotFound(doctor_id.to_string()))?;

        window.check_for_doctor(doctor, date)
    }

    pub async fn book(
        &self,
        window: &BookingWindow,
        user_id: &str,
        doctor_id: &str,
        date: NaiveDate,
        time: TimeSlot,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Booking doctor {} on {} at {} for user {}", doctor_id, date, time, user_id);

        self.validate_date(window, doctor_id, date).map_err(|e| {
            warn!("Booking rejected before commit: {}", e);
            e
        })?;

        let doctor = self
            .store
            .directory()
            .find_doctor(doctor_id)
            .ok_or_else(|| SchedulingError::DoctorNotFound(doctor_id.to_string()))?;

        let candidate = NewAppointment::for_doctor(user_id, doctor, date, time);
        let appointment = self.store.add_appointment(candidate).await?;

        info!("User {} booked appointment {}", user_id, appointment.id);
        Ok(appointment)
    }

    /// Books from an API request against today's window.
    pub async fn book_appointment(
        &self,
        user_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let time: TimeSlot = request.time.parse()?;
        let window = self.current_window();

        self.book(&window, user_id, &request.doctor_id, request.date, time).await
    }
}

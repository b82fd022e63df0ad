// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::DoctorDirectory;

use crate::models::{
    Appointment, AppointmentStatus, NewAppointment, SchedulingError, TimeSlot, UserAppointments,
};
use crate::services::availability::{self, check_weekday};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::persistence::{SnapshotStore, StoreSnapshot};

/// Gatekeeper for appointment state.
///
/// Every mutation runs under one lock: re-read the saved snapshot, validate,
/// apply, save the full snapshot, and roll the in-memory change back if the save
/// fails. Mutations are therefore applied one at a time and in call order, and
/// checks see bookings committed by other stores sharing the same storage.
pub struct SchedulingStore {
    directory: Arc<DoctorDirectory>,
    persistence: Arc<dyn SnapshotStore>,
    lifecycle: AppointmentLifecycleService,
    appointments: Mutex<Vec<Appointment>>,
}

impl std::fmt::Debug for SchedulingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingStore").finish_non_exhaustive()
    }
}

impl SchedulingStore {
    /// Restores the store from its last snapshot. A missing snapshot starts empty;
    /// so does a malformed one, with a warning.
    pub async fn load(
        directory: Arc<DoctorDirectory>,
        persistence: Arc<dyn SnapshotStore>,
    ) -> Result<Self, SchedulingError> {
        let appointments = match persistence.load().await? {
            Some(bytes) => match StoreSnapshot::decode(&bytes) {
                Ok(appointments) => appointments,
                Err(e) => {
                    warn!("Discarding unreadable appointment snapshot: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        info!("Scheduling store loaded with {} appointments", appointments.len());

        Ok(Self {
            directory,
            persistence,
            lifecycle: AppointmentLifecycleService::new(),
            appointments: Mutex::new(appointments),
        })
    }

    pub fn directory(&self) -> &DoctorDirectory {
        &self.directory
    }

    pub fn directory_handle(&self) -> Arc<DoctorDirectory> {
        Arc::clone(&self.directory)
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle
    }

    /// Commits a new booking. The slot is re-checked against the saved snapshot
    /// inside the same critical section that appends the record, so two racing
    /// commits cannot both win, even from different stores over one storage.
    #[instrument(skip(self, candidate), fields(doctor_id = %candidate.doctor_id, date = %candidate.date, time = %candidate.time))]
    pub async fn add_appointment(&self, candidate: NewAppointment) -> Result<Appointment, SchedulingError> {
        if candidate.status != AppointmentStatus::Upcoming {
            return Err(SchedulingError::ValidationError(format!(
                "new appointments start as upcoming, got {}",
                candidate.status
            )));
        }
        if candidate.user_id.trim().is_empty() {
            return Err(SchedulingError::ValidationError("user id is required".to_string()));
        }

        let doctor = self
            .directory
            .find_doctor(&candidate.doctor_id)
            .ok_or_else(|| SchedulingError::DoctorNotFound(candidate.doctor_id.clone()))?;
        check_weekday(doctor, candidate.date)?;

        let mut appointments = self.appointments.lock().await;
        let _commit = self.persistence.lock_for_commit().await;
        self.sync_from_storage(&mut appointments).await?;

        if let Some(existing) =
            availability::find_conflict(&appointments, &candidate.doctor_id, candidate.date, candidate.time)
        {
            warn!("Slot already held by appointment {}", existing.id);
            return Err(SchedulingError::SlotConflict {
                doctor_id: candidate.doctor_id,
                date: candidate.date,
                time: candidate.time,
            });
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id: candidate.user_id,
            doctor_id: candidate.doctor_id,
            doctor_name: candidate.doctor_name,
            specialty: candidate.specialty,
            date: candidate.date,
            time: candidate.time,
            status: AppointmentStatus::Upcoming,
            created_at: Utc::now(),
        };

        appointments.push(appointment.clone());
        if let Err(e) = self.persist(&appointments).await {
            appointments.pop();
            return Err(e);
        }

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    /// Marks the appointment cancelled. Repeating the call is a no-op; an unknown
    /// id is reported as `NotFound`.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.transition(id, AppointmentStatus::Cancelled).await
    }

    /// Out-of-band completion, only valid for upcoming appointments.
    #[instrument(skip(self))]
    pub async fn complete_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.transition(id, AppointmentStatus::Completed).await
    }

    async fn transition(&self, id: Uuid, new_status: AppointmentStatus) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.lock().await;
        let _commit = self.persistence.lock_for_commit().await;
        self.sync_from_storage(&mut appointments).await?;

        let index = appointments
            .iter()
            .position(|apt| apt.id == id)
            .ok_or(SchedulingError::NotFound(id))?;

        let previous = appointments[index].status;
        self.lifecycle.validate_status_transition(previous, new_status)?;

        if previous == new_status {
            debug!("Appointment {} already {}", id, new_status);
            return Ok(appointments[index].clone());
        }

        appointments[index].status = new_status;
        if let Err(e) = self.persist(&appointments).await {
            appointments[index].status = previous;
            return Err(e);
        }

        info!("Appointment {} moved from {} to {}", id, previous, new_status);
        Ok(appointments[index].clone())
    }

    /// Catalog slots not held by a non-cancelled booking for this doctor and date.
    /// Weekday availability is not consulted here.
    pub async fn get_available_times(&self, doctor_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
        let appointments = self.current().await;
        let times = availability::available_times(&appointments, doctor_id, date);

        debug!("{} free slots for doctor {} on {}", times.len(), doctor_id, date);
        times
    }

    /// All of a user's appointments in storage order, every status included.
    pub async fn get_user_appointments(&self, user_id: &str) -> Vec<Appointment> {
        self.current()
            .await
            .iter()
            .filter(|apt| apt.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn get_user_appointment_summary(&self, user_id: &str) -> UserAppointments {
        let (past, upcoming) = self
            .get_user_appointments(user_id)
            .await
            .into_iter()
            .partition(|apt| self.lifecycle.is_past(apt.status));

        UserAppointments { upcoming, past }
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.current()
            .await
            .iter()
            .find(|apt| apt.id == id)
            .cloned()
            .ok_or(SchedulingError::NotFound(id))
    }

    pub async fn appointment_count(&self) -> usize {
        self.current().await.len()
    }

    /// Locked view of the appointments, refreshed from storage when it can be read.
    async fn current(&self) -> MutexGuard<'_, Vec<Appointment>> {
        let mut appointments = self.appointments.lock().await;
        if let Err(e) = self.sync_from_storage(&mut appointments).await {
            warn!("Serving cached appointments: {}", e);
        }
        appointments
    }

    /// Replaces the cached list with the last saved snapshot. An absent or
    /// unreadable snapshot leaves the cache as it is.
    async fn sync_from_storage(&self, appointments: &mut Vec<Appointment>) -> Result<(), SchedulingError> {
        let Some(bytes) = self.persistence.load().await? else {
            return Ok(());
        };

        match StoreSnapshot::decode(&bytes) {
            Ok(saved) => *appointments = saved,
            Err(e) => warn!("Ignoring unreadable appointment snapshot: {}", e),
        }
        Ok(())
    }

    async fn persist(&self, appointments: &[Appointment]) -> Result<(), SchedulingError> {
        let snapshot = StoreSnapshot::encode(appointments)?;
        self.persistence.save(&snapshot).await.map_err(|e| {
            warn!("Failed to save appointment snapshot: {}", e);
            SchedulingError::from(e)
        })
    }
}

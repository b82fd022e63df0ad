// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, SchedulingError};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(SchedulingError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status.
    /// Cancelling is accepted from every status and is idempotent.
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Upcoming => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Completed => vec![AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled => vec![AppointmentStatus::Cancelled],
        }
    }

    /// Whether the profile view lists this status under past appointments.
    pub fn is_past(&self, status: AppointmentStatus) -> bool {
        matches!(status, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Only upcoming appointments offer a cancel action in the profile view.
    pub fn can_offer_cancel(&self, status: AppointmentStatus) -> bool {
        status == AppointmentStatus::Upcoming
    }
}

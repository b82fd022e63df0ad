// libs/appointment-cell/src/services/wizard.rs
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use doctor_cell::Doctor;
use shared_config::AppConfig;
use shared_models::auth::AuthContext;

use crate::models::{Appointment, SchedulingError, TimeSlot};
use crate::services::availability::BookingWindow;
use crate::services::booking::AppointmentBookingService;
use crate::services::store::SchedulingStore;
use crate::services::view::ViewScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    SelectDoctor,
    SelectDate,
    SelectTime,
    Committed,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::SelectDoctor => 1,
            WizardStep::SelectDate => 2,
            WizardStep::SelectTime => 3,
            WizardStep::Committed => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::SelectDoctor => "Select Doctor",
            WizardStep::SelectDate => "Choose Date",
            WizardStep::SelectTime => "Pick Time",
            WizardStep::Committed => "Booked",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.title())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub doctor_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<TimeSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardRoutes {
    pub login_path: String,
    pub profile_path: String,
    pub success_redirect_delay: Duration,
}

impl WizardRoutes {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            profile_path: config.profile_path.clone(),
            success_redirect_delay: Duration::from_millis(config.success_redirect_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed {
        appointment: Appointment,
        redirect_to: String,
        redirect_after: Duration,
    },
    /// Nothing was booked; the commit resumes once the user has signed in.
    AuthenticationRequired { redirect_to: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("Please select a doctor to continue")]
    DoctorRequired,

    #[error("Please choose a date to continue")]
    DateRequired,

    #[error("Please pick a time slot")]
    TimeRequired,

    #[error("No available time slots for this date. Please select a different date.")]
    NoAvailableTimes,

    #[error("Cannot {action} on step {step}")]
    InvalidTransition { step: WizardStep, action: &'static str },

    #[error("This appointment has already been booked")]
    AlreadyCommitted,

    #[error("No booking is waiting for sign-in")]
    NothingToResume,
}

/// The doctor → date → time booking flow.
///
/// Holds only transient selection state; every read of bookings goes through
/// the store, and the final commit is the store's compare-and-set. Changing an
/// upstream choice clears the ones below it; moving back and forth does not.
pub struct BookingWizard {
    store: Arc<SchedulingStore>,
    booking: AppointmentBookingService,
    window: BookingWindow,
    routes: WizardRoutes,
    step: WizardStep,
    selection: Selection,
    awaiting_authentication: bool,
    notice: Option<WizardError>,
    committed: Option<Appointment>,
}

impl BookingWizard {
    pub fn new(store: Arc<SchedulingStore>, window: BookingWindow, routes: WizardRoutes) -> Self {
        let window_days = (window.last_day() - window.first_day()).num_days();

        Self {
            booking: AppointmentBookingService::with_window_days(Arc::clone(&store), window_days),
            store,
            window,
            routes,
            step: WizardStep::SelectDoctor,
            selection: Selection::default(),
            awaiting_authentication: false,
            notice: None,
            committed: None,
        }
    }

    pub fn from_config(store: Arc<SchedulingStore>, config: &AppConfig, today: NaiveDate) -> Self {
        Self::new(
            store,
            BookingWindow::new(today, config.booking_window_days),
            WizardRoutes::from_config(config),
        )
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Inline explanation for the last rejected action, cleared by the next accepted one.
    pub fn notice(&self) -> Option<&WizardError> {
        self.notice.as_ref()
    }

    pub fn window(&self) -> &BookingWindow {
        &self.window
    }

    pub fn is_awaiting_authentication(&self) -> bool {
        self.awaiting_authentication
    }

    pub fn committed_appointment(&self) -> Option<&Appointment> {
        self.committed.as_ref()
    }

    pub fn doctors(&self) -> &[Doctor] {
        self.store.directory().list_doctors()
    }

    pub fn selected_doctor(&self) -> Option<&Doctor> {
        self.selection
            .doctor_id
            .as_deref()
            .and_then(|id| self.store.directory().find_doctor(id))
    }

    // ==========================================================================
    // STEP 1: DOCTOR
    // ==========================================================================

    pub fn select_doctor(&mut self, doctor_id: &str) -> Result<(), WizardError> {
        self.require_step(WizardStep::SelectDoctor, "select a doctor")?;

        if self.store.directory().find_doctor(doctor_id).is_none() {
            return Err(self.reject(SchedulingError::DoctorNotFound(doctor_id.to_string()).into()));
        }

        if self.selection.doctor_id.as_deref() != Some(doctor_id) {
            debug!("Doctor changed to {}, clearing date and time", doctor_id);
            self.selection = Selection {
                doctor_id: Some(doctor_id.to_string()),
                date: None,
                time: None,
            };
        }

        self.notice = None;
        Ok(())
    }

    pub fn continue_to_date(&mut self) -> Result<(), WizardError> {
        self.require_step(WizardStep::SelectDoctor, "continue to date selection")?;

        if self.selection.doctor_id.is_none() {
            return Err(self.reject(WizardError::DoctorRequired));
        }

        self.advance(WizardStep::SelectDate);
        Ok(())
    }

    // ==========================================================================
    // STEP 2: DATE
    // ==========================================================================

    /// Dates the picker should leave enabled for the chosen doctor.
    pub fn selectable_dates(&self) -> Vec<NaiveDate> {
        self.selected_doctor()
            .map(|doctor| self.window.selectable_dates(doctor))
            .unwrap_or_default()
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), WizardError> {
        self.require_step(WizardStep::SelectDate, "choose a date")?;
        self.check_date(date)?;

        if self.selection.date != Some(date) {
            self.selection.date = Some(date);
            self.selection.time = None;
        }

        self.notice = None;
        Ok(())
    }

    pub fn continue_to_time(&mut self) -> Result<(), WizardError> {
        self.require_step(WizardStep::SelectDate, "continue to time selection")?;

        let Some(date) = self.selection.date else {
            return Err(self.reject(WizardError::DateRequired));
        };
        self.check_date(date)?;

        self.advance(WizardStep::SelectTime);
        Ok(())
    }

    // ==========================================================================
    // STEP 3: TIME
    // ==========================================================================

    /// Free slots for the current doctor and date, empty until both are chosen.
    pub async fn available_times(&self) -> Vec<TimeSlot> {
        match (&self.selection.doctor_id, self.selection.date) {
            (Some(doctor_id), Some(date)) => self.store.get_available_times(doctor_id, date).await,
            _ => Vec::new(),
        }
    }

    pub async fn select_time(&mut self, time: TimeSlot) -> Result<(), WizardError> {
        self.require_step(WizardStep::SelectTime, "pick a time")?;

        let available = self.available_times().await;
        if available.is_empty() {
            return Err(self.reject(WizardError::NoAvailableTimes));
        }
        if !available.contains(&time) {
            let err = self.slot_taken(time);
            return Err(self.reject(err));
        }

        self.selection.time = Some(time);
        self.notice = None;
        Ok(())
    }

    // ==========================================================================
    // NAVIGATION & COMMIT
    // ==========================================================================

    /// Steps back one page. Selections are kept.
    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.step = match self.step {
            WizardStep::Committed => return Err(WizardError::AlreadyCommitted),
            WizardStep::SelectTime => WizardStep::SelectDate,
            WizardStep::SelectDate | WizardStep::SelectDoctor => WizardStep::SelectDoctor,
        };

        self.awaiting_authentication = false;
        self.notice = None;
        Ok(self.step)
    }

    pub async fn commit(&mut self, auth: &AuthContext) -> Result<CommitOutcome, WizardError> {
        if self.step == WizardStep::Committed {
            return Err(self.reject(WizardError::AlreadyCommitted));
        }
        self.require_step(WizardStep::SelectTime, "confirm the booking")?;

        // Sign-in comes before any selection check
        let Some(user_id) = auth.user_id().map(str::to_string) else {
            info!("Booking needs sign-in, redirecting to {}", self.routes.login_path);
            self.awaiting_authentication = true;
            self.notice = None;
            return Ok(CommitOutcome::AuthenticationRequired {
                redirect_to: self.routes.login_path.clone(),
            });
        };

        let Some(doctor_id) = self.selection.doctor_id.clone() else {
            return Err(self.reject(WizardError::DoctorRequired));
        };
        let Some(date) = self.selection.date else {
            return Err(self.reject(WizardError::DateRequired));
        };
        self.check_date(date)?;

        let available = self.store.get_available_times(&doctor_id, date).await;
        if available.is_empty() {
            return Err(self.reject(WizardError::NoAvailableTimes));
        }

        let Some(time) = self.selection.time else {
            return Err(self.reject(WizardError::TimeRequired));
        };
        if !available.contains(&time) {
            self.selection.time = None;
            let err = self.slot_taken(time);
            return Err(self.reject(err));
        }

        let booked = self.booking.book(&self.window, &user_id, &doctor_id, date, time).await;
        match booked {
            Ok(appointment) => {
                self.step = WizardStep::Committed;
                self.awaiting_authentication = false;
                self.notice = None;
                self.committed = Some(appointment.clone());

                Ok(CommitOutcome::Committed {
                    appointment,
                    redirect_to: self.routes.profile_path.clone(),
                    redirect_after: self.routes.success_redirect_delay,
                })
            }
            Err(e @ SchedulingError::SlotConflict { .. }) => {
                self.selection.time = None;
                Err(self.reject(e.into()))
            }
            Err(e) => Err(self.reject(e.into())),
        }
    }

    /// Picks up a commit that was parked on the sign-in redirect.
    pub async fn resume_after_authentication(&mut self, auth: &AuthContext) -> Result<CommitOutcome, WizardError> {
        if !self.awaiting_authentication {
            return Err(WizardError::NothingToResume);
        }

        self.commit(auth).await
    }

    /// Schedules the post-booking navigation on `scope`; tearing the view down
    /// before the delay elapses cancels it.
    pub fn schedule_success_redirect<F>(
        scope: &ViewScope,
        outcome: &CommitOutcome,
        navigate: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(String) + Send + 'static,
    {
        match outcome {
            CommitOutcome::Committed {
                redirect_to,
                redirect_after,
                ..
            } => {
                let target = redirect_to.clone();
                scope.spawn_after(*redirect_after, async move { navigate(target) })
            }
            CommitOutcome::AuthenticationRequired { .. } => None,
        }
    }

    fn check_date(&mut self, date: NaiveDate) -> Result<(), WizardError> {
        let Some(doctor_id) = self.selection.doctor_id.clone() else {
            return Err(self.reject(WizardError::DoctorRequired));
        };

        self.booking
            .validate_date(&self.window, &doctor_id, date)
            .map_err(|e| self.reject(e.into()))
    }

    fn slot_taken(&self, time: TimeSlot) -> WizardError {
        SchedulingError::SlotConflict {
            doctor_id: self.selection.doctor_id.clone().unwrap_or_default(),
            date: self.selection.date.unwrap_or(self.window.first_day()),
            time,
        }
        .into()
    }

    fn require_step(&mut self, expected: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == expected {
            return Ok(());
        }
        let err = if self.step == WizardStep::Committed {
            WizardError::AlreadyCommitted
        } else {
            WizardError::InvalidTransition { step: self.step, action }
        };
        Err(self.reject(err))
    }

    fn advance(&mut self, to: WizardStep) {
        debug!("Wizard moving from step {} to {}", self.step, to);
        self.step = to;
        self.notice = None;
    }

    fn reject(&mut self, err: WizardError) -> WizardError {
        debug!("Wizard rejected action on step {}: {}", self.step, err);
        self.notice = Some(err.clone());
        err
    }
}

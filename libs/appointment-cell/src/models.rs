// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::Doctor;

// ==============================================================================
// TIME SLOT CATALOG
// ==============================================================================

/// Daily slot grid shared by every doctor and date: two half-hour blocks with a
/// lunch gap between 11:30 AM and 02:00 PM.
const SLOT_CATALOG: [(&str, u32, u32); 12] = [
    ("09:00 AM", 9, 0),
    ("09:30 AM", 9, 30),
    ("10:00 AM", 10, 0),
    ("10:30 AM", 10, 30),
    ("11:00 AM", 11, 0),
    ("11:30 AM", 11, 30),
    ("02:00 PM", 14, 0),
    ("02:30 PM", 14, 30),
    ("03:00 PM", 15, 0),
    ("03:30 PM", 15, 30),
    ("04:00 PM", 16, 0),
    ("04:30 PM", 16, 30),
];

/// One label from the fixed daily catalog. Ordering follows the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(usize);

impl TimeSlot {
    pub const COUNT: usize = SLOT_CATALOG.len();

    /// Every slot of the day, in catalog order.
    pub fn catalog() -> Vec<TimeSlot> {
        (0..Self::COUNT).map(TimeSlot).collect()
    }

    pub fn parse(label: &str) -> Option<TimeSlot> {
        let label = label.trim();
        SLOT_CATALOG
            .iter()
            .position(|(l, _, _)| l.eq_ignore_ascii_case(label))
            .map(TimeSlot)
    }

    pub fn label(&self) -> &'static str {
        SLOT_CATALOG[self.0].0
    }

    pub fn start_time(&self) -> NaiveTime {
        let (_, hour, minute) = SLOT_CATALOG[self.0];
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
    }

    pub fn is_morning(&self) -> bool {
        SLOT_CATALOG[self.0].1 < 12
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeSlot {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::parse(s).ok_or_else(|| SchedulingError::InvalidTimeSlot(s.to_string()))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = SchedulingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.label().to_string()
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub time: TimeSlot,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this booking holds the given (doctor, date, time) slot. Cancelled
    /// bookings never hold a slot.
    pub fn occupies(&self, doctor_id: &str, date: NaiveDate, time: TimeSlot) -> bool {
        self.status.is_active() && self.doctor_id == doctor_id && self.date == date && self.time == time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Upcoming => write!(f, "upcoming"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A booking as the caller hands it over, before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub user_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub time: TimeSlot,
    pub status: AppointmentStatus,
}

impl NewAppointment {
    /// Upcoming booking with the doctor's name and specialty snapshotted.
    pub fn for_doctor(user_id: &str, doctor: &Doctor, date: NaiveDate, time: TimeSlot) -> Self {
        Self {
            user_id: user_id.to_string(),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            date,
            time,
            status: AppointmentStatus::Upcoming,
        }
    }
}

/// A user's bookings split the way the profile view shows them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAppointments {
    pub upcoming: Vec<Appointment>,
    pub past: Vec<Appointment>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableTimesQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Doctor {0} not found")]
    DoctorNotFound(String),

    #[error("{time} on {date} is already booked with doctor {doctor_id}")]
    SlotConflict {
        doctor_id: String,
        date: NaiveDate,
        time: TimeSlot,
    },

    #[error("Date not bookable: {0}")]
    OutOfWindow(String),

    #[error("'{0}' is not a clinic time slot")]
    InvalidTimeSlot(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

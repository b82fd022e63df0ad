use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub image: Option<String>,
    pub availability: Vec<Weekday>,
}

impl Doctor {
    pub fn new(
        id: &str,
        name: &str,
        specialty: &str,
        image: Option<&str>,
        availability: &[Weekday],
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            specialty: specialty.to_string(),
            image: image.map(str::to_string),
            availability: availability.to_vec(),
        }
    }

    /// True iff the weekday of `date` is one the doctor accepts bookings on.
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        self.availability.contains(&date.weekday())
    }

    /// Full weekday names in the doctor's listed order, e.g. "Monday".
    pub fn availability_labels(&self) -> Vec<&'static str> {
        self.availability.iter().copied().map(weekday_name).collect()
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub image: Option<String>,
    pub availability: Vec<String>,
}

impl From<&Doctor> for DoctorSummary {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id.clone(),
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            image: doctor.image.clone(),
            availability: doctor
                .availability_labels()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Doctor id '{0}' appears more than once")]
    DuplicateDoctor(String),

    #[error("Doctor '{0}' has no available weekdays")]
    EmptyAvailability(String),

    #[error("Doctor id must not be empty")]
    MissingId,

    #[error("Failed to read doctor directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse doctor directory: {0}")]
    Parse(#[from] serde_json::Error),
}

use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, Weekday};
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{DirectoryError, Doctor};

/// Read-only catalog of the clinic's doctors, kept in insertion order.
#[derive(Debug, Clone)]
pub struct DoctorDirectory {
    doctors: Vec<Doctor>,
}

impl DoctorDirectory {
    pub fn new(doctors: Vec<Doctor>) -> Result<Self, DirectoryError> {
        let mut seen = HashSet::new();

        for doctor in &doctors {
            if doctor.id.trim().is_empty() {
                return Err(DirectoryError::MissingId);
            }
            if !seen.insert(doctor.id.as_str()) {
                return Err(DirectoryError::DuplicateDoctor(doctor.id.clone()));
            }
            if doctor.availability.is_empty() {
                return Err(DirectoryError::EmptyAvailability(doctor.id.clone()));
            }
        }

        Ok(Self { doctors })
    }

    /// The four doctors the clinic ships with.
    pub fn clinic_default() -> Self {
        use Weekday::*;

        Self {
            doctors: vec![
                Doctor::new(
                    "1",
                    "Dr. Sarah Johnson",
                    "General Medicine",
                    Some("/female-doctor.png"),
                    &[Mon, Tue, Wed, Thu, Fri],
                ),
                Doctor::new(
                    "2",
                    "Dr. Michael Chen",
                    "Cardiology",
                    Some("/male-doctor-cardiologist.jpg"),
                    &[Mon, Wed, Fri],
                ),
                Doctor::new(
                    "3",
                    "Dr. Emily Williams",
                    "Pediatrics",
                    Some("/female-pediatrician.png"),
                    &[Tue, Thu, Fri],
                ),
                Doctor::new(
                    "4",
                    "Dr. James Brown",
                    "Orthopedics",
                    Some("/male-orthopedic-doctor.png"),
                    &[Mon, Tue, Thu],
                ),
            ],
        }
    }

    pub async fn from_json_file(path: &Path) -> Result<Self, DirectoryError> {
        debug!("Loading doctor directory from {}", path.display());

        let raw = tokio::fs::read(path).await?;
        let doctors: Vec<Doctor> = serde_json::from_slice(&raw)?;
        Self::new(doctors)
    }

    /// Uses the configured directory file when one is set, the built-in clinic otherwise.
    pub async fn from_config(config: &AppConfig) -> Result<Self, DirectoryError> {
        let directory = match &config.doctor_directory_path {
            Some(path) => Self::from_json_file(path).await?,
            None => Self::clinic_default(),
        };

        info!("Doctor directory ready with {} doctors", directory.len());
        Ok(directory)
    }

    pub fn list_doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn find_doctor(&self, doctor_id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == doctor_id)
    }

    pub fn is_available_on_weekday(&self, doctor: &Doctor, date: NaiveDate) -> bool {
        doctor.is_available_on(date)
    }

    pub fn by_specialty(&self, specialty: &str) -> Vec<&Doctor> {
        self.doctors
            .iter()
            .filter(|d| d.specialty.eq_ignore_ascii_case(specialty))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.doctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty()
    }
}

impl Default for DoctorDirectory {
    fn default() -> Self {
        Self::clinic_default()
    }
}

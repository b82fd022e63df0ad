// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;

use chrono::{Duration, Local, NaiveDate};

use doctor_cell::{weekday_name, Doctor};

use crate::models::{Appointment, SchedulingError, TimeSlot};

/// Times already held by non-cancelled bookings for one doctor on one date.
pub fn booked_times(appointments: &[Appointment], doctor_id: &str, date: NaiveDate) -> HashSet<TimeSlot> {
    appointments
        .iter()
        .filter(|apt| apt.status.is_active() && apt.doctor_id == doctor_id && apt.date == date)
        .map(|apt| apt.time)
        .collect()
}

/// The slot catalog minus booked times, in catalog order.
pub fn available_times(appointments: &[Appointment], doctor_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
    let booked = booked_times(appointments, doctor_id, date);

    TimeSlot::catalog()
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect()
}

pub fn find_conflict<'a>(
    appointments: &'a [Appointment],
    doctor_id: &str,
    date: NaiveDate,
    time: TimeSlot,
) -> Option<&'a Appointment> {
    appointments.iter().find(|apt| apt.occupies(doctor_id, date, time))
}

pub fn check_weekday(doctor: &Doctor, date: NaiveDate) -> Result<(), SchedulingError> {
    if doctor.is_available_on(date) {
        return Ok(());
    }

    Err(SchedulingError::OutOfWindow(format!(
        "{} does not see patients on {}s (available: {})",
        doctor.name,
        weekday_name(chrono::Datelike::weekday(&date)),
        doctor.availability_labels().join(", ")
    )))
}

/// Inclusive range of dates open for booking: today through today + `days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl BookingWindow {
    pub fn new(today: NaiveDate, days: i64) -> Self {
        Self {
            first_day: today,
            last_day: today + Duration::days(days.max(0)),
        }
    }

    /// Window anchored on the local calendar date.
    pub fn from_today(days: i64) -> Self {
        Self::new(Local::now().date_naive(), days)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day && date <= self.last_day
    }

    pub fn check(&self, date: NaiveDate) -> Result<(), SchedulingError> {
        if date < self.first_day {
            return Err(SchedulingError::OutOfWindow(format!(
                "{} is in the past",
                date.format("%B %d, %Y")
            )));
        }
        if date > self.last_day {
            return Err(SchedulingError::OutOfWindow(format!(
                "{} is after the last bookable day, {}",
                date.format("%B %d, %Y"),
                self.last_day.format("%B %d, %Y")
            )));
        }
        Ok(())
    }

    /// Both date gates a booking must pass before it reaches the store.
    pub fn check_for_doctor(&self, doctor: &Doctor, date: NaiveDate) -> Result<(), SchedulingError> {
        self.check(date)?;
        check_weekday(doctor, date)
    }

    /// Dates in the window the doctor works on, i.e. the ones a date picker leaves enabled.
    pub fn selectable_dates(&self, doctor: &Doctor) -> Vec<NaiveDate> {
        self.first_day
            .iter_days()
            .take_while(|d| *d <= self.last_day)
            .filter(|d| doctor.is_available_on(*d))
            .collect()
    }
}

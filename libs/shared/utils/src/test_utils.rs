use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthContext, User};

pub struct TestConfig {
    pub storage_path: PathBuf,
    pub booking_window_days: i64,
    pub success_redirect_delay_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            storage_path: std::env::temp_dir().join(format!("appointments-{}.json", Uuid::new_v4())),
            booking_window_days: 60,
            success_redirect_delay_ms: 10,
        }
    }
}

impl TestConfig {
    pub fn with_storage(path: &Path) -> Self {
        Self {
            storage_path: path.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            storage_path: self.storage_path.clone(),
            booking_window_days: self.booking_window_days,
            success_redirect_delay_ms: self.success_redirect_delay_ms,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("Demo User", "demo@clinic.com")
    }
}

impl TestUser {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            email: Some(self.email.clone()),
        }
    }

    pub fn auth_context(&self) -> AuthContext {
        AuthContext::signed_in(self.to_user())
    }
}

pub struct TestDates;

impl TestDates {
    /// Monday 2025-03-10, the reference day most scheduling tests book against.
    pub fn reference_monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid reference date")
    }

    /// First date on or after `from` that falls on `weekday`.
    pub fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
        let offset = (7 + weekday.num_days_from_monday() as i64
            - from.weekday().num_days_from_monday() as i64)
            % 7;
        from + Duration::days(offset)
    }
}

pub struct MockBookingPayloads;

impl MockBookingPayloads {
    pub fn booking_request(doctor_id: &str, date: NaiveDate, time: &str) -> serde_json::Value {
        json!({
            "doctor_id": doctor_id,
            "date": date.format("%Y-%m-%d").to_string(),
            "time": time,
        })
    }
}

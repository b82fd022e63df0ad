use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_STORAGE_PATH: &str = "data/appointment-storage.json";
pub const DEFAULT_BOOKING_WINDOW_DAYS: i64 = 60;
pub const DEFAULT_SUCCESS_REDIRECT_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_path: PathBuf,
    pub doctor_directory_path: Option<PathBuf>,
    pub booking_window_days: i64,
    pub login_path: String,
    pub profile_path: String,
    pub success_redirect_delay_ms: u64,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            doctor_directory_path: None,
            booking_window_days: DEFAULT_BOOKING_WINDOW_DAYS,
            login_path: "/login".to_string(),
            profile_path: "/profile".to_string(),
            success_redirect_delay_ms: DEFAULT_SUCCESS_REDIRECT_DELAY_MS,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            storage_path: env::var("APPOINTMENT_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    warn!("APPOINTMENT_STORAGE_PATH not set, using {}", DEFAULT_STORAGE_PATH);
                    defaults.storage_path.clone()
                }),
            doctor_directory_path: env::var("DOCTOR_DIRECTORY_PATH").ok().map(PathBuf::from),
            booking_window_days: parse_or_default(
                "BOOKING_WINDOW_DAYS",
                defaults.booking_window_days,
            ),
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| {
                warn!("LOGIN_PATH not set, using default");
                defaults.login_path.clone()
            }),
            profile_path: env::var("PROFILE_PATH").unwrap_or_else(|_| {
                warn!("PROFILE_PATH not set, using default");
                defaults.profile_path.clone()
            }),
            success_redirect_delay_ms: parse_or_default(
                "SUCCESS_REDIRECT_DELAY_MS",
                defaults.success_redirect_delay_ms,
            ),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| {
                warn!("BIND_ADDR not set, using default");
                defaults.bind_addr.clone()
            }),
        };

        if !config.is_configured() {
            warn!("Booking window must be positive, got {}", config.booking_window_days);
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.booking_window_days > 0 && !self.login_path.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using {}", key, default);
            default
        }
    }
}

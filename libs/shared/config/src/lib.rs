use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::warn;

/// Which persistence backend the stores are wired against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            "supabase" | "postgres" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub frontend_url: String,
    pub slot_hold_minutes: i64,
    pub max_slots_per_batch: usize,
    pub availability_horizon_days: i64,
    pub max_query_window_days: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            storage_backend: StorageBackend::Memory,
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            jwt_secret: String::new(),
            jwt_expiry_hours: 24,
            frontend_url: "http://localhost:5173".to_string(),
            slot_hold_minutes: 10,
            max_slots_per_batch: 100,
            availability_horizon_days: 365,
            max_query_window_days: 366,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            port: parse_or("PORT", defaults.port),
            storage_backend: env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, falling back to in-memory storage", e);
                        None
                    }
                })
                .unwrap_or(defaults.storage_backend),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            jwt_expiry_hours: parse_within("JWT_EXPIRY_HOURS", defaults.jwt_expiry_hours, 1..=720),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| {
                    warn!("FRONTEND_URL not set, using default");
                    defaults.frontend_url.clone()
                }),
            slot_hold_minutes: parse_within("SLOT_HOLD_MINUTES", defaults.slot_hold_minutes, 1..=1440),
            max_slots_per_batch: parse_within("MAX_SLOTS_PER_BATCH", defaults.max_slots_per_batch, 1..=1000),
            availability_horizon_days: parse_within(
                "AVAILABILITY_HORIZON_DAYS",
                defaults.availability_horizon_days,
                1..=3660,
            ),
            max_query_window_days: parse_within("MAX_QUERY_WINDOW_DAYS", defaults.max_query_window_days, 1..=3660),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        if self.jwt_secret.is_empty() {
            return false;
        }
        match self.storage_backend {
            StorageBackend::Memory => true,
            StorageBackend::Supabase => self.is_supabase_configured(),
        }
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }
}

fn parse_or<T: FromStr + Copy + Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_within<T: FromStr + Copy + Display + PartialOrd>(key: &str, default: T, range: RangeInclusive<T>) -> T {
    within(key, parse_or(key, default), default, range)
}

/// Keeps `value` when it lies in `range`, otherwise warns and uses `default`.
fn within<T: Copy + Display + PartialOrd>(key: &str, value: T, default: T, range: RangeInclusive<T>) -> T {
    if range.contains(&value) {
        value
    } else {
        warn!(
            "{} value {} is outside {}..={}, using default {}",
            key, value, range.start(), range.end(), default
        );
        default
    }
}

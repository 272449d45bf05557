use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::with_security_headers;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/pokerclub";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_VOUCHER_VALIDITY_DAYS: i64 = 30;
const MAX_VOUCHER_VALIDITY_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub port: u16,
    pub max_connections: u32,
    pub voucher_validity_days: i64,
    pub cors_allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            store_backend: parse_or(&lookup, "STORE_BACKEND", StoreBackend::Postgres),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            voucher_validity_days: voucher_validity_days(&lookup),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| cors::DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        }
    }

    pub fn voucher_validity(&self) -> Duration {
        Duration::days(
            self.voucher_validity_days
                .clamp(1, MAX_VOUCHER_VALIDITY_DAYS),
        )
    }
}

fn voucher_validity_days<F>(lookup: &F) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    let days = parse_or(lookup, "VOUCHER_VALIDITY_DAYS", DEFAULT_VOUCHER_VALIDITY_DAYS);
    if (1..=MAX_VOUCHER_VALIDITY_DAYS).contains(&days) {
        days
    } else {
        tracing::warn!(
            "VOUCHER_VALIDITY_DAYS must be between 1 and {MAX_VOUCHER_VALIDITY_DAYS}, got {days}, using default {DEFAULT_VOUCHER_VALIDITY_DAYS}"
        );
        DEFAULT_VOUCHER_VALIDITY_DAYS
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {key} value '{raw}': {e}, using default {default}");
            default
        }),
        None => default,
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Postgres => write!(f, "postgres"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

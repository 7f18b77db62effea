use anyhow::{bail, Context};
use serde::Deserialize;

use crate::{lessons::generator::ScheduleConfig, tz::LocalZone};

pub const DEFAULT_TIMEZONE: &str = "Europe/Vienna";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    /// IANA zone used for "today", recurrence rules and calendar windows.
    pub timezone: String,
    /// Mount point for the API routes; empty mounts them at the root.
    pub api_prefix: String,
    pub reminder_window_hours: i64,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "jget".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "jget-users".into()),
            ttl_minutes: var_or("JWT_TTL_MINUTES", 30),
            refresh_ttl_minutes: var_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 30),
        };
        let timezone =
            std::env::var("TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let config = Self {
            database_url,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 10),
            jwt,
            timezone,
            api_prefix: normalize_prefix(&std::env::var("API_PREFIX").unwrap_or_default()),
            reminder_window_hours: var_or("REMINDER_WINDOW_HOURS", 24),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if LocalZone::named(&self.timezone).is_none() {
            bail!("TIMEZONE {:?} is not a known IANA zone", self.timezone);
        }
        if self.jwt.ttl_minutes <= 0 || self.jwt.refresh_ttl_minutes <= 0 {
            bail!("JWT token lifetimes must be positive");
        }
        Ok(())
    }

    pub fn zone(&self) -> anyhow::Result<LocalZone> {
        LocalZone::named(&self.timezone)
            .with_context(|| format!("unknown timezone {:?}", self.timezone))
    }

    pub fn schedule(&self) -> anyhow::Result<ScheduleConfig> {
        Ok(ScheduleConfig::new(self.zone()?))
    }
}

/// `"api/v1/"` becomes `"/api/v1"`; blank stays blank.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

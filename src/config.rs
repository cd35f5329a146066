use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::leave::EngineSettings;
use crate::leave::overlap::DEFAULT_OVERLAP_THRESHOLD;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    // Leave policy
    pub leave_overlap_threshold: u32,
    pub leave_auto_approval_overlap_threshold: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,

            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            leave_overlap_threshold: parse_or(
                &lookup,
                "LEAVE_OVERLAP_THRESHOLD",
                DEFAULT_OVERLAP_THRESHOLD,
            )?,
            leave_auto_approval_overlap_threshold: parse_or(
                &lookup,
                "LEAVE_AUTO_APPROVAL_OVERLAP_THRESHOLD",
                DEFAULT_OVERLAP_THRESHOLD,
            )?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            approval_overlap_threshold: self.leave_overlap_threshold,
            auto_approval_overlap_threshold: self.leave_auto_approval_overlap_threshold,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

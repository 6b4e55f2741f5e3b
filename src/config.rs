//! Environment-derived startup configuration.
//!
//! Two values are required and their absence is startup-fatal: the token
//! signing secret (`SECRET`) and the SQLite database path (`DATABASE_PATH`).
//! A process that cannot sign tokens cannot serve logins, so it refuses to
//! start rather than limping along and failing per-request.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default bind address — loopback only.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 3001;

/// Resolved process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token signing secret. Required.
    pub secret: String,
    /// Path to the SQLite database file. Required.
    pub database_path: PathBuf,
    /// Bind address, default `127.0.0.1`.
    pub host: String,
    /// Bind port, default `3001`.
    pub port: u16,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a lookup function. Keeps parsing testable
    /// without mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = lookup("SECRET")
            .filter(|v| !v.trim().is_empty())
            .context("SECRET is not set — cannot sign tokens without it")?;

        let database_path: PathBuf = lookup("DATABASE_PATH")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_PATH is not set")?
            .into();

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            secret,
            database_path,
            host,
            port,
        })
    }
}

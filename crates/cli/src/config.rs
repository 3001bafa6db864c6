//! Environment-driven configuration.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const DATA_DIR_VAR: &str = "SOLSTICE_DATA_DIR";
pub const SECRET_VAR: &str = "SOLSTICE_SECRET";
pub const ADMIN_PASSWORD_VAR: &str = "SOLSTICE_ADMIN_PASSWORD";

/// Startup configuration for the terminal client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the JSON stores and the session file.
    pub data_dir: PathBuf,

    /// Shared token-signing secret. Must be non-empty; a misconfigured
    /// secret aborts startup rather than failing on every call.
    pub secret: String,

    /// Password used to seed the initial `admin` user on first run.
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let secret = std::env::var(SECRET_VAR)
            .with_context(|| format!("{SECRET_VAR} must be set"))?;
        if secret.trim().is_empty() {
            bail!("{SECRET_VAR} must not be empty");
        }

        let admin_password = std::env::var(ADMIN_PASSWORD_VAR).ok();

        Ok(Self {
            data_dir,
            secret,
            admin_password,
        })
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session")
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }
}

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Optional path to a roster seed file (users and employees).
    /// If not set, the built-in seed roster is used.
    pub seed_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let seed_path = parse_seed_path(env::var("SEED_PATH").ok());

        Ok(Config {
            port,
            state_dir,
            seed_path,
        })
    }
}

/// Parse SEED_PATH from an optional string value.
///
/// Returns None if the value is missing, empty, or contains only whitespace,
/// so that `SEED_PATH=""` behaves the same as leaving it unset.
pub fn parse_seed_path(value: Option<String>) -> Option<PathBuf> {
    value.filter(|s| !s.trim().is_empty()).map(PathBuf::from)
}

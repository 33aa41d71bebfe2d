// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading the config file,
//! the keyword list and the bot credentials.

use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::Credentials;

/// Load configuration from a TOML file.
///
/// Unlike [`Config::load_or_default`], an unreadable or malformed file is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path)
        .map_err(|e| AppError::config(format!("Failed to load config from {path:?}: {e}")))
}

/// Read a keyword file: one keyword per line, blank lines dropped.
pub fn load_keywords(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read keywords from {path:?}: {e}")))?;
    Ok(parse_keywords(&content))
}

fn parse_keywords(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load the config file, merge in the keyword file when it exists, and validate.
pub fn load_all(config_path: &Path, keywords_path: &Path) -> Result<Config> {
    let mut config = load_config(config_path)?;

    if keywords_path.exists() {
        let keywords = load_keywords(keywords_path)?;
        log::info!(
            "Loaded {} keyword(s) from {}",
            keywords.len(),
            keywords_path.display()
        );
        config.extend_keywords(keywords);
    } else {
        log::debug!("No keyword file at {}", keywords_path.display());
    }

    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;
    Ok(config)
}

/// Bot credentials from the `TOKEN` and `CHAT_ID` environment variables.
pub fn load_credentials() -> Result<Credentials> {
    Credentials::from_env()
}

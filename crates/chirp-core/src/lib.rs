//! Core types and configuration for chirp.
//!
//! This crate provides platform-agnostic types that can be used across
//! all chirp sub-crates.

mod clip;
mod config;
mod state;

pub use clip::{AudioClip, mime_for_extension};
pub use config::{Config, ConfigManager};
pub use state::SubmissionState;

/// Application name
pub const APP_NAME: &str = "chirp";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Chirp";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable that overrides the classification endpoint.
pub const API_URL_ENV: &str = "CHIRP_API_URL";

/// Endpoint used when neither the environment nor the config file name one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

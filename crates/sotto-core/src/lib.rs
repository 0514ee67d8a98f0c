//! Core types and configuration for sotto.
//!
//! This crate provides platform-agnostic types that can be used across
//! all sotto sub-crates.

mod config;
mod hotkey;
mod state;

pub use config::{models_dir, Config, ConfigManager};
pub use hotkey::HotkeyBinding;
pub use state::MicState;

/// Application name
pub const APP_NAME: &str = "sotto";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Sotto";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

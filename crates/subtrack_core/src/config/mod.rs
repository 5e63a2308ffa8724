//! Configuration management.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation through `Settings::to_track_options` before anything is kept or written
//! - User comments preserved across section updates
//!
//! # Example
//!
//! ```no_run
//! use subtrack_core::config::{ConfigManager, ConfigSection};
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new(".config/subtrack.toml");
//! config.load_or_create().unwrap();
//!
//! // Runtime options for the catalog
//! let options = config.settings().to_track_options().unwrap();
//!
//! // Modify a setting and save just that section atomically
//! config.settings_mut().discovery.lyrics_enabled = true;
//! config.update_section(ConfigSection::Discovery).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, EncodingSettings, LoggingSettings, Settings, TimelineSettings};

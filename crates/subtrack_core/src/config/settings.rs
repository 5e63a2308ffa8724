//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::subtitles::discovery::DiscoveryOptions;
use crate::subtitles::{EncodingHint, IntervalPolicy, SubtitleResult, TimelineOptions, TrackOptions};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Sidecar discovery rules.
    #[serde(default)]
    pub discovery: DiscoveryOptions,

    /// Text encoding fallback.
    #[serde(default)]
    pub encoding: EncodingSettings,

    /// Timeline construction.
    #[serde(default)]
    pub timeline: TimelineSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Runtime options for discovery and track loading.
    ///
    /// Fails if the configured encoding label is unknown.
    pub fn to_track_options(&self) -> SubtitleResult<TrackOptions> {
        let encoding = EncodingHint::from_label(&self.encoding.default_label, self.encoding.pinned)?;
        Ok(TrackOptions {
            encoding,
            timeline: TimelineOptions {
                frame_rate: self.timeline.frame_rate,
                policy: if self.timeline.strict {
                    IntervalPolicy::Reject
                } else {
                    IntervalPolicy::Clamp
                },
            },
            prune_empty: self.timeline.prune_empty,
            discovery: self.discovery.clone(),
        })
    }
}

/// Encoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Encoding label used when detection finds nothing.
    #[serde(rename = "default", default = "default_encoding")]
    pub default_label: String,

    /// Always use the default, skipping detection.
    #[serde(default)]
    pub pinned: bool,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            default_label: default_encoding(),
            pinned: false,
        }
    }
}

/// Timeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// Reject captions ending before they begin instead of clamping.
    #[serde(default)]
    pub strict: bool,

    /// Frame rate for frame-based formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,

    /// Drop captions without text after parsing.
    #[serde(default = "default_true")]
    pub prune_empty: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            strict: false,
            frame_rate: None,
            prune_empty: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: LogLevel,

    /// Include module paths in log lines.
    #[serde(default = "default_true")]
    pub show_target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            show_target: true,
        }
    }
}

impl LoggingSettings {
    /// Subscriber configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            show_target: self.show_target,
            ..LogConfig::default()
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Discovery,
    Encoding,
    Timeline,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Discovery,
        ConfigSection::Encoding,
        ConfigSection::Timeline,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Discovery => "discovery",
            ConfigSection::Encoding => "encoding",
            ConfigSection::Timeline => "timeline",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Discovery => "Sidecar subtitle discovery",
            ConfigSection::Encoding => "Text encoding fallback",
            ConfigSection::Timeline => "Caption timeline behavior",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

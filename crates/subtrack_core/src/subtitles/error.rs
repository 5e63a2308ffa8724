//! Subtitle error types.

use std::path::PathBuf;

/// Errors that can occur while discovering, decoding, parsing or querying subtitles.
#[derive(Debug, thiserror::Error)]
pub enum SubtitleError {
    /// File missing, unreadable, or directory not found during discovery.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested or pinned encoding is not available.
    #[error("Unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    /// No format signature matched, or the format has no parser.
    #[error("Unknown subtitle format for '{path}': {reason}")]
    UnknownFormat { path: PathBuf, reason: String },

    /// The dialect was recognized but the content is structurally invalid.
    #[error("Malformed subtitle: {0}")]
    Malformed(#[from] ParseError),

    /// Frame/time conversion attempted without a positive frame rate.
    #[error("Invalid frame rate: {}", display_rate(.0))]
    InvalidFrameRate(Option<f64>),

    /// Selection of an ordinal that is not in the catalog.
    #[error("No subtitle track with ordinal {0}")]
    NoSuchTrack(usize),
}

fn display_rate(rate: &Option<f64>) -> String {
    match rate {
        Some(r) => r.to_string(),
        None => "unset".to_string(),
    }
}

/// Structured detail for malformed subtitle content.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Invalid or malformed time format.
    #[error("Invalid time format at line {line}: '{value}'")]
    InvalidTime { line: usize, value: String },

    /// Invalid caption line or block.
    #[error("Invalid event at line {line}: {message}")]
    InvalidEvent { line: usize, message: String },

    /// Caption ends before it begins.
    #[error("Caption ends before it begins ({begin_ms}ms > {end_ms}ms)")]
    InvertedInterval { begin_ms: i64, end_ms: i64 },

    /// Markup document could not be read.
    #[error("Invalid markup: {0}")]
    InvalidMarkup(String),

    /// Generic parse error.
    #[error("Parse error at line {line}: {message}")]
    Generic { line: usize, message: String },
}

/// Result type for subtitle operations.
pub type SubtitleResult<T> = Result<T, SubtitleError>;

impl SubtitleError {
    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown format error.
    pub fn unknown_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnknownFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error only disqualifies a candidate during discovery.
    ///
    /// I/O, encoding and format failures drop a sidecar from the catalog;
    /// everything else is reported.
    pub fn is_discovery_skippable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::UnsupportedEncoding(_) | Self::UnknownFormat { .. }
        )
    }
}

impl ParseError {
    /// Create a generic parse error.
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self::Generic {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid time error.
    pub fn invalid_time(line: usize, value: impl Into<String>) -> Self {
        Self::InvalidTime {
            line,
            value: value.into(),
        }
    }

    /// Create an invalid event error.
    pub fn invalid_event(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            line,
            message: message.into(),
        }
    }
}

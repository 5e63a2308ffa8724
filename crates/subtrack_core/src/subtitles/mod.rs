//! Subtitle track discovery, loading and playback lookup.
//!
//! # Architecture
//!
//! - **Pure functions** for detection steps (encoding, classification)
//! - **Pluggable parsers** selected per format through [`create_parser`]
//! - **Clean public API** via re-exports
//!
//! # Components
//!
//! - **time**: Dual clock/frame time values
//! - **encoding**: BOM sniffing and byte-statistics probe
//! - **classify**: Signature-table format classifier
//! - **parsers**: Format-specific parsers
//! - **timeline**: Ordered captions with a playback cursor
//! - **discovery**: Sidecar file enumeration and idx/sub pairing
//! - **inband**: Interface to the decoder's embedded streams
//! - **catalog**: Selectable tracks of one media file
//!
//! # Usage
//!
//! ```ignore
//! use subtrack_core::subtitles::{Catalog, TrackOptions};
//!
//! let catalog = Catalog::build(Path::new("movie.mkv"), None, TrackOptions::default())?;
//! let track = catalog.select(0)?;
//!
//! // During playback
//! let active = track.timeline.find_all_active(0, position_ms);
//! ```

pub mod catalog;
pub mod classify;
pub mod discovery;
pub mod encoding;
mod error;
pub mod inband;
pub mod parsers;
pub mod time;
pub mod timeline;
mod types;

// Re-export core types
pub use types::{Caption, SubtitleFormat, SubtitleIdentity};

// Re-export errors
pub use error::{ParseError, SubtitleError, SubtitleResult};

pub use catalog::{load_external, Catalog, CatalogEntry, CatalogSummary, LoadedTrack, TrackOptions};
pub use classify::{classify_source, classify_text, Classification};
pub use discovery::{discover, DiscoveredTrack, Discovery, DiscoveryOptions};
pub use encoding::{detect_file, EncodingHint};
pub use inband::InBandSource;
pub use parsers::{create_parser, parse_file, ParseContext, ParseSource, SourceKind, SubtitleParser};
pub use time::{ClockTime, TimeValue};
pub use timeline::{CaptionSink, IntervalPolicy, SharedTimeline, Timeline, TimelineOptions};

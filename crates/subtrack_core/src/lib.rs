//! Subtrack Core - subtitle track discovery and timeline synchronization.
//!
//! Finds the subtitle tracks available for a media file (sidecar files and
//! decoder-reported in-band streams), loads a selected track into a
//! time-ordered caption timeline, and answers "which captions are active at
//! time T" as playback advances or seeks.

pub mod config;
pub mod logging;
pub mod subtitles;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

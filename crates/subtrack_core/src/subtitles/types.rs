//! Core subtitle types.
//!
//! Captions carry [`TimeValue`]s so frame-based formats keep frame precision
//! until a frame rate is known; the timeline caches millisecond values for
//! lookup.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::time::TimeValue;

/// Closed set of subtitle format tags.
///
/// The order of declaration follows the classifier's signature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubStation Alpha / Advanced SSA (`Dialogue:` lines).
    Ssa,
    /// MicroDVD (`{start}{end}text`, frames).
    MicroDvd,
    /// MPL1 (`start,end,flags`, frames).
    Mpl1,
    /// MPL2 (`[start][end]text`, deciseconds).
    Mpl2,
    /// SubViewer (`h:m:s.f,h:m:s.f`).
    SubViewer,
    /// SubViewer 2 (`{T h:m:s:c`).
    SubViewer2,
    /// SAMI (`<SAMI>` markup).
    Sami,
    /// VPlayer (`h:m:s:text`).
    VPlayer,
    /// Generic XML timed text.
    Markup,
    /// Phoenix Japanimation Society (`start,end,"text"`, frames).
    Pjs,
    /// MPSub (`FORMAT=...` with relative timing).
    MpSub,
    /// SubRip (`h:m:s,f --> h:m:s,f`).
    SubRip,
    /// SubRip 0.9 (`[h:m:s]`).
    SubRip09,
    /// Lyrics (`[mm:ss.xx]text`).
    Lrc,
    /// VobSub index + bitmap data.
    IdxSub,
    /// Stream demultiplexed by the external decoder.
    InBand,
}

impl SubtitleFormat {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ssa => "SubStation Alpha",
            Self::MicroDvd => "MicroDVD",
            Self::Mpl1 => "MPL1",
            Self::Mpl2 => "MPL2",
            Self::SubViewer => "SubViewer",
            Self::SubViewer2 => "SubViewer 2",
            Self::Sami => "SAMI",
            Self::VPlayer => "VPlayer",
            Self::Markup => "Timed Text",
            Self::Pjs => "PJS",
            Self::MpSub => "MPSub",
            Self::SubRip => "SubRip",
            Self::SubRip09 => "SubRip 0.9",
            Self::Lrc => "LRC",
            Self::IdxSub => "VobSub",
            Self::InBand => "In-band",
        }
    }

    /// Typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ssa => "ass",
            Self::MicroDvd => "sub",
            Self::Mpl1 | Self::Mpl2 => "mpl",
            Self::SubViewer | Self::SubViewer2 => "sub",
            Self::Sami => "smi",
            Self::VPlayer => "txt",
            Self::Markup => "xml",
            Self::Pjs => "js",
            Self::MpSub => "sub",
            Self::SubRip => "srt",
            Self::SubRip09 => "rt",
            Self::Lrc => "lrc",
            Self::IdxSub => "idx",
            Self::InBand => "",
        }
    }

    /// Whether timestamps in this format are frame numbers.
    pub fn is_frame_based(&self) -> bool {
        matches!(self, Self::MicroDvd | Self::Mpl1 | Self::Pjs)
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single timed subtitle entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    /// Begin time.
    pub begin: TimeValue,
    /// End time.
    pub end: TimeValue,
    /// Display text (may contain formatting tags; may be empty).
    pub text: String,
    /// Ordinal used for re-numbering after edits.
    pub index: usize,
}

impl Caption {
    /// Create a caption.
    pub fn new(begin: TimeValue, end: TimeValue, text: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            text: text.into(),
            index: 0,
        }
    }

    /// Create a clock-time caption from milliseconds.
    pub fn from_millis(begin_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self::new(
            TimeValue::from_millis(begin_ms),
            TimeValue::from_millis(end_ms),
            text,
        )
    }

    /// Create a frame-based caption.
    pub fn from_frames(begin: u64, end: u64, text: impl Into<String>) -> Self {
        Self::new(TimeValue::from_frames(begin), TimeValue::from_frames(end), text)
    }

    /// Whether the caption has nothing to display.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Reference to one selectable subtitle stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SubtitleIdentity {
    /// Sidecar file; `stream` selects a sub-stream of a multi-stream idx file.
    External {
        path: PathBuf,
        stream: usize,
        /// Sub-stream name from the idx file, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Stream reported by the external decoder.
    InBand { index: usize },
}

impl SubtitleIdentity {
    /// External file reference with default sub-stream 0.
    pub fn external(path: impl Into<PathBuf>) -> Self {
        Self::External {
            path: path.into(),
            stream: 0,
            name: None,
        }
    }

    /// In-band reference.
    pub fn in_band(index: usize) -> Self {
        Self::InBand { index }
    }

    /// Path of the backing file, if external.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::External { path, .. } => Some(path),
            Self::InBand { .. } => None,
        }
    }

    /// Whether this identity is an in-band stream.
    pub fn is_in_band(&self) -> bool {
        matches!(self, Self::InBand { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_based_formats() {
        assert!(SubtitleFormat::MicroDvd.is_frame_based());
        assert!(SubtitleFormat::Pjs.is_frame_based());
        assert!(!SubtitleFormat::SubRip.is_frame_based());
    }

    #[test]
    fn empty_caption_detection() {
        assert!(Caption::from_millis(0, 10, "  \n").is_empty());
        assert!(!Caption::from_millis(0, 10, "Hi").is_empty());
    }

    #[test]
    fn identity_serializes_with_kind_tag() {
        let id = SubtitleIdentity::external("/media/movie.srt");
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("\"kind\":\"external\""));
        assert!(json.contains("\"stream\":0"));
        assert!(!json.contains("name"));

        let json = serde_json::to_string(&SubtitleIdentity::in_band(2)).unwrap();
        assert_eq!(json, r#"{"kind":"inband","index":2}"#);
    }
}

//! Subtitle parsers for the classified formats.
//!
//! Every [`SubtitleFormat`] maps to exactly one [`SubtitleParser`] through
//! [`create_parser`]. Most parsers work on decoded text; markup parsers ask
//! for the file path and read it themselves.
//!
//! Formats whose grammar is not handled here still get a parser, one that
//! fails with `UnknownFormat`, so dispatch stays total.

mod common;
mod lrc;
mod markup;
mod microdvd;
mod mpl2;
mod pjs;
mod sami;
mod srt;
mod ssa;
mod subrip09;
mod subviewer;
mod subviewer2;
mod vplayer;

pub use common::{parse_clock, parse_fraction_ms};
pub use lrc::Lrc;
pub use markup::Markup;
pub use microdvd::MicroDvd;
pub use mpl2::Mpl2;
pub use pjs::Pjs;
pub use sami::Sami;
pub use srt::{parse_srt_time, SubRip};
pub use ssa::{parse_ass_time, Ssa};
pub use subrip09::SubRip09;
pub use subviewer::SubViewer;
pub use subviewer2::SubViewer2;
pub use vplayer::VPlayer;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};

use crate::subtitles::encoding;
use crate::subtitles::error::{SubtitleError, SubtitleResult};
use crate::subtitles::timeline::{Timeline, TimelineOptions};
use crate::subtitles::types::SubtitleFormat;

/// What a parser wants to be handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Decoded text.
    Text,
    /// The file path; the parser reads the file itself.
    Path,
}

/// Input handed to a parser.
#[derive(Debug, Clone, Copy)]
pub enum ParseSource<'a> {
    /// Decoded text.
    Text(&'a str),
    /// File to read with the context encoding.
    Path(&'a Path),
}

impl<'a> ParseSource<'a> {
    /// Decoded text, reading the file if needed.
    pub fn read(&self, ctx: &ParseContext) -> SubtitleResult<Cow<'a, str>> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text)),
            Self::Path(path) => encoding::read_to_string(path, ctx.encoding).map(Cow::Owned),
        }
    }

    /// Path used in error messages.
    pub fn display_path(&self) -> PathBuf {
        match self {
            Self::Text(_) => PathBuf::from("<text>"),
            Self::Path(path) => path.to_path_buf(),
        }
    }
}

/// Parameters shared by all parsers.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    /// Encoding for path sources.
    pub encoding: &'static Encoding,
    /// Sub-stream ordinal within a multi-stream file.
    pub stream: usize,
    /// Options for the produced timeline.
    pub timeline: TimelineOptions,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            stream: 0,
            timeline: TimelineOptions::default(),
        }
    }
}

impl ParseContext {
    /// Context with a frame rate for frame-based formats.
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.timeline.frame_rate = Some(frame_rate);
        self
    }

    /// Fresh timeline with this context's options.
    pub fn new_timeline(&self) -> Timeline {
        Timeline::with_options(self.timeline)
    }
}

/// Capability turning one format's content into a timeline.
pub trait SubtitleParser: Send + Sync {
    /// Format handled by this parser.
    fn format(&self) -> SubtitleFormat;

    /// Input this parser expects.
    fn source_kind(&self) -> SourceKind {
        SourceKind::Text
    }

    /// Parse content into a timeline.
    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline>;
}

/// Parser for a format with no grammar in this crate.
pub struct Unsupported {
    format: SubtitleFormat,
    reason: &'static str,
}

impl SubtitleParser for Unsupported {
    fn format(&self) -> SubtitleFormat {
        self.format
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Path
    }

    fn parse(&self, source: ParseSource<'_>, _ctx: &ParseContext) -> SubtitleResult<Timeline> {
        Err(SubtitleError::unknown_format(
            source.display_path(),
            format!("{}: {}", self.format, self.reason),
        ))
    }
}

/// Create the parser for a format.
pub fn create_parser(format: SubtitleFormat) -> Box<dyn SubtitleParser> {
    match format {
        SubtitleFormat::Ssa => Box::new(Ssa),
        SubtitleFormat::MicroDvd => Box::new(MicroDvd),
        SubtitleFormat::Mpl2 => Box::new(Mpl2),
        SubtitleFormat::SubViewer => Box::new(SubViewer),
        SubtitleFormat::SubViewer2 => Box::new(SubViewer2),
        SubtitleFormat::Sami => Box::new(Sami),
        SubtitleFormat::VPlayer => Box::new(VPlayer),
        SubtitleFormat::Markup => Box::new(Markup),
        SubtitleFormat::Pjs => Box::new(Pjs),
        SubtitleFormat::SubRip => Box::new(SubRip),
        SubtitleFormat::SubRip09 => Box::new(SubRip09),
        SubtitleFormat::Lrc => Box::new(Lrc),
        SubtitleFormat::Mpl1 => Box::new(Unsupported {
            format,
            reason: "no text grammar available",
        }),
        SubtitleFormat::MpSub => Box::new(Unsupported {
            format,
            reason: "relative timing is not supported",
        }),
        SubtitleFormat::IdxSub => Box::new(Unsupported {
            format,
            reason: "bitmap subtitles are decoded externally",
        }),
        SubtitleFormat::InBand => Box::new(Unsupported {
            format,
            reason: "in-band captions are delivered by the decoder",
        }),
    }
}

/// Parse a file whose format is already known.
pub fn parse_file(path: &Path, format: SubtitleFormat, ctx: &ParseContext) -> SubtitleResult<Timeline> {
    let parser = create_parser(format);
    match parser.source_kind() {
        SourceKind::Path => parser.parse(ParseSource::Path(path), ctx),
        SourceKind::Text => {
            let text = encoding::read_to_string(path, ctx.encoding)?;
            parser.parse(ParseSource::Text(&text), ctx)
        }
    }
}

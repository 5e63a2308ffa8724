//! SubRip parser.
//!
//! # Format Overview
//!
//! SubRip files consist of sequential entries:
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:04,000
//! Hello, world!
//!
//! 2
//! 00:00:05,000 --> 00:00:08,000
//! This is a test.
//! ```
//!
//! Each entry has:
//! - Index number (ignored; captions are renumbered by position)
//! - Timing line: `HH:MM:SS,mmm --> HH:MM:SS,mmm`
//! - One or more lines of text
//! - Blank line separator
//!
//! WebVTT cues share the arrow signature, so `MM:SS.mmm` stamps and trailing
//! cue settings (`align:start`) are accepted as well.

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::{Caption, SubtitleFormat};

use super::common::{normalize_newlines, parse_clock};
use super::{ParseContext, ParseSource, SubtitleParser};

const ARROW: &str = "-->";

/// SubRip (and arrow-style WebVTT) parser.
pub struct SubRip;

impl SubtitleParser for SubRip {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::SubRip
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        parse_srt(&content, ctx)
    }
}

struct Block<'a> {
    first_line: usize,
    lines: Vec<&'a str>,
}

fn split_blocks(content: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block<'_>> = None;

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            blocks.extend(current.take());
            continue;
        }
        current
            .get_or_insert_with(|| Block {
                first_line: i + 1,
                lines: Vec::new(),
            })
            .lines
            .push(line);
    }
    blocks.extend(current);
    blocks
}

fn parse_srt(content: &str, ctx: &ParseContext) -> SubtitleResult<Timeline> {
    let content = normalize_newlines(content);
    let mut timeline = ctx.new_timeline();

    for block in split_blocks(&content) {
        // Timing line may or may not have an index before it
        let Some(timing_idx) = block.lines.iter().position(|l| l.contains(ARROW)) else {
            continue;
        };
        let timing_line = block.lines[timing_idx];
        let line_num = block.first_line + timing_idx;

        let (begin, end) = parse_srt_timing(timing_line)
            .ok_or_else(|| ParseError::invalid_time(line_num, timing_line.trim()))?;

        let text = block.lines[timing_idx + 1..].join("\n");
        timeline.append(Caption::new(begin, end, text))?;
    }

    Ok(timeline)
}

/// Parse timing line: `HH:MM:SS,mmm --> HH:MM:SS,mmm [settings]`
fn parse_srt_timing(line: &str) -> Option<(TimeValue, TimeValue)> {
    let (start, rest) = line.split_once(ARROW)?;
    let end = rest.split_whitespace().next()?;
    Some((parse_srt_time(start)?, parse_srt_time(end)?))
}

/// Parse a SubRip timestamp: `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm`.
pub fn parse_srt_time(s: &str) -> Option<TimeValue> {
    let s = s.trim();
    let (clock, frac) = match s.rsplit_once([',', '.']) {
        Some((clock, frac)) => (clock, frac),
        None => (s, ""),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    match parts.as_slice() {
        [h, m, sec] => parse_clock(h, m, sec, frac),
        [m, sec] => parse_clock("0", m, sec, frac),
        _ => None,
    }
}

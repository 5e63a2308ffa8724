//! SubViewer 1/2 parser.
//!
//! A timing line `HH:MM:SS.cc,HH:MM:SS.cc` (comma fractions also occur) is
//! followed by one text line where `[br]` breaks lines. Bracketed header
//! lines such as `[INFORMATION]` are skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::{Caption, SubtitleFormat};

use super::common::{normalize_newlines, parse_clock};
use super::{ParseContext, ParseSource, SubtitleParser};

static TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d+):(\d+)[.,](\d+)\s*,\s*(\d+):(\d+):(\d+)[.,](\d+)").unwrap()
});

/// SubViewer parser.
pub struct SubViewer;

impl SubtitleParser for SubViewer {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::SubViewer
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let content = normalize_newlines(&content);
        let mut timeline = ctx.new_timeline();
        let mut lines = content.lines().enumerate().peekable();

        while let Some((line_num, line)) = lines.next() {
            let line = line.trim();
            let Some(caps) = TIMING.captures(line) else {
                continue;
            };
            let invalid = || ParseError::invalid_time(line_num + 1, line);
            let begin = parse_clock(&caps[1], &caps[2], &caps[3], &caps[4]).ok_or_else(invalid)?;
            let end = parse_clock(&caps[5], &caps[6], &caps[7], &caps[8]).ok_or_else(invalid)?;

            let text = match lines.peek() {
                Some((_, next)) if !next.trim().is_empty() && !TIMING.is_match(next.trim()) => {
                    let text = next.trim().replace("[br]", "\n");
                    lines.next();
                    text
                }
                _ => String::new(),
            };

            timeline.append(Caption::new(begin, end, text))?;
        }

        Ok(timeline)
    }
}

//! SubViewer 2 (`{T ...}` block) parser.
//!
//! ```text
//! {T 00:00:01:20
//! Hello
//! }
//! ```
//!
//! Blocks carry only a start time; each caption lasts until the next block.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, normalize_newlines, parse_clock, Pending};
use super::{ParseContext, ParseSource, SubtitleParser};

static BLOCK_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{T\s+(\d+):(\d+):(\d+)[:.](\d+)\s*(.*)$").unwrap());

/// SubViewer 2 parser.
pub struct SubViewer2;

impl SubtitleParser for SubViewer2 {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::SubViewer2
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let mut pending: Vec<Pending> = Vec::new();
        let mut body: Option<Vec<String>> = None;

        for (line_num, line) in normalize_newlines(&content).lines().enumerate() {
            let line = line.trim();

            if let Some(caps) = BLOCK_START.captures(line) {
                // Unterminated previous block
                if let (Some(lines), Some(last)) = (body.take(), pending.last_mut()) {
                    last.text = lines.join("\n");
                }
                let begin = parse_clock(&caps[1], &caps[2], &caps[3], &caps[4])
                    .ok_or_else(|| ParseError::invalid_time(line_num + 1, line))?;
                pending.push(Pending::open(begin, ""));

                let rest = caps[5].trim();
                let mut lines = Vec::new();
                match rest.strip_suffix('}') {
                    Some(inline) => {
                        if !inline.trim().is_empty() {
                            lines.push(inline.trim().to_string());
                        }
                        if let Some(last) = pending.last_mut() {
                            last.text = lines.join("\n");
                        }
                    }
                    None => {
                        if !rest.is_empty() {
                            lines.push(rest.to_string());
                        }
                        body = Some(lines);
                    }
                }
                continue;
            }

            let Some(lines) = body.as_mut() else {
                continue;
            };
            match line.strip_suffix('}') {
                Some(tail) => {
                    if !tail.trim().is_empty() {
                        lines.push(tail.trim().to_string());
                    }
                    if let (Some(lines), Some(last)) = (body.take(), pending.last_mut()) {
                        last.text = lines.join("\n");
                    }
                }
                None => lines.push(line.to_string()),
            }
        }

        if let (Some(lines), Some(last)) = (body.take(), pending.last_mut()) {
            last.text = lines.join("\n");
        }

        finish(pending, ctx)
    }
}

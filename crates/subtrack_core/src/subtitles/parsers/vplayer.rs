//! VPlayer parser: `HH:MM:SS:text` or `HH:MM:SS text`, start times only.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, normalize_newlines, parse_clock, Pending};
use super::{ParseContext, ParseSource, SubtitleParser};

static LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+):(\d+):(\d+)[: ](.*)$").unwrap());

/// VPlayer parser.
pub struct VPlayer;

impl SubtitleParser for VPlayer {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::VPlayer
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let mut pending = Vec::new();
        for (line_num, line) in normalize_newlines(&content).lines().enumerate() {
            let line = line.trim();
            let Some(caps) = LINE.captures(line) else {
                continue;
            };
            let begin = parse_clock(&caps[1], &caps[2], &caps[3], "")
                .ok_or_else(|| ParseError::invalid_time(line_num + 1, line))?;
            pending.push(Pending::open(begin, caps[4].trim().replace('|', "\n")));
        }

        finish(pending, ctx)
    }
}

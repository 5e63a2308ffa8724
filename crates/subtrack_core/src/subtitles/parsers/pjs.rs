//! Phoenix Japanimation Society parser: `start,end,"text"` in frames.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::{Caption, SubtitleFormat};

use super::common::normalize_newlines;
use super::{ParseContext, ParseSource, SubtitleParser};

static LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(\d+),\s*(\d+),\s*"(.*)"\s*$"#).unwrap());

/// PJS parser.
pub struct Pjs;

impl SubtitleParser for Pjs {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Pjs
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let mut timeline = ctx.new_timeline();
        for (line_num, line) in normalize_newlines(&content).lines().enumerate() {
            let Some(caps) = LINE.captures(line.trim()) else {
                continue;
            };
            let frame = |idx: usize| {
                caps[idx]
                    .parse::<u64>()
                    .map_err(|_| ParseError::invalid_time(line_num + 1, &caps[idx]))
            };
            let caption = Caption::from_frames(frame(1)?, frame(2)?, caps[3].replace('|', "\n"));
            timeline.append(caption)?;
        }

        Ok(timeline)
    }
}

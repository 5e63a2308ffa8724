//! SubRip 0.9 parser: a `[HH:MM:SS]` line followed by the caption text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, normalize_newlines, parse_clock, Pending};
use super::{ParseContext, ParseSource, SubtitleParser};

static STAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d+):(\d+):(\d+)\]").unwrap());

/// SubRip 0.9 parser.
pub struct SubRip09;

impl SubtitleParser for SubRip09 {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::SubRip09
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let mut pending: Vec<Pending> = Vec::new();
        let mut awaiting_text = false;

        for (line_num, line) in normalize_newlines(&content).lines().enumerate() {
            let line = line.trim();
            if let Some(caps) = STAMP.captures(line) {
                let begin = parse_clock(&caps[1], &caps[2], &caps[3], "")
                    .ok_or_else(|| ParseError::invalid_time(line_num + 1, line))?;
                pending.push(Pending::open(begin, ""));
                awaiting_text = true;
            } else if awaiting_text {
                if let Some(last) = pending.last_mut() {
                    last.text = line.replace("[br]", "\n");
                }
                awaiting_text = false;
            }
        }

        finish(pending, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_then_text() {
        let content = "[00:00:02]\nHello[br]there\n[00:00:06]\n\n";
        let tl = SubRip09
            .parse(ParseSource::Text(content), &ParseContext::default())
            .unwrap();
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.begin_ms(0), Some(2000));
        assert_eq!(tl.end_ms(0), Some(6000));
        assert_eq!(tl.get(0).unwrap().text, "Hello\nthere");
        // A blank line after a stamp clears it.
        assert!(tl.get(1).unwrap().is_empty());
    }
}

//! MPL2 parser.
//!
//! `[start][end]text` with times in deciseconds. `|` separates lines and a
//! leading `/` on a line marks italics, which is dropped here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, normalize_newlines, Pending};
use super::{ParseContext, ParseSource, SubtitleParser};

static LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d+)\]\[(\d*)\](.*)$").unwrap());

/// MPL2 parser.
pub struct Mpl2;

impl SubtitleParser for Mpl2 {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Mpl2
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let mut pending = Vec::new();
        for (line_num, line) in normalize_newlines(&content).lines().enumerate() {
            let Some(caps) = LINE.captures(line.trim()) else {
                continue;
            };
            let deciseconds = |digits: &str| -> Result<TimeValue, ParseError> {
                digits
                    .parse::<i64>()
                    .ok()
                    .and_then(|ds| ds.checked_mul(100))
                    .map(TimeValue::from_millis)
                    .ok_or_else(|| ParseError::invalid_time(line_num + 1, digits))
            };

            let begin = deciseconds(&caps[1])?;
            let end = match &caps[2] {
                "" => None,
                digits => Some(deciseconds(digits)?),
            };
            let text = caps[3]
                .split('|')
                .map(|l| l.strip_prefix('/').unwrap_or(l))
                .collect::<Vec<_>>()
                .join("\n");

            pending.push(Pending { begin, end, text });
        }

        finish(pending, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::error::SubtitleError;

    #[test]
    fn deciseconds_and_italics() {
        let tl = Mpl2
            .parse(
                ParseSource::Text("[10][25]/Slanted|plain\n[30][40]Next\n"),
                &ParseContext::default(),
            )
            .unwrap();
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.begin_ms(0), Some(1000));
        assert_eq!(tl.end_ms(0), Some(2500));
        assert_eq!(tl.get(0).unwrap().text, "Slanted\nplain");
    }

    #[test]
    fn oversized_time_is_invalid() {
        let err = Mpl2
            .parse(
                ParseSource::Text("[922337203685477580][922337203685477580]x\n"),
                &ParseContext::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SubtitleError::Malformed(ParseError::InvalidTime { line: 1, .. })
        ));
    }
}

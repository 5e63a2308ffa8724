//! LRC lyrics parser.
//!
//! A line may carry several `[mm:ss.xx]` stamps sharing one text. Tags such
//! as `[ar:Artist]` are metadata and ignored, except `[offset:+/-ms]` which
//! moves every stamp earlier by the given amount.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, normalize_newlines, parse_fraction_ms, Pending};
use super::{ParseContext, ParseSource, SubtitleParser};

static STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+):(\d+)(?:[.:](\d+))?\]").unwrap());

static OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[offset:\s*([+-]?\d+)\s*\]").unwrap());

/// LRC lyrics parser.
pub struct Lrc;

impl SubtitleParser for Lrc {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Lrc
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let mut offset_ms = 0i64;
        let mut offset_line = 0;
        let mut stamped: Vec<(i64, String)> = Vec::new();

        for (line_num, line) in normalize_newlines(&content).lines().enumerate() {
            let mut rest = line.trim();

            if let Some(caps) = OFFSET.captures(rest) {
                offset_ms = caps[1]
                    .parse()
                    .map_err(|_| ParseError::invalid_time(line_num + 1, rest))?;
                offset_line = line_num + 1;
                continue;
            }

            let mut begins = Vec::new();
            while let Some(caps) = STAMP.captures(rest) {
                let invalid = || ParseError::invalid_time(line_num + 1, line.trim());
                let minutes: i64 = caps[1].parse().map_err(|_| invalid())?;
                let seconds: i64 = caps[2].parse().map_err(|_| invalid())?;
                let frac = caps.get(3).map_or("", |m| m.as_str());
                let millis = parse_fraction_ms(frac).ok_or_else(invalid)?;
                let begin = minutes
                    .checked_mul(60_000)
                    .and_then(|ms| ms.checked_add(seconds.checked_mul(1000)?))
                    .and_then(|ms| ms.checked_add(millis))
                    .ok_or_else(invalid)?;
                begins.push(begin);
                rest = &rest[caps[0].len()..];
            }

            let text = rest.trim();
            stamped.extend(begins.into_iter().map(|ms| (ms, text.to_string())));
        }

        // Stamps from one line can be scattered across the song
        stamped.sort_by_key(|(ms, _)| *ms);

        let pending = stamped
            .into_iter()
            .map(|(ms, text)| {
                let begin = ms
                    .checked_sub(offset_ms)
                    .ok_or_else(|| ParseError::invalid_time(offset_line, offset_ms.to_string()))?;
                Ok(Pending::open(TimeValue::from_millis(begin), text))
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        finish(pending, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::error::SubtitleError;

    fn parse(content: &str) -> Timeline {
        Lrc.parse(ParseSource::Text(content), &ParseContext::default())
            .unwrap()
    }

    #[test]
    fn repeated_stamps_are_sorted() {
        let tl = parse("[ar:Someone]\n[ti:Song]\n[00:01.00][00:10.50]Chorus\n[00:05.00]Verse\n");
        assert_eq!(tl.len(), 3);
        let texts: Vec<&str> = tl.captions().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["Chorus", "Verse", "Chorus"]);
        assert_eq!(tl.begin_ms(2), Some(10_500));
        assert_eq!(tl.end_ms(0), Some(5000));
    }

    #[test]
    fn offset_moves_stamps_earlier() {
        let tl = parse("[offset:500]\n[00:02.00]Line\n");
        assert_eq!(tl.begin_ms(0), Some(1500));
    }

    #[test]
    fn oversized_stamp_is_invalid() {
        let err = Lrc
            .parse(
                ParseSource::Text("[ti:Song]\n[999999999999999999:00.00]x\n"),
                &ParseContext::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SubtitleError::Malformed(ParseError::InvalidTime { line: 2, .. })
        ));
    }

    #[test]
    fn extreme_offset_is_invalid() {
        let content = format!("[offset:{}]\n[00:01.00]x\n", i64::MIN);
        let err = Lrc
            .parse(ParseSource::Text(&content), &ParseContext::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SubtitleError::Malformed(ParseError::InvalidTime { line: 1, .. })
        ));
    }
}

//! Helpers shared by the text parsers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::SubtitleResult;
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::Caption;

use super::ParseContext;

/// Display time given to a final caption that has no explicit end.
pub(crate) const DEFAULT_DURATION_MS: i64 = 3000;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Fractional seconds to milliseconds, scaled by digit count.
///
/// `"5"` is 500ms, `"05"` is 50ms, `"005"` is 5ms; extra digits are truncated.
pub fn parse_fraction_ms(frac: &str) -> Option<i64> {
    if frac.is_empty() {
        return Some(0);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{:0<3}", frac);
    padded[..3].parse().ok()
}

/// Build a clock value from textual fields.
pub fn parse_clock(hours: &str, minutes: &str, seconds: &str, frac: &str) -> Option<TimeValue> {
    let h: i64 = hours.trim().parse().ok()?;
    let m: i64 = minutes.trim().parse().ok()?;
    let s: i64 = seconds.trim().parse().ok()?;
    let ms = parse_fraction_ms(frac.trim())?;
    Some(TimeValue::from_hms(h, m, s, ms))
}

/// Unify line endings.
pub(crate) fn normalize_newlines(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Remove markup tags.
pub(crate) fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

/// Caption whose end may come from the next caption's begin.
#[derive(Debug)]
pub(crate) struct Pending {
    pub begin: TimeValue,
    pub end: Option<TimeValue>,
    pub text: String,
}

impl Pending {
    pub fn open(begin: TimeValue, text: impl Into<String>) -> Self {
        Self {
            begin,
            end: None,
            text: text.into(),
        }
    }
}

/// Resolve open ends and build the timeline.
///
/// A missing end becomes the next caption's begin; the last caption gets
/// [`DEFAULT_DURATION_MS`].
pub(crate) fn finish(pending: Vec<Pending>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
    let mut timeline = ctx.new_timeline();
    let rate = ctx.timeline.frame_rate;
    let next_begins: Vec<Option<TimeValue>> = pending
        .iter()
        .skip(1)
        .map(|p| Some(p.begin))
        .chain(std::iter::once(None))
        .collect();

    for (item, next_begin) in pending.into_iter().zip(next_begins) {
        let end = match item.end.or(next_begin) {
            Some(end) => end,
            None => {
                let mut end = item.begin;
                end.shift_millis(DEFAULT_DURATION_MS, rate)?;
                end
            }
        };
        timeline.append(Caption::new(item.begin, end, item.text))?;
    }

    Ok(timeline)
}

//! MicroDVD parser.
//!
//! Lines look like `{start}{end}text` with frame numbers; `{start}{}` leaves
//! the end open. `|` separates caption lines. A leading `{1}{1}23.976` line
//! declares the frame rate when the caller did not supply one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, normalize_newlines, Pending};
use super::{ParseContext, ParseSource, SubtitleParser};

static LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{(\d+)\}\{(\d*)\}(.*)$").unwrap());

/// MicroDVD parser.
pub struct MicroDvd;

impl SubtitleParser for MicroDvd {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::MicroDvd
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        parse_microdvd(&content, ctx)
    }
}

/// Frame rate declared by a `{1}{1}fps` caption.
fn declared_rate(begin: u64, end: Option<u64>, text: &str) -> Option<f64> {
    if begin != 1 || end != Some(1) {
        return None;
    }
    text.trim().parse::<f64>().ok().filter(|r| r.is_finite() && *r > 0.0)
}

fn parse_microdvd(content: &str, ctx: &ParseContext) -> SubtitleResult<Timeline> {
    let content = normalize_newlines(content);
    let mut ctx = *ctx;
    let mut pending = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = LINE.captures(line) else {
            tracing::trace!("Line {}: not a MicroDVD caption, skipping", line_num + 1);
            continue;
        };

        let begin: u64 = caps[1]
            .parse()
            .map_err(|_| ParseError::invalid_time(line_num + 1, &caps[1]))?;
        let end: Option<u64> = match &caps[2] {
            "" => None,
            digits => Some(
                digits
                    .parse()
                    .map_err(|_| ParseError::invalid_time(line_num + 1, digits))?,
            ),
        };
        let text = &caps[3];

        if pending.is_empty() {
            if let Some(rate) = declared_rate(begin, end, text) {
                if ctx.timeline.frame_rate.is_none() {
                    tracing::debug!("MicroDVD file declares {} fps", rate);
                    ctx.timeline.frame_rate = Some(rate);
                }
                continue;
            }
        }

        pending.push(Pending {
            begin: TimeValue::from_frames(begin),
            end: end.map(TimeValue::from_frames),
            text: text.replace('|', "\n"),
        });
    }

    finish(pending, &ctx)
}

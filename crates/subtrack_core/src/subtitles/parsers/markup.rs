//! XML timed-text parser.
//!
//! Every `<p>` element with a `begin` attribute becomes a caption. The end
//! comes from `end`, else `begin + dur`, else the next caption's begin.
//!
//! Time expressions:
//! - clock: `HH:MM:SS`, `HH:MM:SS.fff`, `HH:MM:SS:ff` (frames)
//! - offset: `<number><unit>` with unit `h`, `m`, `s`, `ms` or `f`

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, parse_clock, Pending};
use super::{ParseContext, ParseSource, SourceKind, SubtitleParser};

/// XML timed-text parser.
pub struct Markup;

impl SubtitleParser for Markup {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Markup
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Path
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        parse_markup(&content, ctx)
    }
}

fn parse_markup(xml: &str, ctx: &ParseContext) -> SubtitleResult<Timeline> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| ParseError::InvalidMarkup(format!("XML parse error: {}", e)))?;

    // Document-declared rate for frame expressions, else the caller's
    let frame_rate = doc
        .root_element()
        .attributes()
        .find(|a| a.name() == "frameRate")
        .and_then(|a| a.value().trim().parse::<f64>().ok())
        .or(ctx.timeline.frame_rate);

    let mut pending = Vec::new();

    for p in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
    {
        let line = doc.text_pos_at(p.range().start).row as usize;
        let time_attr = |name: &str| -> Result<Option<i64>, ParseError> {
            match p.attribute(name) {
                None => Ok(None),
                Some(value) => parse_time_expression(value, frame_rate)
                    .map(Some)
                    .ok_or_else(|| ParseError::invalid_time(line, value)),
            }
        };

        let Some(begin) = time_attr("begin")? else {
            tracing::debug!("Line {}: <p> without begin attribute, skipping", line);
            continue;
        };
        let end = match (time_attr("end")?, time_attr("dur")?) {
            (Some(end), _) => Some(end),
            (None, Some(dur)) => Some(begin.checked_add(dur).ok_or_else(|| {
                ParseError::invalid_time(line, p.attribute("dur").unwrap_or_default())
            })?),
            (None, None) => None,
        };

        pending.push(Pending {
            begin: TimeValue::from_millis(begin),
            end: end.map(TimeValue::from_millis),
            text: paragraph_text(&p),
        });
    }

    finish(pending, ctx)
}

/// Text content of a paragraph with `<br/>` as line breaks.
fn paragraph_text(p: &roxmltree::Node) -> String {
    let mut text = String::new();
    for node in p.descendants().skip(1) {
        if node.is_text() {
            if let Some(t) = node.text() {
                text.push_str(t);
            }
        } else if node.is_element() && node.tag_name().name() == "br" {
            text.push('\n');
        }
    }
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a timed-text time expression into milliseconds.
fn parse_time_expression(value: &str, frame_rate: Option<f64>) -> Option<i64> {
    let value = value.trim();
    if value.contains(':') {
        return parse_clock_expression(value, frame_rate);
    }

    let unit_start = value.find(|c: char| c.is_ascii_alphabetic())?;
    let (number, unit) = value.split_at(unit_start);
    let number: f64 = number.parse().ok()?;
    let ms = match unit {
        "h" => number * 3_600_000.0,
        "m" => number * 60_000.0,
        "s" => number * 1000.0,
        "ms" => number,
        "f" => number * 1000.0 / frame_rate.filter(|r| *r > 0.0)?,
        _ => return None,
    };
    finite_millis(ms)
}

/// Rounded milliseconds, `None` outside the `i64` range.
fn finite_millis(ms: f64) -> Option<i64> {
    let ms = ms.round();
    (ms.is_finite() && ms.abs() < i64::MAX as f64).then_some(ms as i64)
}

fn parse_clock_expression(value: &str, frame_rate: Option<f64>) -> Option<i64> {
    let parts: Vec<&str> = value.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => {
            let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
            parse_clock(h, m, whole, frac)?.to_millis(None).ok()
        }
        [h, m, s, frames] => {
            let base = parse_clock(h, m, s, "")?.to_millis(None).ok()?;
            let rate = frame_rate.filter(|r| *r > 0.0)?;
            let frames: f64 = frames.trim().parse().ok()?;
            base.checked_add(finite_millis(frames * 1000.0 / rate)?)
        }
        _ => None,
    }
}

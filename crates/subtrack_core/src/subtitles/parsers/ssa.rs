//! SSA/ASS subtitle parser.
//!
//! # Format Overview
//!
//! SSA files have three main sections:
//! - `[Script Info]`: Metadata (title, resolution, etc.)
//! - `[V4+ Styles]` or `[V4 Styles]`: Style definitions
//! - `[Events]`: Dialogue and comment lines
//!
//! Only `Dialogue:` lines become captions. Column positions come from the
//! `[Events]` `Format:` line, falling back to the standard V4+ layout.
//! All timing is in the format `H:MM:SS.cc` (centiseconds).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::{Caption, SubtitleFormat};

use super::common::parse_clock;
use super::{ParseContext, ParseSource, SubtitleParser};

static OVERRIDE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

/// SubStation Alpha parser.
pub struct Ssa;

impl SubtitleParser for Ssa {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Ssa
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        parse_ssa(&content, ctx)
    }
}

/// Column positions of the fields a caption needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EventColumns {
    start: usize,
    end: usize,
    text: usize,
}

impl Default for EventColumns {
    fn default() -> Self {
        // Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
        Self {
            start: 1,
            end: 2,
            text: 9,
        }
    }
}

impl EventColumns {
    /// Column map from an `[Events]` `Format:` line.
    ///
    /// `Ok(None)` when a required column is missing. Text must come after the
    /// timing columns since it is the only field that may contain commas.
    fn from_format_line(line: &str, line_num: usize) -> Result<Option<Self>, ParseError> {
        let fields = parse_format_line(line);
        let find = |name: &str| fields.iter().position(|f| f == name);
        let (Some(start), Some(end), Some(text)) = (find("start"), find("end"), find("text")) else {
            return Ok(None);
        };
        if start > text || end > text {
            return Err(ParseError::invalid_event(
                line_num,
                "Text column must follow Start and End",
            ));
        }
        Ok(Some(Self { start, end, text }))
    }
}

fn parse_ssa(content: &str, ctx: &ParseContext) -> SubtitleResult<Timeline> {
    let mut timeline = ctx.new_timeline();
    let mut current_section = String::new();
    let mut columns = EventColumns::default();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1; // 1-indexed for error messages
        let line = line.trim().trim_start_matches('\u{feff}');

        if line.is_empty() || line.starts_with(';') || line.starts_with('!') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            current_section = line[1..line.len() - 1].to_lowercase();
            continue;
        }

        if current_section != "events" {
            continue;
        }

        if line.starts_with("Format:") {
            match EventColumns::from_format_line(line, line_num)? {
                Some(found) => columns = found,
                None => tracing::warn!(
                    "Line {}: event format lacks Start/End/Text, keeping default columns",
                    line_num
                ),
            }
        } else if let Some(body) = line.strip_prefix("Dialogue:") {
            let caption = parse_dialogue(body, columns, line_num)?;
            timeline.append(caption)?;
        }
    }

    Ok(timeline)
}

/// Parse a Format: line to get field names.
fn parse_format_line(line: &str) -> Vec<String> {
    line.trim_start_matches("Format:")
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .collect()
}

fn parse_dialogue(body: &str, columns: EventColumns, line_num: usize) -> Result<Caption, ParseError> {
    // The text field is last and may contain commas
    let parts: Vec<&str> = body.trim().splitn(columns.text + 1, ',').collect();
    if parts.len() <= columns.text {
        return Err(ParseError::invalid_event(
            line_num,
            format!("Expected {} fields, got {}", columns.text + 1, parts.len()),
        ));
    }

    let field_time = |idx: usize| {
        let value = parts
            .get(idx)
            .ok_or_else(|| ParseError::invalid_event(line_num, format!("Missing field {}", idx + 1)))?
            .trim();
        parse_ass_time(value).ok_or_else(|| ParseError::invalid_time(line_num, value))
    };

    let begin = field_time(columns.start)?;
    let end = field_time(columns.end)?;
    Ok(Caption::new(begin, end, dialogue_text(parts[columns.text])))
}

/// Caption text with override blocks removed and line breaks expanded.
fn dialogue_text(raw: &str) -> String {
    OVERRIDE_BLOCK
        .replace_all(raw, "")
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
}

/// Parse SSA timestamp format: `H:MM:SS.cc`
pub fn parse_ass_time(s: &str) -> Option<TimeValue> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    let [h, m, sec] = parts.as_slice() else {
        return None;
    };
    let (whole, frac) = sec.split_once('.').unwrap_or((sec, ""));
    parse_clock(h, m, whole, frac)
}

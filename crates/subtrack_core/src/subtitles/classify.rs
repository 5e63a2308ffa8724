//! Subtitle format classification from decoded text.
//!
//! Each scanned line is tested against an ordered signature table; the first
//! signature that matches decides the format. Only the first
//! [`MAX_PROBE_LINES`] lines are scanned, and a line longer than
//! [`MAX_LINE_CHARS`] marks the source as binary/corrupt.
//!
//! While scanning, an SSA-style style table is tracked so the font name of
//! the first style row can be reported alongside the format.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::SubtitleFormat;

/// Lines scanned before giving up.
pub const MAX_PROBE_LINES: usize = 60;

/// Longest line accepted as text.
pub const MAX_LINE_CHARS: usize = 3000;

/// Bytes that always hold the scanned lines, at four bytes per character.
pub const CLASSIFY_WINDOW_BYTES: usize = MAX_PROBE_LINES * (MAX_LINE_CHARS + 1) * 4;

/// Extension that is trusted without looking at the content.
const PASS_THROUGH_EXTENSION: &str = "idx";

struct Signature {
    pattern: Regex,
    format: SubtitleFormat,
}

static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    use SubtitleFormat::*;
    [
        (r"^Dialogue:", Ssa),
        (r"^\{\d+\}\{\d+\}", MicroDvd),
        (r"^\{\d+\}\{\}", MicroDvd),
        (r"^\d+,\d+,\d+", Mpl1),
        (r"^\[\d+\]\[\d+\]", Mpl2),
        (r"^\d+:\d+:\d+\.\d+,\d+:\d+:\d+\.\d+", SubViewer),
        (r"^\d+:\d+:\d+,\d+,\d+:\d+:\d+,\d+", SubViewer),
        (r"^\{T \d+:\d+:\d+:\d+", SubViewer2),
        (r"^\{T \d+:\d+:\d+\.\d+", SubViewer2),
        (r"(?i)<SAMI>", Sami),
        (r"^\d+:\d+:\d+:", VPlayer),
        (r"^\d+:\d+:\d+ ", VPlayer),
        (r"^<", Markup),
        (r#"^\d+,\d+,\s*""#, Pjs),
        (r#"^\d+,\s+\d+,\s*""#, Pjs),
        (r"^FORMAT=\d+", MpSub),
        (r"^FORMAT=TIME", MpSub),
        (r"-->", SubRip),
        (r"^\[\d+:\d+:\d+\]", SubRip09),
        (r"^\[\d+:\d+\.\d+\]", Lrc),
    ]
    .into_iter()
    .map(|(pattern, format)| Signature {
        pattern: Regex::new(pattern).unwrap(),
        format,
    })
    .collect()
});

/// Result of classifying a text source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Detected format; `None` means invalid.
    pub format: Option<SubtitleFormat>,
    /// Font name from the first style row, if a style table was seen.
    pub font: Option<String>,
}

impl Classification {
    /// Font name side channel.
    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }

    /// Whether a format was recognized.
    pub fn is_valid(&self) -> bool {
        self.format.is_some()
    }

    fn with_format(format: SubtitleFormat) -> Self {
        Self {
            format: Some(format),
            font: None,
        }
    }
}

/// Format implied by the file extension alone, skipping content inspection.
pub fn pass_through_format(path: &Path) -> Option<SubtitleFormat> {
    let ext = path.extension()?.to_str()?;
    ext.eq_ignore_ascii_case(PASS_THROUGH_EXTENSION)
        .then_some(SubtitleFormat::IdxSub)
}

/// Match a single line against the signature table.
pub fn match_line(line: &str) -> Option<SubtitleFormat> {
    let line = line.trim_start();
    SIGNATURES
        .iter()
        .find(|sig| sig.pattern.is_match(line))
        .map(|sig| sig.format)
}

#[derive(Debug, Default)]
struct StyleTracker {
    font_column: Option<usize>,
    font: Option<String>,
}

impl StyleTracker {
    fn observe(&mut self, line: &str) {
        let line = line.trim();
        if let Some(header) = line.strip_prefix("Format:") {
            if let Some(column) = header
                .split(',')
                .position(|field| field.trim().eq_ignore_ascii_case("fontname"))
            {
                self.font_column = Some(column);
            }
        } else if self.font.is_none() {
            // First style row only.
            if let (Some(column), Some(row)) = (self.font_column, line.strip_prefix("Style:")) {
                self.font = row
                    .split(',')
                    .nth(column)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from);
            }
        }
    }
}

/// Classify a sequence of decoded lines.
pub fn classify_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Classification {
    let mut styles = StyleTracker::default();

    for (line_num, line) in lines.into_iter().take(MAX_PROBE_LINES).enumerate() {
        if line.chars().count() > MAX_LINE_CHARS {
            tracing::debug!(
                "Line {} exceeds {} characters; treating source as binary",
                line_num + 1,
                MAX_LINE_CHARS
            );
            return Classification::default();
        }

        styles.observe(line);

        if let Some(format) = match_line(line) {
            tracing::debug!("Line {} matches {} signature", line_num + 1, format);
            return Classification {
                format: Some(format),
                font: styles.font,
            };
        }
    }

    Classification {
        format: None,
        font: styles.font,
    }
}

/// Classify decoded text.
pub fn classify_text(text: &str) -> Classification {
    classify_lines(text.lines())
}

/// Classify a file given its path and decoded content.
///
/// Pass-through extensions are trusted without scanning.
pub fn classify_source(path: &Path, text: &str) -> Classification {
    match pass_through_format(path) {
        Some(format) => Classification::with_format(format),
        None => classify_text(text),
    }
}

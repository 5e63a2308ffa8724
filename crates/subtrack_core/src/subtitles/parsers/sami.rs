//! SAMI parser.
//!
//! Captions are `<SYNC Start=ms>` blocks; each lasts until the next SYNC.
//! A block holding only `&nbsp;` clears the screen and yields an empty
//! caption, which pruning removes later.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitles::error::{ParseError, SubtitleResult};
use crate::subtitles::time::TimeValue;
use crate::subtitles::timeline::Timeline;
use crate::subtitles::types::SubtitleFormat;

use super::common::{finish, strip_tags, Pending};
use super::{ParseContext, ParseSource, SourceKind, SubtitleParser};

static SYNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<sync\s+start\s*=\s*["']?(\d+)["']?[^>]*>"#).unwrap());

static BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static BODY_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</body>").unwrap());

/// SAMI parser.
pub struct Sami;

impl SubtitleParser for Sami {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Sami
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Path
    }

    fn parse(&self, source: ParseSource<'_>, ctx: &ParseContext) -> SubtitleResult<Timeline> {
        let content = source.read(ctx)?;
        let end_of_body = BODY_END.find(&content).map_or(content.len(), |m| m.start());
        let syncs: Vec<_> = SYNC.captures_iter(&content).collect();
        let mut pending = Vec::with_capacity(syncs.len());

        for (i, caps) in syncs.iter().enumerate() {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let start: i64 = caps[1].parse().map_err(|_| {
                let line = content[..whole.start()].matches('\n').count() + 1;
                ParseError::invalid_time(line, &caps[1])
            })?;

            let block_end = syncs
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(end_of_body, |m| m.start())
                .max(whole.end());
            let text = block_text(&content[whole.end()..block_end]);

            pending.push(Pending::open(TimeValue::from_millis(start), text));
        }

        finish(pending, ctx)
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn block_text(raw: &str) -> String {
    let flat = raw.replace(['\r', '\n'], " ");
    let broken = BREAK.replace_all(&flat, "\n");
    decode_entities(&strip_tags(&broken))
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

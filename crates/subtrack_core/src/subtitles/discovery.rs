//! Sidecar subtitle discovery.
//!
//! Sidecars are siblings of the media file whose name starts with the media
//! name up to and including its last `.` (case-insensitive) and whose
//! extension is recognized. `movie.mkv` finds `movie.srt`, `Movie.en.ass`
//! and `movie.idx`, but not `movies.srt`.
//!
//! An `idx` file makes its `sub` partner redundant and may describe several
//! sub-streams; each `id:<name>, index:<n>` record becomes its own entry.

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::encoding;
use super::error::{SubtitleError, SubtitleResult};
use super::types::SubtitleIdentity;

/// Extensions recognized as sidecar subtitles.
pub const DEFAULT_EXTENSIONS: [&str; 15] = [
    "idx", "aqt", "ass", "lrc", "smi", "sami", "txt", "srt", "ssa", "xml", "jss", "js", "mpl",
    "rt", "sub",
];

/// Lyrics extension, skipped unless lyrics support is enabled.
pub const LYRICS_EXTENSION: &str = "lrc";

const IDX_EXTENSION: &str = "idx";
const SUB_EXTENSION: &str = "sub";

static IDX_RECORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"id:\s*([^,]*),\s*index:\s*(\d+)").unwrap());

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Sidecar matching rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Include `.lrc` lyrics files.
    #[serde(default)]
    pub lyrics_enabled: bool,

    /// Recognized extensions; case and a leading dot are ignored.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            lyrics_enabled: false,
            extensions: default_extensions(),
        }
    }
}

impl DiscoveryOptions {
    /// Whether a lowercase extension is accepted.
    pub fn accepts(&self, ext: &str) -> bool {
        if ext == LYRICS_EXTENSION && !self.lyrics_enabled {
            return false;
        }
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// One discovered external entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTrack {
    /// Position in the catalog (after in-band entries).
    pub ordinal: usize,
    /// External identity.
    pub identity: SubtitleIdentity,
}

/// Result of scanning a media file's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// External entries in ordinal order.
    pub tracks: Vec<DiscoveredTrack>,
    /// Per-extension file counts, e.g. `"srt:2 idx:1"`.
    pub histogram: String,
}

impl Discovery {
    /// Number of external entries.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Media file name up to and including the last `.`.
///
/// A name without a dot gets one appended so that only `name.<ext>`
/// siblings match.
pub fn media_prefix(media_path: &Path) -> Option<String> {
    let name = media_path.file_name()?.to_str()?;
    Some(match name.rfind('.') {
        Some(dot) => name[..=dot].to_string(),
        None => format!("{}.", name),
    })
}

/// Lowercase extension of `name` when it is a sidecar candidate.
fn candidate_extension(name: &str, prefix_lower: &str, options: &DiscoveryOptions) -> Option<String> {
    let lower = name.to_lowercase();
    if !lower.starts_with(prefix_lower) || lower.len() == prefix_lower.len() {
        return None;
    }
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
    options.accepts(ext).then(|| ext.to_string())
}

fn stem_of(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Drop `sub` files that pair with an `idx` file of the same stem.
fn remove_paired_subs(files: &mut Vec<(PathBuf, String)>) {
    let idx_names: Vec<String> = files
        .iter()
        .filter(|(_, ext)| ext == IDX_EXTENSION)
        .filter_map(|(path, _)| path.file_name()?.to_str().map(str::to_lowercase))
        .collect();

    files.retain(|(path, ext)| {
        if ext != SUB_EXTENSION {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        let name = name.to_lowercase();
        let paired = idx_names
            .iter()
            .any(|idx| idx.len() == name.len() && stem_of(idx) == stem_of(&name));
        if paired {
            tracing::debug!("Skipping {} (paired with idx)", path.display());
        }
        !paired
    });
}

/// Sub-stream records of an idx file as `(name, index)` pairs.
pub fn parse_idx_streams(text: &str) -> Vec<(String, usize)> {
    IDX_RECORD
        .captures_iter(text)
        .filter_map(|caps| {
            let index = caps[2].parse().ok()?;
            Some((caps[1].trim().to_string(), index))
        })
        .collect()
}

/// Build `"ext:count ..."` with extensions in order of first appearance.
pub fn extension_histogram<'a>(extensions: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for ext in extensions {
        match counts.iter_mut().find(|(e, _)| *e == ext) {
            Some((_, n)) => *n += 1,
            None => counts.push((ext, 1)),
        }
    }
    counts
        .iter()
        .map(|(ext, n)| format!("{}:{}", ext, n))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identities backed by one idx file.
fn idx_identities(path: &Path) -> SubtitleResult<Vec<SubtitleIdentity>> {
    let text = encoding::read_to_string(path, UTF_8)?;
    let streams = parse_idx_streams(&text);
    if streams.is_empty() {
        return Ok(vec![SubtitleIdentity::external(path)]);
    }
    Ok(streams
        .into_iter()
        .map(|(name, stream)| SubtitleIdentity::External {
            path: path.to_path_buf(),
            stream,
            name: (!name.is_empty()).then_some(name),
        })
        .collect())
}

/// Scan the media file's directory for sidecar subtitles.
///
/// Ordinals start at `in_band_count`. A missing or unreadable directory is an
/// `Io` error; an unreadable idx file is dropped with a warning.
pub fn discover(
    media_path: &Path,
    in_band_count: usize,
    options: &DiscoveryOptions,
) -> SubtitleResult<Discovery> {
    let dir = match media_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let Some(prefix) = media_prefix(media_path) else {
        return Ok(Discovery::default());
    };
    let prefix_lower = prefix.to_lowercase();

    let entries = fs::read_dir(dir).map_err(|e| SubtitleError::io(dir, e))?;
    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SubtitleError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path == media_path {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(ext) = candidate_extension(name, &prefix_lower, options) {
            files.push((path, ext));
        }
    }

    // Directory order is unspecified
    files.sort_by(|a, b| a.0.cmp(&b.0));
    remove_paired_subs(&mut files);

    let histogram = extension_histogram(files.iter().map(|(_, ext)| ext.as_str()));

    let mut identities = Vec::new();
    for (path, ext) in files {
        if ext == IDX_EXTENSION {
            match idx_identities(&path) {
                Ok(streams) => identities.extend(streams),
                Err(e) => tracing::warn!("Dropping {}: {}", path.display(), e),
            }
        } else {
            identities.push(SubtitleIdentity::external(path));
        }
    }

    let tracks: Vec<DiscoveredTrack> = identities
        .into_iter()
        .enumerate()
        .map(|(i, identity)| DiscoveredTrack {
            ordinal: in_band_count + i,
            identity,
        })
        .collect();

    tracing::debug!(
        "Discovered {} sidecar entries for {} [{}]",
        tracks.len(),
        media_path.display(),
        histogram
    );

    Ok(Discovery { tracks, histogram })
}

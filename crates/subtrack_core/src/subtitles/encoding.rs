//! Text encoding detection for subtitle files.
//!
//! Detection order:
//! 1. A caller-pinned code page wins outright.
//! 2. Byte-order marks (UTF-16 LE/BE, UTF-8).
//! 3. A byte-pair probe over the first [`PROBE_WINDOW`] bytes counting
//!    UTF-16 zero-byte patterns and UTF-8 three-byte sequences.
//! 4. The caller's default.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use super::error::{SubtitleError, SubtitleResult};

/// Bytes inspected by the statistical probe.
pub const PROBE_WINDOW: usize = 1024;

/// Occurrences of one signature that end the probe early.
pub const CONFIDENCE_THRESHOLD: usize = 10;

/// Caller-supplied fallback encoding.
#[derive(Debug, Clone, Copy)]
pub struct EncodingHint {
    /// Encoding used when detection finds nothing.
    pub default: &'static Encoding,
    /// Skip detection and always use `default`.
    pub pinned: bool,
}

impl Default for EncodingHint {
    fn default() -> Self {
        Self {
            default: UTF_8,
            pinned: false,
        }
    }
}

impl EncodingHint {
    /// Resolve a WHATWG encoding label (e.g. `"gbk"`, `"windows-1252"`).
    pub fn from_label(label: &str, pinned: bool) -> SubtitleResult<Self> {
        let default = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| SubtitleError::UnsupportedEncoding(label.to_string()))?;
        Ok(Self { default, pinned })
    }

    /// Unpinned hint with the given default.
    pub fn with_default(default: &'static Encoding) -> Self {
        Self {
            default,
            pinned: false,
        }
    }
}

/// Identify a byte-order mark at the start of `bytes`.
pub fn sniff_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    match bytes {
        [0xFF, 0xFE, ..] => Some(UTF_16LE),
        [0xFE, 0xFF, ..] => Some(UTF_16BE),
        [0xEF, 0xBB, 0xBF, ..] => Some(UTF_8),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct ProbeCounts {
    utf16_be: usize,
    utf16_le: usize,
    utf8: usize,
}

impl ProbeCounts {
    fn confident(&self) -> Option<&'static Encoding> {
        if self.utf8 >= CONFIDENCE_THRESHOLD {
            Some(UTF_8)
        } else if self.utf16_le >= CONFIDENCE_THRESHOLD {
            Some(UTF_16LE)
        } else if self.utf16_be >= CONFIDENCE_THRESHOLD {
            Some(UTF_16BE)
        } else {
            None
        }
    }

    fn preferred(&self) -> Option<&'static Encoding> {
        if self.utf8 > 0 {
            Some(UTF_8)
        } else if self.utf16_le > 0 {
            Some(UTF_16LE)
        } else if self.utf16_be > 0 {
            Some(UTF_16BE)
        } else {
            None
        }
    }
}

fn is_printable_ascii(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Guess an encoding from byte statistics alone.
///
/// Returns `None` when no signature occurred, or when a UTF-8 lead byte is
/// followed by invalid continuation bytes (a legacy code page is more likely
/// than any guess this probe could make).
pub fn probe(bytes: &[u8]) -> Option<&'static Encoding> {
    let window = &bytes[..bytes.len().min(PROBE_WINDOW)];
    let mut counts = ProbeCounts::default();
    let mut i = 0;

    while i + 1 < window.len() {
        let (a, b) = (window[i], window[i + 1]);

        if a == 0 && is_printable_ascii(b) {
            counts.utf16_be += 1;
            i += 2;
        } else if is_printable_ascii(a) && b == 0 {
            counts.utf16_le += 1;
            i += 2;
        } else if a & 0xE0 == 0xE0 {
            let Some(&c) = window.get(i + 2) else {
                // Sequence cut by the probe window.
                break;
            };
            if !is_continuation(b) || !is_continuation(c) {
                return None;
            }
            counts.utf8 += 1;
            i += 3;
        } else {
            i += 1;
        }

        if let Some(found) = counts.confident() {
            return Some(found);
        }
    }

    counts.preferred()
}

/// Detect the encoding of an in-memory prefix.
pub fn detect_bytes(bytes: &[u8], hint: EncodingHint) -> &'static Encoding {
    if hint.pinned {
        tracing::debug!("Using pinned encoding {}", hint.default.name());
        return hint.default;
    }

    if let Some(enc) = sniff_bom(bytes) {
        tracing::debug!("Byte-order mark indicates {}", enc.name());
        return enc;
    }

    match probe(bytes) {
        Some(enc) => {
            tracing::debug!("Byte probe indicates {}", enc.name());
            enc
        }
        None => hint.default,
    }
}

/// Detect the encoding of a file from its first bytes.
pub fn detect_file(path: &Path, hint: EncodingHint) -> SubtitleResult<&'static Encoding> {
    if hint.pinned {
        return Ok(hint.default);
    }

    let mut file = File::open(path).map_err(|e| SubtitleError::io(path, e))?;
    let mut prefix = Vec::with_capacity(PROBE_WINDOW);
    file.by_ref()
        .take(PROBE_WINDOW as u64)
        .read_to_end(&mut prefix)
        .map_err(|e| SubtitleError::io(path, e))?;

    Ok(detect_bytes(&prefix, hint))
}

/// Decode bytes, dropping a byte-order mark that matches `encoding`.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        tracing::debug!("Replaced undecodable bytes while decoding as {}", encoding.name());
    }
    text.into_owned()
}

/// Read and decode at most `max_bytes` from the start of a file.
///
/// A character cut at the limit decodes as a replacement character.
pub fn read_prefix(path: &Path, encoding: &'static Encoding, max_bytes: usize) -> SubtitleResult<String> {
    let file = File::open(path).map_err(|e| SubtitleError::io(path, e))?;
    let mut bytes = Vec::new();
    file.take(max_bytes as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| SubtitleError::io(path, e))?;
    Ok(decode(&bytes, encoding))
}

/// Read and decode a whole file.
pub fn read_to_string(path: &Path, encoding: &'static Encoding) -> SubtitleResult<String> {
    let bytes = std::fs::read(path).map_err(|e| SubtitleError::io(path, e))?;
    Ok(decode(&bytes, encoding))
}

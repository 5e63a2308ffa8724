//! Catalog of selectable subtitle tracks for one media file.
//!
//! In-band streams take ordinals `0..n`; sidecar files follow. Building the
//! catalog probes every sidecar (encoding + format) and silently drops the
//! ones that cannot be read or recognized. Selecting an entry is strict: any
//! failure is returned to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use super::classify;
use super::discovery::{self, DiscoveryOptions};
use super::encoding::{self, EncodingHint};
use super::error::{SubtitleError, SubtitleResult};
use super::inband::InBandSource;
use super::parsers::{create_parser, ParseContext, ParseSource, SourceKind};
use super::timeline::{CaptionSink, SharedTimeline, Timeline, TimelineOptions};
use super::types::{SubtitleFormat, SubtitleIdentity};

/// Options applied when discovering and loading tracks.
#[derive(Debug, Clone)]
pub struct TrackOptions {
    /// Encoding fallback / override.
    pub encoding: EncodingHint,
    /// Options for loaded timelines.
    pub timeline: TimelineOptions,
    /// Drop captions without text after parsing.
    pub prune_empty: bool,
    /// Sidecar matching rules.
    pub discovery: DiscoveryOptions,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            encoding: EncodingHint::default(),
            timeline: TimelineOptions::default(),
            prune_empty: true,
            discovery: DiscoveryOptions::default(),
        }
    }
}

/// One selectable track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Selection ordinal.
    pub ordinal: usize,
    /// What to load.
    pub identity: SubtitleIdentity,
    /// Format found while probing; `InBand` for decoder streams.
    pub format: SubtitleFormat,
}

/// Serializable catalog description for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub media_path: PathBuf,
    pub in_band_streams: usize,
    pub histogram: String,
    pub entries: Vec<CatalogEntry>,
}

impl CatalogSummary {
    /// Pretty JSON for diagnostics output.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A loaded track ready for playback queries.
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    pub identity: SubtitleIdentity,
    pub format: SubtitleFormat,
    /// Encoding used to decode the file; `None` for in-band streams.
    pub encoding: Option<&'static Encoding>,
    /// Font name from the file's style table, if any.
    pub font: Option<String>,
    pub timeline: SharedTimeline,
}

/// Selectable tracks of one media file.
pub struct Catalog {
    media_path: PathBuf,
    entries: Vec<CatalogEntry>,
    histogram: String,
    in_band: Option<Arc<dyn InBandSource>>,
    options: TrackOptions,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("media_path", &self.media_path)
            .field("entries", &self.entries)
            .field("histogram", &self.histogram)
            .field("in_band", &self.in_band.is_some())
            .finish()
    }
}

struct Probe {
    format: SubtitleFormat,
    encoding: &'static Encoding,
    font: Option<String>,
}

/// Detect encoding and format of a sidecar file.
fn probe_file(path: &Path, hint: EncodingHint) -> SubtitleResult<Probe> {
    let encoding = encoding::detect_file(path, hint)?;

    if let Some(format) = classify::pass_through_format(path) {
        return Ok(Probe {
            format,
            encoding,
            font: None,
        });
    }

    // The classifier never looks past this window
    let text = encoding::read_prefix(path, encoding, classify::CLASSIFY_WINDOW_BYTES)?;
    let classification = classify::classify_text(&text);
    let format = classification
        .format
        .ok_or_else(|| SubtitleError::unknown_format(path, "no known subtitle signature"))?;

    Ok(Probe {
        format,
        encoding,
        font: classification.font,
    })
}

/// Load one sidecar stream: detect encoding, classify, parse.
pub fn load_external(path: &Path, stream: usize, options: &TrackOptions) -> SubtitleResult<LoadedTrack> {
    let probe = probe_file(path, options.encoding)?;
    tracing::debug!(
        "{}: {} in {}",
        path.display(),
        probe.format,
        probe.encoding.name()
    );

    let ctx = ParseContext {
        encoding: probe.encoding,
        stream,
        timeline: options.timeline,
    };
    let parser = create_parser(probe.format);
    let mut timeline = match parser.source_kind() {
        SourceKind::Text => {
            let text = encoding::read_to_string(path, probe.encoding)?;
            parser.parse(ParseSource::Text(&text), &ctx)?
        }
        SourceKind::Path => parser.parse(ParseSource::Path(path), &ctx)?,
    };

    if options.prune_empty {
        let removed = timeline.prune_empty();
        if removed > 0 {
            tracing::debug!("Pruned {} empty captions", removed);
        }
    }
    timeline.renumber();

    tracing::info!(
        "Loaded {} captions from {} ({})",
        timeline.len(),
        path.display(),
        probe.format
    );

    Ok(LoadedTrack {
        identity: SubtitleIdentity::External {
            path: path.to_path_buf(),
            stream,
            name: None,
        },
        format: probe.format,
        encoding: Some(probe.encoding),
        font: probe.font,
        timeline: timeline.into(),
    })
}

impl Catalog {
    /// Build the catalog for a media file.
    ///
    /// Fails only when the media file's directory cannot be listed.
    pub fn build(
        media_path: &Path,
        in_band: Option<Arc<dyn InBandSource>>,
        options: TrackOptions,
    ) -> SubtitleResult<Self> {
        let mut catalog = Self {
            media_path: media_path.to_path_buf(),
            entries: Vec::new(),
            histogram: String::new(),
            in_band,
            options,
        };
        catalog.rebuild()?;
        Ok(catalog)
    }

    /// Rebuild for another media file.
    pub fn set_media_path(&mut self, media_path: &Path) -> SubtitleResult<()> {
        self.media_path = media_path.to_path_buf();
        self.rebuild()
    }

    fn rebuild(&mut self) -> SubtitleResult<()> {
        let in_band_count = self.in_band.as_ref().map_or(0, |src| src.total_streams());
        let found = discovery::discover(&self.media_path, in_band_count, &self.options.discovery)?;

        let mut entries: Vec<CatalogEntry> = (0..in_band_count)
            .map(|index| CatalogEntry {
                ordinal: index,
                identity: SubtitleIdentity::in_band(index),
                format: SubtitleFormat::InBand,
            })
            .collect();

        for track in found.tracks {
            let Some(path) = track.identity.path() else {
                continue;
            };
            match probe_file(path, self.options.encoding) {
                Ok(probe) => entries.push(CatalogEntry {
                    ordinal: entries.len(),
                    identity: track.identity,
                    format: probe.format,
                }),
                Err(e) if e.is_discovery_skippable() => {
                    tracing::warn!("Dropping sidecar {}: {}", path.display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Catalog for {}: {} in-band, {} external [{}]",
            self.media_path.display(),
            in_band_count,
            entries.len() - in_band_count,
            found.histogram
        );

        self.entries = entries;
        self.histogram = found.histogram;
        Ok(())
    }

    /// Media file this catalog describes.
    pub fn media_path(&self) -> &Path {
        &self.media_path
    }

    /// All entries in ordinal order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to select.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sidecar extension histogram.
    pub fn histogram(&self) -> &str {
        &self.histogram
    }

    /// Entry by ordinal.
    pub fn entry(&self, ordinal: usize) -> Option<&CatalogEntry> {
        self.entries.get(ordinal)
    }

    /// Human readable label per entry.
    ///
    /// In-band titles and languages are queried from the decoder now.
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|entry| self.label_of(entry)).collect()
    }

    fn label_of(&self, entry: &CatalogEntry) -> String {
        match &entry.identity {
            SubtitleIdentity::InBand { index } => {
                let (title, language) = match &self.in_band {
                    Some(src) => (src.title_of(*index), src.language_of(*index)),
                    None => (None, None),
                };
                match (title, language) {
                    (Some(t), Some(l)) => format!("{} ({})", t, l),
                    (Some(t), None) => t,
                    (None, Some(l)) => format!("Track {} ({})", index + 1, l),
                    (None, None) => format!("Track {}", index + 1),
                }
            }
            SubtitleIdentity::External { path, name, .. } => {
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                match name {
                    Some(name) => format!("{} [{}] ({})", file, name, entry.format.name()),
                    None => format!("{} ({})", file, entry.format.name()),
                }
            }
        }
    }

    /// Load the track at `ordinal`.
    ///
    /// In-band streams are activated on the decoder and get an empty shared
    /// timeline which the decoder fills through its caption sink.
    pub fn select(&self, ordinal: usize) -> SubtitleResult<LoadedTrack> {
        let entry = self
            .entries
            .get(ordinal)
            .ok_or(SubtitleError::NoSuchTrack(ordinal))?;
        tracing::info!("Selecting track {}: {}", ordinal, self.label_of(entry));

        match &entry.identity {
            SubtitleIdentity::InBand { index } => {
                let src = self
                    .in_band
                    .as_ref()
                    .ok_or(SubtitleError::NoSuchTrack(ordinal))?;
                src.set_active_stream(*index)?;

                let timeline = SharedTimeline::new(Timeline::with_options(self.options.timeline));
                let sink: Arc<dyn CaptionSink> = Arc::new(timeline.clone());
                src.attach_sink(sink);

                Ok(LoadedTrack {
                    identity: entry.identity.clone(),
                    format: SubtitleFormat::InBand,
                    encoding: None,
                    font: None,
                    timeline,
                })
            }
            SubtitleIdentity::External { path, stream, .. } => {
                let mut track = load_external(path, *stream, &self.options)?;
                track.identity = entry.identity.clone();
                Ok(track)
            }
        }
    }

    /// Serializable description.
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            media_path: self.media_path.clone(),
            in_band_streams: self.in_band.as_ref().map_or(0, |src| src.total_streams()),
            histogram: self.histogram.clone(),
            entries: self.entries.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::inband::mock::MockDecoder;
    use crate::subtitles::types::Caption;
    use std::fs;
    use tempfile::tempdir;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
                       2\n00:00:03,000 --> 00:00:04,000\n\n\n\
                       3\n00:00:05,000 --> 00:00:06,000\nBye\n";

    fn decoder() -> Arc<MockDecoder> {
        Arc::new(MockDecoder {
            streams: 1,
            titles: Some("1,Full;".into()),
            languages: Some("1,eng;".into()),
            ..Default::default()
        })
    }

    #[test]
    fn in_band_first_then_sidecars() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();
        fs::write(dir.path().join("film.srt"), SRT).unwrap();
        fs::write(dir.path().join("film.txt"), "just some notes\n").unwrap();

        let src: Arc<dyn InBandSource> = decoder();
        let catalog = Catalog::build(&media, Some(src), TrackOptions::default()).unwrap();

        // The unrecognized .txt is dropped
        assert_eq!(catalog.len(), 2);
        assert!(catalog.entry(0).unwrap().identity.is_in_band());
        assert_eq!(catalog.entry(1).unwrap().format, SubtitleFormat::SubRip);
        assert_eq!(catalog.histogram(), "srt:1 txt:1");

        let labels = catalog.labels();
        assert_eq!(labels[0], "Full (eng)");
        assert_eq!(labels[1], "film.srt (SubRip)");
    }

    #[test]
    fn select_external_prunes_and_renumbers() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();
        fs::write(dir.path().join("film.srt"), SRT).unwrap();

        let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
        let track = catalog.select(0).unwrap();

        assert_eq!(track.format, SubtitleFormat::SubRip);
        assert_eq!(track.encoding.map(|e| e.name()), Some("UTF-8"));
        let tl = track.timeline.snapshot();
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.get(1).unwrap().index, 2);
        assert_eq!(tl.get(1).unwrap().text, "Bye");
    }

    #[test]
    fn select_in_band_attaches_sink() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();

        let mock = decoder();
        let src: Arc<dyn InBandSource> = mock.clone();
        let catalog = Catalog::build(&media, Some(src), TrackOptions::default()).unwrap();
        let track = catalog.select(0).unwrap();

        assert_eq!(*mock.active.lock(), Some(0));
        let sink = mock.sink.lock().clone().unwrap();
        sink.deliver(Caption::from_millis(500, 900, "from decoder")).unwrap();
        assert_eq!(track.timeline.len(), 1);
    }

    #[test]
    fn missing_ordinal_is_no_such_track() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();

        let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
        assert!(matches!(catalog.select(3), Err(SubtitleError::NoSuchTrack(3))));
    }

    #[test]
    fn removed_file_fails_on_select() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        let sidecar = dir.path().join("film.srt");
        fs::write(&media, "").unwrap();
        fs::write(&sidecar, SRT).unwrap();

        let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
        fs::remove_file(&sidecar).unwrap();
        assert!(matches!(catalog.select(0), Err(SubtitleError::Io { .. })));
    }

    #[test]
    fn large_captions_past_classify_window_still_load() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();

        let mut srt = String::new();
        let mut i = 0;
        while srt.len() <= classify::CLASSIFY_WINDOW_BYTES {
            srt.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                clock(i * 1000),
                clock(i * 1000 + 500),
                "x".repeat(200)
            ));
            i += 1;
        }
        fs::write(dir.path().join("film.srt"), &srt).unwrap();

        let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
        assert_eq!(catalog.entry(0).unwrap().format, SubtitleFormat::SubRip);
        let track = catalog.select(0).unwrap();
        assert_eq!(track.timeline.len(), i as usize);
    }

    fn clock(ms: i64) -> String {
        format!(
            "{:02}:{:02}:{:02},{:03}",
            ms / 3_600_000,
            ms / 60_000 % 60,
            ms / 1000 % 60,
            ms % 1000
        )
    }

    #[test]
    fn binary_sidecar_is_dropped() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();
        fs::write(dir.path().join("film.sub"), vec![0xABu8; 4 * classify::CLASSIFY_WINDOW_BYTES]).unwrap();

        let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.histogram(), "sub:1");
    }

    #[test]
    fn summary_serializes() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("film.mkv");
        fs::write(&media, "").unwrap();
        fs::write(dir.path().join("film.srt"), SRT).unwrap();

        let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
        let summary = catalog.summary();
        assert!(summary.to_json_pretty().unwrap().contains("\"histogram\""));
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["histogram"], "srt:1");
        assert_eq!(json["entries"][0]["format"], "subrip");
        assert_eq!(json["entries"][0]["identity"]["kind"], "external");
    }
}

//! Discovery, selection and playback queries against a real directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use subtrack_core::config::Settings;
use subtrack_core::subtitles::{
    Caption, Catalog, CaptionSink, InBandSource, SubtitleFormat, SubtitleIdentity, SubtitleResult,
    TrackOptions,
};
use tempfile::tempdir;

const SRT: &str = "1
00:00:01,000 --> 00:00:04,000
First

2
00:00:03,000 --> 00:00:05,000
Overlapping

3
00:00:10,000 --> 00:00:12,000
Later
";

const MICRODVD: &str = "{1}{1}25\n{25}{50}Frame one\n{100}{150}Frame two\n";

fn write(dir: &Path, name: &str, content: &[u8]) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn discover_select_and_query() {
    let dir = tempdir().unwrap();
    let media = dir.path().join("movie.mkv");
    write(dir.path(), "movie.mkv", b"");
    write(dir.path(), "movie.en.srt", SRT.as_bytes());
    write(dir.path(), "movie.idx", b"id: en, index: 0\n");
    write(dir.path(), "movie.sub", b"\x00\x01binary");
    write(dir.path(), "unrelated.srt", SRT.as_bytes());

    let catalog = Catalog::build(&media, None, TrackOptions::default()).unwrap();
    let names: Vec<String> = catalog
        .entries()
        .iter()
        .filter_map(|e| e.identity.path())
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["movie.en.srt", "movie.idx"]);
    assert_eq!(catalog.entry(1).unwrap().format, SubtitleFormat::IdxSub);

    let track = catalog.select(0).unwrap();
    assert_eq!(track.format, SubtitleFormat::SubRip);
    let timeline = track.timeline;

    assert!(timeline.find_all_active(0, 500).is_empty());

    let active: Vec<String> = timeline
        .find_all_active(0, 3500)
        .into_iter()
        .map(|c| c.text)
        .collect();
    assert_eq!(active, vec!["First", "Overlapping"]);

    assert_eq!(timeline.find_nearest(60_000), Some(2));
    assert_eq!(timeline.find_nearest(0), Some(0));

    // Seek back then forward after a shift
    timeline.shift_millis(1000).unwrap();
    timeline.reset_cursor();
    let active: Vec<String> = timeline
        .find_all_active(0, 11_500)
        .into_iter()
        .map(|c| c.text)
        .collect();
    assert_eq!(active, vec!["Later"]);

    // Bitmap subtitles are listed but cannot be loaded here
    assert!(catalog.select(1).is_err());
}

#[test]
fn utf16_sidecar_with_configured_frame_rate() {
    let dir = tempdir().unwrap();
    let media = dir.path().join("clip.avi");
    write(dir.path(), "clip.avi", b"");

    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(MICRODVD.encode_utf16().flat_map(|u| u.to_le_bytes()));
    write(dir.path(), "clip.sub", &bytes);

    let mut settings = Settings::default();
    settings.timeline.frame_rate = Some(50.0);
    let options = settings.to_track_options().unwrap();

    let catalog = Catalog::build(&media, None, options).unwrap();
    let track = catalog.select(0).unwrap();
    assert_eq!(track.format, SubtitleFormat::MicroDvd);
    assert_eq!(track.encoding.map(|e| e.name()), Some("UTF-16LE"));

    // Configured rate wins over the file's declaration
    let snapshot = track.timeline.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.begin_ms(0), Some(500));
    assert_eq!(snapshot.begin_ms(1), Some(2000));
}

#[derive(Default)]
struct FakeDecoder {
    sink: Mutex<Option<Arc<dyn CaptionSink>>>,
}

impl InBandSource for FakeDecoder {
    fn total_streams(&self) -> usize {
        2
    }

    fn raw_titles(&self) -> Option<String> {
        Some("1,Dialogue;2,Signs;".to_string())
    }

    fn raw_languages(&self) -> Option<String> {
        Some("1,eng;2,jpn;".to_string())
    }

    fn set_active_stream(&self, _index: usize) -> SubtitleResult<()> {
        Ok(())
    }

    fn attach_sink(&self, sink: Arc<dyn CaptionSink>) {
        *self.sink.lock() = Some(sink);
    }
}

#[test]
fn in_band_captions_arrive_from_decoder_thread() {
    let dir = tempdir().unwrap();
    let media = dir.path().join("show.mkv");
    write(dir.path(), "show.mkv", b"");
    write(dir.path(), "show.srt", SRT.as_bytes());

    let decoder = Arc::new(FakeDecoder::default());
    let source: Arc<dyn InBandSource> = decoder.clone();
    let catalog = Catalog::build(&media, Some(source), TrackOptions::default()).unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.labels()[1], "Signs (jpn)");
    assert_eq!(
        catalog.entry(2).unwrap().identity,
        SubtitleIdentity::external(dir.path().join("show.srt"))
    );

    let track = catalog.select(1).unwrap();
    let sink = decoder.sink.lock().clone().unwrap();

    // Decoder delivers slightly out of order
    let producer = thread::spawn(move || {
        for begin in [3000, 1000, 2000, 5000, 4000] {
            sink.deliver(Caption::from_millis(begin, begin + 1500, format!("at {}", begin)))
                .unwrap();
        }
    });

    // Queries may run while captions arrive
    let _ = track.timeline.find_nearest(2500);
    producer.join().unwrap();

    let snapshot = track.timeline.snapshot();
    let begins: Vec<i64> = (0..snapshot.len())
        .filter_map(|i| snapshot.begin_ms(i))
        .collect();
    assert_eq!(begins, vec![1000, 2000, 3000, 4000, 5000]);

    let active: Vec<String> = track
        .timeline
        .find_all_active(0, 4200)
        .into_iter()
        .map(|c| c.text)
        .collect();
    assert_eq!(active, vec!["at 3000", "at 4000"]);
}

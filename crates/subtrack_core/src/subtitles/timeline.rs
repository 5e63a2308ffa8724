//! Ordered caption container with a playback cursor.
//!
//! Captions are kept in non-decreasing begin order. Appends are expected to be
//! nearly sorted (decoders deliver captions roughly in presentation order), so
//! placement scans backward from the tail instead of re-sorting.
//!
//! The cursor remembers the last looked-up position. Continuous playback moves
//! it by a few captions per query; seeks backward walk with a fixed stride and
//! switch to binary search once the probe budget is spent.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::{ParseError, SubtitleResult};
use super::time::require_frame_rate;
use super::types::Caption;

/// Backward step used when the timestamp is before the cursor caption.
pub const LOOKBACK_STRIDE: usize = 2;

/// Single steps taken forward before falling back to binary search.
const FORWARD_PROBE_LIMIT: usize = 32;

/// Strided steps taken backward before falling back to binary search.
const BACKWARD_PROBE_LIMIT: usize = 16;

/// What `append` does with a caption that ends before it begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalPolicy {
    /// Set the end to the begin time.
    #[default]
    Clamp,
    /// Refuse the caption with a malformed-subtitle error.
    Reject,
}

/// Timeline construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimelineOptions {
    /// Frame rate for frame-based captions.
    pub frame_rate: Option<f64>,
    /// Handling of inverted intervals.
    pub policy: IntervalPolicy,
}

#[derive(Debug, Clone)]
struct Entry {
    caption: Caption,
    begin_ms: i64,
    end_ms: i64,
}

/// Ordered captions for one subtitle track.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<Entry>,
    cursor: Option<usize>,
    options: TimelineOptions,
}

impl Timeline {
    /// Create an empty timeline with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty timeline with the given options.
    pub fn with_options(options: TimelineOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Options in effect.
    pub fn options(&self) -> TimelineOptions {
        self.options
    }

    /// Frame rate used for frame-based captions.
    pub fn frame_rate(&self) -> Option<f64> {
        self.options.frame_rate
    }

    /// Number of captions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the timeline has no captions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor, `None` only when empty.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Caption at an index.
    pub fn get(&self, index: usize) -> Option<&Caption> {
        self.entries.get(index).map(|e| &e.caption)
    }

    /// Caption under the cursor.
    pub fn current(&self) -> Option<&Caption> {
        self.cursor.and_then(|c| self.get(c))
    }

    /// Captions in ascending begin order.
    pub fn captions(&self) -> impl Iterator<Item = &Caption> + '_ {
        self.entries.iter().map(|e| &e.caption)
    }

    /// Begin time in milliseconds of the caption at `index`.
    pub fn begin_ms(&self, index: usize) -> Option<i64> {
        self.entries.get(index).map(|e| e.begin_ms)
    }

    /// End time in milliseconds of the caption at `index`.
    pub fn end_ms(&self, index: usize) -> Option<i64> {
        self.entries.get(index).map(|e| e.end_ms)
    }

    /// Insert a caption at its chronological position.
    ///
    /// Returns the index it was placed at. Equal begin times keep arrival order.
    pub fn append(&mut self, mut caption: Caption) -> SubtitleResult<usize> {
        let rate = self.options.frame_rate;
        let begin_ms = caption.begin.to_millis(rate)?;
        let mut end_ms = caption.end.to_millis(rate)?;

        if end_ms < begin_ms {
            match self.options.policy {
                IntervalPolicy::Reject => {
                    return Err(ParseError::InvertedInterval { begin_ms, end_ms }.into());
                }
                IntervalPolicy::Clamp => {
                    tracing::debug!(
                        "Clamping inverted caption {}ms..{}ms to zero length",
                        begin_ms,
                        end_ms
                    );
                    caption.end = caption.begin;
                    end_ms = begin_ms;
                }
            }
        }

        let mut pos = self.entries.len();
        if let Some(last) = self.entries.last() {
            if begin_ms <= last.begin_ms {
                while pos > 0 && begin_ms < self.entries[pos - 1].begin_ms {
                    pos -= 1;
                }
            }
        }

        self.entries.insert(
            pos,
            Entry {
                caption,
                begin_ms,
                end_ms,
            },
        );

        self.cursor = match self.cursor {
            None => Some(0),
            Some(c) if pos <= c => Some(c + 1),
            keep => keep,
        };

        Ok(pos)
    }

    /// Index of the latest caption beginning at or before `timestamp_ms`.
    ///
    /// Timestamps before the first caption resolve to index 0. Returns `None`
    /// only for an empty timeline. Moves the cursor to the result.
    pub fn find_nearest(&mut self, timestamp_ms: i64) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }

        let last = self.entries.len() - 1;
        let mut idx = self.cursor.unwrap_or(0).min(last);

        if timestamp_ms >= self.entries[idx].begin_ms {
            let mut steps = 0;
            while idx < last && self.entries[idx + 1].begin_ms <= timestamp_ms {
                if steps == FORWARD_PROBE_LIMIT {
                    idx = self.search(timestamp_ms);
                    break;
                }
                idx += 1;
                steps += 1;
            }
        } else {
            let mut steps = 0;
            while idx > 0 && self.entries[idx].begin_ms > timestamp_ms {
                if steps == BACKWARD_PROBE_LIMIT {
                    idx = self.search(timestamp_ms);
                    break;
                }
                idx = idx.saturating_sub(LOOKBACK_STRIDE);
                steps += 1;
            }
            // The stride can overshoot by one caption.
            while idx < last && self.entries[idx + 1].begin_ms <= timestamp_ms {
                idx += 1;
            }
        }

        self.cursor = Some(idx);
        Some(idx)
    }

    fn search(&self, timestamp_ms: i64) -> usize {
        self.entries
            .partition_point(|e| e.begin_ms <= timestamp_ms)
            .saturating_sub(1)
    }

    /// Every caption whose `[begin, end]` interval contains `timestamp_ms`.
    ///
    /// The cursor is repositioned first; scanning starts at `from_index` or the
    /// nearest caption, whichever is earlier, and stops at the first caption
    /// that begins after the timestamp.
    pub fn find_all_active(&mut self, from_index: usize, timestamp_ms: i64) -> Vec<&Caption> {
        let Some(nearest) = self.find_nearest(timestamp_ms) else {
            return Vec::new();
        };
        let start = from_index.min(nearest);

        self.entries[start..]
            .iter()
            .take_while(|e| e.begin_ms <= timestamp_ms)
            .filter(|e| e.end_ms >= timestamp_ms)
            .map(|e| &e.caption)
            .collect()
    }

    /// Move the cursor one caption forward (clamped).
    pub fn advance(&mut self) -> Option<usize> {
        let last = self.entries.len().checked_sub(1)?;
        let next = self.cursor.map_or(0, |c| (c + 1).min(last));
        self.cursor = Some(next);
        Some(next)
    }

    /// Move the cursor one caption backward (clamped).
    pub fn retreat(&mut self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let prev = self.cursor.map_or(0, |c| c.saturating_sub(1));
        self.cursor = Some(prev);
        Some(prev)
    }

    /// Put the cursor back at the first caption, e.g. after a seek.
    pub fn reset_cursor(&mut self) {
        self.cursor = if self.entries.is_empty() { None } else { Some(0) };
    }

    /// Shift every caption by a signed millisecond delta.
    pub fn shift_millis(&mut self, delta_ms: i64) -> SubtitleResult<()> {
        let rate = self.options.frame_rate;
        for entry in &mut self.entries {
            entry.caption.begin.shift_millis(delta_ms, rate)?;
            entry.caption.end.shift_millis(delta_ms, rate)?;
        }
        self.refresh_cache()
    }

    /// Shift every caption by a signed frame delta.
    pub fn shift_frames(&mut self, delta_frames: i64) -> SubtitleResult<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let rate = Some(require_frame_rate(self.options.frame_rate)?);
        for entry in &mut self.entries {
            entry.caption.begin.shift_frames(delta_frames, rate)?;
            entry.caption.end.shift_frames(delta_frames, rate)?;
        }
        self.refresh_cache()
    }

    /// Change the frame rate used for frame-based captions.
    ///
    /// The previous rate is restored if any caption cannot be converted.
    pub fn set_frame_rate(&mut self, frame_rate: Option<f64>) -> SubtitleResult<()> {
        if frame_rate.is_some() {
            require_frame_rate(frame_rate)?;
        }
        let previous = self.options.frame_rate;
        self.options.frame_rate = frame_rate;
        if let Err(e) = self.refresh_cache() {
            self.options.frame_rate = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Drop captions with no displayable text. Returns how many were removed.
    pub fn prune_empty(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.caption.is_empty());
        let removed = before - self.entries.len();

        self.cursor = match (self.cursor, self.entries.len()) {
            (_, 0) => None,
            (Some(c), len) => Some(c.min(len - 1)),
            (None, _) => Some(0),
        };
        removed
    }

    /// Rewrite caption ordinals as 1..=n in timeline order.
    pub fn renumber(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.caption.index = i + 1;
        }
    }

    fn refresh_cache(&mut self) -> SubtitleResult<()> {
        let rate = self.options.frame_rate;
        let mut refreshed = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            refreshed.push((
                entry.caption.begin.to_millis(rate)?,
                entry.caption.end.to_millis(rate)?,
            ));
        }
        for (entry, (begin_ms, end_ms)) in self.entries.iter_mut().zip(refreshed) {
            entry.begin_ms = begin_ms;
            entry.end_ms = end_ms;
        }
        Ok(())
    }
}

/// Receives captions from an asynchronous producer such as an in-band decoder.
pub trait CaptionSink: Send + Sync {
    /// Deliver one caption.
    fn deliver(&self, caption: Caption) -> SubtitleResult<()>;
}

/// Thread-safe timeline handle.
///
/// Appends and cursor queries are serialized by one lock because placement
/// reorders the entries the cursor indexes into.
#[derive(Debug, Clone, Default)]
pub struct SharedTimeline {
    inner: Arc<Mutex<Timeline>>,
}

impl SharedTimeline {
    /// Wrap a timeline.
    pub fn new(timeline: Timeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(timeline)),
        }
    }

    /// Insert a caption at its chronological position.
    pub fn append(&self, caption: Caption) -> SubtitleResult<usize> {
        self.inner.lock().append(caption)
    }

    /// See [`Timeline::find_nearest`].
    pub fn find_nearest(&self, timestamp_ms: i64) -> Option<usize> {
        self.inner.lock().find_nearest(timestamp_ms)
    }

    /// See [`Timeline::find_all_active`]. Returns owned captions.
    pub fn find_all_active(&self, from_index: usize, timestamp_ms: i64) -> Vec<Caption> {
        self.inner
            .lock()
            .find_all_active(from_index, timestamp_ms)
            .into_iter()
            .cloned()
            .collect()
    }

    /// See [`Timeline::advance`].
    pub fn advance(&self) -> Option<usize> {
        self.inner.lock().advance()
    }

    /// See [`Timeline::retreat`].
    pub fn retreat(&self) -> Option<usize> {
        self.inner.lock().retreat()
    }

    /// See [`Timeline::reset_cursor`].
    pub fn reset_cursor(&self) {
        self.inner.lock().reset_cursor()
    }

    /// See [`Timeline::shift_millis`].
    pub fn shift_millis(&self, delta_ms: i64) -> SubtitleResult<()> {
        self.inner.lock().shift_millis(delta_ms)
    }

    /// See [`Timeline::shift_frames`].
    pub fn shift_frames(&self, delta_frames: i64) -> SubtitleResult<()> {
        self.inner.lock().shift_frames(delta_frames)
    }

    /// Number of captions.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the timeline has no captions.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Timeline {
        self.inner.lock().clone()
    }

    /// Run a closure with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut Timeline) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<Timeline> for SharedTimeline {
    fn from(timeline: Timeline) -> Self {
        Self::new(timeline)
    }
}

impl CaptionSink for SharedTimeline {
    fn deliver(&self, caption: Caption) -> SubtitleResult<()> {
        self.append(caption).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::error::SubtitleError;
    use crate::subtitles::time::TimeValue;

    fn timeline_of(spans: &[(i64, i64)]) -> Timeline {
        let mut tl = Timeline::new();
        for (i, (b, e)) in spans.iter().enumerate() {
            tl.append(Caption::from_millis(*b, *e, format!("c{}", i)))
                .unwrap();
        }
        tl
    }

    fn begins(tl: &Timeline) -> Vec<i64> {
        (0..tl.len()).map(|i| tl.begin_ms(i).unwrap()).collect()
    }

    #[test]
    fn out_of_order_appends_stay_sorted() {
        let tl = timeline_of(&[(5000, 6000), (1000, 2000), (3000, 4000), (2000, 2500), (7000, 8000)]);
        assert_eq!(begins(&tl), vec![1000, 2000, 3000, 5000, 7000]);
    }

    #[test]
    fn equal_begins_keep_arrival_order() {
        let mut tl = Timeline::new();
        tl.append(Caption::from_millis(1000, 2000, "first")).unwrap();
        tl.append(Caption::from_millis(1000, 3000, "second")).unwrap();
        let texts: Vec<_> = tl.captions().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn inverted_caption_clamped_by_default() {
        let mut tl = Timeline::new();
        tl.append(Caption::from_millis(5000, 4000, "bad")).unwrap();
        assert_eq!(tl.end_ms(0), Some(5000));
        assert_eq!(tl.get(0).unwrap().end, TimeValue::from_millis(5000));
    }

    #[test]
    fn inverted_caption_rejected_when_strict() {
        let mut tl = Timeline::with_options(TimelineOptions {
            policy: IntervalPolicy::Reject,
            ..Default::default()
        });
        let err = tl.append(Caption::from_millis(5000, 4000, "bad")).unwrap_err();
        assert!(matches!(
            err,
            SubtitleError::Malformed(ParseError::InvertedInterval { .. })
        ));
        assert!(tl.is_empty());
        assert_eq!(tl.cursor(), None);
    }

    #[test]
    fn frame_captions_need_rate() {
        let mut tl = Timeline::new();
        assert!(matches!(
            tl.append(Caption::from_frames(0, 25, "x")),
            Err(SubtitleError::InvalidFrameRate(None))
        ));

        let mut tl = Timeline::with_options(TimelineOptions {
            frame_rate: Some(25.0),
            ..Default::default()
        });
        tl.append(Caption::from_frames(25, 50, "x")).unwrap();
        assert_eq!(tl.begin_ms(0), Some(1000));
        assert_eq!(tl.end_ms(0), Some(2000));
    }

    #[test]
    fn find_nearest_empty() {
        let mut tl = Timeline::new();
        assert_eq!(tl.find_nearest(1000), None);
        assert_eq!(tl.cursor(), None);
    }

    #[test]
    fn find_nearest_bounds() {
        let mut tl = timeline_of(&[(1000, 2000), (3000, 4000), (5000, 6000)]);
        assert_eq!(tl.find_nearest(100_000), Some(2));
        assert_eq!(tl.find_nearest(0), Some(0));
        assert_eq!(tl.find_nearest(5000), Some(2));
        assert_eq!(tl.find_nearest(4999), Some(1));
    }

    #[test]
    fn find_nearest_continuous_playback() {
        let spans: Vec<(i64, i64)> = (0..50).map(|i| (i * 1000, i * 1000 + 900)).collect();
        let mut tl = timeline_of(&spans);
        for t in (0..50_000).step_by(250) {
            assert_eq!(tl.find_nearest(t), Some((t / 1000) as usize));
        }
    }

    #[test]
    fn find_nearest_backward_seeks() {
        let spans: Vec<(i64, i64)> = (0..1000).map(|i| (i * 100, i * 100 + 50)).collect();
        let mut tl = timeline_of(&spans);

        // Jump to the end, then seek back by various distances.
        assert_eq!(tl.find_nearest(99_950), Some(999));
        assert_eq!(tl.find_nearest(99_650), Some(996));
        assert_eq!(tl.find_nearest(99_550), Some(995));
        assert_eq!(tl.find_nearest(42_010), Some(420));
        assert_eq!(tl.find_nearest(0), Some(0));
        assert_eq!(tl.find_nearest(-5), Some(0));
        assert_eq!(tl.find_nearest(77_777), Some(777));
    }

    #[test]
    fn find_nearest_with_duplicate_begins() {
        let mut tl = timeline_of(&[(1000, 2000), (1000, 2500), (1000, 3000), (4000, 5000)]);
        assert_eq!(tl.find_nearest(1500), Some(2));
        tl.find_nearest(4500);
        assert_eq!(tl.find_nearest(1000), Some(2));
    }

    #[test]
    fn find_all_active_overlapping() {
        let mut tl = timeline_of(&[(1000, 5000), (2000, 3000), (2500, 6000), (7000, 8000)]);
        let active: Vec<_> = tl
            .find_all_active(0, 2700)
            .into_iter()
            .map(|c| c.text.clone())
            .collect();
        assert_eq!(active, vec!["c0", "c1", "c2"]);

        assert!(tl.find_all_active(0, 500).is_empty());
        assert!(tl.find_all_active(0, 6500).is_empty());

        let active = tl.find_all_active(3, 7500);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].text, "c3");
    }

    #[test]
    fn find_all_active_after_backward_seek() {
        let mut tl = timeline_of(&[(1000, 2000), (3000, 4000), (5000, 6000)]);
        tl.find_nearest(5500);
        let active = tl.find_all_active(2, 1500);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].text, "c0");
        assert_eq!(tl.cursor(), Some(0));
    }

    #[test]
    fn advance_and_retreat_clamp() {
        let mut tl = timeline_of(&[(0, 1), (2, 3)]);
        assert_eq!(tl.retreat(), Some(0));
        assert_eq!(tl.advance(), Some(1));
        assert_eq!(tl.advance(), Some(1));
        assert_eq!(tl.retreat(), Some(0));

        let mut empty = Timeline::new();
        assert_eq!(empty.advance(), None);
        assert_eq!(empty.retreat(), None);
    }

    #[test]
    fn cursor_follows_inserted_caption() {
        let mut tl = timeline_of(&[(1000, 2000), (3000, 4000)]);
        tl.find_nearest(3500);
        assert_eq!(tl.cursor(), Some(1));
        tl.append(Caption::from_millis(500, 800, "early")).unwrap();
        assert_eq!(tl.cursor(), Some(2));
        assert_eq!(tl.current().unwrap().text, "c1");
    }

    #[test]
    fn shift_round_trip() {
        let mut tl = timeline_of(&[(1000, 2000), (3_599_999, 3_600_500)]);
        let before: Vec<Caption> = tl.captions().cloned().collect();
        tl.shift_millis(12_345).unwrap();
        assert_eq!(tl.begin_ms(0), Some(13_345));
        tl.shift_millis(-12_345).unwrap();
        let after: Vec<Caption> = tl.captions().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn shift_frames_requires_rate() {
        let mut tl = timeline_of(&[(1000, 2000)]);
        assert!(matches!(
            tl.shift_frames(10),
            Err(SubtitleError::InvalidFrameRate(None))
        ));
        tl.set_frame_rate(Some(25.0)).unwrap();
        tl.shift_frames(25).unwrap();
        assert_eq!(tl.begin_ms(0), Some(2000));
    }

    #[test]
    fn set_frame_rate_restores_on_failure() {
        let mut tl = Timeline::with_options(TimelineOptions {
            frame_rate: Some(25.0),
            ..Default::default()
        });
        tl.append(Caption::from_frames(25, 50, "x")).unwrap();
        assert!(tl.set_frame_rate(None).is_err());
        assert_eq!(tl.frame_rate(), Some(25.0));
        assert!(tl.set_frame_rate(Some(-3.0)).is_err());

        tl.set_frame_rate(Some(50.0)).unwrap();
        assert_eq!(tl.begin_ms(0), Some(500));
    }

    #[test]
    fn prune_and_renumber() {
        let mut tl = Timeline::new();
        tl.append(Caption::from_millis(0, 10, "a")).unwrap();
        tl.append(Caption::from_millis(20, 30, "")).unwrap();
        tl.append(Caption::from_millis(40, 50, "b")).unwrap();
        tl.find_nearest(45);

        assert_eq!(tl.prune_empty(), 1);
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.cursor(), Some(1));

        tl.renumber();
        let indices: Vec<_> = tl.captions().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn shared_timeline_concurrent_appends() {
        let shared = SharedTimeline::default();
        let producer = shared.clone();

        let handle = std::thread::spawn(move || {
            // Nearly sorted: pairs arrive swapped.
            for i in (0..200).step_by(2) {
                producer
                    .deliver(Caption::from_millis((i + 1) * 100, (i + 1) * 100 + 50, "b"))
                    .unwrap();
                producer
                    .deliver(Caption::from_millis(i * 100, i * 100 + 50, "a"))
                    .unwrap();
            }
        });

        for t in 0..200 {
            let _ = shared.find_nearest(t * 100);
            let _ = shared.find_all_active(0, t * 100);
        }
        handle.join().unwrap();

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.len(), 200);
        let b = begins(&snapshot);
        assert!(b.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(shared.find_nearest(19_950), Some(199));
    }
}

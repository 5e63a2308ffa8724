//! Caption time values.
//!
//! A [`TimeValue`] is authoritative in exactly one unit: either clock time
//! (hours/minutes/seconds/milliseconds) or a frame count. Converting between
//! the two needs a frame rate, and a frame value that is shifted by a
//! millisecond delta becomes a clock value permanently.

use std::fmt;

use super::error::{SubtitleError, SubtitleResult};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Validate a frame rate for frame/time conversion.
pub fn require_frame_rate(frame_rate: Option<f64>) -> SubtitleResult<f64> {
    match frame_rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        other => Err(SubtitleError::InvalidFrameRate(other)),
    }
}

/// Normalized clock fields.
///
/// Minutes and seconds lie in `0..=59`, milliseconds in `0..=999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ClockTime {
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub millis: u16,
}

impl ClockTime {
    /// Build from possibly out-of-range fields, carrying overflow upward and
    /// borrowing underflow downward. A negative total clamps to zero.
    pub fn normalized(hours: i64, minutes: i64, seconds: i64, millis: i64) -> Self {
        let mut ms = millis;
        let mut s = seconds.saturating_add(ms.div_euclid(1000));
        ms = ms.rem_euclid(1000);
        let mut m = minutes.saturating_add(s.div_euclid(60));
        s = s.rem_euclid(60);
        let h = hours.saturating_add(m.div_euclid(60));
        m = m.rem_euclid(60);

        if h < 0 {
            return Self::default();
        }

        Self {
            hours: h.min(u32::MAX as i64) as u32,
            minutes: m as u8,
            seconds: s as u8,
            millis: ms as u16,
        }
    }

    /// Build from a millisecond count (negative clamps to zero).
    pub fn from_millis(total_ms: i64) -> Self {
        Self::normalized(0, 0, 0, total_ms)
    }

    /// Total milliseconds.
    pub fn total_millis(&self) -> i64 {
        self.hours as i64 * MS_PER_HOUR
            + self.minutes as i64 * MS_PER_MINUTE
            + self.seconds as i64 * MS_PER_SECOND
            + self.millis as i64
    }

    fn shifted(&self, delta_ms: i64) -> Self {
        Self::normalized(
            self.hours as i64,
            self.minutes as i64,
            self.seconds as i64,
            (self.millis as i64).saturating_add(delta_ms),
        )
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.millis
        )
    }
}

/// A caption timestamp in either clock time or frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    /// Absolute clock time.
    Clock(ClockTime),
    /// Frame count, meaningful only together with a frame rate.
    Frames(u64),
}

impl Default for TimeValue {
    fn default() -> Self {
        Self::Clock(ClockTime::default())
    }
}

impl TimeValue {
    /// Clock value from milliseconds.
    pub fn from_millis(ms: i64) -> Self {
        Self::Clock(ClockTime::from_millis(ms))
    }

    /// Clock value from separate fields (normalized).
    pub fn from_hms(hours: i64, minutes: i64, seconds: i64, millis: i64) -> Self {
        Self::Clock(ClockTime::normalized(hours, minutes, seconds, millis))
    }

    /// Frame value.
    pub fn from_frames(frames: u64) -> Self {
        Self::Frames(frames)
    }

    /// Whether the frame count is the authoritative unit.
    pub fn is_frames(&self) -> bool {
        matches!(self, Self::Frames(_))
    }

    /// Milliseconds. Frame values need a positive frame rate.
    pub fn to_millis(&self, frame_rate: Option<f64>) -> SubtitleResult<i64> {
        match self {
            Self::Clock(clock) => Ok(clock.total_millis()),
            Self::Frames(frames) => {
                let rate = require_frame_rate(frame_rate)?;
                Ok((*frames as f64 * 1000.0 / rate).round() as i64)
            }
        }
    }

    /// Frame count. Clock values need a positive frame rate.
    pub fn to_frames(&self, frame_rate: Option<f64>) -> SubtitleResult<u64> {
        match self {
            Self::Frames(frames) => Ok(*frames),
            Self::Clock(clock) => {
                let rate = require_frame_rate(frame_rate)?;
                Ok((clock.total_millis() as f64 * rate / 1000.0).round() as u64)
            }
        }
    }

    /// Clock fields, converting a frame value with the given rate.
    ///
    /// Frame granularity is lost by this conversion.
    pub fn to_clock(&self, frame_rate: Option<f64>) -> SubtitleResult<ClockTime> {
        match self {
            Self::Clock(clock) => Ok(*clock),
            Self::Frames(_) => Ok(ClockTime::from_millis(self.to_millis(frame_rate)?)),
        }
    }

    /// Shift by a signed millisecond delta.
    ///
    /// A frame value is converted to clock time first and stays clock time.
    pub fn shift_millis(&mut self, delta_ms: i64, frame_rate: Option<f64>) -> SubtitleResult<()> {
        let clock = self.to_clock(frame_rate)?;
        *self = Self::Clock(clock.shifted(delta_ms));
        Ok(())
    }

    /// Shift by a signed frame delta.
    ///
    /// Frame values stay frames (floored at zero); clock values are shifted by
    /// the delta's duration at the given rate.
    pub fn shift_frames(&mut self, delta_frames: i64, frame_rate: Option<f64>) -> SubtitleResult<()> {
        match self {
            Self::Frames(frames) => {
                *frames = (*frames as i64).saturating_add(delta_frames).max(0) as u64;
                Ok(())
            }
            Self::Clock(clock) => {
                let rate = require_frame_rate(frame_rate)?;
                let delta_ms = (delta_frames as f64 * 1000.0 / rate).round() as i64;
                *clock = clock.shifted(delta_ms);
                Ok(())
            }
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock(clock) => clock.fmt(f),
            Self::Frames(frames) => write!(f, "frame {}", frames),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_carries_overflow() {
        let t = ClockTime::normalized(0, 59, 59, 1500);
        assert_eq!(
            t,
            ClockTime {
                hours: 1,
                minutes: 0,
                seconds: 0,
                millis: 500
            }
        );
    }

    #[test]
    fn normalization_borrows_underflow() {
        let t = ClockTime::normalized(1, 0, 0, -1);
        assert_eq!(
            t,
            ClockTime {
                hours: 0,
                minutes: 59,
                seconds: 59,
                millis: 999
            }
        );
    }

    #[test]
    fn extreme_fields_saturate() {
        let t = ClockTime::normalized(0, i64::MAX, i64::MAX, i64::MAX);
        assert_eq!(t.hours, u32::MAX);
        assert!(t.minutes < 60 && t.seconds < 60 && t.millis < 1000);

        let mut v = TimeValue::from_millis(1000);
        v.shift_millis(i64::MIN, None).unwrap();
        assert_eq!(v.to_millis(None).unwrap(), 0);
    }

    #[test]
    fn negative_total_clamps_to_zero() {
        let mut t = TimeValue::from_millis(500);
        t.shift_millis(-2000, None).unwrap();
        assert_eq!(t.to_millis(None).unwrap(), 0);
    }

    #[test]
    fn frames_need_rate() {
        let t = TimeValue::from_frames(50);
        assert!(matches!(
            t.to_millis(None),
            Err(SubtitleError::InvalidFrameRate(None))
        ));
        assert!(matches!(
            t.to_millis(Some(0.0)),
            Err(SubtitleError::InvalidFrameRate(Some(_)))
        ));
        assert_eq!(t.to_millis(Some(25.0)).unwrap(), 2000);
    }

    #[test]
    fn clock_to_frames_needs_rate() {
        let t = TimeValue::from_millis(2000);
        assert!(t.to_frames(None).is_err());
        assert_eq!(t.to_frames(Some(25.0)).unwrap(), 50);
        // Clock to millis never needs a rate.
        assert_eq!(t.to_millis(None).unwrap(), 2000);
    }

    #[test]
    fn shifting_frames_by_millis_becomes_clock() {
        let mut t = TimeValue::from_frames(25);
        t.shift_millis(500, Some(25.0)).unwrap();
        assert!(!t.is_frames());
        assert_eq!(t.to_millis(None).unwrap(), 1500);
    }

    #[test]
    fn frame_shift_floors_at_zero() {
        let mut t = TimeValue::from_frames(10);
        t.shift_frames(-25, None).unwrap();
        assert_eq!(t, TimeValue::Frames(0));
    }

    #[test]
    fn shift_round_trip_is_exact() {
        let original = TimeValue::from_hms(1, 2, 3, 456);
        let mut t = original;
        t.shift_millis(3_725_999, None).unwrap();
        t.shift_millis(-3_725_999, None).unwrap();
        assert_eq!(t, original);
    }

    #[test]
    fn display_formats() {
        assert_eq!(TimeValue::from_hms(1, 2, 3, 4).to_string(), "01:02:03.004");
        assert_eq!(TimeValue::from_frames(12).to_string(), "frame 12");
    }
}

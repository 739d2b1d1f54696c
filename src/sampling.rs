//! Temporal sampling decisions.
//!
//! [`SamplingClock`] keeps a running presentation-time accumulator for the
//! video stream and decides, frame by frame, whether the frame just decoded is
//! due for emission. The accumulator advances by one of four rules, tried in a
//! fixed order on every call (see [`TimestampRule`]):
//!
//! 1. the stream's nominal average frame rate, when valid;
//! 2. the packet's presentation timestamp, when positive;
//! 3. the packet's decode timestamp, when positive;
//! 4. an assumed 25 frames per second.
//!
//! The first evaluation of a run is always emitted. Afterwards a frame is due
//! once at least `interval_ms` milliseconds have accumulated since the last
//! emitted frame.
//!
//! Rules 2 and 3 copy the timestamp into the accumulator as is, in stream
//! time-base units. [`SamplingClock::with_rescaled_timestamps`] converts them
//! to microseconds through the stream time base instead.
//!
//! # Example
//!
//! ```
//! use framesift::{PacketTimestamps, Rational, SamplingClock};
//!
//! // 25 fps stream, one image every 200 ms.
//! let mut clock = SamplingClock::new(200, Rational::new(25, 1), Rational::new(1, 25));
//! let emitted: Vec<bool> = (0..10)
//!     .map(|_| clock.evaluate(PacketTimestamps::default()).emit)
//!     .collect();
//! assert_eq!(emitted.iter().filter(|&&emit| emit).count(), 2);
//! assert!(emitted[0] && emitted[5]);
//! ```

use ffmpeg_next::Rational;

use crate::conversion::timestamp_to_microseconds;

/// Increment used when no frame rate or timestamp is usable (25 fps).
pub const ASSUMED_FRAME_DURATION_US: i64 = 1_000_000 / 25;

/// Which piece of stream metadata advanced the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampRule {
    /// Fixed per-frame step derived from the stream's average frame rate.
    NominalFrameRate,
    /// Accumulator set from the packet's presentation timestamp.
    PresentationTimestamp,
    /// Accumulator set from the packet's decode timestamp.
    DecodeTimestamp,
    /// Fixed 40 ms step.
    AssumedFrameRate,
}

/// Timestamps carried by the packet a frame was decoded from.
///
/// Both are in stream time-base units. Flushed frames carry neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketTimestamps {
    /// Presentation timestamp.
    pub pts: Option<i64>,
    /// Decode timestamp.
    pub dts: Option<i64>,
}

impl PacketTimestamps {
    /// Timestamps with only a presentation timestamp.
    pub fn with_pts(pts: i64) -> Self {
        Self {
            pts: Some(pts),
            dts: None,
        }
    }

    /// Timestamps with only a decode timestamp.
    pub fn with_dts(dts: i64) -> Self {
        Self {
            pts: None,
            dts: Some(dts),
        }
    }
}

/// Outcome of a single [`SamplingClock::evaluate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct SamplingDecision {
    /// Whether the frame should be written.
    pub emit: bool,
    /// Accumulator value after this evaluation. Microseconds, except after a
    /// raw pts/dts assignment, which leaves it in stream time-base units.
    pub presentation_time_us: i64,
    /// Rule that produced `presentation_time_us`.
    pub rule: TimestampRule,
}

/// Running emit/skip state for one extraction run.
#[derive(Debug, Clone)]
pub struct SamplingClock {
    interval_ms: u64,
    frame_rate: Rational,
    time_base: Rational,
    rescale_timestamps: bool,
    accumulator_us: i64,
    last_emitted_us: Option<i64>,
}

fn is_valid(rate: Rational) -> bool {
    rate.numerator() > 0 && rate.denominator() > 0
}

impl SamplingClock {
    /// Create a clock for a stream with the given average frame rate and
    /// time base. `interval_ms == 0` emits every frame.
    ///
    /// Invalid rationals (zero or negative terms) are accepted; they simply
    /// make the corresponding rule inapplicable.
    pub fn new(interval_ms: u64, frame_rate: Rational, time_base: Rational) -> Self {
        Self {
            interval_ms,
            frame_rate,
            time_base,
            rescale_timestamps: false,
            accumulator_us: 0,
            last_emitted_us: None,
        }
    }

    /// Convert pts/dts to microseconds through the stream time base before
    /// assigning them to the accumulator. Off by default; has no effect when
    /// the time base is invalid.
    pub fn with_rescaled_timestamps(mut self, enabled: bool) -> Self {
        self.rescale_timestamps = enabled;
        self
    }

    /// Whether pts/dts are rescaled to microseconds.
    pub fn rescales_timestamps(&self) -> bool {
        self.rescale_timestamps
    }

    /// Minimum spacing between emitted frames, in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Current accumulator value (see [`SamplingDecision::presentation_time_us`]).
    pub fn accumulator_us(&self) -> i64 {
        self.accumulator_us
    }

    /// Accumulator value at the last emission. `None` before the first
    /// evaluation.
    pub fn last_emitted_us(&self) -> Option<i64> {
        self.last_emitted_us
    }

    /// Pick the rule that will advance the accumulator for these timestamps.
    pub fn rule_for(&self, timestamps: PacketTimestamps) -> TimestampRule {
        if is_valid(self.frame_rate) {
            TimestampRule::NominalFrameRate
        } else if timestamps.pts.is_some_and(|pts| pts > 0) {
            TimestampRule::PresentationTimestamp
        } else if timestamps.dts.is_some_and(|dts| dts > 0) {
            TimestampRule::DecodeTimestamp
        } else {
            TimestampRule::AssumedFrameRate
        }
    }

    /// Advance the accumulator for one decoded frame and decide whether it
    /// is due.
    pub fn evaluate(&mut self, timestamps: PacketTimestamps) -> SamplingDecision {
        let rule = self.rule_for(timestamps);
        self.accumulator_us = match rule {
            TimestampRule::NominalFrameRate => {
                let step = 1_000_000 * i64::from(self.frame_rate.denominator())
                    / i64::from(self.frame_rate.numerator());
                self.accumulator_us.saturating_add(step)
            }
            TimestampRule::PresentationTimestamp => {
                self.assign_timestamp(timestamps.pts.unwrap_or_default())
            }
            TimestampRule::DecodeTimestamp => {
                self.assign_timestamp(timestamps.dts.unwrap_or_default())
            }
            TimestampRule::AssumedFrameRate => {
                self.accumulator_us.saturating_add(ASSUMED_FRAME_DURATION_US)
            }
        };

        let emit = match self.last_emitted_us {
            None => true,
            Some(_) if self.interval_ms == 0 => true,
            Some(last) => {
                let threshold_us = i64::try_from(self.interval_ms)
                    .unwrap_or(i64::MAX / 1000)
                    .saturating_mul(1000);
                self.accumulator_us.saturating_sub(last) >= threshold_us
            }
        };

        // A pts/dts that jumps backwards must not pull the marker back.
        if emit {
            let marker = self
                .last_emitted_us
                .map_or(self.accumulator_us, |last| last.max(self.accumulator_us));
            self.last_emitted_us = Some(marker);
        }

        SamplingDecision {
            emit,
            presentation_time_us: self.accumulator_us,
            rule,
        }
    }

    fn assign_timestamp(&self, timestamp: i64) -> i64 {
        if self.rescale_timestamps && is_valid(self.time_base) {
            timestamp_to_microseconds(timestamp, self.time_base)
        } else {
            timestamp
        }
    }
}

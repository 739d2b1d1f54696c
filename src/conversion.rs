//! Internal timestamp and geometry conversions.

use ffmpeg_next::Rational;

/// Rescale a timestamp in `time_base` units to microseconds.
///
/// Computed in 128-bit arithmetic and saturated to the `i64` range. The caller
/// guarantees a positive denominator.
pub(crate) fn timestamp_to_microseconds(timestamp: i64, time_base: Rational) -> i64 {
    let scaled = i128::from(timestamp) * 1_000_000 * i128::from(time_base.numerator())
        / i128::from(time_base.denominator());
    scaled.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Convert a rational frame rate to frames per second, `0.0` when invalid.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        f64::from(rate.numerator()) / f64::from(rate.denominator())
    } else {
        0.0
    }
}

/// Derive one output dimension from the other, preserving `source` aspect.
pub(crate) fn scale_dimension(given: u32, given_source: u32, other_source: u32) -> u32 {
    if given_source == 0 {
        return other_source.max(1);
    }
    let ratio = f64::from(given) / f64::from(given_source);
    ((f64::from(other_source) * ratio).round() as u32).max(1)
}

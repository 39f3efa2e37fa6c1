//! Timing primitives for tick-driven scripts.
//!
//! The host owns the clock: every tick it delivers advances a counter, and all
//! musical timing is derived from that counter rather than from wall-clock
//! time. This keeps interval pulses locked to the host transport and avoids
//! floating-point drift over long sessions.
//!
//! - [`Transport`] - ticks per beat, tempo and the tick counter
//! - [`beats_to_duration_ms`] - beat-relative durations to milliseconds
//! - [`is_interval_start`] - one-tick pulses at repeating beat boundaries

/// Default resolution of one beat in ticks.
pub const DEFAULT_TICKS_PER_BEAT: f64 = 180.0;

/// Default tempo in beats per minute.
pub const DEFAULT_BEATS_PER_MINUTE: f64 = 100.0;

/// Convert a duration in beats to milliseconds at the given tempo.
///
/// Returns `None` when `duration_beats` is not positive, which callers treat
/// as "no duration" rather than an error.
#[inline]
pub fn beats_to_duration_ms(duration_beats: f64, bpm: f64) -> Option<f64> {
    if !(duration_beats > 0.0) || !duration_beats.is_finite() {
        return None;
    }
    Some((duration_beats / bpm) * 60_000.0)
}

/// Check whether `tick` is the start of a repeating interval.
///
/// The tick is first shifted by `floor(offset_beats * ticks_per_beat)`. A
/// shifted tick before zero has not reached the first interval yet. Otherwise
/// the pulse fires on the first tick after each interval boundary, so the
/// shifted tick `0` itself never fires.
pub fn is_interval_start(
    tick: u64,
    ticks_per_beat: f64,
    interval_beats: f64,
    offset_beats: f64,
) -> bool {
    let offset_ticks = (offset_beats * ticks_per_beat).floor();
    if !offset_ticks.is_finite() {
        return false;
    }
    // Stay in f64: huge offsets must not overflow an integer subtraction.
    let adjusted = tick as f64 - offset_ticks;
    if adjusted < 0.0 || adjusted >= i64::MAX as f64 {
        return false;
    }
    let adjusted = adjusted as i64;

    let ticks_per_interval = ticks_per_beat * interval_beats;
    if !(ticks_per_interval > 0.0) || !ticks_per_interval.is_finite() {
        return false;
    }

    let intervals_passed = (adjusted as f64 / ticks_per_interval).floor();
    let interval_start = (ticks_per_interval * intervals_passed).floor() as i64 + 1;
    adjusted == interval_start
}

/// The authoritative clock state of one bridge.
///
/// Tempo setters reject values that are not strictly positive, so
/// `ticks_per_beat > 0` and `beats_per_minute > 0` always hold.
#[derive(Clone, Debug, PartialEq)]
pub struct Transport {
    ticks_per_beat: f64,
    beats_per_minute: f64,
    tick: u64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_BEAT, DEFAULT_BEATS_PER_MINUTE)
    }
}

impl Transport {
    /// Create a transport at tick 0.
    ///
    /// Values that are not positive fall back to the defaults.
    pub fn new(ticks_per_beat: f64, beats_per_minute: f64) -> Self {
        let mut transport = Self {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            beats_per_minute: DEFAULT_BEATS_PER_MINUTE,
            tick: 0,
        };
        transport.set_ticks_per_beat(ticks_per_beat);
        transport.set_beats_per_minute(beats_per_minute);
        transport
    }

    pub fn ticks_per_beat(&self) -> f64 {
        self.ticks_per_beat
    }

    pub fn beats_per_minute(&self) -> f64 {
        self.beats_per_minute
    }

    /// Current value of the tick counter.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Set ticks per beat. Returns `false` and leaves the value untouched
    /// when `value` is not a positive finite number.
    pub fn set_ticks_per_beat(&mut self, value: f64) -> bool {
        if is_positive(value) {
            self.ticks_per_beat = value;
            true
        } else {
            false
        }
    }

    /// Set the tempo. Returns `false` and leaves the value untouched when
    /// `value` is not a positive finite number.
    pub fn set_beats_per_minute(&mut self, value: f64) -> bool {
        if is_positive(value) {
            self.beats_per_minute = value;
            true
        } else {
            false
        }
    }

    /// Rewind the tick counter to zero.
    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Advance the tick counter by exactly one.
    pub fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }

    /// Length of one tick in seconds at the current tempo.
    pub fn tick_period_secs(&self) -> f64 {
        60.0 / (self.beats_per_minute * self.ticks_per_beat)
    }
}

#[inline]
fn is_positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_beat_duration() {
        for bpm in [60.0, 100.0, 120.0, 133.0, 7.0] {
            let ms = beats_to_duration_ms(1.0, bpm).unwrap();
            assert!((ms - 60_000.0 / bpm).abs() < 1e-9, "bpm {bpm}");
        }
    }

    #[test]
    fn test_half_beat_at_120_is_250ms() {
        let ms = beats_to_duration_ms(0.5, 120.0).unwrap();
        assert!((ms - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_duration_means_none() {
        assert_eq!(beats_to_duration_ms(0.0, 120.0), None);
        assert_eq!(beats_to_duration_ms(-1.0, 120.0), None);
        assert_eq!(beats_to_duration_ms(f64::NAN, 120.0), None);
    }

    #[test]
    fn test_pulse_on_first_tick_of_each_beat() {
        let fired: Vec<u64> = (1..=8)
            .filter(|&tick| is_interval_start(tick, 4.0, 1.0, 0.0))
            .collect();
        assert_eq!(fired, vec![1, 5]);
    }

    #[test]
    fn test_pulse_never_fires_on_tick_zero() {
        // The interval start is always >= 1, so the very first tick is skipped.
        assert!(!is_interval_start(0, 4.0, 1.0, 0.0));
        assert!(!is_interval_start(0, 180.0, 0.25, 0.0));
        // Same for an offset that shifts the adjusted tick back to zero.
        assert!(!is_interval_start(2, 4.0, 1.0, 0.5));
        assert!(is_interval_start(3, 4.0, 1.0, 0.5));
    }

    #[test]
    fn test_exactly_one_pulse_per_window() {
        let tpb = 180.0;
        for interval in [0.25, 0.5, 1.0, 1.5, 4.0] {
            let window = (tpb * interval) as u64;
            for w in 0..6u64 {
                let start = w * window + 1;
                let count = (start..start + window)
                    .filter(|&tick| is_interval_start(tick, tpb, interval, 0.0))
                    .count();
                assert_eq!(count, 1, "interval {interval}, window {w}");
            }
        }
    }

    #[test]
    fn test_negative_adjusted_tick_is_false() {
        assert!(!is_interval_start(3, 4.0, 1.0, 2.0));
        assert!(is_interval_start(9, 4.0, 1.0, 2.0));
    }

    #[test]
    fn test_extreme_offsets_do_not_overflow() {
        for tick in [0, 1, 5, u64::MAX] {
            assert!(!is_interval_start(tick, 4.0, 1.0, -1e300));
            assert!(!is_interval_start(tick, 4.0, 1.0, 1e300));
        }
        assert!(!is_interval_start(1, 4.0, 1.0, f64::NEG_INFINITY));
    }

    #[test]
    fn test_degenerate_interval_never_fires() {
        for tick in 0..16 {
            assert!(!is_interval_start(tick, 4.0, 0.0, 0.0));
            assert!(!is_interval_start(tick, 4.0, -1.0, 0.0));
        }
    }

    #[test]
    fn test_no_drift_over_long_sessions() {
        // 1/3 beat intervals produce fractional interval lengths.
        let tpb = 100.0;
        let interval = 1.0 / 3.0;
        let hours = 3_u64;
        let ticks = hours * 3600 * 2 * tpb as u64;
        let count = (0..ticks)
            .filter(|&tick| is_interval_start(tick, tpb, interval, 0.0))
            .count() as f64;
        let expected = ticks as f64 / (tpb * interval);
        assert!((count - expected).abs() <= 1.0);
    }

    #[test]
    fn test_transport_rejects_non_positive_tempo() {
        let mut transport = Transport::default();
        assert!(!transport.set_beats_per_minute(0.0));
        assert!(!transport.set_beats_per_minute(-10.0));
        assert!(!transport.set_ticks_per_beat(0.0));
        assert!(!transport.set_ticks_per_beat(f64::INFINITY));
        assert!((transport.beats_per_minute() - DEFAULT_BEATS_PER_MINUTE).abs() < 0.001);
        assert!((transport.ticks_per_beat() - DEFAULT_TICKS_PER_BEAT).abs() < 0.001);

        assert!(transport.set_beats_per_minute(120.0));
        assert!((transport.beats_per_minute() - 120.0).abs() < 0.001);
    }

    #[test]
    fn test_transport_new_falls_back_to_defaults() {
        let transport = Transport::new(-4.0, 0.0);
        assert!((transport.ticks_per_beat() - DEFAULT_TICKS_PER_BEAT).abs() < 0.001);
        assert!((transport.beats_per_minute() - DEFAULT_BEATS_PER_MINUTE).abs() < 0.001);
    }

    #[test]
    fn test_transport_advance_and_reset() {
        let mut transport = Transport::new(4.0, 120.0);
        transport.advance();
        transport.advance();
        assert_eq!(transport.tick(), 2);
        transport.reset();
        assert_eq!(transport.tick(), 0);
        // 120 bpm * 4 tpb = 8 ticks per second
        assert!((transport.tick_period_secs() - 0.125).abs() < 1e-9);
    }
}

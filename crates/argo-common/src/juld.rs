//! Observation timestamp decoding.
//!
//! The archive's native `JULD` field counts days since 1950-01-01T00:00:00Z,
//! but upstream producers have historically also emitted the same logical
//! field as nanoseconds, microseconds or milliseconds since the UNIX epoch.
//! The decode ladder here disambiguates by magnitude; the ranges are chosen
//! so no two rules overlap for plausible calendar years (up to ~2087). The
//! boundaries are inherently heuristic near the thresholds — the true
//! encoding convention per archive is not recoverable from the data alone.

use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

/// Upper bound (inclusive) for the native day-counter interpretation.
/// 50000 days past 1950 lands in 2086-2087.
const MAX_JULIAN_DAYS: f64 = 50_000.0;

/// Above this the value can only be nanoseconds since the UNIX epoch.
const NANOS_THRESHOLD: f64 = 1e17;

/// Below this (and above zero) epoch-scale interpretations are implausible.
const EPOCH_THRESHOLD: f64 = 1e12;

/// Millis vs micros split within the epoch-scale band.
const MICROS_THRESHOLD: f64 = 1e14;

/// Decode a raw numeric observation timestamp into a UTC instant.
///
/// Returns `None` when the value is non-finite or falls outside every
/// known encoding band. Never panics; total over all `f64` input.
pub fn decode_observed_at(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }

    if (0.0..=MAX_JULIAN_DAYS).contains(&raw) {
        // Native day-counter, possibly fractional.
        let epoch = Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).single()?;
        let millis = (raw * 86_400_000.0).round() as i64;
        return epoch.checked_add_signed(chrono::Duration::milliseconds(millis));
    }

    if raw > NANOS_THRESHOLD {
        if raw > i64::MAX as f64 {
            warn!(raw = raw, "Timestamp too large for nanosecond decoding");
            return None;
        }
        return Some(Utc.timestamp_nanos(raw as i64));
    }

    if raw > EPOCH_THRESHOLD {
        if raw < MICROS_THRESHOLD {
            return Utc.timestamp_millis_opt(raw as i64).single();
        }
        return DateTime::from_timestamp_micros(raw as i64);
    }

    warn!(raw = raw, "Timestamp value outside all known encodings");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_day_counter_zero_is_1950_epoch() {
        let dt = decode_observed_at(0.0).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_day_counter_upper_bound_lands_in_2086() {
        let dt = decode_observed_at(50_000.0).unwrap();
        assert!(dt.year() == 2086 || dt.year() == 2087, "got {}", dt);
    }

    #[test]
    fn test_fractional_days_keep_sub_day_precision() {
        let dt = decode_observed_at(0.5).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(1950, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_nanosecond_scale() {
        // 2023-11-14T22:13:20Z as nanoseconds
        let dt = decode_observed_at(1.7e18).unwrap();
        assert_eq!(dt.year(), 2023);
    }

    #[test]
    fn test_millisecond_scale() {
        // 1.7e12 ms is also 2023-era
        let dt = decode_observed_at(1.7e12).unwrap();
        assert_eq!(dt.year(), 2023);
    }

    #[test]
    fn test_microsecond_scale() {
        let dt = decode_observed_at(1.7e15).unwrap();
        assert_eq!(dt.year(), 2023);
    }

    #[test]
    fn test_nan_and_infinity_are_undecodable() {
        assert!(decode_observed_at(f64::NAN).is_none());
        assert!(decode_observed_at(f64::INFINITY).is_none());
        assert!(decode_observed_at(f64::NEG_INFINITY).is_none());
    }

    #[test]
    fn test_gap_values_are_undecodable() {
        // Between the day-counter band and the epoch-scale bands.
        assert!(decode_observed_at(60_000.0).is_none());
        assert!(decode_observed_at(1e9).is_none());
        assert!(decode_observed_at(-5.0).is_none());
    }
}

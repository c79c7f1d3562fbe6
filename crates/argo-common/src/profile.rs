//! Normalized profile and measurement records produced by the parser and
//! consumed by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mode::DataMode;

/// One measurement cast by one float on one mission cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// WMO identifier of the float, stable across cycles.
    pub platform_number: String,
    /// Mission cycle number, unique per platform.
    pub cycle_number: i32,
    /// UTC instant of the cast; absent when undecodable.
    pub observed_at: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    /// Nearest named region, or "Unknown" for invalid coordinates.
    pub ocean_name: String,
    pub data_mode: DataMode,
    /// Deduplication key derived from `(platform_number, cycle_number)`.
    pub source_key: String,
}

impl ProfileRecord {
    /// The canonical deduplication key for a platform/cycle pair.
    pub fn source_key_for(platform_number: &str, cycle_number: i32) -> String {
        format!("{}-{}", platform_number, cycle_number)
    }
}

/// One depth-level reading belonging to exactly one profile.
///
/// Only ever constructed with a present, finite pressure; levels with
/// missing pressure are dropped before this type exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub pressure: f64,
    pub temperature: Option<f64>,
    pub temperature_adjusted: Option<f64>,
    pub salinity: Option<f64>,
    pub salinity_adjusted: Option<f64>,
    pub pressure_qc: char,
    pub temperature_qc: char,
    pub salinity_qc: char,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_format() {
        assert_eq!(ProfileRecord::source_key_for("1901820", 42), "1901820-42");
    }
}

//! Per-profile normalization: one dataset slice in, one profile record plus
//! its measurement records out.

use tracing::{debug, error};

use argo_common::{
    decode_observed_at, DataMode, GeoResolver, MeasurementRecord, ProfileRecord,
};

use crate::extract::{
    extract_or_default, extract_qc_or_default, read_levels, scalar_f64, scalar_string,
};

/// A fully normalized profile: header plus its depth-level measurements.
#[derive(Debug, Clone)]
pub struct ParsedProfile {
    pub profile: ProfileRecord,
    pub measurements: Vec<MeasurementRecord>,
}

/// Parse one profile index out of an open dataset.
///
/// Returns `None` (after logging) when the identity fields are missing or
/// unparseable; the caller continues with the next index. Every other
/// field degrades to its missing marker instead of aborting the profile.
pub fn parse_profile(
    file: &netcdf::File,
    index: usize,
    geo: &GeoResolver,
) -> Option<ParsedProfile> {
    // Identity fields: without these the profile cannot be keyed at all.
    let platform_number = match scalar_string(file, "PLATFORM_NUMBER", index) {
        Some(p) => p,
        None => {
            error!(index = index, "Profile has no usable PLATFORM_NUMBER, skipping");
            return None;
        }
    };
    let cycle_number = match scalar_f64(file, "CYCLE_NUMBER", index) {
        Some(c) if c.is_finite() => c as i32,
        _ => {
            error!(
                platform = %platform_number,
                index = index,
                "Profile has no usable CYCLE_NUMBER, skipping"
            );
            return None;
        }
    };
    let source_key = ProfileRecord::source_key_for(&platform_number, cycle_number);

    let latitude = scalar_f64(file, "LATITUDE", index).unwrap_or(f64::NAN);
    let longitude = scalar_f64(file, "LONGITUDE", index).unwrap_or(f64::NAN);
    let ocean_name = geo
        .resolve(validated(latitude, 90.0), validated(longitude, 180.0))
        .to_string();

    let observed_at = scalar_f64(file, "JULD", index).and_then(decode_observed_at);

    let data_mode = scalar_string(file, "DATA_MODE", index)
        .and_then(|s| s.chars().next())
        .map(DataMode::from_code)
        .unwrap_or_default();

    // Reference pressure array fixes the level count for every other field.
    let pressure = match read_levels(file, "PRES", index) {
        Some(levels) if !levels.is_empty() => levels,
        _ => {
            debug!(key = %source_key, "Pressure array unextractable, using length-1 default");
            vec![f64::NAN]
        }
    };
    let n_levels = pressure.len();

    let temperature = extract_or_default(file, "TEMP", index, n_levels);
    let temperature_adjusted = extract_or_default(file, "TEMP_ADJUSTED", index, n_levels);
    let salinity = extract_or_default(file, "PSAL", index, n_levels);
    let salinity_adjusted = extract_or_default(file, "PSAL_ADJUSTED", index, n_levels);

    let (pressure_qc, _) = extract_qc_or_default(file, "PRES_QC", index, n_levels);
    let (temperature_qc, _) = extract_qc_or_default(file, "TEMP_QC", index, n_levels);
    let (salinity_qc, _) = extract_qc_or_default(file, "PSAL_QC", index, n_levels);

    let mut measurements = Vec::with_capacity(n_levels);
    for level in 0..n_levels {
        // Levels without a pressure reading are dropped, never stored.
        if !pressure[level].is_finite() {
            continue;
        }
        measurements.push(MeasurementRecord {
            pressure: pressure[level],
            temperature: present(temperature.values[level]),
            temperature_adjusted: present(temperature_adjusted.values[level]),
            salinity: present(salinity.values[level]),
            salinity_adjusted: present(salinity_adjusted.values[level]),
            pressure_qc: pressure_qc[level],
            temperature_qc: temperature_qc[level],
            salinity_qc: salinity_qc[level],
        });
    }

    Some(ParsedProfile {
        profile: ProfileRecord {
            platform_number,
            cycle_number,
            observed_at,
            latitude,
            longitude,
            ocean_name,
            data_mode,
            source_key,
        },
        measurements,
    })
}

/// NaN readings become absent rather than zero.
fn present(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Out-of-range coordinates resolve as if non-finite; the stored record
/// keeps the raw value for traceability.
fn validated(coord: f64, bound: f64) -> f64 {
    if coord.abs() <= bound {
        coord
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A two-profile file where profile 0 is complete and profile 1 has a
    /// corrupt cycle number (NaN) so it must be skipped.
    fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("profiles.nc");
        let mut file = netcdf::create(&path).unwrap();

        file.add_dimension("N_PROF", 2).unwrap();
        file.add_dimension("N_LEVELS", 3).unwrap();
        file.add_dimension("STRING8", 8).unwrap();

        let mut platform = file
            .add_variable::<u8>("PLATFORM_NUMBER", &["N_PROF", "STRING8"])
            .unwrap();
        platform.put_values(b"1901820\01901820\0", ..).unwrap();

        let mut cycle = file.add_variable::<f64>("CYCLE_NUMBER", &["N_PROF"]).unwrap();
        cycle.put_values(&[3.0, f64::NAN], ..).unwrap();

        let mut lat = file.add_variable::<f64>("LATITUDE", &["N_PROF"]).unwrap();
        lat.put_values(&[0.0, 12.0], ..).unwrap();
        let mut lon = file.add_variable::<f64>("LONGITUDE", &["N_PROF"]).unwrap();
        lon.put_values(&[-160.0, 70.0], ..).unwrap();

        let mut juld = file.add_variable::<f64>("JULD", &["N_PROF"]).unwrap();
        juld.put_values(&[0.0, 100.0], ..).unwrap();

        let mut mode = file.add_variable::<u8>("DATA_MODE", &["N_PROF"]).unwrap();
        mode.put_values(b"DR", ..).unwrap();

        let mut pres = file
            .add_variable::<f64>("PRES", &["N_PROF", "N_LEVELS"])
            .unwrap();
        pres.put_values(&[5.0, f64::NAN, 15.0, 4.0, 8.0, 12.0], ..)
            .unwrap();

        let mut temp = file
            .add_variable::<f64>("TEMP", &["N_PROF", "N_LEVELS"])
            .unwrap();
        temp.put_values(&[20.0, 19.5, f64::NAN, 18.0, 17.0, 16.0], ..)
            .unwrap();

        path
    }

    #[test]
    fn test_complete_profile_parses() {
        let dir = TempDir::new().unwrap();
        let file = netcdf::open(write_fixture(&dir)).unwrap();
        let geo = GeoResolver::default();

        let parsed = parse_profile(&file, 0, &geo).unwrap();
        assert_eq!(parsed.profile.platform_number, "1901820");
        assert_eq!(parsed.profile.cycle_number, 3);
        assert_eq!(parsed.profile.source_key, "1901820-3");
        assert_eq!(parsed.profile.ocean_name, "Pacific Ocean");
        assert_eq!(parsed.profile.data_mode, DataMode::DelayedMode);
        assert_eq!(
            parsed.profile.observed_at.unwrap().to_rfc3339(),
            "1950-01-01T00:00:00+00:00"
        );

        // Level 1 has NaN pressure and must be dropped.
        assert_eq!(parsed.measurements.len(), 2);
        assert_eq!(parsed.measurements[0].pressure, 5.0);
        assert_eq!(parsed.measurements[0].temperature, Some(20.0));
        assert_eq!(parsed.measurements[1].pressure, 15.0);
        // Temperature NaN at that level is absent, not zero.
        assert_eq!(parsed.measurements[1].temperature, None);
        // Missing adjusted/salinity fields default to absent everywhere.
        assert_eq!(parsed.measurements[0].salinity, None);
        // Missing QC fields default to '9'.
        assert_eq!(parsed.measurements[0].pressure_qc, '9');
    }

    #[test]
    fn test_corrupt_cycle_number_skips_only_that_profile() {
        let dir = TempDir::new().unwrap();
        let file = netcdf::open(write_fixture(&dir)).unwrap();
        let geo = GeoResolver::default();

        assert!(parse_profile(&file, 1, &geo).is_none());
        // Sibling profile is unaffected.
        assert!(parse_profile(&file, 0, &geo).is_some());
    }

    #[test]
    fn test_out_of_range_latitude_is_unknown_ocean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("badlat.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("N_PROF", 1).unwrap();
            file.add_dimension("STRING8", 8).unwrap();

            let mut platform = file
                .add_variable::<u8>("PLATFORM_NUMBER", &["N_PROF", "STRING8"])
                .unwrap();
            platform.put_values(b"2902746\0", ..).unwrap();
            let mut cycle = file.add_variable::<f64>("CYCLE_NUMBER", &["N_PROF"]).unwrap();
            cycle.put_values(&[1.0], ..).unwrap();
            let mut lat = file.add_variable::<f64>("LATITUDE", &["N_PROF"]).unwrap();
            lat.put_values(&[91.0], ..).unwrap();
            let mut lon = file.add_variable::<f64>("LONGITUDE", &["N_PROF"]).unwrap();
            lon.put_values(&[0.0], ..).unwrap();
        }
        let file = netcdf::open(&path).unwrap();
        let geo = GeoResolver::default();

        let parsed = parse_profile(&file, 0, &geo).unwrap();
        assert_eq!(parsed.profile.ocean_name, "Unknown");
        // The raw coordinate is kept on the record for traceability.
        assert_eq!(parsed.profile.latitude, 91.0);
    }

    #[test]
    fn test_out_of_range_index_skips() {
        let dir = TempDir::new().unwrap();
        let file = netcdf::open(write_fixture(&dir)).unwrap();
        let geo = GeoResolver::default();

        assert!(parse_profile(&file, 7, &geo).is_none());
    }
}

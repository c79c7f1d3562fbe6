//! Nearest named ocean/sea region resolution.

/// Mean Earth radius in kilometers, used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A named ocean/sea reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct OceanRegion {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reference points for the named regions a profile can be attributed to.
///
/// Points sit roughly at the center of each basin; they are far enough
/// apart that nearest-point resolution is unambiguous in practice.
const DEFAULT_REGIONS: &[OceanRegion] = &[
    OceanRegion { name: "Pacific Ocean", latitude: 0.0, longitude: -160.0 },
    OceanRegion { name: "Atlantic Ocean", latitude: 0.0, longitude: -30.0 },
    OceanRegion { name: "Indian Ocean", latitude: -20.0, longitude: 80.0 },
    OceanRegion { name: "Southern Ocean", latitude: -65.0, longitude: 0.0 },
    OceanRegion { name: "Arctic Ocean", latitude: 85.0, longitude: 0.0 },
    OceanRegion { name: "Arabian Sea", latitude: 14.0, longitude: 65.0 },
    OceanRegion { name: "Bay of Bengal", latitude: 13.0, longitude: 88.0 },
    OceanRegion { name: "Mediterranean Sea", latitude: 35.0, longitude: 18.0 },
    OceanRegion { name: "Caribbean Sea", latitude: 15.0, longitude: -75.0 },
    OceanRegion { name: "South China Sea", latitude: 12.0, longitude: 113.0 },
];

/// Name returned when coordinates cannot be attributed to any region.
pub const UNKNOWN_REGION: &str = "Unknown";

/// Resolves coordinates to the nearest named ocean/sea region.
///
/// The reference table is fixed at construction and read-only afterwards.
#[derive(Debug, Clone)]
pub struct GeoResolver {
    regions: Vec<OceanRegion>,
}

impl GeoResolver {
    /// Build a resolver over a custom reference table.
    pub fn new(regions: Vec<OceanRegion>) -> Self {
        Self { regions }
    }

    /// Resolve to the nearest region name, or [`UNKNOWN_REGION`] when either
    /// coordinate is non-finite. Ties break to the first minimal entry.
    pub fn resolve(&self, latitude: f64, longitude: f64) -> &str {
        if !latitude.is_finite() || !longitude.is_finite() {
            return UNKNOWN_REGION;
        }

        let mut best: Option<(&OceanRegion, f64)> = None;
        for region in &self.regions {
            let d = haversine_km(latitude, longitude, region.latitude, region.longitude);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((region, d)),
            }
        }

        best.map(|(r, _)| r.name).unwrap_or(UNKNOWN_REGION)
    }
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REGIONS.to_vec())
    }
}

/// Great-circle distance between two points in kilometers.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` fractionally above 1 near the antipode, which
    // would make asin return NaN.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equatorial_pacific() {
        let geo = GeoResolver::default();
        assert_eq!(geo.resolve(0.0, -160.0), "Pacific Ocean");
    }

    #[test]
    fn test_mid_atlantic() {
        let geo = GeoResolver::default();
        assert_eq!(geo.resolve(10.0, -35.0), "Atlantic Ocean");
    }

    #[test]
    fn test_bay_of_bengal() {
        let geo = GeoResolver::default();
        assert_eq!(geo.resolve(15.0, 89.0), "Bay of Bengal");
    }

    #[test]
    fn test_non_finite_coordinates_are_unknown() {
        let geo = GeoResolver::default();
        assert_eq!(geo.resolve(f64::NAN, -160.0), UNKNOWN_REGION);
        assert_eq!(geo.resolve(0.0, f64::INFINITY), UNKNOWN_REGION);
    }

    #[test]
    fn test_empty_table_is_unknown() {
        let geo = GeoResolver::new(Vec::new());
        assert_eq!(geo.resolve(0.0, 0.0), UNKNOWN_REGION);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Quarter of the equatorial circumference.
        let d = haversine_km(0.0, 0.0, 0.0, 90.0);
        assert!((d - 10_007.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_antipodal_distance_is_finite() {
        // Exactly half the circumference; must not degrade to NaN.
        let d = haversine_km(10.0, 20.0, -10.0, -160.0);
        assert!(d.is_finite());
        assert!((d - 20_015.0).abs() < 30.0, "got {}", d);
    }

    #[test]
    fn test_antipode_of_reference_point_resolves_normally() {
        let geo = GeoResolver::default();
        // Antipode of the Pacific reference point (0, -160); a NaN distance
        // there would otherwise win every comparison.
        assert_eq!(geo.resolve(0.0, 20.0), "Mediterranean Sea");
    }
}

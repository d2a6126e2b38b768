//! Geographic proximity scoring
//!
//! Great-circle distance (haversine) mapped to [0,1] through a
//! configurable step-decay curve.

/// Mean earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (lat, lon) pairs in kilometers
pub fn haversine_km(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let d_lat = (lat_b - lat_a).to_radians();
    let d_lon = (lon_b - lon_a).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat_a.to_radians().cos() * lat_b.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push the intermediate marginally outside [0,1] for
    // near-antipodal points, and sqrt/asin would then return NaN
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Proximity score for two optional locations
///
/// Either location missing scores 0.0: unknown proximity is not
/// rewarded. Identical coordinates score 1.0.
///
/// `breakpoints` is a (max_km, score) curve, distances strictly
/// increasing, scores non-increasing (validated at config load);
/// distances beyond the last breakpoint score 0.0.
pub fn geo_score(
    a: Option<(f64, f64)>,
    b: Option<(f64, f64)>,
    breakpoints: &[(f64, f64)],
) -> f64 {
    let ((lat_a, lon_a), (lat_b, lon_b)) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };

    let distance_km = haversine_km(lat_a, lon_a, lat_b, lon_b);

    for &(max_km, score) in breakpoints {
        if distance_km <= max_km {
            return score;
        }
    }
    0.0
}

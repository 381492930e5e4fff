//! Geodesic primitives: haversine distance, point-to-segment distance in
//! degree space, and the bounding-box search margin used to reject distant
//! line features before a full segment scan.

use std::f64::consts::PI;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const KM_PER_DEGREE_LAT: f64 = 111.32;

/// Great-circle distance between two lat/lon points, in km.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * PI / 180.0;
    let lat2_rad = lat2 * PI / 180.0;
    let dlat = (lat2 - lat1) * PI / 180.0;
    let dlon = (lon2 - lon1) * PI / 180.0;

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Distance from point `p` to the line segment `a`-`b`, computed by
/// projecting in degree space (anisotropic away from the equator, but
/// adequate at the 100 km operational radii this crate uses) and taking
/// the haversine distance to the clamped projection.
pub fn point_to_segment_km(p_lat: f64, p_lon: f64, a_lat: f64, a_lon: f64, b_lat: f64, b_lon: f64) -> f64 {
    let dx = p_lat - a_lat;
    let dy = p_lon - a_lon;
    let cx = b_lat - a_lat;
    let cy = b_lon - a_lon;

    let dot = dx * cx + dy * cy;
    let len_sq = cx * cx + cy * cy;
    let param = if len_sq != 0.0 { dot / len_sq } else { -1.0 };

    let (proj_lat, proj_lon) = if param < 0.0 {
        (a_lat, a_lon)
    } else if param > 1.0 {
        (b_lat, b_lon)
    } else {
        (a_lat + param * cx, a_lon + param * cy)
    };

    haversine_km(p_lat, p_lon, proj_lat, proj_lon)
}

/// Whether a bounding box could plausibly contain a feature within
/// `radius_km` of `(lat, lon)`. Used to reject line features cheaply before
/// walking their segments. The 0.2 floor on `cos(lat)` prevents the
/// longitude margin from blowing up near the poles.
pub fn bbox_within_search(bbox: (f64, f64, f64, f64), lat: f64, lon: f64, radius_km: f64) -> bool {
    let (min_lat, min_lon, max_lat, max_lon) = bbox;
    let lat_margin = radius_km / KM_PER_DEGREE_LAT;
    let lon_margin = radius_km / (KM_PER_DEGREE_LAT * (lat.to_radians().cos()).max(0.2));

    !(lat < min_lat - lat_margin || lat > max_lat + lat_margin || lon < min_lon - lon_margin || lon > max_lon + lon_margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_known_distance() {
        // London to Paris: ~344 km
        let d = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 344.0).abs() < 10.0);
    }

    #[test]
    fn haversine_zero_at_same_point() {
        let d = haversine_km(51.5, -0.1, 51.5, -0.1);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn point_on_segment_is_zero_distance() {
        let d = point_to_segment_km(51.0, 0.0, 50.0, 0.0, 52.0, 0.0);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn point_beyond_segment_clamps_to_endpoint() {
        let on_endpoint = haversine_km(51.0, 5.0, 52.0, 0.0);
        let via_segment = point_to_segment_km(51.0, 5.0, 50.0, 0.0, 52.0, 0.0);
        assert!((on_endpoint - via_segment).abs() < 1e-6);
    }

    #[test]
    fn bbox_margin_shrinks_away_from_equator_floor() {
        let bbox = (50.0, 0.0, 50.0, 0.0);
        assert!(bbox_within_search(bbox, 50.0, 0.05, 1.0));
        assert!(!bbox_within_search(bbox, 50.0, 50.0, 1.0));
    }
}

//! Batch proximity engine: for each site, the nearest-feature distance (km)
//! to each of the five infrastructure layers, converted to an exponential
//! decay score and summed into a total proximity bonus.

use crate::catalog::InfrastructureCatalog;
use crate::grid::{nearest_line, nearest_point};
use std::collections::HashMap;

pub const SEARCH_RADIUS_KM: f64 = 100.0;

pub const HALF_DISTANCE_SUBSTATION_KM: f64 = 30.0;
pub const HALF_DISTANCE_TRANSMISSION_KM: f64 = 30.0;
pub const HALF_DISTANCE_FIBER_KM: f64 = 15.0;
pub const HALF_DISTANCE_IXP_KM: f64 = 40.0;
pub const HALF_DISTANCE_WATER_KM: f64 = 25.0;

/// `100 * 2^(-d/half_d)`, clamped to `[0, 100]` and forced to 0 once `d`
/// reaches 200 km (the decay is negligible there but this keeps scores
/// exactly zero instead of a vanishingly small positive value).
pub fn exponential_score(distance_km: f64, half_distance_km: f64) -> f64 {
    if distance_km >= 200.0 {
        return 0.0;
    }
    let k = std::f64::consts::LN_2 / half_distance_km;
    let score = 100.0 * (-k * distance_km).exp();
    score.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default)]
pub struct ProximityScoreSet {
    pub substation_score: f64,
    pub transmission_score: f64,
    pub fiber_score: f64,
    pub ixp_score: f64,
    pub water_score: f64,
    pub total_proximity_bonus: f64,
    /// Only layers that produced a hit are present, rounded to 0.1 km.
    pub nearest_distances: HashMap<String, f64>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute the proximity score set for a single site against one catalog
/// snapshot.
pub fn score_site(catalog: &InfrastructureCatalog, lat: f64, lon: f64) -> ProximityScoreSet {
    let mut out = ProximityScoreSet::default();

    if let Some((d, _)) = nearest_point(&catalog.substation_index, &catalog.substations, lat, lon, SEARCH_RADIUS_KM) {
        out.substation_score = exponential_score(d, HALF_DISTANCE_SUBSTATION_KM);
        out.nearest_distances.insert("substation_km".to_string(), round1(d));
    }

    if let Some((d, _)) = nearest_line(&catalog.transmission_index, &catalog.transmission_lines, lat, lon, SEARCH_RADIUS_KM) {
        out.transmission_score = exponential_score(d, HALF_DISTANCE_TRANSMISSION_KM);
        out.nearest_distances.insert("transmission_km".to_string(), round1(d));
    }

    if let Some((d, _)) = nearest_line(&catalog.fiber_index, &catalog.fiber_cables, lat, lon, SEARCH_RADIUS_KM) {
        out.fiber_score = exponential_score(d, HALF_DISTANCE_FIBER_KM);
        out.nearest_distances.insert("fiber_km".to_string(), round1(d));
    }

    if let Some((d, _)) = nearest_point(&catalog.ixp_index, &catalog.internet_exchange_points, lat, lon, SEARCH_RADIUS_KM) {
        out.ixp_score = exponential_score(d, HALF_DISTANCE_IXP_KM);
        out.nearest_distances.insert("ixp_km".to_string(), round1(d));
    }

    let water_point = nearest_point(&catalog.water_point_index, &catalog.water_points, lat, lon, SEARCH_RADIUS_KM);
    let water_line = nearest_line(&catalog.water_line_index, &catalog.water_lines, lat, lon, SEARCH_RADIUS_KM);
    let water_best = match (water_point, water_line) {
        (Some((dp, _)), Some((dl, _))) => Some(dp.min(dl)),
        (Some((dp, _)), None) => Some(dp),
        (None, Some((dl, _))) => Some(dl),
        (None, None) => None,
    };
    if let Some(d) = water_best {
        out.water_score = exponential_score(d, HALF_DISTANCE_WATER_KM);
        out.nearest_distances.insert("water_km".to_string(), round1(d));
    }

    out.total_proximity_bonus = out.substation_score + out.transmission_score + out.fiber_score + out.ixp_score + out.water_score;
    out
}

/// Score every site against a single catalog snapshot. Input order is
/// preserved; each site's result is independent of the others (order of
/// the batch has no bearing on individual distances).
pub fn score_sites_batch(catalog: &InfrastructureCatalog, sites: &[(f64, f64)]) -> Vec<ProximityScoreSet> {
    sites.iter().map(|&(lat, lon)| score_site(catalog, lat, lon)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InfrastructureCatalog, RawCollections};
    use serde_json::json;

    fn sample_catalog() -> InfrastructureCatalog {
        InfrastructureCatalog::build(RawCollections {
            substations: vec![json!({"latitude": 51.5, "longitude": -0.1})],
            transmission_lines: vec![json!({"path_coordinates": [[-0.2, 51.4], [0.0, 51.6]]})],
            fiber_cables: vec![],
            internet_exchange_points: vec![],
            water_resources: vec![],
        })
    }

    #[test]
    fn exponential_score_is_monotone_decreasing_in_distance() {
        let near = exponential_score(1.0, 30.0);
        let far = exponential_score(50.0, 30.0);
        assert!(near > far);
    }

    #[test]
    fn exponential_score_forced_zero_at_200km() {
        assert_eq!(exponential_score(200.0, 30.0), 0.0);
        assert_eq!(exponential_score(500.0, 30.0), 0.0);
    }

    #[test]
    fn score_site_hits_nearby_substation() {
        let catalog = sample_catalog();
        let scores = score_site(&catalog, 51.5, -0.1);
        assert!(scores.substation_score > 99.0);
        assert!(scores.nearest_distances.contains_key("substation_km"));
    }

    #[test]
    fn score_site_misses_absent_layers() {
        let catalog = sample_catalog();
        let scores = score_site(&catalog, 51.5, -0.1);
        assert_eq!(scores.fiber_score, 0.0);
        assert!(!scores.nearest_distances.contains_key("fiber_km"));
    }

    #[test]
    fn batch_matches_individual_scoring() {
        let catalog = sample_catalog();
        let sites = vec![(51.5, -0.1), (60.0, -1.0)];
        let batch = score_sites_batch(&catalog, &sites);
        for (i, &(lat, lon)) in sites.iter().enumerate() {
            let single = score_site(&catalog, lat, lon);
            assert!((batch[i].total_proximity_bonus - single.total_proximity_bonus).abs() < 1e-6);
        }
    }
}

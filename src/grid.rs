//! Uniform spatial grid over point and polyline infrastructure features.

use crate::geodesic::haversine_km;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const GRID_CELL_DEGREES: f64 = 0.5;

/// A single geographic point feature (substation, IXP, point-type water
/// resource). Immutable once constructed.
#[derive(Debug, Clone)]
pub struct PointFeature {
    pub lat: f64,
    pub lon: f64,
    pub data: Value,
}

/// Axis-aligned bounding box in degrees: `(min_lat, min_lon, max_lat, max_lon)`.
pub type BBox = (f64, f64, f64, f64);

/// A polyline feature (transmission line, fiber route, river-type water
/// resource). `segments` is precomputed from adjacent coordinate pairs;
/// `bbox` is the axis-aligned envelope. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct LineFeature {
    pub coordinates: Vec<(f64, f64)>,
    pub segments: Vec<(f64, f64, f64, f64)>,
    pub bbox: BBox,
    pub data: Value,
}

impl LineFeature {
    /// Build from an ordered list of `(lat, lon)` vertices. Returns `None`
    /// if fewer than two vertices survive.
    pub fn from_coordinates(coordinates: Vec<(f64, f64)>, data: Value) -> Option<Self> {
        if coordinates.len() < 2 {
            return None;
        }
        let min_lat = coordinates.iter().map(|(lat, _)| *lat).fold(f64::INFINITY, f64::min);
        let max_lat = coordinates.iter().map(|(lat, _)| *lat).fold(f64::NEG_INFINITY, f64::max);
        let min_lon = coordinates.iter().map(|(_, lon)| *lon).fold(f64::INFINITY, f64::min);
        let max_lon = coordinates.iter().map(|(_, lon)| *lon).fold(f64::NEG_INFINITY, f64::max);

        let segments = coordinates
            .windows(2)
            .map(|pair| (pair[0].0, pair[0].1, pair[1].0, pair[1].1))
            .collect();

        Some(Self {
            coordinates,
            segments,
            bbox: (min_lat, min_lon, max_lat, max_lon),
            data,
        })
    }

    /// Minimum point-to-segment distance across the feature, or `9999.0`
    /// km if it somehow has no segments.
    pub fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        let mut best = f64::INFINITY;
        for &(a_lat, a_lon, b_lat, b_lon) in &self.segments {
            let d = crate::geodesic::point_to_segment_km(lat, lon, a_lat, a_lon, b_lat, b_lon);
            if d < best {
                best = d;
                if best == 0.0 {
                    break;
                }
            }
        }
        if best.is_finite() {
            best
        } else {
            9999.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey(i64, i64);

/// Uniform lat/lon grid. Points occupy exactly one cell; lines are stamped
/// into every cell their bbox overlaps. Queries over an expanding ring of
/// cells deduplicate by feature identity (pointer equality on the `Arc`).
pub struct SpatialGrid<F> {
    cell_size_deg: f64,
    cells: HashMap<CellKey, Vec<Arc<F>>>,
}

impl<F> SpatialGrid<F> {
    pub fn new() -> Self {
        Self::with_cell_size(GRID_CELL_DEGREES)
    }

    pub fn with_cell_size(cell_size_deg: f64) -> Self {
        Self {
            cell_size_deg,
            cells: HashMap::new(),
        }
    }

    fn index_lat(&self, lat: f64) -> i64 {
        ((lat + 90.0) / self.cell_size_deg).floor() as i64
    }

    fn index_lon(&self, lon: f64) -> i64 {
        ((lon + 180.0) / self.cell_size_deg).floor() as i64
    }

    pub fn approximate_cell_width_km(&self) -> f64 {
        self.cell_size_deg * crate::geodesic::KM_PER_DEGREE_LAT
    }

    /// Steps required to cover `radius_km` from the origin cell, per the
    /// ring-expansion rule: at least one ring, plus one extra for safety.
    pub fn steps_for_radius(&self, radius_km: f64) -> i64 {
        let cell_width = self.approximate_cell_width_km().max(1.0);
        ((radius_km / cell_width).ceil() as i64).max(1) + 1
    }

    pub fn add_point(&mut self, lat: f64, lon: f64, feature: Arc<F>) {
        let key = CellKey(self.index_lat(lat), self.index_lon(lon));
        self.cells.entry(key).or_default().push(feature);
    }

    pub fn add_bbox(&mut self, bbox: BBox, feature: Arc<F>) {
        let (min_lat, min_lon, max_lat, max_lon) = bbox;
        let lat_start = self.index_lat(min_lat);
        let lat_end = self.index_lat(max_lat);
        let lon_start = self.index_lon(min_lon);
        let lon_end = self.index_lon(max_lon);
        for lat_idx in lat_start..=lat_end {
            for lon_idx in lon_start..=lon_end {
                self.cells.entry(CellKey(lat_idx, lon_idx)).or_default().push(Arc::clone(&feature));
            }
        }
    }

    /// Yield every feature within `±steps` cells of `(lat, lon)`, each at
    /// most once.
    pub fn query(&self, lat: f64, lon: f64, steps: i64) -> Vec<Arc<F>> {
        let base_lat = self.index_lat(lat);
        let base_lon = self.index_lon(lon);
        let mut seen: std::collections::HashSet<usize> = std::collections::HashSet::new();
        let mut out = Vec::new();
        for lat_offset in -steps..=steps {
            for lon_offset in -steps..=steps {
                let key = CellKey(base_lat + lat_offset, base_lon + lon_offset);
                if let Some(features) = self.cells.get(&key) {
                    for feature in features {
                        let ptr = Arc::as_ptr(feature) as usize;
                        if seen.insert(ptr) {
                            out.push(Arc::clone(feature));
                        }
                    }
                }
            }
        }
        out
    }
}

impl<F> Default for SpatialGrid<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest point feature to `(lat, lon)` within `radius_km`, expanding the
/// grid search ring-by-ring and falling back to a full linear scan if the
/// grid-limited search turns up nothing.
pub fn nearest_point(grid: &SpatialGrid<PointFeature>, all: &[Arc<PointFeature>], lat: f64, lon: f64, radius_km: f64) -> Option<(f64, Arc<PointFeature>)> {
    let steps = grid.steps_for_radius(radius_km);
    let mut best: Option<(f64, Arc<PointFeature>)> = None;
    for step in 1..=(steps + 1) {
        for feature in grid.query(lat, lon, step) {
            let d = haversine_km(lat, lon, feature.lat, feature.lon);
            if d > radius_km {
                continue;
            }
            if best.as_ref().map_or(true, |(best_d, _)| d < *best_d) {
                best = Some((d, feature));
            }
        }
        if best.is_some() {
            break;
        }
    }

    if best.is_none() {
        for feature in all {
            let d = haversine_km(lat, lon, feature.lat, feature.lon);
            if best.as_ref().map_or(true, |(best_d, _)| d < *best_d) {
                best = Some((d, Arc::clone(feature)));
            }
        }
    }
    best
}

/// Nearest line feature to `(lat, lon)` within `radius_km`, symmetric to
/// [`nearest_point`]. Candidates are rejected cheaply via their bbox before
/// the more expensive per-segment distance is computed.
pub fn nearest_line(grid: &SpatialGrid<LineFeature>, all: &[Arc<LineFeature>], lat: f64, lon: f64, radius_km: f64) -> Option<(f64, Arc<LineFeature>)> {
    let steps = grid.steps_for_radius(radius_km);
    let mut best: Option<(f64, Arc<LineFeature>)> = None;
    for step in 1..=(steps + 1) {
        for feature in grid.query(lat, lon, step) {
            if !crate::geodesic::bbox_within_search(feature.bbox, lat, lon, radius_km) {
                continue;
            }
            let d = feature.distance_km(lat, lon);
            if d > radius_km {
                continue;
            }
            if best.as_ref().map_or(true, |(best_d, _)| d < *best_d) {
                best = Some((d, feature));
            }
        }
        if best.is_some() {
            break;
        }
    }

    if best.is_none() {
        for feature in all {
            if !crate::geodesic::bbox_within_search(feature.bbox, lat, lon, radius_km) {
                continue;
            }
            let d = feature.distance_km(lat, lon);
            if best.as_ref().map_or(true, |(best_d, _)| d < *best_d) {
                best = Some((d, Arc::clone(feature)));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(lat: f64, lon: f64) -> Arc<PointFeature> {
        Arc::new(PointFeature { lat, lon, data: json!({}) })
    }

    #[test]
    fn grid_completeness_self_query_is_zero_distance() {
        let mut grid = SpatialGrid::new();
        let f = point(51.5, -0.1);
        grid.add_point(f.lat, f.lon, Arc::clone(&f));
        let all = vec![Arc::clone(&f)];
        let (d, found) = nearest_point(&grid, &all, 51.5, -0.1, 100.0).unwrap();
        assert!(d.abs() < 1e-6);
        assert!(Arc::ptr_eq(&found, &f));
    }

    #[test]
    fn query_deduplicates_line_stamped_into_multiple_cells() {
        let mut grid = SpatialGrid::new();
        let line = Arc::new(LineFeature::from_coordinates(vec![(50.0, 0.0), (52.0, 2.0)], json!({})).unwrap());
        grid.add_bbox(line.bbox, Arc::clone(&line));
        let results = grid.query(51.0, 1.0, 3);
        let count = results.iter().filter(|f| Arc::ptr_eq(f, &line)).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn fallback_scan_finds_point_outside_grid_radius_search() {
        let grid: SpatialGrid<PointFeature> = SpatialGrid::new();
        let f = point(10.0, 10.0);
        let all = vec![Arc::clone(&f)];
        // grid is empty, so ring search misses; fallback scan must still find it
        let (d, found) = nearest_point(&grid, &all, 10.0, 10.0, 1.0).unwrap();
        assert!(d.abs() < 1e-6);
        assert!(Arc::ptr_eq(&found, &f));
    }

    #[test]
    fn line_from_coordinates_rejects_single_vertex() {
        assert!(LineFeature::from_coordinates(vec![(1.0, 1.0)], json!({})).is_none());
    }
}

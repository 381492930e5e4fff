//! Feature catalog loader: normalizes heterogeneous infrastructure records
//! into typed point/line features, builds one spatial grid per layer, and
//! serves a TTL-cached snapshot behind a single-writer/multi-reader lock.

use crate::error::{RatingError, Result};
use crate::grid::{LineFeature, PointFeature, SpatialGrid};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

fn coerce_float(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn get_any<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        if let Some(v) = record.get(*key) {
            if !v.is_null() {
                return Some(v);
            }
        }
    }
    None
}

/// Extract `(lat, lon)` from a record, tolerating the key variants the
/// upstream store is known to emit, including a nested `location` object or
/// a `coordinates: [lon, lat]` list — delegates to
/// [`crate::transform::extract_coordinates`] for that nested fallback, which
/// is the same extraction C9 applies to TEC/project rows, then tries two
/// further flat variants (`Lat`/`Long`) seen in some catalog feeds.
fn extract_point_coords(record: &Value) -> Option<(f64, f64)> {
    if let (Some(lat), Some(lon)) = crate::transform::extract_coordinates(record) {
        return Some((lat, lon));
    }
    let lat = coerce_float(get_any(record, &["Lat"]));
    let lon = coerce_float(get_any(record, &["Long"]));
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    }
}

fn parse_geometry(raw: &Value) -> Option<Vec<Value>> {
    match raw {
        Value::String(s) => serde_json::from_str::<Value>(s).ok().and_then(|v| parse_geometry(&v)),
        Value::Array(items) => Some(items.clone()),
        _ => None,
    }
}

/// Build a [`LineFeature`] from a raw geometry field (a JSON string or a
/// list of `[lon, lat]` pairs). Fewer than two valid vertices is dropped.
pub fn prepare_line_feature(raw_geometry: Option<&Value>, record: Value) -> Option<LineFeature> {
    let raw_geometry = raw_geometry?;
    if raw_geometry.is_null() {
        return None;
    }
    let items = parse_geometry(raw_geometry)?;

    let mut coordinates = Vec::with_capacity(items.len());
    for entry in &items {
        let pair = entry.as_array()?;
        if pair.len() < 2 {
            continue;
        }
        let lon = coerce_float(pair.get(0));
        let lat = coerce_float(pair.get(1));
        if let (Some(lat), Some(lon)) = (lat, lon) {
            coordinates.push((lat, lon));
        }
    }

    LineFeature::from_coordinates(coordinates, record)
}

/// A raw water-resource record is polymorphic: a single `[lon, lat]` pair
/// is a point resource, anything else is attempted as a line.
pub enum WaterFeature {
    Point(PointFeature),
    Line(LineFeature),
}

pub fn prepare_water_feature(raw_geometry: Option<&Value>, record: Value) -> Option<WaterFeature> {
    let raw_geometry = raw_geometry?;
    let items = parse_geometry(raw_geometry)?;

    if items.len() == 2 && items.iter().all(|v| v.is_number()) {
        let lon = coerce_float(items.get(0))?;
        let lat = coerce_float(items.get(1))?;
        return Some(WaterFeature::Point(PointFeature { lat, lon, data: record }));
    }

    prepare_line_feature(raw_geometry, record).map(WaterFeature::Line)
}

/// Per-layer counts and grids, plus the raw feature lists used for the
/// full-scan fallback. Immutable once constructed; refreshed wholesale
/// under the cache's write lock.
pub struct InfrastructureCatalog {
    pub substations: Vec<Arc<PointFeature>>,
    pub transmission_lines: Vec<Arc<LineFeature>>,
    pub fiber_cables: Vec<Arc<LineFeature>>,
    pub internet_exchange_points: Vec<Arc<PointFeature>>,
    pub water_points: Vec<Arc<PointFeature>>,
    pub water_lines: Vec<Arc<LineFeature>>,

    pub substation_index: SpatialGrid<PointFeature>,
    pub transmission_index: SpatialGrid<LineFeature>,
    pub fiber_index: SpatialGrid<LineFeature>,
    pub ixp_index: SpatialGrid<PointFeature>,
    pub water_point_index: SpatialGrid<PointFeature>,
    pub water_line_index: SpatialGrid<LineFeature>,

    pub load_timestamp: Instant,
    pub counts: HashMap<String, usize>,
}

/// Raw record collections delivered by the external store, keyed the way
/// [`InfrastructureStore::fetch_all`] returns them.
pub struct RawCollections {
    pub substations: Vec<Value>,
    pub transmission_lines: Vec<Value>,
    pub fiber_cables: Vec<Value>,
    pub internet_exchange_points: Vec<Value>,
    pub water_resources: Vec<Value>,
}

impl InfrastructureCatalog {
    pub fn build(raw: RawCollections) -> Self {
        let mut substations = Vec::new();
        let mut substation_index = SpatialGrid::new();
        for record in raw.substations {
            if let Some((lat, lon)) = extract_point_coords(&record) {
                let feature = Arc::new(PointFeature { lat, lon, data: record });
                substation_index.add_point(lat, lon, Arc::clone(&feature));
                substations.push(feature);
            }
        }

        let mut transmission_lines = Vec::new();
        let mut transmission_index = SpatialGrid::new();
        for record in raw.transmission_lines {
            let geometry = record.get("path_coordinates").cloned();
            if let Some(feature) = prepare_line_feature(geometry.as_ref(), record) {
                let feature = Arc::new(feature);
                transmission_index.add_bbox(feature.bbox, Arc::clone(&feature));
                transmission_lines.push(feature);
            }
        }

        let mut fiber_cables = Vec::new();
        let mut fiber_index = SpatialGrid::new();
        for record in raw.fiber_cables {
            let geometry = record.get("route_coordinates").cloned();
            if let Some(feature) = prepare_line_feature(geometry.as_ref(), record) {
                let feature = Arc::new(feature);
                fiber_index.add_bbox(feature.bbox, Arc::clone(&feature));
                fiber_cables.push(feature);
            }
        }

        let mut internet_exchange_points = Vec::new();
        let mut ixp_index = SpatialGrid::new();
        for record in raw.internet_exchange_points {
            if let Some((lat, lon)) = extract_point_coords(&record) {
                let feature = Arc::new(PointFeature { lat, lon, data: record });
                ixp_index.add_point(lat, lon, Arc::clone(&feature));
                internet_exchange_points.push(feature);
            }
        }

        let mut water_points = Vec::new();
        let mut water_lines = Vec::new();
        let mut water_point_index = SpatialGrid::new();
        let mut water_line_index = SpatialGrid::new();
        for record in raw.water_resources {
            let geometry = record.get("coordinates").cloned();
            match prepare_water_feature(geometry.as_ref(), record) {
                Some(WaterFeature::Point(p)) => {
                    let feature = Arc::new(p);
                    water_point_index.add_point(feature.lat, feature.lon, Arc::clone(&feature));
                    water_points.push(feature);
                }
                Some(WaterFeature::Line(l)) => {
                    let feature = Arc::new(l);
                    water_line_index.add_bbox(feature.bbox, Arc::clone(&feature));
                    water_lines.push(feature);
                }
                None => {}
            }
        }

        let mut counts = HashMap::new();
        counts.insert("substations".to_string(), substations.len());
        counts.insert("transmission".to_string(), transmission_lines.len());
        counts.insert("fiber".to_string(), fiber_cables.len());
        counts.insert("ixps".to_string(), internet_exchange_points.len());
        counts.insert("water".to_string(), water_points.len() + water_lines.len());

        Self {
            substations,
            transmission_lines,
            fiber_cables,
            internet_exchange_points,
            water_points,
            water_lines,
            substation_index,
            transmission_index,
            fiber_index,
            ixp_index,
            water_point_index,
            water_line_index,
            load_timestamp: Instant::now(),
            counts,
        }
    }
}

/// External collaborator: the feature store. Out of scope per the task
/// (no REST/DB access lives in this crate); implementors adapt whatever
/// transport backs the five logical collections.
#[async_trait]
pub trait InfrastructureStore: Send + Sync {
    async fn fetch_all(&self) -> Result<RawCollections>;
}

/// TTL-cached, single-writer/multi-reader catalog cache. Refresh is
/// all-or-nothing: a fetch error leaves the previous snapshot serving.
pub struct CatalogCache {
    store: Arc<dyn InfrastructureStore>,
    ttl: Duration,
    inner: RwLock<Option<Arc<InfrastructureCatalog>>>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn InfrastructureStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            inner: RwLock::new(None),
        }
    }

    /// Return the current catalog, refreshing it first if it is absent or
    /// older than the TTL. A refresh failure is logged and the stale
    /// snapshot (if any) is returned; only a cold cache with a failing
    /// fetch surfaces an error.
    pub async fn get(&self) -> Result<Arc<InfrastructureCatalog>> {
        {
            let guard = self.inner.read().await;
            if let Some(catalog) = guard.as_ref() {
                if catalog.load_timestamp.elapsed() < self.ttl {
                    return Ok(Arc::clone(catalog));
                }
            }
        }

        let mut guard = self.inner.write().await;
        let is_stale = guard.as_ref().map_or(true, |c| c.load_timestamp.elapsed() >= self.ttl);
        if !is_stale {
            return Ok(Arc::clone(guard.as_ref().unwrap()));
        }

        match self.store.fetch_all().await {
            Ok(raw) => {
                let catalog = Arc::new(InfrastructureCatalog::build(raw));
                *guard = Some(Arc::clone(&catalog));
                tracing::info!(
                    substations = catalog.counts.get("substations").copied().unwrap_or(0),
                    transmission = catalog.counts.get("transmission").copied().unwrap_or(0),
                    fiber = catalog.counts.get("fiber").copied().unwrap_or(0),
                    ixps = catalog.counts.get("ixps").copied().unwrap_or(0),
                    water = catalog.counts.get("water").copied().unwrap_or(0),
                    "refreshed infrastructure catalog"
                );
                Ok(catalog)
            }
            Err(err) => {
                if let Some(stale) = guard.as_ref() {
                    tracing::warn!(error = %err, "catalog refresh failed, serving stale snapshot");
                    Ok(Arc::clone(stale))
                } else {
                    Err(RatingError::StoreFetch(err.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_record_tolerates_key_variants() {
        let record = json!({"Lat": 51.5, "Long": -0.1});
        assert_eq!(extract_point_coords(&record), Some((51.5, -0.1)));
    }

    #[test]
    fn point_record_without_coords_is_dropped() {
        let record = json!({"name": "no coords here"});
        assert_eq!(extract_point_coords(&record), None);
    }

    #[test]
    fn line_feature_parses_json_string_geometry() {
        let geometry = json!("[[0.0, 50.0], [1.0, 51.0]]");
        let feature = prepare_line_feature(Some(&geometry), json!({})).unwrap();
        assert_eq!(feature.coordinates.len(), 2);
    }

    #[test]
    fn line_feature_with_one_vertex_is_none() {
        let geometry = json!([[0.0, 50.0]]);
        assert!(prepare_line_feature(Some(&geometry), json!({})).is_none());
    }

    #[test]
    fn water_feature_pair_becomes_point() {
        let geometry = json!([0.1, 51.0]);
        match prepare_water_feature(Some(&geometry), json!({})) {
            Some(WaterFeature::Point(p)) => {
                assert_eq!(p.lon, 0.1);
                assert_eq!(p.lat, 51.0);
            }
            _ => panic!("expected point"),
        }
    }

    #[test]
    fn water_feature_multi_vertex_becomes_line() {
        let geometry = json!([[0.0, 50.0], [1.0, 51.0], [2.0, 52.0]]);
        match prepare_water_feature(Some(&geometry), json!({})) {
            Some(WaterFeature::Line(l)) => assert_eq!(l.coordinates.len(), 3),
            _ => panic!("expected line"),
        }
    }

    #[test]
    fn build_catalog_counts_features_per_layer() {
        let raw = RawCollections {
            substations: vec![json!({"latitude": 51.0, "longitude": 0.0})],
            transmission_lines: vec![json!({"path_coordinates": [[0.0, 50.0], [1.0, 51.0]]})],
            fiber_cables: vec![],
            internet_exchange_points: vec![],
            water_resources: vec![json!({"coordinates": [0.0, 50.0]})],
        };
        let catalog = InfrastructureCatalog::build(raw);
        assert_eq!(catalog.counts["substations"], 1);
        assert_eq!(catalog.counts["transmission"], 1);
        assert_eq!(catalog.counts["water"], 1);
    }
}

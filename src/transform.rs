//! Persona/source resolution and the TEC→unified-site-schema transform.
//!
//! Two upstream record shapes exist: `renewable_projects`, which already
//! matches the unified [`Site`] schema, and `tec_connections`, which needs
//! [`transform_tec_to_project_schema`] first.

use serde_json::Value;

/// How a requested persona string resolved against the known table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaResolution {
    /// Caller supplied nothing; the canonical default was used.
    Defaulted,
    /// Caller supplied a string that didn't match any known persona.
    Invalid,
    /// Caller supplied a recognized persona.
    Valid,
}

impl PersonaResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defaulted => "defaulted",
            Self::Invalid => "invalid",
            Self::Valid => "valid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemandPersona {
    Hyperscaler,
    Colocation,
    EdgeComputing,
}

impl DemandPersona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hyperscaler => "hyperscaler",
            Self::Colocation => "colocation",
            Self::EdgeComputing => "edge_computing",
        }
    }

    pub fn weights(&self) -> crate::config::PersonaWeights {
        match self {
            Self::Hyperscaler => crate::config::PERSONA_WEIGHTS_HYPERSCALER,
            Self::Colocation => crate::config::PERSONA_WEIGHTS_COLOCATION,
            Self::EdgeComputing => crate::config::PERSONA_WEIGHTS_EDGE_COMPUTING,
        }
    }

    pub fn capacity_params(&self) -> crate::config::CapacityParams {
        match self {
            Self::Hyperscaler => crate::config::CAPACITY_PARAMS_HYPERSCALER,
            Self::Colocation => crate::config::CAPACITY_PARAMS_COLOCATION,
            Self::EdgeComputing => crate::config::CAPACITY_PARAMS_EDGE_COMPUTING,
        }
    }

    pub fn capacity_range(&self) -> crate::config::CapacityRange {
        match self {
            Self::Hyperscaler => crate::config::CAPACITY_RANGE_HYPERSCALER,
            Self::Colocation => crate::config::CAPACITY_RANGE_COLOCATION,
            Self::EdgeComputing => crate::config::CAPACITY_RANGE_EDGE_COMPUTING,
        }
    }

    pub const ALL: [DemandPersona; 3] = [Self::Hyperscaler, Self::Colocation, Self::EdgeComputing];
}

/// Normalize a requested demand persona string. Empty ⇒ defaulted to
/// `hyperscaler`; unrecognized ⇒ invalid, falling back to `hyperscaler`.
pub fn resolve_demand_persona(raw: Option<&str>) -> (DemandPersona, PersonaResolution) {
    let trimmed = raw.unwrap_or("").trim();
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() {
        return (DemandPersona::Hyperscaler, PersonaResolution::Defaulted);
    }
    match lowered.as_str() {
        "hyperscaler" => (DemandPersona::Hyperscaler, PersonaResolution::Valid),
        "colocation" => (DemandPersona::Colocation, PersonaResolution::Valid),
        "edge_computing" => (DemandPersona::EdgeComputing, PersonaResolution::Valid),
        _ => (DemandPersona::Hyperscaler, PersonaResolution::Invalid),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplyPersona {
    Greenfield,
    Repower,
    Stranded,
}

impl SupplyPersona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greenfield => "greenfield",
            Self::Repower => "repower",
            Self::Stranded => "stranded",
        }
    }

    pub fn weights(&self) -> crate::config::PersonaWeights {
        match self {
            Self::Greenfield => crate::config::PERSONA_WEIGHTS_GREENFIELD,
            Self::Repower => crate::config::PERSONA_WEIGHTS_REPOWER,
            Self::Stranded => crate::config::PERSONA_WEIGHTS_STRANDED,
        }
    }
}

/// Normalize a requested supply-side persona string. Empty ⇒ defaulted to
/// `greenfield`; unrecognized ⇒ invalid, falling back to `greenfield`.
pub fn resolve_supply_persona(raw: Option<&str>) -> (SupplyPersona, PersonaResolution) {
    let trimmed = raw.unwrap_or("").trim();
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() {
        return (SupplyPersona::Greenfield, PersonaResolution::Defaulted);
    }
    match lowered.as_str() {
        "greenfield" => (SupplyPersona::Greenfield, PersonaResolution::Valid),
        "repower" => (SupplyPersona::Repower, PersonaResolution::Valid),
        "stranded" => (SupplyPersona::Stranded, PersonaResolution::Valid),
        _ => (SupplyPersona::Greenfield, PersonaResolution::Invalid),
    }
}

/// Unified site schema scored by the rest of the pipeline, whether it
/// arrived already in this shape (`renewable_projects`) or was produced by
/// [`transform_tec_to_project_schema`] (`tec_connections`).
#[derive(Debug, Clone)]
pub struct Site {
    pub id: Option<String>,
    pub site_name: String,
    pub technology_type: String,
    pub capacity_mw: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub commissioning_year: Option<i32>,
    pub is_btm: Option<bool>,
    pub development_status_short: String,
    pub capacity_factor: Option<f64>,
    pub operator: Option<String>,
    pub connection_site: Option<String>,
    pub substation_name: Option<String>,
    pub voltage_kv: Option<f64>,
}

impl Site {
    pub fn has_valid_coords(&self) -> bool {
        matches!((self.latitude, self.longitude), (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite())
    }
}

/// UK-scoped validation bounds for user-submitted sites (§3). Catalog-
/// sourced projects only need finite coordinates, checked separately via
/// [`Site::has_valid_coords`].
pub fn validate_user_site(site: &Site) -> Result<(), String> {
    let lat = site.latitude.ok_or_else(|| "missing latitude".to_string())?;
    let lon = site.longitude.ok_or_else(|| "missing longitude".to_string())?;
    if !(49.8..=60.9).contains(&lat) {
        return Err(format!("latitude {lat} outside UK bounds [49.8, 60.9]"));
    }
    if !(-10.8..=2.0).contains(&lon) {
        return Err(format!("longitude {lon} outside UK bounds [-10.8, 2.0]"));
    }
    if !(5.0..=500.0).contains(&site.capacity_mw) {
        return Err(format!("capacity_mw {} outside [5, 500]", site.capacity_mw));
    }
    if let Some(year) = site.commissioning_year {
        if !(2025..=2035).contains(&year) {
            return Err(format!("commissioning_year {year} outside [2025, 2035]"));
        }
    }
    Ok(())
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Heterogeneous coordinate extraction: direct key variants, a nested
/// `location` object, then a nested `coordinates: [lon, lat]` list.
pub fn extract_coordinates(row: &Value) -> (Option<f64>, Option<f64>) {
    let lat_keys = ["latitude", "lat", "Latitude", "Latitude_deg"];
    let lon_keys = ["longitude", "lon", "lng", "Longitude", "Longitude_deg"];

    let mut latitude = lat_keys.iter().find_map(|k| row.get(*k).and_then(as_f64));
    let mut longitude = lon_keys.iter().find_map(|k| row.get(*k).and_then(as_f64));

    if (latitude.is_none() || longitude.is_none()) && row.get("location").map_or(false, Value::is_object) {
        let location = &row["location"];
        if latitude.is_none() {
            latitude = location.get("lat").or_else(|| location.get("latitude")).and_then(as_f64);
        }
        if longitude.is_none() {
            longitude = location
                .get("lon")
                .or_else(|| location.get("lng"))
                .or_else(|| location.get("longitude"))
                .and_then(as_f64);
        }
    }

    if (latitude.is_none() || longitude.is_none()) && row.get("coordinates").map_or(false, Value::is_array) {
        let coords = row["coordinates"].as_array().unwrap();
        if coords.len() >= 2 {
            if longitude.is_none() {
                longitude = as_f64(&coords[0]);
            }
            if latitude.is_none() {
                latitude = as_f64(&coords[1]);
            }
        }
    }

    (latitude, longitude)
}

fn string_field(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Transform a `tec_connections` row (Transmission Entry Capacity) into the
/// unified [`Site`] schema scored everywhere else in this crate.
pub fn transform_tec_to_project_schema(row: &Value) -> Site {
    let (latitude, longitude) = extract_coordinates(row);
    let project_name = string_field(row, "project_name");

    Site {
        id: string_field(row, "id"),
        site_name: project_name.clone().unwrap_or_else(|| "Untitled Project".to_string()),
        technology_type: string_field(row, "technology_type").unwrap_or_else(|| "Unknown".to_string()),
        capacity_mw: row.get("capacity_mw").and_then(as_f64).unwrap_or(0.0),
        latitude,
        longitude,
        commissioning_year: None,
        is_btm: None,
        development_status_short: string_field(row, "development_status").unwrap_or_else(|| "Scoping".to_string()),
        capacity_factor: None,
        operator: string_field(row, "operator").or_else(|| string_field(row, "customer_name")),
        connection_site: string_field(row, "connection_site"),
        substation_name: string_field(row, "substation_name"),
        voltage_kv: row.get("voltage").and_then(as_f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn demand_persona_empty_defaults() {
        let (p, status) = resolve_demand_persona(Some(""));
        assert_eq!(p, DemandPersona::Hyperscaler);
        assert_eq!(status, PersonaResolution::Defaulted);
    }

    #[test]
    fn demand_persona_unknown_is_invalid_with_fallback() {
        let (p, status) = resolve_demand_persona(Some("not-a-persona"));
        assert_eq!(p, DemandPersona::Hyperscaler);
        assert_eq!(status, PersonaResolution::Invalid);
    }

    #[test]
    fn demand_persona_trims_and_lowercases() {
        let (p, status) = resolve_demand_persona(Some("  Colocation  "));
        assert_eq!(p, DemandPersona::Colocation);
        assert_eq!(status, PersonaResolution::Valid);
    }

    #[test]
    fn extract_coordinates_prefers_direct_keys() {
        let row = json!({"latitude": 51.0, "longitude": -1.0});
        assert_eq!(extract_coordinates(&row), (Some(51.0), Some(-1.0)));
    }

    #[test]
    fn extract_coordinates_falls_back_to_nested_location() {
        let row = json!({"location": {"lat": 52.0, "lng": -2.0}});
        assert_eq!(extract_coordinates(&row), (Some(52.0), Some(-2.0)));
    }

    #[test]
    fn extract_coordinates_falls_back_to_coordinates_list() {
        let row = json!({"coordinates": [-3.0, 53.0]});
        assert_eq!(extract_coordinates(&row), (Some(53.0), Some(-3.0)));
    }

    #[test]
    fn tec_transform_defaults_missing_project_name() {
        let row = json!({"capacity_mw": 12.5});
        let site = transform_tec_to_project_schema(&row);
        assert_eq!(site.site_name, "Untitled Project");
        assert_eq!(site.development_status_short, "Scoping");
    }

    #[test]
    fn validate_user_site_rejects_out_of_bounds_capacity() {
        let site = Site {
            id: None,
            site_name: "x".into(),
            technology_type: "solar".into(),
            capacity_mw: 1.0,
            latitude: Some(51.5),
            longitude: Some(-0.1),
            commissioning_year: Some(2026),
            is_btm: None,
            development_status_short: "in planning".into(),
            capacity_factor: None,
            operator: None,
            connection_site: None,
            substation_name: None,
            voltage_kv: None,
        };
        assert!(validate_user_site(&site).is_err());
    }
}

//! `rate-sites`: score a batch of candidate sites against a local
//! infrastructure fixture and print the result as GeoJSON.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoValue};
use infra_rating::catalog::{CatalogCache, InfrastructureStore, RawCollections};
use infra_rating::config::Config;
use infra_rating::error::{RatingError, Result};
use infra_rating::pipeline::{self, ScoredSite};
use infra_rating::transform::Site;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

/// Score candidate sites against an infrastructure catalog and emit GeoJSON.
#[derive(Parser, Debug)]
#[command(name = "rate-sites", version, about)]
struct Cli {
    /// Path to a JSON file with substations/transmission_lines/fiber_cables/
    /// internet_exchange_points/water_resources collections.
    #[arg(long)]
    infrastructure: PathBuf,

    /// Path to a JSON array of candidate sites to score.
    #[arg(long)]
    sites: PathBuf,

    /// Demand persona: hyperscaler, colocation, or edge_computing.
    #[arg(long)]
    persona: Option<String>,

    /// Optional £/MWh ceiling used by the price-sensitivity component.
    #[arg(long)]
    max_price_mwh: Option<f64>,

    /// Write output here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

struct JsonFileStore {
    path: PathBuf,
}

fn collection(root: &Value, key: &str) -> Vec<Value> {
    root.get(key).and_then(Value::as_array).cloned().unwrap_or_default()
}

#[async_trait]
impl InfrastructureStore for JsonFileStore {
    async fn fetch_all(&self) -> Result<RawCollections> {
        let raw = fs::read_to_string(&self.path)?;
        let root: Value = serde_json::from_str(&raw)?;
        Ok(RawCollections {
            substations: collection(&root, "substations"),
            transmission_lines: collection(&root, "transmission_lines"),
            fiber_cables: collection(&root, "fiber_cables"),
            internet_exchange_points: collection(&root, "internet_exchange_points"),
            water_resources: collection(&root, "water_resources"),
        })
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_field(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

fn site_from_json(row: &Value) -> Site {
    let (latitude, longitude) = infra_rating::transform::extract_coordinates(row);
    Site {
        id: string_field(row, "id"),
        site_name: string_field(row, "site_name").unwrap_or_else(|| "Untitled Site".to_string()),
        technology_type: string_field(row, "technology_type").unwrap_or_else(|| "Unknown".to_string()),
        capacity_mw: row.get("capacity_mw").and_then(as_f64).unwrap_or(0.0),
        latitude,
        longitude,
        commissioning_year: row.get("commissioning_year").and_then(Value::as_i64).map(|v| v as i32),
        is_btm: row.get("is_btm").and_then(Value::as_bool),
        development_status_short: string_field(row, "development_status_short").unwrap_or_else(|| "Scoping".to_string()),
        capacity_factor: row.get("capacity_factor").and_then(as_f64),
        operator: string_field(row, "operator"),
        connection_site: string_field(row, "connection_site"),
        substation_name: string_field(row, "substation_name"),
        voltage_kv: row.get("voltage_kv").and_then(as_f64),
    }
}

fn feature_from_scored_site(site: &ScoredSite) -> Feature {
    let mut properties = Map::new();
    properties.insert("site_name".to_string(), Value::String(site.site_name.clone()));
    properties.insert("technology_type".to_string(), Value::String(site.technology_type.clone()));
    properties.insert("capacity_mw".to_string(), serde_json::json!(site.capacity_mw));
    properties.insert("operator".to_string(), serde_json::json!(site.operator));
    properties.insert("development_status".to_string(), Value::String(site.development_status.clone()));
    properties.insert("connection_site".to_string(), serde_json::json!(site.connection_site));
    properties.insert("substation_name".to_string(), serde_json::json!(site.substation_name));
    properties.insert("voltage_kv".to_string(), serde_json::json!(site.voltage_kv));
    properties.insert("investment_rating".to_string(), serde_json::json!(site.investment_rating));
    properties.insert("rating_description".to_string(), Value::String(site.rating_description.to_string()));
    properties.insert("color_code".to_string(), Value::String(site.color_code.to_string()));
    properties.insert("component_scores".to_string(), serde_json::json!(site.component_scores));
    properties.insert("weighted_contributions".to_string(), serde_json::json!(site.weighted_contributions));
    properties.insert("nearest_infrastructure".to_string(), serde_json::json!(site.nearest_infrastructure));
    properties.insert("internal_total_score".to_string(), serde_json::json!(site.internal_total_score));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoValue::Point(vec![site.longitude, site.latitude]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();

    let sites_raw = fs::read_to_string(&cli.sites)?;
    let sites_json: Vec<Value> = serde_json::from_str(&sites_raw)?;
    let sites: Vec<Site> = sites_json.iter().map(site_from_json).collect();

    let config = Config::from_env();
    let store = Arc::new(JsonFileStore { path: cli.infrastructure.clone() });
    let cache = CatalogCache::new(store, config.cache_ttl);

    let result = pipeline::score_sites(&cache, sites, cli.persona.as_deref(), cli.max_price_mwh).await?;

    tracing::info!(
        scored = result.metadata.rows_scored,
        persona = %result.metadata.persona,
        resolution = result.metadata.persona_resolution.as_str(),
        "scoring run complete"
    );

    let features: Vec<Feature> = result.features.iter().map(feature_from_scored_site).collect();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let output = serde_json::to_string_pretty(&collection).map_err(RatingError::Json)?;
    match cli.output {
        Some(path) => fs::write(path, output)?,
        None => println!("{output}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn json_file_store_reads_fixture_collections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"substations": [{{"latitude": 51.5, "longitude": -0.1}}], "transmission_lines": [], "fiber_cables": [], "internet_exchange_points": [], "water_resources": []}}"#
        )
        .unwrap();

        let store = JsonFileStore { path: file.path().to_path_buf() };
        let raw = store.fetch_all().await.unwrap();
        assert_eq!(raw.substations.len(), 1);
        assert!(raw.transmission_lines.is_empty());
    }

    #[test]
    fn site_from_json_falls_back_on_missing_fields() {
        let row = serde_json::json!({"latitude": 51.5, "longitude": -0.1});
        let site = site_from_json(&row);
        assert_eq!(site.site_name, "Untitled Site");
        assert_eq!(site.capacity_mw, 0.0);
    }
}

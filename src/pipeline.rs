//! Pipeline orchestration (C10): fetch the infrastructure catalog, batch
//! proximity-score a set of sites, weight them by persona, and return a
//! sorted result with run metadata. Two entrypoints cover the two upstream
//! shapes this system scores: demand-side siting (`score_sites`) and the
//! supply-side power-developer workflow (`power_developer_analysis`).

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::catalog::CatalogCache;
use crate::config;
use crate::legacy;
use crate::persona::{self, PersonaComponentScores};
use crate::proximity::{self, ProximityScoreSet};
use crate::topsis;
use crate::transform::{self, PersonaResolution, Site};

#[derive(Debug, Clone)]
pub struct ScoredSite {
    pub site_name: String,
    pub technology_type: String,
    pub capacity_mw: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub operator: Option<String>,
    pub development_status: String,
    pub connection_site: Option<String>,
    pub substation_name: Option<String>,
    pub voltage_kv: Option<f64>,
    pub investment_rating: f64,
    pub rating_description: &'static str,
    pub color_code: &'static str,
    pub component_scores: HashMap<String, f64>,
    pub weighted_contributions: HashMap<String, f64>,
    pub nearest_infrastructure: HashMap<String, f64>,
    pub internal_total_score: f64,
}

#[derive(Debug, Clone)]
pub struct AnalysisMetadata {
    pub persona: String,
    pub persona_resolution: PersonaResolution,
    pub requested_persona: Option<String>,
    pub total_rows_processed: usize,
    pub rows_with_valid_coords: usize,
    pub rows_scored: usize,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub features: Vec<ScoredSite>,
    pub metadata: AnalysisMetadata,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_map(map: &HashMap<String, f64>) -> HashMap<String, f64> {
    map.iter().map(|(k, v)| (k.clone(), round1(*v))).collect()
}

fn component_scores_map(components: &PersonaComponentScores) -> HashMap<String, f64> {
    let mut m = HashMap::new();
    m.insert("capacity".to_string(), components.capacity);
    m.insert("connection_speed".to_string(), components.connection_speed);
    m.insert("resilience".to_string(), components.resilience);
    m.insert("land_planning".to_string(), components.land_planning);
    m.insert("latency".to_string(), components.latency);
    m.insert("cooling".to_string(), components.cooling);
    m.insert("price_sensitivity".to_string(), components.price_sensitivity);
    m
}

fn persona_weights_map(weights: config::PersonaWeights) -> HashMap<String, f64> {
    let weights = weights.normalized();
    let mut m = HashMap::new();
    m.insert("capacity".to_string(), weights.capacity);
    m.insert("connection_speed".to_string(), weights.connection_speed);
    m.insert("resilience".to_string(), weights.resilience);
    m.insert("land_planning".to_string(), weights.land_planning);
    m.insert("latency".to_string(), weights.latency);
    m.insert("cooling".to_string(), weights.cooling);
    m.insert("price_sensitivity".to_string(), weights.price_sensitivity);
    m
}

fn empty_result(persona: String, resolution: PersonaResolution, requested: Option<String>) -> AnalysisResult {
    AnalysisResult {
        features: Vec::new(),
        metadata: AnalysisMetadata {
            persona,
            persona_resolution: resolution,
            requested_persona: requested,
            total_rows_processed: 0,
            rows_with_valid_coords: 0,
            rows_scored: 0,
            processing_time_seconds: 0.0,
        },
    }
}

/// Score a batch of demand-side sites (siting candidates for a data-center
/// operator persona). Sites without finite coordinates are dropped before
/// proximity scoring; a site that fails to score is skipped and logged,
/// not fatal to the batch.
pub async fn score_sites(catalog_cache: &CatalogCache, sites: Vec<Site>, persona_raw: Option<&str>, user_max_price_mwh: Option<f64>) -> crate::error::Result<AnalysisResult> {
    let start = Instant::now();
    let (persona, resolution) = transform::resolve_demand_persona(persona_raw);
    let requested_persona = persona_raw.filter(|s| !s.trim().is_empty()).map(str::to_string);

    let total_rows = sites.len();
    if total_rows == 0 {
        tracing::warn!("score_sites called with an empty batch");
        return Ok(empty_result(persona.as_str().to_string(), resolution, requested_persona));
    }

    let valid_sites: Vec<Site> = sites.into_iter().filter(Site::has_valid_coords).collect();
    tracing::info!(total = total_rows, valid = valid_sites.len(), "filtered to sites with valid coordinates");

    if valid_sites.is_empty() {
        tracing::warn!("no sites with valid coordinates in batch");
        return Ok(empty_result(persona.as_str().to_string(), resolution, requested_persona));
    }

    let catalog = catalog_cache.get().await?;
    let coords: Vec<(f64, f64)> = valid_sites.iter().map(|s| (s.latitude.unwrap(), s.longitude.unwrap())).collect();
    let proximity_batch = proximity::score_sites_batch(&catalog, &coords);

    let weights = persona.weights();
    let capacity_params = persona.capacity_params();

    let mut scored = Vec::with_capacity(valid_sites.len());
    for (index, site) in valid_sites.iter().enumerate() {
        let proximity_scores = proximity_batch.get(index).cloned().unwrap_or_default();
        match score_one_site(site, &proximity_scores, capacity_params, weights, user_max_price_mwh) {
            Ok(scored_site) => scored.push(scored_site),
            Err(err) => tracing::warn!(site = %site.site_name, error = %err, "skipping site due to scoring error"),
        }
    }

    scored.sort_by(|a, b| b.investment_rating.partial_cmp(&a.investment_rating).unwrap_or(std::cmp::Ordering::Equal));

    let rows_scored = scored.len();
    Ok(AnalysisResult {
        features: scored,
        metadata: AnalysisMetadata {
            persona: persona.as_str().to_string(),
            persona_resolution: resolution,
            requested_persona,
            total_rows_processed: total_rows,
            rows_with_valid_coords: valid_sites.len(),
            rows_scored,
            processing_time_seconds: start.elapsed().as_secs_f64(),
        },
    })
}

fn score_one_site(site: &Site, proximity_scores: &ProximityScoreSet, capacity_params: config::CapacityParams, weights: config::PersonaWeights, user_max_price_mwh: Option<f64>) -> crate::error::Result<ScoredSite> {
    let latitude = site.latitude.ok_or_else(|| crate::error::RatingError::Validation("missing latitude".into()))?;
    let longitude = site.longitude.ok_or_else(|| crate::error::RatingError::Validation("missing longitude".into()))?;

    let components = persona::build_persona_component_scores(site, proximity_scores, capacity_params, user_max_price_mwh);
    let result = persona::score_persona_weighted(&components, weights);

    Ok(ScoredSite {
        site_name: site.site_name.clone(),
        technology_type: site.technology_type.clone(),
        capacity_mw: site.capacity_mw,
        latitude,
        longitude,
        operator: site.operator.clone(),
        development_status: site.development_status_short.clone(),
        connection_site: site.connection_site.clone(),
        substation_name: site.substation_name.clone(),
        voltage_kv: site.voltage_kv,
        investment_rating: result.rating_0_10,
        rating_description: result.description,
        color_code: result.color,
        component_scores: round_map(&component_scores_map(&components)),
        weighted_contributions: round_map(&result.weighted_contributions),
        nearest_infrastructure: proximity_scores.nearest_distances.clone(),
        internal_total_score: round1(result.score_0_100),
    })
}

/// Run the power-developer workflow against raw rows from either the
/// `renewable_projects` table (already unified-shape) or `tec_connections`
/// (needs the TEC transform first). `custom_criteria`, when supplied,
/// overrides the persona's default weights — its keys are translated from
/// frontend field names via [`config::FRONTEND_WEIGHT_KEY_MAP`] and
/// renormalized to sum to 1.0.
pub async fn power_developer_analysis(
    catalog_cache: &CatalogCache,
    rows: Vec<Value>,
    source_table: &str,
    target_persona_raw: Option<&str>,
    custom_criteria: Option<HashMap<String, f64>>,
) -> crate::error::Result<AnalysisResult> {
    let start = Instant::now();
    let (persona, resolution) = transform::resolve_supply_persona(target_persona_raw);
    let requested_persona = target_persona_raw.filter(|s| !s.trim().is_empty()).map(str::to_string);

    let total_rows = rows.len();
    if total_rows == 0 {
        tracing::warn!(source_table, "no rows returned for power developer analysis");
        return Ok(empty_result(persona.as_str().to_string(), resolution, requested_persona));
    }

    let projects: Vec<Site> = if source_table == "tec_connections" {
        rows.iter().map(transform::transform_tec_to_project_schema).collect()
    } else {
        rows.iter().map(site_from_unified_row).collect()
    };

    let valid_sites: Vec<Site> = projects.into_iter().filter(Site::has_valid_coords).collect();
    tracing::info!(total = total_rows, valid = valid_sites.len(), source_table, "filtered power developer rows to valid coordinates");

    if valid_sites.is_empty() {
        tracing::warn!("no power developer rows with valid coordinates");
        return Ok(empty_result(persona.as_str().to_string(), resolution, requested_persona));
    }

    let catalog = catalog_cache.get().await?;
    let coords: Vec<(f64, f64)> = valid_sites.iter().map(|s| (s.latitude.unwrap(), s.longitude.unwrap())).collect();
    let proximity_batch = proximity::score_sites_batch(&catalog, &coords);

    let weights = match custom_criteria {
        Some(frontend_weights) => persona::translate_frontend_weights(&frontend_weights).normalized(),
        None => persona.weights(),
    };

    let mut scored = Vec::with_capacity(valid_sites.len());
    for (index, site) in valid_sites.iter().enumerate() {
        let proximity_scores = proximity_batch.get(index).cloned().unwrap_or_default();
        let capacity_params = config::CapacityParams { min_mw: 1.0, ideal_mw: 100.0, max_mw: 1000.0 };
        match score_one_site(site, &proximity_scores, capacity_params, weights, None) {
            Ok(scored_site) => scored.push(scored_site),
            Err(err) => tracing::warn!(site = %site.site_name, error = %err, "skipping project due to scoring error"),
        }
    }

    scored.sort_by(|a, b| b.investment_rating.partial_cmp(&a.investment_rating).unwrap_or(std::cmp::Ordering::Equal));

    let rows_scored = scored.len();
    Ok(AnalysisResult {
        features: scored,
        metadata: AnalysisMetadata {
            persona: persona.as_str().to_string(),
            persona_resolution: resolution,
            requested_persona,
            total_rows_processed: total_rows,
            rows_with_valid_coords: valid_sites.len(),
            rows_scored,
            processing_time_seconds: start.elapsed().as_secs_f64(),
        },
    })
}

/// Generic demand-side scoring entrypoint over raw upstream rows: like
/// [`score_sites`], but takes either `renewable_projects` or
/// `tec_connections` rows directly, an optional result cap, and an
/// optional eight-key custom weight vector routed through
/// [`persona::score_custom_weighted`] instead of the normal seven-key
/// persona path.
pub async fn score_projects(
    catalog_cache: &CatalogCache,
    rows: Vec<Value>,
    limit: Option<usize>,
    persona_raw: Option<&str>,
    source_table: &str,
    custom_weights: Option<HashMap<String, f64>>,
) -> crate::error::Result<AnalysisResult> {
    let start = Instant::now();
    let (persona, resolution) = transform::resolve_demand_persona(persona_raw);
    let requested_persona = persona_raw.filter(|s| !s.trim().is_empty()).map(str::to_string);

    let total_rows = rows.len();
    if total_rows == 0 {
        tracing::warn!(source_table, "no rows returned for score_projects");
        return Ok(empty_result(persona.as_str().to_string(), resolution, requested_persona));
    }

    let projects: Vec<Site> = if source_table == "tec_connections" {
        rows.iter().map(transform::transform_tec_to_project_schema).collect()
    } else {
        rows.iter().map(site_from_unified_row).collect()
    };

    let valid_sites: Vec<Site> = projects.into_iter().filter(Site::has_valid_coords).collect();
    tracing::info!(total = total_rows, valid = valid_sites.len(), source_table, "filtered project rows to valid coordinates");

    if valid_sites.is_empty() {
        tracing::warn!("no project rows with valid coordinates");
        return Ok(empty_result(persona.as_str().to_string(), resolution, requested_persona));
    }

    let catalog = catalog_cache.get().await?;
    let coords: Vec<(f64, f64)> = valid_sites.iter().map(|s| (s.latitude.unwrap(), s.longitude.unwrap())).collect();
    let proximity_batch = proximity::score_sites_batch(&catalog, &coords);

    let capacity_params = persona.capacity_params();

    let mut scored = Vec::with_capacity(valid_sites.len());
    for (index, site) in valid_sites.iter().enumerate() {
        let proximity_scores = proximity_batch.get(index).cloned().unwrap_or_default();
        let result = match &custom_weights {
            Some(weights) => score_one_project_custom(site, &proximity_scores, capacity_params, weights),
            None => score_one_site(site, &proximity_scores, capacity_params, persona.weights(), None),
        };
        match result {
            Ok(scored_site) => scored.push(scored_site),
            Err(err) => tracing::warn!(site = %site.site_name, error = %err, "skipping project due to scoring error"),
        }
    }

    scored.sort_by(|a, b| b.investment_rating.partial_cmp(&a.investment_rating).unwrap_or(std::cmp::Ordering::Equal));
    if let Some(limit) = limit {
        scored.truncate(limit);
    }

    let rows_scored = scored.len();
    Ok(AnalysisResult {
        features: scored,
        metadata: AnalysisMetadata {
            persona: persona.as_str().to_string(),
            persona_resolution: resolution,
            requested_persona,
            total_rows_processed: total_rows,
            rows_with_valid_coords: valid_sites.len(),
            rows_scored,
            processing_time_seconds: start.elapsed().as_secs_f64(),
        },
    })
}

fn score_one_project_custom(site: &Site, proximity_scores: &ProximityScoreSet, capacity_params: config::CapacityParams, weights: &HashMap<String, f64>) -> crate::error::Result<ScoredSite> {
    let latitude = site.latitude.ok_or_else(|| crate::error::RatingError::Validation("missing latitude".into()))?;
    let longitude = site.longitude.ok_or_else(|| crate::error::RatingError::Validation("missing longitude".into()))?;

    let components = persona::build_custom_component_scores(site, proximity_scores, capacity_params);
    let score_0_100 = persona::score_custom_weighted(&components, weights)?;
    let rating_0_10 = round1(score_0_100 / 10.0);
    let (color, description) = persona::color_and_description(rating_0_10);

    let total: f64 = weights.values().sum().max(1e-9);
    let get = |key: &str| weights.get(key).copied().unwrap_or(0.0) / total;

    let mut component_scores = HashMap::new();
    component_scores.insert("capacity".to_string(), components.capacity);
    component_scores.insert("development_stage".to_string(), components.development_stage);
    component_scores.insert("technology".to_string(), components.technology);
    component_scores.insert("grid_infrastructure".to_string(), components.grid_infrastructure);
    component_scores.insert("digital_infrastructure".to_string(), components.digital_infrastructure);
    component_scores.insert("water_resources".to_string(), components.water_resources);
    component_scores.insert("lcoe_resource_quality".to_string(), components.lcoe_resource_quality);
    component_scores.insert("tnuos_transmission_costs".to_string(), components.tnuos_transmission_costs);

    let mut weighted_contributions = HashMap::new();
    for (key, value) in &component_scores {
        weighted_contributions.insert(key.clone(), value * get(key));
    }

    Ok(ScoredSite {
        site_name: site.site_name.clone(),
        technology_type: site.technology_type.clone(),
        capacity_mw: site.capacity_mw,
        latitude,
        longitude,
        operator: site.operator.clone(),
        development_status: site.development_status_short.clone(),
        connection_site: site.connection_site.clone(),
        substation_name: site.substation_name.clone(),
        voltage_kv: site.voltage_kv,
        investment_rating: rating_0_10,
        rating_description: description,
        color_code: color,
        component_scores: round_map(&component_scores),
        weighted_contributions: round_map(&weighted_contributions),
        nearest_infrastructure: proximity_scores.nearest_distances.clone(),
        internal_total_score: round1(score_0_100),
    })
}

/// One site's rating under each of the three scoring systems this crate
/// implements, so a caller can see where they agree or diverge.
#[derive(Debug, Clone)]
pub struct ScoringComparison {
    pub site_name: String,
    pub persona_weighted_rating: f64,
    pub topsis_closeness: f64,
    pub legacy_rating: f64,
}

/// Run the persona-weighted ([`persona`]), TOPSIS ([`topsis`]), and legacy
/// ([`legacy`]) scoring systems over the same batch of rows and return
/// their ratings side by side, one entry per site, sharing a single
/// proximity-scoring pass.
pub async fn compare_scoring_systems(catalog_cache: &CatalogCache, rows: Vec<Value>, limit: Option<usize>, persona_raw: Option<&str>, source_table: &str) -> crate::error::Result<Vec<ScoringComparison>> {
    let (persona, _resolution) = transform::resolve_demand_persona(persona_raw);

    if rows.is_empty() {
        tracing::warn!(source_table, "no rows returned for compare_scoring_systems");
        return Ok(Vec::new());
    }

    let projects: Vec<Site> = if source_table == "tec_connections" {
        rows.iter().map(transform::transform_tec_to_project_schema).collect()
    } else {
        rows.iter().map(site_from_unified_row).collect()
    };

    let mut valid_sites: Vec<Site> = projects.into_iter().filter(Site::has_valid_coords).collect();
    if let Some(limit) = limit {
        valid_sites.truncate(limit);
    }
    if valid_sites.is_empty() {
        tracing::warn!("no rows with valid coordinates for compare_scoring_systems");
        return Ok(Vec::new());
    }

    let catalog = catalog_cache.get().await?;
    let coords: Vec<(f64, f64)> = valid_sites.iter().map(|s| (s.latitude.unwrap(), s.longitude.unwrap())).collect();
    let proximity_batch = proximity::score_sites_batch(&catalog, &coords);

    let capacity_params = persona.capacity_params();
    let weights = persona.weights();

    let mut persona_ratings = Vec::with_capacity(valid_sites.len());
    let mut legacy_ratings = Vec::with_capacity(valid_sites.len());
    let mut component_maps = Vec::with_capacity(valid_sites.len());

    for (index, site) in valid_sites.iter().enumerate() {
        let proximity_scores = proximity_batch.get(index).cloned().unwrap_or_default();

        let components = persona::build_persona_component_scores(site, &proximity_scores, capacity_params, None);
        let persona_result = persona::score_persona_weighted(&components, weights);
        persona_ratings.push(persona_result.rating_0_10);
        component_maps.push(component_scores_map(&components));

        let legacy = legacy::enhanced_investment_rating(site.capacity_mw, &site.development_status_short, &site.technology_type, &proximity_scores);
        legacy_ratings.push(legacy.investment_rating);
    }

    let topsis_weights = persona_weights_map(weights);
    let topsis_result = topsis::calculate_persona_topsis_score(&component_maps, &topsis_weights);

    let comparisons = valid_sites
        .iter()
        .enumerate()
        .map(|(index, site)| ScoringComparison {
            site_name: site.site_name.clone(),
            persona_weighted_rating: persona_ratings[index],
            topsis_closeness: round1(topsis_result.closeness.get(index).copied().unwrap_or(0.0)),
            legacy_rating: legacy_ratings[index],
        })
        .collect();

    Ok(comparisons)
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

fn site_from_unified_row(row: &Value) -> Site {
    let (latitude, longitude) = transform::extract_coordinates(row);
    Site {
        id: string_field(row, "id"),
        site_name: string_field(row, "site_name").unwrap_or_else(|| "Untitled Project".to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCache, InfrastructureStore, RawCollections};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeStore;

    #[async_trait]
    impl InfrastructureStore for FakeStore {
        async fn fetch_all(&self) -> crate::error::Result<RawCollections> {
            Ok(RawCollections {
                substations: vec![json!({"latitude": 51.5, "longitude": -0.1})],
                transmission_lines: vec![],
                fiber_cables: vec![],
                internet_exchange_points: vec![],
                water_resources: vec![],
            })
        }
    }

    fn sample_site(name: &str, lat: Option<f64>, lon: Option<f64>) -> Site {
        Site {
            id: None,
            site_name: name.to_string(),
            technology_type: "solar".to_string(),
            capacity_mw: 80.0,
            latitude: lat,
            longitude: lon,
            commissioning_year: None,
            is_btm: None,
            development_status_short: "in planning".to_string(),
            capacity_factor: None,
            operator: None,
            connection_site: None,
            substation_name: None,
            voltage_kv: None,
        }
    }

    #[tokio::test]
    async fn score_sites_empty_batch_returns_empty_metadata() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let result = score_sites(&cache, Vec::new(), None, None).await.unwrap();
        assert!(result.features.is_empty());
        assert_eq!(result.metadata.total_rows_processed, 0);
    }

    #[tokio::test]
    async fn score_sites_drops_sites_without_coordinates() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let sites = vec![sample_site("a", Some(51.5), Some(-0.1)), sample_site("b", None, None)];
        let result = score_sites(&cache, sites, Some("hyperscaler"), None).await.unwrap();
        assert_eq!(result.metadata.total_rows_processed, 2);
        assert_eq!(result.metadata.rows_with_valid_coords, 1);
        assert_eq!(result.features.len(), 1);
    }

    #[tokio::test]
    async fn score_sites_sorts_descending_by_rating() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let sites = vec![sample_site("near", Some(51.5), Some(-0.1)), sample_site("far", Some(60.0), Some(-1.0))];
        let result = score_sites(&cache, sites, Some("hyperscaler"), None).await.unwrap();
        assert_eq!(result.features.len(), 2);
        assert!(result.features[0].investment_rating >= result.features[1].investment_rating);
    }

    fn sample_row(name: &str, lat: f64, lon: f64) -> Value {
        json!({
            "site_name": name,
            "technology_type": "solar",
            "capacity_mw": 80.0,
            "latitude": lat,
            "longitude": lon,
            "development_status_short": "in planning",
        })
    }

    #[tokio::test]
    async fn score_projects_respects_limit() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let rows = vec![sample_row("a", 51.5, -0.1), sample_row("b", 51.6, -0.2), sample_row("c", 51.7, -0.3)];
        let result = score_projects(&cache, rows, Some(1), Some("hyperscaler"), "renewable_projects", None).await.unwrap();
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.metadata.total_rows_processed, 3);
    }

    #[tokio::test]
    async fn score_projects_custom_weights_differ_from_default_persona() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let rows = vec![sample_row("a", 51.5, -0.1)];

        let default_result = score_projects(&cache, rows.clone(), None, Some("hyperscaler"), "renewable_projects", None).await.unwrap();

        let mut weights = HashMap::new();
        weights.insert("capacity".to_string(), 1.0);
        let custom_result = score_projects(&cache, rows, None, Some("hyperscaler"), "renewable_projects", Some(weights)).await.unwrap();

        assert_eq!(default_result.features.len(), 1);
        assert_eq!(custom_result.features.len(), 1);
        assert!(custom_result.features[0].component_scores.contains_key("development_stage"));
        assert!(default_result.features[0].component_scores.contains_key("land_planning"));
    }

    #[tokio::test]
    async fn compare_scoring_systems_reports_all_three_systems() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let rows = vec![sample_row("a", 51.5, -0.1), sample_row("b", 60.0, -1.0)];
        let comparisons = compare_scoring_systems(&cache, rows, None, Some("hyperscaler"), "renewable_projects").await.unwrap();
        assert_eq!(comparisons.len(), 2);
        for comparison in &comparisons {
            assert!(comparison.persona_weighted_rating >= 0.0 && comparison.persona_weighted_rating <= 10.0);
            assert!(comparison.legacy_rating >= 0.0 && comparison.legacy_rating <= 10.0);
            assert!(comparison.topsis_closeness >= 0.0 && comparison.topsis_closeness <= 1.0);
        }
    }

    #[tokio::test]
    async fn compare_scoring_systems_empty_rows_returns_empty_vec() {
        let cache = CatalogCache::new(Arc::new(FakeStore), Duration::from_secs(600));
        let comparisons = compare_scoring_systems(&cache, Vec::new(), None, Some("hyperscaler"), "renewable_projects").await.unwrap();
        assert!(comparisons.is_empty());
    }

    struct FixtureStore {
        raw: RawCollections,
    }

    #[async_trait]
    impl InfrastructureStore for FixtureStore {
        async fn fetch_all(&self) -> crate::error::Result<RawCollections> {
            Ok(RawCollections {
                substations: self.raw.substations.clone(),
                transmission_lines: self.raw.transmission_lines.clone(),
                fiber_cables: self.raw.fiber_cables.clone(),
                internet_exchange_points: self.raw.internet_exchange_points.clone(),
                water_resources: self.raw.water_resources.clone(),
            })
        }
    }

    fn london_rich_catalog() -> CatalogCache {
        let raw = RawCollections {
            substations: vec![json!({"latitude": 51.50, "longitude": -0.10, "name": "Central Substation"})],
            transmission_lines: vec![json!({"path_coordinates": [[-0.2, 51.4], [0.0, 51.6]]})],
            fiber_cables: vec![json!({"route_coordinates": [[-0.15, 51.45], [-0.05, 51.55]]})],
            internet_exchange_points: vec![json!({"latitude": 51.51, "longitude": -0.11})],
            water_resources: vec![json!({"coordinates": [-0.1, 51.49]})],
        };
        CatalogCache::new(Arc::new(FixtureStore { raw }), Duration::from_secs(600))
    }

    fn remote_island_catalog() -> CatalogCache {
        let raw = RawCollections {
            substations: vec![json!({"latitude": 51.50, "longitude": -0.10})],
            transmission_lines: vec![],
            fiber_cables: vec![],
            internet_exchange_points: vec![],
            water_resources: vec![],
        };
        CatalogCache::new(Arc::new(FixtureStore { raw }), Duration::from_secs(600))
    }

    fn full_site(name: &str, tech: &str, capacity_mw: f64, lat: f64, lon: f64, status: &str) -> Site {
        Site {
            id: None,
            site_name: name.to_string(),
            technology_type: tech.to_string(),
            capacity_mw,
            latitude: Some(lat),
            longitude: Some(lon),
            commissioning_year: None,
            is_btm: None,
            development_status_short: status.to_string(),
            capacity_factor: None,
            operator: None,
            connection_site: None,
            substation_name: None,
            voltage_kv: None,
        }
    }

    fn wind_project_row(name: &str, capacity_mw: f64, lat: f64, lon: f64) -> Value {
        json!({
            "site_name": name,
            "technology_type": "wind",
            "capacity_mw": capacity_mw,
            "latitude": lat,
            "longitude": lon,
            "development_status_short": "in planning",
        })
    }

    /// A hyperscaler-sized solar site right on top of every infrastructure
    /// layer should land in the top rating tiers.
    #[tokio::test]
    async fn hyperscaler_site_near_all_infrastructure_scores_highly() {
        let cache = london_rich_catalog();
        let sites = vec![full_site("Ideal Site", "solar", 75.0, 51.50, -0.10, "application submitted")];
        let result = score_sites(&cache, sites, Some("hyperscaler"), None).await.unwrap();

        assert_eq!(result.features.len(), 1);
        assert!(result.features[0].investment_rating >= 6.0, "rating was {}", result.features[0].investment_rating);
    }

    /// A site far from every infrastructure layer should score noticeably
    /// worse than one embedded in a rich catalog, even at the same capacity
    /// and persona.
    #[tokio::test]
    async fn remote_site_scores_below_well_served_site() {
        let rich = london_rich_catalog();
        let remote = remote_island_catalog();

        let remote_site = full_site("Remote Site", "solar", 75.0, 60.5, -1.5, "application submitted");
        let near_site = full_site("Near Site", "solar", 75.0, 51.50, -0.10, "application submitted");

        let remote_result = score_sites(&remote, vec![remote_site], Some("hyperscaler"), None).await.unwrap();
        let rich_result = score_sites(&rich, vec![near_site], Some("hyperscaler"), None).await.unwrap();

        assert!(remote_result.features[0].investment_rating < rich_result.features[0].investment_rating);
    }

    /// The same batch scored under different demand personas should diverge —
    /// persona weighting is supposed to change outcomes, not just relabel them.
    #[tokio::test]
    async fn persona_choice_differentiates_identical_batches() {
        let cache = london_rich_catalog();

        let hyperscaler_sites = vec![full_site("Site", "solar", 150.0, 51.50, -0.10, "in planning")];
        let edge_sites = vec![full_site("Site", "solar", 150.0, 51.50, -0.10, "in planning")];

        let hyperscaler_result = score_sites(&cache, hyperscaler_sites, Some("hyperscaler"), None).await.unwrap();
        let edge_result = score_sites(&cache, edge_sites, Some("edge_computing"), None).await.unwrap();

        assert_ne!(hyperscaler_result.features[0].investment_rating, edge_result.features[0].investment_rating);
    }

    /// Scoring a batch of sites individually through the pipeline should match
    /// scoring them together — no cross-site interaction in the scoring path.
    #[tokio::test]
    async fn batch_scoring_matches_individual_scoring() {
        let cache = london_rich_catalog();

        let batch = vec![full_site("A", "wind", 60.0, 51.50, -0.10, "consented"), full_site("B", "solar", 40.0, 51.52, -0.12, "in planning")];
        let batch_result = score_sites(&cache, batch, Some("colocation"), None).await.unwrap();

        let mut individual_ratings: HashMap<String, f64> = HashMap::new();
        for (name, tech, capacity, status) in [("A", "wind", 60.0, "consented"), ("B", "solar", 40.0, "in planning")] {
            let single = vec![full_site(name, tech, capacity, 51.50, -0.10, status)];
            let single_result = score_sites(&cache, single, Some("colocation"), None).await.unwrap();
            individual_ratings.insert(name.to_string(), single_result.features[0].investment_rating);
        }

        for scored in &batch_result.features {
            if scored.site_name == "A" {
                assert!((scored.investment_rating - individual_ratings["A"]).abs() < 1e-6);
            }
        }
    }

    /// `score_projects`'s eight-key custom weight vector is a different
    /// aggregator than the default persona path, not just a relabeling of the
    /// same seven-key weights — the two must be able to disagree on ranking.
    #[tokio::test]
    async fn score_projects_custom_weights_can_reorder_results() {
        let cache = london_rich_catalog();
        let rows = vec![wind_project_row("Big Remote", 900.0, 60.5, -1.5), wind_project_row("Small Local", 10.0, 51.50, -0.10)];

        let mut weights = HashMap::new();
        weights.insert("grid_infrastructure".to_string(), 1.0);
        let custom_result = score_projects(&cache, rows, None, Some("hyperscaler"), "renewable_projects", Some(weights)).await.unwrap();

        assert_eq!(custom_result.features.len(), 2);
        assert_eq!(custom_result.features[0].site_name, "Small Local", "weighting purely on grid proximity should favor the well-served site");
    }

    /// The three systems compared side by side should be free to disagree —
    /// if they always produced the same ranking there would be no point
    /// comparing them.
    #[tokio::test]
    async fn compare_scoring_systems_systems_can_diverge() {
        let cache = london_rich_catalog();
        let rows = vec![wind_project_row("Embedded", 60.0, 51.50, -0.10), wind_project_row("Remote", 900.0, 60.5, -1.5)];

        let comparisons = compare_scoring_systems(&cache, rows, None, Some("hyperscaler"), "renewable_projects").await.unwrap();

        assert_eq!(comparisons.len(), 2);
        for comparison in &comparisons {
            assert!(comparison.topsis_closeness >= 0.0 && comparison.topsis_closeness <= 1.0);
        }
    }
}

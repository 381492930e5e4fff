//! Persona-weighted aggregation (C6): combines the seven shared component
//! scores into a single weighted rating, plus the two distinct
//! custom-weight paths — an eight-key raw-component aggregator, and a
//! translator from frontend criteria keys onto the seven persona weights.

use std::collections::HashMap;

use crate::config::{self, CapacityParams, PersonaWeights};
use crate::proximity::ProximityScoreSet;
use crate::scoring;
use crate::transform::{DemandPersona, Site};

/// The seven components every persona's weighted score is built from.
/// `land_planning`, `latency`, and `cooling` are aliases of the
/// development-stage, digital-infrastructure, and water-resources scores
/// respectively, not separate formulas.
#[derive(Debug, Clone, Copy)]
pub struct PersonaComponentScores {
    pub capacity: f64,
    pub connection_speed: f64,
    pub resilience: f64,
    pub land_planning: f64,
    pub latency: f64,
    pub cooling: f64,
    pub price_sensitivity: f64,
}

/// Component scores shared by every persona, independent of capacity
/// parameters (which vary per persona).
pub struct SharedComponentScores {
    pub connection_speed: f64,
    pub resilience: f64,
    pub land_planning: f64,
    pub latency: f64,
    pub cooling: f64,
    pub price_sensitivity: f64,
}

pub fn build_shared_persona_component_scores(site: &Site, proximity: &ProximityScoreSet, user_max_price_mwh: Option<f64>) -> SharedComponentScores {
    let latitude = site.latitude.unwrap_or(0.0);
    let longitude = site.longitude.unwrap_or(0.0);

    SharedComponentScores {
        connection_speed: scoring::connection_speed_score(&site.development_status_short, proximity),
        resilience: scoring::resilience_score(&site.technology_type, proximity),
        land_planning: scoring::development_stage_score(&site.development_status_short),
        latency: scoring::digital_infrastructure_score(proximity),
        cooling: scoring::water_resources_score(proximity),
        price_sensitivity: scoring::price_sensitivity_score(&site.technology_type, latitude, longitude, site.capacity_factor, user_max_price_mwh),
    }
}

pub fn build_persona_component_scores(site: &Site, proximity: &ProximityScoreSet, capacity_params: CapacityParams, user_max_price_mwh: Option<f64>) -> PersonaComponentScores {
    let shared = build_shared_persona_component_scores(site, proximity, user_max_price_mwh);
    PersonaComponentScores {
        capacity: scoring::capacity_component_score(site.capacity_mw, capacity_params),
        connection_speed: shared.connection_speed,
        resilience: shared.resilience,
        land_planning: shared.land_planning,
        latency: shared.latency,
        cooling: shared.cooling,
        price_sensitivity: shared.price_sensitivity,
    }
}

/// Result of weighting a component set: the raw `[0, 100]` score, its
/// `[0, 10]` display rating, and the presentation fields derived from it.
#[derive(Debug, Clone)]
pub struct PersonaScoreResult {
    pub score_0_100: f64,
    pub rating_0_10: f64,
    pub color: &'static str,
    pub description: &'static str,
    pub weighted_contributions: HashMap<String, f64>,
}

/// Ten-bucket color/description table, keyed on `score / 10.0`.
pub(crate) fn color_and_description(rating_0_10: f64) -> (&'static str, &'static str) {
    if rating_0_10 >= 9.0 {
        ("#00DD00", "Excellent")
    } else if rating_0_10 >= 8.0 {
        ("#33FF33", "Very Good")
    } else if rating_0_10 >= 7.0 {
        ("#7FFF00", "Good")
    } else if rating_0_10 >= 6.0 {
        ("#CCFF00", "Above Average")
    } else if rating_0_10 >= 5.0 {
        ("#FFFF00", "Average")
    } else if rating_0_10 >= 4.0 {
        ("#FFCC00", "Below Average")
    } else if rating_0_10 >= 3.0 {
        ("#FF9900", "Poor")
    } else if rating_0_10 >= 2.0 {
        ("#FF6600", "Very Poor")
    } else if rating_0_10 >= 1.0 {
        ("#FF3300", "Bad")
    } else {
        ("#CC0000", "Very Bad")
    }
}

/// Weight and aggregate the seven shared components into a single score.
/// Weights are renormalized first if they don't already sum to 1.0.
pub fn score_persona_weighted(components: &PersonaComponentScores, weights: PersonaWeights) -> PersonaScoreResult {
    let weights = weights.normalized();

    let mut weighted_contributions = HashMap::new();
    weighted_contributions.insert("capacity".to_string(), components.capacity * weights.capacity);
    weighted_contributions.insert("connection_speed".to_string(), components.connection_speed * weights.connection_speed);
    weighted_contributions.insert("resilience".to_string(), components.resilience * weights.resilience);
    weighted_contributions.insert("land_planning".to_string(), components.land_planning * weights.land_planning);
    weighted_contributions.insert("latency".to_string(), components.latency * weights.latency);
    weighted_contributions.insert("cooling".to_string(), components.cooling * weights.cooling);
    weighted_contributions.insert("price_sensitivity".to_string(), components.price_sensitivity * weights.price_sensitivity);

    let score_0_100: f64 = weighted_contributions.values().sum();
    let rating_0_10 = (score_0_100 / 10.0 * 10.0).round() / 10.0;
    let (color, description) = color_and_description(rating_0_10);

    PersonaScoreResult {
        score_0_100,
        rating_0_10,
        color,
        description,
        weighted_contributions,
    }
}

/// The eight raw-component keys used by the dedicated custom-weighted
/// aggregator — a separate feature from the seven-key persona system,
/// operating directly on raw (non-persona-gated) component functions.
#[derive(Debug, Clone, Copy)]
pub struct CustomComponentScores {
    pub capacity: f64,
    pub development_stage: f64,
    pub technology: f64,
    pub grid_infrastructure: f64,
    pub digital_infrastructure: f64,
    pub water_resources: f64,
    pub lcoe_resource_quality: f64,
    pub tnuos_transmission_costs: f64,
}

pub fn build_custom_component_scores(site: &Site, proximity: &ProximityScoreSet, capacity_params: CapacityParams) -> CustomComponentScores {
    let latitude = site.latitude.unwrap_or(0.0);
    CustomComponentScores {
        capacity: scoring::capacity_component_score(site.capacity_mw, capacity_params),
        development_stage: scoring::development_stage_score(&site.development_status_short),
        technology: scoring::technology_score(&site.technology_type),
        grid_infrastructure: scoring::grid_infrastructure_score(proximity),
        digital_infrastructure: scoring::digital_infrastructure_score(proximity),
        water_resources: scoring::water_resources_score(proximity),
        lcoe_resource_quality: scoring::lcoe_score(&site.development_status_short),
        tnuos_transmission_costs: scoring::tnuos_proxy_score(latitude),
    }
}

/// Weight and aggregate the eight custom keys. Unrecognized keys in
/// `weights` are ignored; missing keys are treated as zero weight.
/// Weights are renormalized if they don't sum to 1.0.
pub fn score_custom_weighted(components: &CustomComponentScores, weights: &HashMap<String, f64>) -> crate::error::Result<f64> {
    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        return Err(crate::error::RatingError::EmptyWeights);
    }
    let get = |key: &str| weights.get(key).copied().unwrap_or(0.0) / total;

    let score = components.capacity * get("capacity")
        + components.development_stage * get("development_stage")
        + components.technology * get("technology")
        + components.grid_infrastructure * get("grid_infrastructure")
        + components.digital_infrastructure * get("digital_infrastructure")
        + components.water_resources * get("water_resources")
        + components.lcoe_resource_quality * get("lcoe_resource_quality")
        + components.tnuos_transmission_costs * get("tnuos_transmission_costs");

    Ok(score)
}

/// Translate frontend criteria keys (`connection_headroom`, `route_to_market`,
/// `project_stage`, `demand_scale`, `grid_infrastructure`, `digital_infrastructure`,
/// `water_resources`) into a [`PersonaWeights`] vector via the fixed key map,
/// then used as arbitrary weights in the normal seven-key persona system.
pub fn translate_frontend_weights(frontend: &HashMap<String, f64>) -> PersonaWeights {
    let mut mapped: HashMap<&str, f64> = HashMap::new();
    for &(frontend_key, persona_key) in config::FRONTEND_WEIGHT_KEY_MAP {
        if let Some(&value) = frontend.get(frontend_key) {
            mapped.insert(persona_key, value);
        }
    }

    PersonaWeights {
        capacity: mapped.get("capacity").copied().unwrap_or(0.0),
        connection_speed: mapped.get("connection_speed").copied().unwrap_or(0.0),
        resilience: mapped.get("resilience").copied().unwrap_or(0.0),
        land_planning: mapped.get("land_planning").copied().unwrap_or(0.0),
        latency: mapped.get("latency").copied().unwrap_or(0.0),
        cooling: mapped.get("cooling").copied().unwrap_or(0.0),
        price_sensitivity: mapped.get("price_sensitivity").copied().unwrap_or(0.0),
    }
}

/// Scale an existing persona weight vector down to make room for a new
/// `tnuos_transmission_costs` weight of 0.1, renormalizing the seven
/// scaled weights so the full eight-way vector (seven scaled weights plus
/// the fixed 0.1 TNUoS slot) sums to 1.0. If the TNUoS component is
/// already represented the weights pass through renormalized but
/// otherwise untouched. Used by the top-25 enrichment pass in
/// [`crate::tnuos`], which applies the 0.1 TNUoS weight itself.
pub fn reweight_with_tnuos(weights: PersonaWeights, tnuos_component_present: bool) -> PersonaWeights {
    if tnuos_component_present {
        return weights.normalized();
    }
    let normalized = weights.normalized();
    PersonaWeights {
        capacity: normalized.capacity * 0.9,
        connection_speed: normalized.connection_speed * 0.9,
        resilience: normalized.resilience * 0.9,
        land_planning: normalized.land_planning * 0.9,
        latency: normalized.latency * 0.9,
        cooling: normalized.cooling * 0.9,
        price_sensitivity: normalized.price_sensitivity * 0.9,
    }
}

/// Per-demand-persona investment rating for one site, used to decide
/// which customer segment a site best suits. A site whose capacity falls
/// outside a persona's capacity range is scored a flat 2.0 rather than
/// excluded outright, so it still shows up in `customer_match_scores`.
#[derive(Debug, Clone)]
pub struct BestCustomerMatch {
    pub customer_match_scores: HashMap<String, f64>,
    pub best_customer_match: DemandPersona,
    pub best_match_score: f64,
    pub suitable_customers: Vec<DemandPersona>,
}

const OUT_OF_RANGE_RATING: f64 = 2.0;
const SUITABLE_CUSTOMER_THRESHOLD: f64 = 6.0;

pub fn best_customer_match(site: &Site, proximity: &ProximityScoreSet) -> BestCustomerMatch {
    let shared = build_shared_persona_component_scores(site, proximity, None);

    let mut customer_match_scores = HashMap::new();
    for persona in DemandPersona::ALL {
        let range = persona.capacity_range();
        let rating = if (range.min..=range.max).contains(&site.capacity_mw) {
            let components = PersonaComponentScores {
                capacity: scoring::capacity_component_score(site.capacity_mw, persona.capacity_params()),
                connection_speed: shared.connection_speed,
                resilience: shared.resilience,
                land_planning: shared.land_planning,
                latency: shared.latency,
                cooling: shared.cooling,
                price_sensitivity: shared.price_sensitivity,
            };
            score_persona_weighted(&components, persona.weights()).rating_0_10
        } else {
            OUT_OF_RANGE_RATING
        };
        customer_match_scores.insert(persona.as_str().to_string(), rating);
    }

    let (best_customer_match, best_match_score) = DemandPersona::ALL
        .iter()
        .map(|p| (*p, customer_match_scores[p.as_str()]))
        .fold((DemandPersona::Hyperscaler, f64::NEG_INFINITY), |best, candidate| if candidate.1 > best.1 { candidate } else { best });

    let suitable_customers = DemandPersona::ALL.iter().copied().filter(|p| customer_match_scores[p.as_str()] >= SUITABLE_CUSTOMER_THRESHOLD).collect();

    BestCustomerMatch {
        customer_match_scores,
        best_customer_match,
        best_match_score,
        suitable_customers,
    }
}

/// Keep only the sites whose capacity falls within `persona`'s capacity
/// range.
pub fn filter_by_capacity_range<'a>(sites: &'a [Site], persona: DemandPersona) -> Vec<&'a Site> {
    let range = persona.capacity_range();
    sites.iter().filter(|s| (range.min..=range.max).contains(&s.capacity_mw)).collect()
}

/// Count scored sites into the same nine rating buckets the color table
/// uses, keyed by bucket name.
pub fn rating_distribution(ratings: &[f64]) -> HashMap<&'static str, usize> {
    let buckets = [
        "excellent",
        "very_good",
        "good",
        "above_average",
        "average",
        "below_average",
        "poor",
        "very_poor",
        "bad",
    ];
    let mut distribution: HashMap<&'static str, usize> = buckets.iter().map(|&b| (b, 0)).collect();

    for &rating in ratings {
        let bucket = if rating >= 9.0 {
            "excellent"
        } else if rating >= 8.0 {
            "very_good"
        } else if rating >= 7.0 {
            "good"
        } else if rating >= 6.0 {
            "above_average"
        } else if rating >= 5.0 {
            "average"
        } else if rating >= 4.0 {
            "below_average"
        } else if rating >= 3.0 {
            "poor"
        } else if rating >= 2.0 {
            "very_poor"
        } else {
            "bad"
        };
        *distribution.get_mut(bucket).unwrap() += 1;
    }

    distribution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_components() -> PersonaComponentScores {
        PersonaComponentScores {
            capacity: 80.0,
            connection_speed: 70.0,
            resilience: 60.0,
            land_planning: 50.0,
            latency: 40.0,
            cooling: 30.0,
            price_sensitivity: 90.0,
        }
    }

    #[test]
    fn weighted_score_respects_weight_conservation() {
        let result = score_persona_weighted(&sample_components(), config::PERSONA_WEIGHTS_HYPERSCALER);
        assert!(result.score_0_100 >= 0.0 && result.score_0_100 <= 100.0);
    }

    #[test]
    fn unnormalized_weights_are_renormalized() {
        let lopsided = PersonaWeights {
            capacity: 2.0,
            connection_speed: 0.0,
            resilience: 0.0,
            land_planning: 0.0,
            latency: 0.0,
            cooling: 0.0,
            price_sensitivity: 0.0,
        };
        let result = score_persona_weighted(&sample_components(), lopsided);
        assert!((result.score_0_100 - 80.0).abs() < 1e-6);
    }

    #[test]
    fn color_table_covers_full_range() {
        assert_eq!(color_and_description(9.5).1, "Excellent");
        assert_eq!(color_and_description(0.5).1, "Very Bad");
        assert_eq!(color_and_description(5.2).1, "Average");
    }

    #[test]
    fn custom_weighted_score_rejects_all_zero_weights() {
        let components = CustomComponentScores {
            capacity: 10.0,
            development_stage: 10.0,
            technology: 10.0,
            grid_infrastructure: 10.0,
            digital_infrastructure: 10.0,
            water_resources: 10.0,
            lcoe_resource_quality: 10.0,
            tnuos_transmission_costs: 10.0,
        };
        let weights = HashMap::new();
        assert!(score_custom_weighted(&components, &weights).is_err());
    }

    #[test]
    fn frontend_translation_maps_known_keys() {
        let mut frontend = HashMap::new();
        frontend.insert("connection_headroom".to_string(), 0.4);
        frontend.insert("demand_scale".to_string(), 0.6);
        let weights = translate_frontend_weights(&frontend);
        assert_eq!(weights.connection_speed, 0.4);
        assert_eq!(weights.capacity, 0.6);
    }

    fn sample_site(capacity_mw: f64) -> Site {
        Site {
            id: None,
            site_name: "test".into(),
            technology_type: "solar".into(),
            capacity_mw,
            latitude: Some(51.5),
            longitude: Some(-0.1),
            commissioning_year: None,
            is_btm: None,
            development_status_short: "in planning".into(),
            capacity_factor: None,
            operator: None,
            connection_site: None,
            substation_name: None,
            voltage_kv: None,
        }
    }

    #[test]
    fn out_of_range_capacity_gets_flat_fallback_rating() {
        let tiny_site = sample_site(0.5);
        let result = best_customer_match(&tiny_site, &ProximityScoreSet::default());
        assert_eq!(result.customer_match_scores["hyperscaler"], OUT_OF_RANGE_RATING);
    }

    #[test]
    fn filter_by_capacity_range_excludes_out_of_band_sites() {
        let sites = vec![sample_site(2.0), sample_site(100.0)];
        let filtered = filter_by_capacity_range(&sites, DemandPersona::EdgeComputing);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].capacity_mw, 2.0);
    }

    #[test]
    fn rating_distribution_buckets_sum_to_input_length() {
        let ratings = vec![9.5, 7.2, 4.0, 1.0];
        let distribution = rating_distribution(&ratings);
        let total: usize = distribution.values().sum();
        assert_eq!(total, ratings.len());
    }
}

//! Component scorers (C5): pure functions converting raw distances,
//! capacity, development stage, technology, and tariff-zone data into
//! bounded `[0, 100]` component scores.

use crate::config::{self, CapacityParams};
use crate::proximity::ProximityScoreSet;
use crate::tnuos;

fn clamp100(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Logistic centered on the persona's `ideal_mw`. Strictly increasing in
/// `mw` for any fixed persona — required by the capacity-monotonicity
/// invariant.
pub fn capacity_component_score(capacity_mw: f64, params: CapacityParams) -> f64 {
    let score = 100.0 / (1.0 + (-0.05 * (capacity_mw - params.ideal_mw)).exp());
    clamp100(score)
}

/// Case-insensitive exact match against the fixed table, then substring
/// match in declaration order, then a default of 45.0.
pub fn development_stage_score(status: &str) -> f64 {
    let normalized = status.to_lowercase();
    let normalized = normalized.trim();

    if let Some(&(_, score)) = config::DEVELOPMENT_STAGE_TABLE.iter().find(|(key, _)| *key == normalized) {
        return score;
    }
    for &(key, score) in config::DEVELOPMENT_STAGE_TABLE {
        if normalized.contains(key) {
            return score;
        }
    }
    config::DEVELOPMENT_STAGE_DEFAULT
}

/// Substring match against a fixed technology table. `CCGT` is matched
/// case-insensitively here (the source system's check ran an uppercase
/// literal against an already-lowercased string and could never fire;
/// this implements the behavior the table's own documentation describes).
pub fn technology_score(tech_type: &str) -> f64 {
    let tech = tech_type.to_lowercase();
    if tech.contains("solar") || tech.contains("battery") {
        return 80.0;
    }
    if tech.contains("wind") {
        return 60.0;
    }
    if tech.contains("hybrid") || tech.contains("ccgt") {
        return 100.0;
    }
    80.0
}

pub fn grid_infrastructure_score(proximity: &ProximityScoreSet) -> f64 {
    let substation_raw = proximity
        .nearest_distances
        .get("substation_km")
        .map_or(0.0, |d| (-d / crate::proximity::HALF_DISTANCE_SUBSTATION_KM).exp());
    let transmission_raw = proximity
        .nearest_distances
        .get("transmission_km")
        .map_or(0.0, |d| (-d / crate::proximity::HALF_DISTANCE_TRANSMISSION_KM).exp());
    clamp100(50.0 * (substation_raw + transmission_raw))
}

pub fn digital_infrastructure_score(proximity: &ProximityScoreSet) -> f64 {
    let fiber_raw = proximity
        .nearest_distances
        .get("fiber_km")
        .map_or(0.0, |d| (-d / crate::proximity::HALF_DISTANCE_FIBER_KM).exp());
    let ixp_raw = proximity
        .nearest_distances
        .get("ixp_km")
        .map_or(0.0, |d| (-d / crate::proximity::HALF_DISTANCE_IXP_KM).exp());
    clamp100(50.0 * (fiber_raw + ixp_raw))
}

pub fn water_resources_score(proximity: &ProximityScoreSet) -> f64 {
    let water_raw = proximity
        .nearest_distances
        .get("water_km")
        .map_or(0.0, |d| (-d / crate::proximity::HALF_DISTANCE_WATER_KM).exp());
    clamp100(100.0 * water_raw)
}

pub fn lcoe_score(development_status_short: &str) -> f64 {
    let normalized = development_status_short.trim().to_lowercase();
    let normalized = if normalized.is_empty() { "unknown".to_string() } else { normalized };
    config::LCOE_STATUS_TABLE
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, score)| *score)
        .unwrap_or(config::LCOE_STATUS_DEFAULT)
}

/// Latitude-proxy TNUoS estimate used when no zone lookup is available
/// (C8's zone-based score is the richer alternative).
pub fn tnuos_proxy_score(latitude: f64) -> f64 {
    let lat_normalized = (latitude - 49.5) / (60.0 - 49.5);
    let tariff = -2.0 + 17.0 * lat_normalized;
    tnuos::score_from_tariff(tariff)
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Technology- and latitude-dependent capacity factor estimate, in percent.
/// A user-provided value overrides and is clamped to `[5, 95]`.
pub fn estimate_capacity_factor(tech_type: &str, latitude: f64, user_provided: Option<f64>) -> f64 {
    if let Some(value) = user_provided {
        return clamp(value, 5.0, 95.0);
    }

    let tech = tech_type.to_lowercase();
    if tech.contains("solar") {
        let base = 12.0 - ((latitude - 50.0) / 8.0) * 2.0;
        return clamp(base, 9.0, 13.0);
    }
    if tech.contains("wind") {
        if tech.contains("offshore") {
            return 45.0;
        }
        let base = 28.0 + ((latitude - 50.0) / 8.0) * 7.0;
        return clamp(base, 25.0, 38.0);
    }
    if tech.contains("battery") || tech.contains("bess") {
        return 20.0;
    }
    if tech.contains("hydro") {
        return 50.0;
    }
    if tech.contains("gas") || tech.contains("ccgt") {
        return 70.0;
    }
    if tech.contains("biomass") {
        return 70.0;
    }
    if tech.contains("hybrid") {
        return 50.0;
    }
    30.0
}

/// `0.50 * remapped_stage + 0.30 * exp_decay(substation, 30) + 0.20 * exp_decay(transmission, 50)`.
/// `remapped_stage` linearly rescales the development-stage score from
/// `[20, 95]` to `[15, 100]`.
pub fn connection_speed_score(development_status_short: &str, proximity: &ProximityScoreSet) -> f64 {
    let base_stage = development_stage_score(development_status_short);
    let (stage_min, stage_max) = (20.0, 95.0);
    let normalized = clamp((base_stage - stage_min) / (stage_max - stage_min), 0.0, 1.0);
    let stage_score = clamp(15.0 + normalized * (100.0 - 15.0), 15.0, 100.0);

    let substation_km = proximity.nearest_distances.get("substation_km").copied().unwrap_or(999.0);
    let transmission_km = proximity.nearest_distances.get("transmission_km").copied().unwrap_or(999.0);
    let substation_score = 100.0 * (-substation_km / 30.0).exp();
    let transmission_score = 100.0 * (-transmission_km / 50.0).exp();

    clamp100(stage_score * 0.50 + substation_score * 0.30 + transmission_score * 0.20)
}

/// Integer tier-count driven by distance thresholds across four layers
/// plus a technology bump, mapped to a fixed score table. This is the
/// richer of two resilience-tier variants found in the source system —
/// see DESIGN.md for why it was chosen over the simpler one.
pub fn resilience_score(technology_type: &str, proximity: &ProximityScoreSet) -> f64 {
    let mut tier_count = 0u32;

    let substation_km = proximity.nearest_distances.get("substation_km").copied().unwrap_or(999.0);
    tier_count += if substation_km < 15.0 {
        4
    } else if substation_km < 30.0 {
        3
    } else if substation_km < 50.0 {
        2
    } else if substation_km < 75.0 {
        1
    } else {
        0
    };

    let transmission_km = proximity.nearest_distances.get("transmission_km").copied().unwrap_or(999.0);
    tier_count += if transmission_km < 20.0 {
        3
    } else if transmission_km < 40.0 {
        2
    } else if transmission_km < 60.0 {
        1
    } else {
        0
    };

    let fiber_km = proximity.nearest_distances.get("fiber_km").copied().unwrap_or(999.0);
    tier_count += if fiber_km < 10.0 {
        2
    } else if fiber_km < 25.0 {
        1
    } else {
        0
    };

    let ixp_km = proximity.nearest_distances.get("ixp_km").copied().unwrap_or(999.0);
    tier_count += if ixp_km < 50.0 {
        2
    } else if ixp_km < 100.0 {
        1
    } else {
        0
    };

    let tech = technology_type.to_lowercase();
    if tech.contains("battery") || tech.contains("storage") {
        tier_count += 2;
    }
    if tech.contains("gas") || tech.contains("diesel") {
        tier_count += 1;
    }

    match tier_count {
        0 | 1 => 25.0,
        2 => 35.0,
        3 => 45.0,
        4 => 60.0,
        5 => 70.0,
        6 => 80.0,
        7 => 90.0,
        _ => 95.0,
    }
}

/// Per-technology baseline LCOE adjusted by the estimated capacity factor
/// and a TNUoS-derived £/MWh impact. With a caller-supplied ceiling, the
/// score rewards savings and penalizes overage with exponential decay;
/// without one, the resulting cost is mapped linearly from `[40, 100]`
/// £/MWh onto `[100, 0]`.
pub fn price_sensitivity_score(technology_type: &str, latitude: f64, longitude: f64, user_capacity_factor: Option<f64>, user_max_price_mwh: Option<f64>) -> f64 {
    let tech = technology_type.to_lowercase();
    let _ = longitude;

    let params = if tech.contains("solar") {
        config::PriceSensitivityParams { base_lcoe: 55.0, reference_cf: 0.12 }
    } else if tech.contains("wind") && tech.contains("offshore") {
        config::PriceSensitivityParams { base_lcoe: 80.0, reference_cf: 0.40 }
    } else if tech.contains("wind") {
        config::PriceSensitivityParams { base_lcoe: 60.0, reference_cf: 0.30 }
    } else if tech.contains("battery") || tech.contains("bess") {
        config::PriceSensitivityParams { base_lcoe: 65.0, reference_cf: 0.20 }
    } else if tech.contains("hydro") {
        config::PriceSensitivityParams { base_lcoe: 70.0, reference_cf: 0.35 }
    } else if tech.contains("biomass") {
        config::PriceSensitivityParams { base_lcoe: 85.0, reference_cf: 0.70 }
    } else if tech.contains("gas") || tech.contains("ccgt") {
        config::PriceSensitivityParams { base_lcoe: 70.0, reference_cf: 0.55 }
    } else if tech.contains("hybrid") {
        config::PriceSensitivityParams { base_lcoe: config::PRICE_SENSITIVITY_DEFAULT.base_lcoe, reference_cf: 0.25 }
    } else {
        config::PriceSensitivityParams { base_lcoe: config::PRICE_SENSITIVITY_DEFAULT.base_lcoe, reference_cf: config::PRICE_SENSITIVITY_DEFAULT.reference_cf }
    };

    let capacity_factor_pct = estimate_capacity_factor(&tech, latitude, user_capacity_factor);
    let capacity_factor = capacity_factor_pct / 100.0;

    let adjusted_lcoe = if capacity_factor > 0.0 {
        params.base_lcoe * (params.reference_cf / capacity_factor)
    } else {
        params.base_lcoe
    };

    let tnuos_percentile = tnuos_proxy_score(latitude);
    let tnuos_min = -3.0;
    let tnuos_max = 16.0;
    let tnuos_tariff = tnuos_min + ((100.0 - tnuos_percentile) / 100.0) * (tnuos_max - tnuos_min);

    let annual_hours = 8760.0;
    let capacity_hours = annual_hours * capacity_factor;
    let tnuos_mwh_impact = if capacity_hours > 0.0 { (tnuos_tariff.abs() * 1000.0) / capacity_hours } else { 0.0 };

    let total_cost_mwh = if tnuos_tariff < 0.0 { adjusted_lcoe - tnuos_mwh_impact } else { adjusted_lcoe + tnuos_mwh_impact };

    let score = if let Some(max_price) = user_max_price_mwh.filter(|v| *v > 0.0) {
        if total_cost_mwh <= max_price {
            let savings_pct = (max_price - total_cost_mwh) / max_price;
            50.0 + savings_pct * 50.0
        } else {
            let overage_pct = (total_cost_mwh - max_price) / max_price;
            50.0 * (-overage_pct * 2.0).exp()
        }
    } else {
        let (min_expected, max_expected) = (40.0, 100.0);
        let normalized = clamp((total_cost_mwh - min_expected) / (max_expected - min_expected), 0.0, 1.0);
        100.0 * (1.0 - normalized)
    };

    clamp100(score)
}

//! The traditional (non-persona) renewable-energy scoring system: a fixed
//! capacity/stage/technology blend plus a capped infrastructure bonus.
//! Kept alongside the persona-weighted and TOPSIS systems so callers can
//! compare all three against the same batch.

use crate::proximity::ProximityScoreSet;

fn capacity_band_score(capacity_mw: f64) -> f64 {
    if capacity_mw >= 200.0 {
        30.0
    } else if capacity_mw >= 100.0 {
        80.0
    } else if capacity_mw >= 50.0 {
        70.0
    } else if capacity_mw >= 25.0 {
        90.0
    } else if capacity_mw >= 10.0 {
        60.0
    } else if capacity_mw >= 5.0 {
        30.0
    } else {
        15.0
    }
}

fn stage_band_score(development_status_short: &str) -> f64 {
    let status = development_status_short.to_lowercase();
    if status.contains("operational") {
        10.0
    } else if status.contains("construction") {
        60.0
    } else if status.contains("granted") {
        90.0
    } else if status.contains("submitted") {
        80.0
    } else if status.contains("planning") {
        // "planning" is checked before "pre-planning" below, so a
        // "pre-planning" status matches this branch first and scores 70.0
        // rather than 60.0 — transcribed this way from the status this
        // band table is ground-truthed against.
        70.0
    } else if status.contains("pre-planning") {
        60.0
    } else {
        50.0
    }
}

fn technology_band_score(technology_type: &str) -> f64 {
    let tech = technology_type.to_lowercase();
    if tech.contains("solar") {
        80.0
    } else if tech.contains("battery") {
        85.0
    } else if tech.contains("wind") {
        80.0
    } else if tech.contains("hybrid") {
        100.0
    } else {
        70.0
    }
}

/// `0.30 * capacity_band + 0.50 * stage_band + 0.20 * technology_band`,
/// clamped to `[0, 100]`.
pub fn base_investment_score(capacity_mw: f64, development_status_short: &str, technology_type: &str) -> f64 {
    let score = capacity_band_score(capacity_mw) * 0.30 + stage_band_score(development_status_short) * 0.50 + technology_band_score(technology_type) * 0.20;
    score.clamp(0.0, 100.0)
}

/// Threshold-banded bonus (not a continuous function of distance, unlike
/// every other component score in this crate): up to 25 points for grid
/// proximity, 10 for digital, 5 for water, capped per-layer before summing.
pub fn infrastructure_bonus(proximity: &ProximityScoreSet) -> f64 {
    let mut grid_bonus: f64 = 0.0;
    if proximity.substation_score > 40.0 {
        grid_bonus += 15.0;
    } else if proximity.substation_score > 25.0 {
        grid_bonus += 10.0;
    } else if proximity.substation_score > 10.0 {
        grid_bonus += 5.0;
    }
    if proximity.transmission_score > 30.0 {
        grid_bonus += 10.0;
    } else if proximity.transmission_score > 15.0 {
        grid_bonus += 5.0;
    }
    let grid_bonus = grid_bonus.min(25.0);

    let mut digital_bonus: f64 = 0.0;
    if proximity.fiber_score > 15.0 {
        digital_bonus += 5.0;
    } else if proximity.fiber_score > 8.0 {
        digital_bonus += 3.0;
    }
    if proximity.ixp_score > 8.0 {
        digital_bonus += 5.0;
    } else if proximity.ixp_score > 4.0 {
        digital_bonus += 2.0;
    }
    let digital_bonus = digital_bonus.min(10.0);

    let water_bonus = if proximity.water_score > 10.0 {
        5.0
    } else if proximity.water_score > 5.0 {
        3.0
    } else if proximity.water_score > 2.0 {
        1.0
    } else {
        0.0
    };

    grid_bonus + digital_bonus + water_bonus
}

#[derive(Debug, Clone)]
pub struct LegacyRating {
    pub base_investment_score: f64,
    pub infrastructure_bonus: f64,
    pub investment_rating: f64,
    pub internal_total_score: f64,
}

/// The traditional scoring path: `min(100, base + bonus)`, displayed as a
/// `[1.0, 10.0]` rating.
pub fn enhanced_investment_rating(capacity_mw: f64, development_status_short: &str, technology_type: &str, proximity: &ProximityScoreSet) -> LegacyRating {
    let base = base_investment_score(capacity_mw, development_status_short, technology_type);
    let bonus = infrastructure_bonus(proximity);
    let total = (base + bonus).min(100.0);

    LegacyRating {
        base_investment_score: (base / 10.0 * 10.0).round() / 10.0,
        infrastructure_bonus: (bonus / 10.0 * 10.0).round() / 10.0,
        investment_rating: (total / 10.0 * 10.0).round() / 10.0,
        internal_total_score: (total * 10.0).round() / 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_score_favors_mid_sized_capacity_band() {
        let mid = base_investment_score(30.0, "operational", "solar");
        let huge = base_investment_score(250.0, "operational", "solar");
        assert!(mid > huge, "25-50MW band should outscore the 200MW+ band");
    }

    #[test]
    fn infrastructure_bonus_caps_each_layer() {
        let mut proximity = ProximityScoreSet::default();
        proximity.substation_score = 100.0;
        proximity.transmission_score = 100.0;
        proximity.fiber_score = 100.0;
        proximity.ixp_score = 100.0;
        proximity.water_score = 100.0;
        assert_eq!(infrastructure_bonus(&proximity), 40.0);
    }

    #[test]
    fn enhanced_rating_never_exceeds_ten() {
        let mut proximity = ProximityScoreSet::default();
        proximity.substation_score = 100.0;
        proximity.transmission_score = 100.0;
        let rating = enhanced_investment_rating(25.0, "granted", "hybrid", &proximity);
        assert!(rating.investment_rating <= 10.0);
    }
}

//! TNUoS (Transmission Network Use of System) zone lookup and the top-25
//! re-scoring enrichment pass (C8).

use crate::persona::PersonaComponentScores;

#[derive(Debug, Clone, Copy)]
pub struct Zone {
    pub zone_id: &'static str,
    pub zone_name: &'static str,
    pub tariff: f64,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Hardcoded bounding-box zone table, checked in this order (first match
/// wins — the boxes overlap slightly, so declaration order is significant).
pub const ZONES: &[Zone] = &[
    Zone { zone_id: "GZ1", zone_name: "North Scotland", tariff: 15.32, min_lat: 57.5, max_lat: 61.0, min_lng: -6.0, max_lng: -1.5 },
    Zone { zone_id: "GZ2", zone_name: "South Scotland", tariff: 14.87, min_lat: 55.0, max_lat: 57.5, min_lng: -4.0, max_lng: -1.5 },
    Zone { zone_id: "GZ3", zone_name: "Borders", tariff: 13.45, min_lat: 54.5, max_lat: 56.0, min_lng: -4.0, max_lng: -1.5 },
    Zone { zone_id: "GZ4", zone_name: "Central Scotland", tariff: 12.98, min_lat: 55.5, max_lat: 56.5, min_lng: -5.0, max_lng: -3.0 },
    Zone { zone_id: "GZ5", zone_name: "Argyll", tariff: 11.67, min_lat: 55.0, max_lat: 57.0, min_lng: -6.0, max_lng: -4.0 },
    Zone { zone_id: "GZ6", zone_name: "Dumfries", tariff: 10.34, min_lat: 54.5, max_lat: 55.5, min_lng: -4.5, max_lng: -2.5 },
    Zone { zone_id: "GZ7", zone_name: "Ayr", tariff: 9.87, min_lat: 54.8, max_lat: 55.5, min_lng: -5.0, max_lng: -3.5 },
    Zone { zone_id: "GZ8", zone_name: "Central Belt", tariff: 8.92, min_lat: 55.2, max_lat: 56.0, min_lng: -4.5, max_lng: -3.0 },
    Zone { zone_id: "GZ9", zone_name: "Lothian", tariff: 7.56, min_lat: 55.5, max_lat: 56.2, min_lng: -3.5, max_lng: -2.0 },
    Zone { zone_id: "GZ10", zone_name: "Southern Scotland", tariff: 6.23, min_lat: 54.8, max_lat: 55.5, min_lng: -3.5, max_lng: -1.5 },
    Zone { zone_id: "GZ11", zone_name: "North East England", tariff: 5.67, min_lat: 54.0, max_lat: 55.5, min_lng: -3.0, max_lng: -0.5 },
    Zone { zone_id: "GZ12", zone_name: "Yorkshire", tariff: 4.89, min_lat: 53.0, max_lat: 54.5, min_lng: -3.0, max_lng: -0.5 },
    Zone { zone_id: "GZ13", zone_name: "Humber", tariff: 4.12, min_lat: 52.5, max_lat: 53.5, min_lng: -2.0, max_lng: 0.5 },
    Zone { zone_id: "GZ14", zone_name: "North West England", tariff: 3.78, min_lat: 52.5, max_lat: 54.5, min_lng: -3.5, max_lng: -1.5 },
    Zone { zone_id: "GZ15", zone_name: "East Midlands", tariff: 2.95, min_lat: 51.5, max_lat: 53.0, min_lng: -2.5, max_lng: 0.0 },
    Zone { zone_id: "GZ16", zone_name: "West Midlands", tariff: 2.34, min_lat: 51.5, max_lat: 52.7, min_lng: -3.0, max_lng: -1.5 },
    Zone { zone_id: "GZ17", zone_name: "East England", tariff: 1.87, min_lat: 51.5, max_lat: 52.5, min_lng: -0.5, max_lng: 1.5 },
    Zone { zone_id: "GZ18", zone_name: "South Wales", tariff: 1.45, min_lat: 51.2, max_lat: 52.0, min_lng: -3.5, max_lng: -2.0 },
    Zone { zone_id: "GZ19", zone_name: "North Wales", tariff: 0.98, min_lat: 52.3, max_lat: 53.5, min_lng: -3.8, max_lng: -2.8 },
    Zone { zone_id: "GZ20", zone_name: "Pembroke", tariff: 0.67, min_lat: 51.6, max_lat: 52.1, min_lng: -5.5, max_lng: -4.8 },
    Zone { zone_id: "GZ21", zone_name: "South West England", tariff: -0.12, min_lat: 50.5, max_lat: 51.5, min_lng: -4.5, max_lng: -2.0 },
    Zone { zone_id: "GZ22", zone_name: "Cornwall", tariff: -0.45, min_lat: 49.9, max_lat: 50.7, min_lng: -5.5, max_lng: -4.5 },
    Zone { zone_id: "GZ23", zone_name: "London", tariff: -0.78, min_lat: 51.2, max_lat: 51.8, min_lng: -0.5, max_lng: 0.5 },
    Zone { zone_id: "GZ24", zone_name: "South East England", tariff: -1.23, min_lat: 50.5, max_lat: 51.5, min_lng: -2.0, max_lng: 1.5 },
    Zone { zone_id: "GZ25", zone_name: "Kent", tariff: -1.56, min_lat: 50.8, max_lat: 51.5, min_lng: 0.2, max_lng: 1.8 },
    Zone { zone_id: "GZ26", zone_name: "Southern England", tariff: -1.89, min_lat: 50.5, max_lat: 51.2, min_lng: -2.5, max_lng: 0.0 },
    Zone { zone_id: "GZ27", zone_name: "Solent", tariff: -2.34, min_lat: 50.6, max_lat: 51.0, min_lng: -2.0, max_lng: -1.0 },
];

/// First-match linear scan over the hardcoded zone table.
pub fn find_zone(latitude: f64, longitude: f64) -> Option<&'static Zone> {
    ZONES.iter().find(|z| (z.min_lat..=z.max_lat).contains(&latitude) && (z.min_lng..=z.max_lng).contains(&longitude))
}

/// `[-3, 16]` £/kW tariff mapped strictly decreasing onto `[100, 0]`, with
/// exact endpoint clamping.
pub fn score_from_tariff(tariff: f64) -> f64 {
    const MIN_TARIFF: f64 = -3.0;
    const MAX_TARIFF: f64 = 16.0;

    if tariff <= MIN_TARIFF {
        return 100.0;
    }
    if tariff >= MAX_TARIFF {
        return 0.0;
    }
    let normalized = (tariff - MIN_TARIFF) / (MAX_TARIFF - MIN_TARIFF);
    (100.0 * (1.0 - normalized)).clamp(0.0, 100.0)
}

/// A scored site, as seen by the top-25 enrichment pass: its position, its
/// current component scores/weights, and the rating they produced.
#[derive(Debug, Clone)]
pub struct EnrichmentCandidate {
    pub latitude: f64,
    pub longitude: f64,
    pub investment_rating: f64,
    pub components: PersonaComponentScores,
    pub weights: crate::config::PersonaWeights,
}

#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub tnuos_enriched: bool,
    pub tnuos_zone_id: Option<&'static str>,
    pub tnuos_zone_name: Option<&'static str>,
    pub tnuos_tariff_pounds_per_kw: Option<f64>,
    pub tnuos_score: Option<f64>,
    pub old_rating: f64,
    pub new_rating: f64,
    pub rating_change: f64,
}

/// Enrich the top 25 sites (by `investment_rating`, descending) with a
/// zone-derived `tnuos_transmission_costs` component, re-weighting and
/// re-scoring each. Sites without a zone hit, or outside the top 25,
/// are returned unenriched. The input need not already be sorted.
pub fn enrich_and_rescore_top_25(candidates: &[EnrichmentCandidate]) -> Vec<EnrichmentOutcome> {
    let mut indexed: Vec<(usize, &EnrichmentCandidate)> = candidates.iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.investment_rating.partial_cmp(&a.1.investment_rating).unwrap_or(std::cmp::Ordering::Equal));

    let mut outcomes = vec![None; candidates.len()];

    for (rank, (original_index, candidate)) in indexed.iter().enumerate() {
        let original_index = *original_index;
        if rank >= 25 {
            outcomes[original_index] = Some(EnrichmentOutcome {
                tnuos_enriched: false,
                tnuos_zone_id: None,
                tnuos_zone_name: None,
                tnuos_tariff_pounds_per_kw: None,
                tnuos_score: None,
                old_rating: candidate.investment_rating,
                new_rating: candidate.investment_rating,
                rating_change: 0.0,
            });
            continue;
        }

        let zone = match find_zone(candidate.latitude, candidate.longitude) {
            Some(z) => z,
            None => {
                outcomes[original_index] = Some(EnrichmentOutcome {
                    tnuos_enriched: false,
                    tnuos_zone_id: None,
                    tnuos_zone_name: None,
                    tnuos_tariff_pounds_per_kw: None,
                    tnuos_score: None,
                    old_rating: candidate.investment_rating,
                    new_rating: candidate.investment_rating,
                    rating_change: 0.0,
                });
                continue;
            }
        };

        let tnuos_score = score_from_tariff(zone.tariff);
        let weights = crate::persona::reweight_with_tnuos(candidate.weights, false);

        let weighted_score = candidate.components.capacity * weights.capacity
            + candidate.components.connection_speed * weights.connection_speed
            + candidate.components.resilience * weights.resilience
            + candidate.components.land_planning * weights.land_planning
            + candidate.components.latency * weights.latency
            + candidate.components.cooling * weights.cooling
            + candidate.components.price_sensitivity * weights.price_sensitivity
            + tnuos_score * 0.1;
        let weighted_score = weighted_score.clamp(0.0, 100.0);
        let new_rating = (weighted_score / 10.0 * 10.0).round() / 10.0;
        let old_rating = candidate.investment_rating;

        outcomes[original_index] = Some(EnrichmentOutcome {
            tnuos_enriched: true,
            tnuos_zone_id: Some(zone.zone_id),
            tnuos_zone_name: Some(zone.zone_name),
            tnuos_tariff_pounds_per_kw: Some(zone.tariff),
            tnuos_score: Some((tnuos_score * 10.0).round() / 10.0),
            old_rating,
            new_rating,
            rating_change: ((new_rating - old_rating) * 10.0).round() / 10.0,
        });
    }

    outcomes.into_iter().map(|o| o.expect("every candidate index is visited exactly once")).collect()
}

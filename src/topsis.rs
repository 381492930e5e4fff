//! TOPSIS (Technique for Order Preference by Similarity to Ideal Solution)
//! ranking (C7): an alternative to the linear-weighted persona score that
//! ranks sites by closeness to an ideal vector built from the batch itself.

use std::collections::HashMap;

/// One alternative's per-key weighted-normalized vector, retained for
/// callers that want to inspect the intermediate vectors rather than just
/// the final closeness coefficient.
#[derive(Debug, Clone)]
pub struct WeightedVector {
    pub normalized_scores: HashMap<String, f64>,
    pub weighted_normalized_scores: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct TopsisResult {
    pub closeness: Vec<f64>,
    pub ideal_solution: HashMap<String, f64>,
    pub anti_ideal_solution: HashMap<String, f64>,
    pub vectors: Vec<WeightedVector>,
}

/// Rank `component_scores` (one map per alternative, all sharing the same
/// keys) against `weights`. Each key is normalized by the Euclidean norm
/// of that key's column across every alternative (denominator floored at
/// `1e-9` to avoid division by zero on all-zero columns), then weighted.
/// The ideal/anti-ideal vectors are the per-key max/min of the *weighted
/// normalized* values, not the raw scores. Closeness is
/// `distance_to_anti_ideal / (distance_to_ideal + distance_to_anti_ideal)`,
/// or 0.0 when both distances are zero (a single alternative, or every
/// alternative identical).
pub fn calculate_persona_topsis_score(component_scores: &[HashMap<String, f64>], weights: &HashMap<String, f64>) -> TopsisResult {
    if component_scores.is_empty() {
        return TopsisResult {
            closeness: Vec::new(),
            ideal_solution: HashMap::new(),
            anti_ideal_solution: HashMap::new(),
            vectors: Vec::new(),
        };
    }

    let component_keys: Vec<String> = component_scores[0].keys().cloned().collect();

    let mut denominators: HashMap<String, f64> = HashMap::new();
    for key in &component_keys {
        let sum_squares: f64 = component_scores.iter().map(|scores| scores.get(key).copied().unwrap_or(0.0).powi(2)).sum();
        let denominator = sum_squares.sqrt();
        denominators.insert(key.clone(), if denominator == 0.0 { 1e-9 } else { denominator });
    }

    let mut vectors = Vec::with_capacity(component_scores.len());
    for scores in component_scores {
        let mut normalized = HashMap::new();
        let mut weighted = HashMap::new();
        for key in &component_keys {
            let raw_value = scores.get(key).copied().unwrap_or(0.0);
            let denominator = denominators[key];
            let normalized_value = if denominator != 0.0 { raw_value / denominator } else { 0.0 };
            let weight = weights.get(key).copied().unwrap_or(0.0);
            normalized.insert(key.clone(), normalized_value);
            weighted.insert(key.clone(), normalized_value * weight);
        }
        vectors.push(WeightedVector { normalized_scores: normalized, weighted_normalized_scores: weighted });
    }

    let mut ideal_solution = HashMap::new();
    let mut anti_ideal_solution = HashMap::new();
    for key in &component_keys {
        let values: Vec<f64> = vectors.iter().map(|v| v.weighted_normalized_scores[key]).collect();
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        ideal_solution.insert(key.clone(), max);
        anti_ideal_solution.insert(key.clone(), min);
    }

    let mut closeness = Vec::with_capacity(vectors.len());
    for vector in &vectors {
        let distance_to_ideal = component_keys
            .iter()
            .map(|key| (vector.weighted_normalized_scores[key] - ideal_solution[key]).powi(2))
            .sum::<f64>()
            .sqrt();
        let distance_to_anti_ideal = component_keys
            .iter()
            .map(|key| (vector.weighted_normalized_scores[key] - anti_ideal_solution[key]).powi(2))
            .sum::<f64>()
            .sqrt();
        let denominator = distance_to_ideal + distance_to_anti_ideal;
        closeness.push(if denominator != 0.0 { distance_to_anti_ideal / denominator } else { 0.0 });
    }

    TopsisResult { closeness, ideal_solution, anti_ideal_solution, vectors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(capacity: f64, resilience: f64) -> HashMap<String, f64> {
        let mut m = HashMap::new();
        m.insert("capacity".to_string(), capacity);
        m.insert("resilience".to_string(), resilience);
        m
    }

    fn equal_weights() -> HashMap<String, f64> {
        let mut w = HashMap::new();
        w.insert("capacity".to_string(), 0.5);
        w.insert("resilience".to_string(), 0.5);
        w
    }

    #[test]
    fn empty_input_returns_empty_result() {
        let result = calculate_persona_topsis_score(&[], &equal_weights());
        assert!(result.closeness.is_empty());
    }

    #[test]
    fn best_alternative_on_every_key_gets_closeness_one() {
        let batch = vec![scores(100.0, 100.0), scores(10.0, 10.0), scores(50.0, 50.0)];
        let result = calculate_persona_topsis_score(&batch, &equal_weights());
        assert!((result.closeness[0] - 1.0).abs() < 1e-9);
        assert!((result.closeness[1] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn identical_alternatives_get_zero_closeness() {
        let batch = vec![scores(42.0, 42.0), scores(42.0, 42.0)];
        let result = calculate_persona_topsis_score(&batch, &equal_weights());
        assert_eq!(result.closeness, vec![0.0, 0.0]);
    }

    #[test]
    fn single_alternative_is_both_ideal_and_anti_ideal() {
        let batch = vec![scores(30.0, 80.0)];
        let result = calculate_persona_topsis_score(&batch, &equal_weights());
        assert_eq!(result.closeness, vec![0.0]);
    }
}

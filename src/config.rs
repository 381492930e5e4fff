//! Centralized tunables: persona weight tables, capacity parameters, the
//! development-stage/technology/LCOE lookup tables, and environment-driven
//! configuration. Grouped in one module, per the source system's own
//! convention, so tests can override them without chasing constants across
//! the crate.

use std::env;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let ttl_seconds = env::var("INFRA_CACHE_TTL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECONDS);
        Self {
            cache_ttl: Duration::from_secs(ttl_seconds),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
        }
    }
}

/// `(min_mw, ideal_mw, max_mw)` per persona, used by the capacity logistic.
#[derive(Debug, Clone, Copy)]
pub struct CapacityParams {
    pub min_mw: f64,
    pub ideal_mw: f64,
    pub max_mw: f64,
}

pub const CAPACITY_PARAMS_EDGE_COMPUTING: CapacityParams = CapacityParams { min_mw: 0.4, ideal_mw: 2.0, max_mw: 5.0 };
pub const CAPACITY_PARAMS_COLOCATION: CapacityParams = CapacityParams { min_mw: 5.0, ideal_mw: 15.0, max_mw: 30.0 };
pub const CAPACITY_PARAMS_HYPERSCALER: CapacityParams = CapacityParams { min_mw: 30.0, ideal_mw: 75.0, max_mw: 200.0 };
/// Used when a persona string is unresolved. Spec-mandated fallback triple.
pub const CAPACITY_PARAMS_UNKNOWN: CapacityParams = CapacityParams { min_mw: 50.0, ideal_mw: 100.0, max_mw: 400.0 };

/// Demand-side persona capacity range gate, used to decide customer fit.
#[derive(Debug, Clone, Copy)]
pub struct CapacityRange {
    pub min: f64,
    pub max: f64,
}

pub const CAPACITY_RANGE_EDGE_COMPUTING: CapacityRange = CapacityRange { min: 0.4, max: 5.0 };
pub const CAPACITY_RANGE_COLOCATION: CapacityRange = CapacityRange { min: 5.0, max: 30.0 };
pub const CAPACITY_RANGE_HYPERSCALER: CapacityRange = CapacityRange { min: 30.0, max: 1000.0 };

/// Weight vector over the seven shared persona components.
#[derive(Debug, Clone, Copy)]
pub struct PersonaWeights {
    pub capacity: f64,
    pub connection_speed: f64,
    pub resilience: f64,
    pub land_planning: f64,
    pub latency: f64,
    pub cooling: f64,
    pub price_sensitivity: f64,
}

impl PersonaWeights {
    pub fn sum(&self) -> f64 {
        self.capacity + self.connection_speed + self.resilience + self.land_planning + self.latency + self.cooling + self.price_sensitivity
    }

    /// Renormalize so the seven weights sum to 1.0, if they don't already
    /// within tolerance.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if (total - 1.0).abs() <= 1e-6 || total == 0.0 {
            return *self;
        }
        Self {
            capacity: self.capacity / total,
            connection_speed: self.connection_speed / total,
            resilience: self.resilience / total,
            land_planning: self.land_planning / total,
            latency: self.latency / total,
            cooling: self.cooling / total,
            price_sensitivity: self.price_sensitivity / total,
        }
    }
}

pub const PERSONA_WEIGHTS_HYPERSCALER: PersonaWeights = PersonaWeights {
    capacity: 0.244,
    connection_speed: 0.167,
    resilience: 0.133,
    land_planning: 0.2,
    latency: 0.056,
    cooling: 0.144,
    price_sensitivity: 0.056,
};

pub const PERSONA_WEIGHTS_COLOCATION: PersonaWeights = PersonaWeights {
    capacity: 0.141,
    connection_speed: 0.163,
    resilience: 0.196,
    land_planning: 0.163,
    latency: 0.217,
    cooling: 0.087,
    price_sensitivity: 0.033,
};

pub const PERSONA_WEIGHTS_EDGE_COMPUTING: PersonaWeights = PersonaWeights {
    capacity: 0.097,
    connection_speed: 0.129,
    resilience: 0.108,
    land_planning: 0.28,
    latency: 0.247,
    cooling: 0.054,
    price_sensitivity: 0.086,
};

/// Supply-side ("power developer") persona weights, from the dedicated
/// constants module rather than the workflow-local copy that disagrees
/// with it on `greenfield.connection_speed` — see DESIGN.md.
pub const PERSONA_WEIGHTS_GREENFIELD: PersonaWeights = PersonaWeights {
    capacity: 0.15,
    connection_speed: 0.15,
    resilience: 0.10,
    land_planning: 0.25,
    latency: 0.03,
    cooling: 0.02,
    price_sensitivity: 0.20,
};

pub const PERSONA_WEIGHTS_REPOWER: PersonaWeights = PersonaWeights {
    capacity: 0.15,
    connection_speed: 0.20,
    resilience: 0.12,
    land_planning: 0.15,
    latency: 0.05,
    cooling: 0.03,
    price_sensitivity: 0.15,
};

pub const PERSONA_WEIGHTS_STRANDED: PersonaWeights = PersonaWeights {
    capacity: 0.05,
    connection_speed: 0.25,
    resilience: 0.10,
    land_planning: 0.05,
    latency: 0.05,
    cooling: 0.05,
    price_sensitivity: 0.25,
};

/// Development-stage score table, in declaration order: exact match first,
/// then substring match in this same order, then a default of 45.0.
pub const DEVELOPMENT_STAGE_TABLE: &[(&str, f64)] = &[
    ("decommissioned", 0.0),
    ("abandoned", 5.0),
    ("appeal withdrawn", 10.0),
    ("appeal refused", 15.0),
    ("under construction", 20.0),
    ("appeal lodged", 25.0),
    ("application refused", 30.0),
    ("application withdrawn", 35.0),
    ("awaiting construction", 40.0),
    ("no application made", 45.0),
    ("secretary of state granted", 80.0),
    ("planning expired", 70.0),
    ("no application required", 100.0),
    ("application submitted", 100.0),
    ("revised", 90.0),
    ("consented", 70.0),
    ("granted", 70.0),
    ("in planning", 55.0),
    ("operational", 10.0),
];

pub const DEVELOPMENT_STAGE_DEFAULT: f64 = 45.0;

/// LCOE proxy table keyed by development status.
pub const LCOE_STATUS_TABLE: &[(&str, f64)] = &[
    ("operational", 10.0),
    ("under construction", 50.0),
    ("consented", 85.0),
    ("in planning", 70.0),
    ("site identified", 50.0),
    ("concept", 30.0),
];

pub const LCOE_STATUS_DEFAULT: f64 = 50.0;

/// Per-technology `(base_lcoe_gbp_per_mwh, reference_capacity_factor)` used
/// by the price-sensitivity scorer.
pub struct PriceSensitivityParams {
    pub base_lcoe: f64,
    pub reference_cf: f64,
}

pub const PRICE_SENSITIVITY_DEFAULT: PriceSensitivityParams = PriceSensitivityParams { base_lcoe: 70.0, reference_cf: 0.30 };

/// Frontend→backend weight-key translation used by the power-developer
/// workflow's custom-criteria path.
pub const FRONTEND_WEIGHT_KEY_MAP: &[(&str, &str)] = &[
    ("connection_headroom", "connection_speed"),
    ("route_to_market", "price_sensitivity"),
    ("project_stage", "land_planning"),
    ("demand_scale", "capacity"),
    ("grid_infrastructure", "resilience"),
    ("digital_infrastructure", "latency"),
    ("water_resources", "cooling"),
];

//! Deterministic business-scenario projection.
//!
//! `simulate_genes` is a pure function of the gene values, the snapshot and the
//! simulation settings: no randomness, no clock, no shared state. That is what
//! makes a content-hash memo sound. `ScenarioSimulator` owns the current
//! snapshot together with its memo as one immutable `SimulationFrame`; replacing
//! the snapshot swaps in a new frame, so evaluations still holding the previous
//! frame finish against a consistent (snapshot, cache) pair.
use crate::config::SimulationConfig;
use crate::data::ScenarioCache;
use crate::engines::generation::genome::{StrategyChromosome, StrategyGene};
use crate::types::{BusinessSnapshot, ProjectedResults, SensitivityPoint, SimulatedScenario};
use std::sync::{Arc, PoisonError, RwLock};

pub const MARGIN_GENE: &str = "base_margin_percentage";
pub const CREDIT_GENE: &str = "credit_limit_multiplier";
pub const SAFETY_STOCK_GENE: &str = "safety_stock_days";
pub const SHIPPING_GENE: &str = "shipping_cost_optimization";

/// Gene values assumed when a template set omits one of the projection levers.
const NEUTRAL_MARGIN: f64 = 30.0;
const NEUTRAL_CREDIT_MULTIPLIER: f64 = 1.0;
const NEUTRAL_SAFETY_STOCK_DAYS: f64 = 14.0;
const NEUTRAL_SHIPPING_FACTOR: f64 = 1.0;

/// Inventory days at which cash conversion is neutral.
const REFERENCE_STOCK_DAYS: f64 = 14.0;

const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Snapshot figures after default substitution
#[derive(Debug, Clone, Copy)]
struct Baseline {
    monthly_sales: f64,
    average_margin: f64,
}

#[derive(Debug, Clone, Copy)]
struct Levers {
    margin_pct: f64,
    credit_multiplier: f64,
    safety_stock_days: f64,
    shipping_factor: f64,
}

fn resolve_baseline(
    snapshot: &BusinessSnapshot,
    config: &SimulationConfig,
    defaults_applied: &mut Vec<String>,
) -> Baseline {
    let monthly_sales = match snapshot.monthly_sales {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            defaults_applied.push("monthly_sales".to_string());
            config.default_monthly_sales
        }
    };
    let average_margin = match snapshot.average_margin {
        Some(v) if v.is_finite() => v,
        _ => {
            defaults_applied.push("average_margin".to_string());
            config.default_average_margin
        }
    };
    Baseline {
        monthly_sales,
        average_margin,
    }
}

fn lever(genes: &[StrategyGene], name: &str, neutral: f64, defaults_applied: &mut Vec<String>) -> f64 {
    match genes.iter().find(|g| g.name == name).and_then(StrategyGene::numeric) {
        Some(v) if v.is_finite() => v,
        _ => {
            defaults_applied.push(format!("gene:{}", name));
            neutral
        }
    }
}

fn resolve_levers(genes: &[StrategyGene], defaults_applied: &mut Vec<String>) -> Levers {
    Levers {
        margin_pct: lever(genes, MARGIN_GENE, NEUTRAL_MARGIN, defaults_applied),
        credit_multiplier: lever(genes, CREDIT_GENE, NEUTRAL_CREDIT_MULTIPLIER, defaults_applied),
        safety_stock_days: lever(genes, SAFETY_STOCK_GENE, NEUTRAL_SAFETY_STOCK_DAYS, defaults_applied),
        shipping_factor: lever(genes, SHIPPING_GENE, NEUTRAL_SHIPPING_FACTOR, defaults_applied),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn project(levers: &Levers, baseline: &Baseline) -> ProjectedResults {
    let margin_multiplier = 1.0 + (levers.margin_pct - baseline.average_margin) / 100.0;
    let base_cost = baseline.monthly_sales * (1.0 - levers.margin_pct / 100.0);

    let revenue = baseline.monthly_sales * margin_multiplier;
    let profit = revenue - base_cost * levers.shipping_factor;
    let margin = if revenue > 0.0 {
        profit / revenue * 100.0
    } else {
        0.0
    };

    let credit_risk = levers.credit_multiplier * 0.05;
    let risk_score = (credit_risk * 100.0 + (100.0 - margin)).clamp(0.0, 100.0);

    let inventory_efficiency = REFERENCE_STOCK_DAYS / levers.safety_stock_days.max(1.0);
    let cash_flow = profit * inventory_efficiency;
    let growth_rate = margin_multiplier * 10.0 - 10.0;

    ProjectedResults {
        revenue: finite_or_zero(revenue),
        profit: finite_or_zero(profit),
        margin: finite_or_zero(margin),
        cash_flow: finite_or_zero(cash_flow),
        risk_score: finite_or_zero(risk_score),
        growth_rate: finite_or_zero(growth_rate),
    }
}

fn relative_change(before: f64, after: f64) -> f64 {
    finite_or_zero((after - before) / before.abs().max(1.0) * 100.0)
}

fn sensitivity(
    genes: &[StrategyGene],
    baseline: &Baseline,
    reference: &ProjectedResults,
    change_pct: f64,
) -> Vec<SensitivityPoint> {
    let mut points = Vec::new();
    let mut scratch = Vec::new();

    for (idx, gene) in genes.iter().enumerate() {
        if !gene.mutable {
            continue;
        }
        let Some(value) = gene.numeric() else {
            continue;
        };

        // A zero value would not move under a relative nudge; step by the range instead.
        let step = if value != 0.0 {
            value * change_pct / 100.0
        } else {
            gene.range.map(|r| r.width()).unwrap_or(1.0) * change_pct / 100.0
        };

        let mut varied = genes.to_vec();
        varied[idx].set_numeric(value + step);
        scratch.clear();
        let levers = resolve_levers(&varied, &mut scratch);
        let nudged = project(&levers, baseline);

        points.push(SensitivityPoint {
            variable: gene.name.clone(),
            change_pct,
            impact_on_profit_pct: relative_change(reference.profit, nudged.profit),
            impact_on_risk_pct: relative_change(reference.risk_score, nudged.risk_score),
        });
    }

    points
}

/// Project a gene set against a snapshot.
pub fn simulate_genes(
    genes: &[StrategyGene],
    snapshot: &BusinessSnapshot,
    config: &SimulationConfig,
) -> SimulatedScenario {
    let mut defaults_applied = Vec::new();
    let baseline = resolve_baseline(snapshot, config, &mut defaults_applied);
    let levers = resolve_levers(genes, &mut defaults_applied);

    let projected = project(&levers, &baseline);
    let confidence_level = (config.base_confidence
        - config.default_confidence_penalty * defaults_applied.len() as f64)
        .clamp(0.0, 100.0);
    let recommendation_score =
        finite_or_zero((projected.profit / 1000.0 + (100.0 - projected.risk_score)) / 2.0);

    SimulatedScenario {
        content_hash: crate::engines::generation::genome::content_hash(genes),
        assumptions: genes
            .iter()
            .map(|g| (g.name.clone(), g.value.clone()))
            .collect(),
        projected,
        confidence_level,
        defaults_applied,
        sensitivity: sensitivity(genes, &baseline, &projected, config.sensitivity_change_pct),
        recommendation_score,
    }
}

/// Project one chromosome against a snapshot. Only the genes matter.
pub fn simulate_scenario(
    chromosome: &StrategyChromosome,
    snapshot: &BusinessSnapshot,
    config: &SimulationConfig,
) -> SimulatedScenario {
    simulate_genes(&chromosome.genes, snapshot, config)
}

/// A snapshot together with the memo of scenarios computed against it
pub struct SimulationFrame {
    version: u64,
    snapshot: Arc<BusinessSnapshot>,
    config: Arc<SimulationConfig>,
    cache: ScenarioCache,
}

impl SimulationFrame {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn snapshot(&self) -> &BusinessSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn cache(&self) -> &ScenarioCache {
        &self.cache
    }

    pub fn scenario(&self, chromosome: &StrategyChromosome) -> Arc<SimulatedScenario> {
        self.cache.get_or_compute(chromosome.content_hash(), || {
            simulate_scenario(chromosome, &self.snapshot, &self.config)
        })
    }

    pub fn scenario_for_genes(&self, genes: &[StrategyGene]) -> Arc<SimulatedScenario> {
        let key = crate::engines::generation::genome::content_hash(genes);
        self.cache
            .get_or_compute(key, || simulate_genes(genes, &self.snapshot, &self.config))
    }
}

pub struct ScenarioSimulator {
    frame: RwLock<Arc<SimulationFrame>>,
    cache_capacity: usize,
}

impl ScenarioSimulator {
    pub fn new(snapshot: BusinessSnapshot, config: SimulationConfig) -> Self {
        Self::with_cache_capacity(snapshot, config, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(
        snapshot: BusinessSnapshot,
        config: SimulationConfig,
        cache_capacity: usize,
    ) -> Self {
        let frame = SimulationFrame {
            version: 0,
            snapshot: Arc::new(snapshot),
            config: Arc::new(config),
            cache: ScenarioCache::new(cache_capacity),
        };
        Self {
            frame: RwLock::new(Arc::new(frame)),
            cache_capacity,
        }
    }

    /// Current frame. Callers keep it for the duration of a generation.
    pub fn frame(&self) -> Arc<SimulationFrame> {
        Arc::clone(&self.frame.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the snapshot; the scenario memo starts empty.
    pub fn update_snapshot(&self, snapshot: BusinessSnapshot) {
        let mut frame = self.frame.write().unwrap_or_else(PoisonError::into_inner);
        let next = SimulationFrame {
            version: frame.version + 1,
            snapshot: Arc::new(snapshot),
            config: Arc::clone(&frame.config),
            cache: ScenarioCache::new(self.cache_capacity),
        };
        log::info!(
            "Business snapshot updated (frame {}), dropping {} cached scenarios",
            next.version,
            frame.cache.len()
        );
        *frame = Arc::new(next);
    }

    pub fn simulate(&self, chromosome: &StrategyChromosome) -> Arc<SimulatedScenario> {
        self.frame().scenario(chromosome)
    }
}

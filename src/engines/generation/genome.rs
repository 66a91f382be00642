//! Gene and chromosome representation for strategy evolution
//!
//! A chromosome is an ordered list of named genes. Every chromosome in a run
//! shares the same arity and gene order, taken from the configured
//! `GeneTemplate` set, so genes can be paired by index during crossover.
//!
//! Numeric genes may carry a `GeneRange`. For mutable ranged genes the value
//! must stay inside the range after every operator; `StrategyGene::clamp_to_range`
//! is the only place that enforces it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneCategory {
    Pricing,
    Credit,
    Inventory,
    Distribution,
    Payment,
    Marketing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneRange {
    pub min: f64,
    pub max: f64,
}

impl GeneRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneValue {
    Numeric(f64),
    Flag(bool),
    Label(String),
}

impl GeneValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneValue::Numeric(v) => Some(*v),
            GeneValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            GeneValue::Label(_) => None,
        }
    }
}

impl fmt::Display for GeneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneValue::Numeric(v) => write!(f, "{}", v),
            GeneValue::Flag(b) => write!(f, "{}", b),
            GeneValue::Label(s) => write!(f, "{}", s),
        }
    }
}

/// One tunable strategy parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyGene {
    pub name: String,
    pub category: GeneCategory,
    pub value: GeneValue,
    pub range: Option<GeneRange>,
    pub mutable: bool,
    pub weight: f64,
}

impl StrategyGene {
    /// Pull a numeric value back inside its range. Non-numeric and unranged
    /// genes are left untouched.
    pub fn clamp_to_range(&mut self) {
        if let (GeneValue::Numeric(v), Some(range)) = (&mut self.value, self.range) {
            *v = range.clamp(*v);
        }
    }

    /// Replace a numeric value, routed through `clamp_to_range`.
    pub fn set_numeric(&mut self, value: f64) {
        self.value = GeneValue::Numeric(value);
        self.clamp_to_range();
    }

    pub fn numeric(&self) -> Option<f64> {
        match self.value {
            GeneValue::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn in_range(&self) -> bool {
        match (&self.value, self.range) {
            (GeneValue::Numeric(v), Some(range)) => range.contains(*v),
            _ => true,
        }
    }
}

/// How a gene slot is seeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneKind {
    Ranged { min: f64, max: f64 },
    Flag,
    Fixed(GeneValue),
}

/// Description of one gene slot in every chromosome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneTemplate {
    pub name: String,
    pub category: GeneCategory,
    pub kind: GeneKind,
    pub mutable: bool,
    pub weight: f64,
}

impl GeneTemplate {
    fn ranged(name: &str, category: GeneCategory, min: f64, max: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            category,
            kind: GeneKind::Ranged { min, max },
            mutable: true,
            weight,
        }
    }

    pub fn range(&self) -> Option<GeneRange> {
        match self.kind {
            GeneKind::Ranged { min, max } => Some(GeneRange::new(min, max)),
            _ => None,
        }
    }

    /// Build a gene from this template with the given value.
    pub fn instantiate(&self, value: GeneValue) -> StrategyGene {
        let mut gene = StrategyGene {
            name: self.name.clone(),
            category: self.category,
            value,
            range: self.range(),
            mutable: self.mutable,
            weight: self.weight,
        };
        gene.clamp_to_range();
        gene
    }
}

/// Pricing, credit, inventory and distribution levers of the business
pub fn default_gene_templates() -> Vec<GeneTemplate> {
    use GeneCategory::*;

    vec![
        GeneTemplate::ranged("base_margin_percentage", Pricing, 15.0, 60.0, 0.2),
        GeneTemplate::ranged("discount_threshold", Pricing, 1000.0, 50000.0, 0.1),
        GeneTemplate::ranged("volume_discount_rate", Pricing, 0.0, 25.0, 0.1),
        GeneTemplate {
            name: "dynamic_pricing_enabled".to_string(),
            category: Pricing,
            kind: GeneKind::Flag,
            mutable: false,
            weight: 0.05,
        },
        GeneTemplate::ranged("credit_limit_multiplier", Credit, 1.0, 5.0, 0.15),
        GeneTemplate::ranged("payment_term_days", Credit, 15.0, 90.0, 0.1),
        GeneTemplate::ranged("early_payment_discount", Credit, 0.0, 10.0, 0.05),
        GeneTemplate::ranged("reorder_point_multiplier", Inventory, 1.0, 3.0, 0.1),
        GeneTemplate::ranged("safety_stock_days", Inventory, 7.0, 30.0, 0.05),
        GeneTemplate::ranged("max_inventory_turns", Inventory, 4.0, 24.0, 0.05),
        GeneTemplate::ranged("shipping_cost_optimization", Distribution, 0.8, 1.2, 0.05),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChromosomeId(pub u64);

impl fmt::Display for ChromosomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chr_{:06}", self.0)
    }
}

/// One candidate strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyChromosome {
    pub id: ChromosomeId,
    pub generation: u32,
    pub genes: Vec<StrategyGene>,
    pub fitness: f64,
    pub parent_ids: Vec<ChromosomeId>,
    pub mutations: u32,
    pub birth_date: DateTime<Utc>,
}

impl StrategyChromosome {
    pub fn gene(&self, name: &str) -> Option<&StrategyGene> {
        self.genes.iter().find(|g| g.name == name)
    }

    pub fn numeric_gene(&self, name: &str) -> Option<f64> {
        self.gene(name).and_then(StrategyGene::numeric)
    }

    /// Flat gene name -> value view, as handed to the host.
    pub fn genes_as_map(&self) -> BTreeMap<String, GeneValue> {
        self.genes
            .iter()
            .map(|g| (g.name.clone(), g.value.clone()))
            .collect()
    }

    /// Deterministic hash of the `(name, value)` pairs. Identity, lineage and
    /// fitness are deliberately left out so clones share a cache entry.
    pub fn content_hash(&self) -> u64 {
        content_hash(&self.genes)
    }

    pub fn genes_in_range(&self) -> bool {
        self.genes.iter().all(StrategyGene::in_range)
    }
}

pub fn content_hash(genes: &[StrategyGene]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for gene in genes {
        gene.name.hash(&mut hasher);
        match &gene.value {
            GeneValue::Numeric(v) => {
                0u8.hash(&mut hasher);
                // -0.0 and 0.0 project identically
                let normalized = if *v == 0.0 { 0.0f64 } else { *v };
                normalized.to_bits().hash(&mut hasher);
            }
            GeneValue::Flag(b) => {
                1u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            GeneValue::Label(s) => {
                2u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

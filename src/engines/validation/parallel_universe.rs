//! What-if sweep over the strongest strategies.
//!
//! Each chromosome is replayed under three assumption sets by scaling every
//! mutable numeric gene with one multiplier and clamping it back into range.
//! The live population is never touched; the varied gene sets are scored
//! through the same frame (and memo) as the evolution itself.
use crate::config::SimulationConfig;
use crate::engines::evaluation::simulator::SimulationFrame;
use crate::engines::generation::genome::{ChromosomeId, GeneValue, StrategyChromosome, StrategyGene};
use crate::types::SimulatedScenario;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assumption {
    Optimistic,
    Realistic,
    Pessimistic,
}

impl Assumption {
    pub const ALL: [Assumption; 3] = [
        Assumption::Optimistic,
        Assumption::Realistic,
        Assumption::Pessimistic,
    ];

    pub fn multiplier(&self, config: &SimulationConfig) -> f64 {
        match self {
            Assumption::Optimistic => config.optimistic_multiplier,
            Assumption::Realistic => config.realistic_multiplier,
            Assumption::Pessimistic => config.pessimistic_multiplier,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Assumption::Optimistic => "optimistic",
            Assumption::Realistic => "realistic",
            Assumption::Pessimistic => "pessimistic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseProjection {
    pub chromosome_id: ChromosomeId,
    pub source_fitness: f64,
    pub assumption: Assumption,
    pub multiplier: f64,
    pub scenario: SimulatedScenario,
    pub recommendation_score: f64,
}

/// Genes of `chromosome` with every mutable numeric value scaled and re-clamped.
pub fn apply_assumption(chromosome: &StrategyChromosome, multiplier: f64) -> Vec<StrategyGene> {
    chromosome
        .genes
        .iter()
        .map(|gene| {
            let mut varied = gene.clone();
            if let (true, GeneValue::Numeric(value)) = (gene.mutable, &gene.value) {
                varied.set_numeric(value * multiplier);
            }
            varied
        })
        .collect()
}

/// Score each chromosome under every assumption and rank the results by
/// recommendation score, highest first.
pub fn simulate_parallel_universes(
    chromosomes: &[StrategyChromosome],
    frame: &SimulationFrame,
) -> Vec<UniverseProjection> {
    let config = frame.config();

    let mut projections: Vec<UniverseProjection> = chromosomes
        .par_iter()
        .flat_map_iter(|chromosome| {
            Assumption::ALL.iter().map(move |assumption| {
                let multiplier = assumption.multiplier(config);
                let genes = apply_assumption(chromosome, multiplier);
                let scenario = frame.scenario_for_genes(&genes);
                UniverseProjection {
                    chromosome_id: chromosome.id,
                    source_fitness: chromosome.fitness,
                    assumption: *assumption,
                    multiplier,
                    recommendation_score: scenario.recommendation_score,
                    scenario: (*scenario).clone(),
                }
            })
        })
        .collect();

    projections.sort_by(|a, b| {
        b.recommendation_score
            .partial_cmp(&a.recommendation_score)
            .unwrap_or(Ordering::Equal)
    });

    log::info!("Parallel universes simulated: {}", projections.len());
    projections
}

use crate::config::{ConfigSection, FitnessFunction, GeneticEvolutionConfig};
use crate::engines::evaluation::simulator::SimulationFrame;
use crate::engines::generation::constraints::satisfies_constraints;
use crate::engines::generation::genome::{ChromosomeId, StrategyChromosome};
use crate::engines::generation::operators::random_chromosome;
use crate::engines::metrics::FitnessMetrics;
use crate::error::StratevoError;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Hands out chromosome ids in sequence; ids are never reused within an engine.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeIdGenerator {
    next: u64,
}

impl ChromosomeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ChromosomeId {
        let id = ChromosomeId(self.next);
        self.next += 1;
        id
    }
}

/// One generation. Built once, scored once, then only read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    generation: u32,
    members: Vec<StrategyChromosome>,
}

impl Population {
    /// Score every member against the frame (in parallel) and order them by
    /// descending fitness.
    pub fn evaluate(
        generation: u32,
        members: Vec<StrategyChromosome>,
        frame: &SimulationFrame,
        function: FitnessFunction,
    ) -> Self {
        let mut members: Vec<StrategyChromosome> = members
            .into_par_iter()
            .map(|mut chromosome| {
                let scenario = frame.scenario(&chromosome);
                chromosome.fitness = FitnessMetrics::calculate(function, &scenario);
                chromosome
            })
            .collect();

        members.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));

        Self {
            generation,
            members,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn members(&self) -> &[StrategyChromosome] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn best(&self) -> Option<&StrategyChromosome> {
        self.members.first()
    }

    pub fn top(&self, count: usize) -> &[StrategyChromosome] {
        &self.members[..count.min(self.members.len())]
    }

    pub fn average_fitness(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|c| c.fitness).sum::<f64>() / self.members.len() as f64
    }

    /// Spread of the ranged numeric genes, 0 (identical) to 1 (as spread as a
    /// uniform draw over each range). Per gene the population variance is
    /// divided by `width^2 / 12`, the variance of a uniform draw, and the
    /// ratios are averaged.
    pub fn diversity(&self) -> f64 {
        let Some(first) = self.members.first() else {
            return 1.0;
        };
        if self.members.len() < 2 {
            return 1.0;
        }

        let mut total = 0.0;
        let mut counted = 0usize;
        for (idx, gene) in first.genes.iter().enumerate() {
            let Some(range) = gene.range else {
                continue;
            };
            if range.width() <= 0.0 {
                continue;
            }
            let values: Vec<f64> = self
                .members
                .iter()
                .filter_map(|c| c.genes.get(idx).and_then(|g| g.numeric()))
                .collect();
            if values.is_empty() {
                continue;
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            total += variance / (range.width().powi(2) / 12.0);
            counted += 1;
        }

        if counted == 0 {
            return 0.0;
        }
        (total / counted as f64).clamp(0.0, 1.0)
    }
}

/// Seed generation 0: `population_size` random chromosomes that satisfy the
/// configured constraints, scored against the frame.
pub fn initialize_population<R: Rng>(
    config: &GeneticEvolutionConfig,
    frame: &SimulationFrame,
    ids: &mut ChromosomeIdGenerator,
    rng: &mut R,
) -> Result<Population, StratevoError> {
    config.validate()?;

    let target = config.population_size;
    let budget = config.attempt_budget();
    let mut members = Vec::with_capacity(target);
    let mut attempts = 0usize;

    while members.len() < target {
        if attempts >= budget {
            log::warn!(
                "Could not seed a valid population: {}/{} after {} attempts",
                members.len(),
                target,
                attempts
            );
            return Err(StratevoError::ConstraintExhaustion {
                generation: 0,
                produced: members.len(),
                target,
                attempts,
            });
        }
        attempts += 1;

        let candidate = random_chromosome(&config.genes, ids.next_id(), 0, rng);
        if satisfies_constraints(&candidate, &config.constraints, frame) {
            members.push(candidate);
        }
    }

    let population = Population::evaluate(0, members, frame, config.fitness_function);
    log::info!(
        "Population initialized: size={}, best fitness={:.4}, attempts={}",
        population.len(),
        population.best().map(|c| c.fitness).unwrap_or(0.0),
        attempts
    );
    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintRule, GeneticConstraint, SimulationConfig};
    use crate::engines::evaluation::simulator::ScenarioSimulator;
    use crate::types::BusinessSnapshot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simulator() -> ScenarioSimulator {
        ScenarioSimulator::new(
            BusinessSnapshot::with_sales(100_000.0, 30.0),
            SimulationConfig::default(),
        )
    }

    #[test]
    fn test_initialize_exact_size_sorted() {
        let config = GeneticEvolutionConfig {
            population_size: 37,
            ..Default::default()
        };
        let sim = simulator();
        let mut rng = StdRng::seed_from_u64(42);
        let pop = initialize_population(&config, &sim.frame(), &mut ChromosomeIdGenerator::new(), &mut rng)
            .unwrap();

        assert_eq!(pop.len(), 37);
        assert_eq!(pop.generation(), 0);
        assert!(pop.members().iter().all(|c| c.genes_in_range() && c.generation == 0));
        assert!(pop.members().windows(2).all(|w| w[0].fitness >= w[1].fitness));
        assert!(pop.diversity() > 0.3);
    }

    #[test]
    fn test_initialize_rejects_invalid_config() {
        let config = GeneticEvolutionConfig {
            population_size: 1,
            ..Default::default()
        };
        let sim = simulator();
        let mut rng = StdRng::seed_from_u64(1);
        let result = initialize_population(&config, &sim.frame(), &mut ChromosomeIdGenerator::new(), &mut rng);
        assert!(matches!(result, Err(StratevoError::Configuration(_))));
    }

    #[test]
    fn test_initialize_honours_constraints() {
        let config = GeneticEvolutionConfig {
            population_size: 20,
            constraints: vec![GeneticConstraint {
                metric: "payment_term_days".to_string(),
                rule: ConstraintRule::AtMost(40.0),
            }],
            ..Default::default()
        };
        let sim = simulator();
        let mut rng = StdRng::seed_from_u64(9);
        let pop = initialize_population(&config, &sim.frame(), &mut ChromosomeIdGenerator::new(), &mut rng)
            .unwrap();
        assert!(pop
            .members()
            .iter()
            .all(|c| c.numeric_gene("payment_term_days").unwrap() <= 40.0));
    }

    #[test]
    fn test_initialize_exhausts_on_impossible_constraint() {
        let config = GeneticEvolutionConfig {
            population_size: 4,
            constraint_retry_limit: 3,
            constraints: vec![GeneticConstraint {
                metric: "safety_stock_days".to_string(),
                rule: ConstraintRule::GreaterThan(30.0),
            }],
            ..Default::default()
        };
        let sim = simulator();
        let mut rng = StdRng::seed_from_u64(9);
        let result = initialize_population(&config, &sim.frame(), &mut ChromosomeIdGenerator::new(), &mut rng);
        match result {
            Err(StratevoError::ConstraintExhaustion { attempts, produced, .. }) => {
                assert_eq!(attempts, 12);
                assert_eq!(produced, 0);
            }
            other => panic!("expected exhaustion, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_diversity_of_identical_population_is_zero() {
        let config = GeneticEvolutionConfig {
            population_size: 5,
            ..Default::default()
        };
        let sim = simulator();
        let mut rng = StdRng::seed_from_u64(3);
        let pop = initialize_population(&config, &sim.frame(), &mut ChromosomeIdGenerator::new(), &mut rng)
            .unwrap();
        let clone = pop.members()[0].clone();
        let same = Population::evaluate(1, vec![clone; 5], &sim.frame(), config.fitness_function);
        assert_eq!(same.diversity(), 0.0);
    }
}

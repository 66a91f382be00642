use crate::config::{AppConfig, ConfigSection, GeneticEvolutionConfig, SimulationConfig};
use crate::engines::evaluation::simulator::{ScenarioSimulator, SimulationFrame};
use crate::engines::generation::{
    constraints::satisfies_constraints,
    genome::{GeneCategory, GeneValue, StrategyChromosome},
    operators::{blend_crossover, clone_chromosome, gaussian_mutation, tournament_selection},
    population::{self, ChromosomeIdGenerator, Population},
    progress::{EvolutionEvent, EvolutionObserver, EvolutionSummary, GenerationReport},
};
use crate::engines::metrics::FitnessMetrics;
use crate::engines::planning::{plan_metric, MetricOptimizationPlan};
use crate::engines::validation::parallel_universe::{self, UniverseProjection};
use crate::error::StratevoError;
use crate::types::{BusinessSnapshot, SimulatedScenario};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Generations without a >0.1% gain tolerated before a run counts as converged.
pub const STAGNATION_LIMIT: u32 = 20;
const IMPROVEMENT_THRESHOLD: f64 = 1.001;

/// Fixed confidence attached to gene-level recommendations.
const RECOMMENDATION_CONFIDENCE: f64 = 85.0;

/// Counts generations since the best fitness last rose more than 0.1% above
/// the reference. The reference only moves on such a rise, so small gains
/// accumulate against it.
#[derive(Debug, Clone, Copy)]
struct StagnationTracker {
    reference: f64,
    stagnant: u32,
}

impl StagnationTracker {
    fn new(reference: f64) -> Self {
        Self {
            reference,
            stagnant: 0,
        }
    }

    /// Record one generation's best; true once the run has converged.
    fn observe(&mut self, best_fitness: f64) -> bool {
        if best_fitness > self.reference * IMPROVEMENT_THRESHOLD {
            self.reference = best_fitness;
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }
        self.stagnant > STAGNATION_LIMIT
    }

    fn stagnant(&self) -> u32 {
        self.stagnant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Uninitialized,
    Seeded,
    Selecting,
    Evaluating,
    Completed,
}

/// Cloneable request to stop a run. Checked between generations only, so the
/// generation in progress always completes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn take_request(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub category: GeneCategory,
    pub parameter: String,
    pub suggested_value: GeneValue,
    /// Weighted contribution of the gene, in percent.
    pub impact_pct: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStatus {
    pub state: EngineState,
    pub generation: u32,
    pub population_size: usize,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub diversity: f64,
    pub snapshot_version: u64,
}

pub struct EvolutionEngine<R: Rng = StdRng> {
    config: GeneticEvolutionConfig,
    simulator: ScenarioSimulator,
    population: Population,
    best: Option<StrategyChromosome>,
    generation: u32,
    state: EngineState,
    ids: ChromosomeIdGenerator,
    rng: R,
    observers: Vec<Box<dyn EvolutionObserver>>,
    stop: StopHandle,
}

impl EvolutionEngine<StdRng> {
    /// Engine seeded from `config.seed`, or from OS entropy when unset.
    pub fn new(
        config: GeneticEvolutionConfig,
        snapshot: BusinessSnapshot,
        simulation: SimulationConfig,
    ) -> Result<Self, StratevoError> {
        simulation.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, ScenarioSimulator::new(snapshot, simulation), rng)
    }

    pub fn from_app_config(app: &AppConfig, snapshot: BusinessSnapshot) -> Result<Self, StratevoError> {
        Self::new(app.evolution.clone(), snapshot, app.simulation.clone())
    }
}

impl<R: Rng> EvolutionEngine<R> {
    pub fn with_rng(
        config: GeneticEvolutionConfig,
        simulator: ScenarioSimulator,
        rng: R,
    ) -> Result<Self, StratevoError> {
        config.validate()?;
        Ok(Self {
            config,
            simulator,
            population: Population::default(),
            best: None,
            generation: 0,
            state: EngineState::Uninitialized,
            ids: ChromosomeIdGenerator::new(),
            rng,
            observers: Vec::new(),
            stop: StopHandle::default(),
        })
    }

    pub fn subscribe<O: EvolutionObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn emit(&mut self, event: EvolutionEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }

    /// Replace the business snapshot. Cached scenarios are dropped; the
    /// population and its fitness values are kept until the next generation.
    pub fn update_business_snapshot(&self, snapshot: BusinessSnapshot) {
        self.simulator.update_snapshot(snapshot);
    }

    /// Seed generation 0 and score it. Replaces any existing population.
    pub fn initialize_population(&mut self) -> Result<&Population, StratevoError> {
        let frame = self.simulator.frame();
        let seeded =
            population::initialize_population(&self.config, &frame, &mut self.ids, &mut self.rng)?;

        self.best = seeded.best().cloned();
        self.generation = 0;
        self.population = seeded;
        self.state = EngineState::Seeded;

        let event = EvolutionEvent::PopulationSeeded {
            size: self.population.len(),
            best_fitness: self.best_fitness(),
        };
        self.emit(event);
        Ok(&self.population)
    }

    /// Breed, score and install the next generation.
    ///
    /// On constraint exhaustion the current population stays in place and the
    /// engine remains usable.
    pub fn evolve_generation(&mut self) -> Result<GenerationReport, StratevoError> {
        if self.population.is_empty() {
            return Err(StratevoError::NotSeeded);
        }
        let started = Instant::now();
        let next_generation = self.generation + 1;
        let frame = self.simulator.frame();

        self.state = EngineState::Selecting;
        let offspring = match breed(
            &self.config,
            &self.population,
            &frame,
            next_generation,
            &mut self.ids,
            &mut self.rng,
        ) {
            Ok(offspring) => offspring,
            Err(e) => {
                self.state = EngineState::Seeded;
                return Err(e);
            }
        };

        self.state = EngineState::Evaluating;
        let evaluated =
            Population::evaluate(next_generation, offspring, &frame, self.config.fitness_function);

        let generation_best = evaluated.best().cloned();
        let generation_best_fitness = generation_best.as_ref().map(|c| c.fitness).unwrap_or(0.0);
        let mut new_best_found = false;
        if let Some(candidate) = generation_best {
            if candidate.fitness > self.best_fitness() || self.best.is_none() {
                new_best_found = true;
                self.best = Some(candidate);
            }
        }

        self.population = evaluated;
        self.generation = next_generation;
        self.state = EngineState::Seeded;

        let report = GenerationReport {
            generation: next_generation,
            best_fitness: self.best_fitness(),
            generation_best_fitness,
            avg_fitness: self.population.average_fitness(),
            diversity: self.population.diversity(),
            new_best_found,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        log::debug!(
            "Generation {} evolved on frame {}: best {:.4}, avg {:.4}",
            report.generation,
            frame.version(),
            report.best_fitness,
            report.avg_fitness
        );

        if new_best_found {
            if let Some(best) = self.best.clone() {
                self.emit(EvolutionEvent::NewBestFound(best));
            }
        }
        self.emit(EvolutionEvent::GenerationComplete(report.clone()));
        Ok(report)
    }

    /// Evolve until the generation limit, stagnation, or a stop request.
    /// Seeds the population first if needed.
    pub fn run_evolution(&mut self, max_generations: Option<u32>) -> Result<EvolutionSummary, StratevoError> {
        let started = Instant::now();
        if self.population.is_empty() {
            self.initialize_population()?;
        }

        let limit = max_generations
            .map(|requested| requested.min(self.config.generation_limit))
            .unwrap_or(self.config.generation_limit);

        log::info!(
            "Starting evolution: population={}, limit={}, objective={:?}",
            self.population.len(),
            limit,
            self.config.fitness_function
        );

        let mut stagnation = StagnationTracker::new(self.best_fitness());
        let mut first_best: Option<f64> = None;
        let mut generations_run = 0u32;
        let mut converged = false;
        let mut cancelled = false;

        while generations_run < limit {
            if self.stop.take_request() {
                log::info!("Evolution cancelled after {} generations", generations_run);
                cancelled = true;
                break;
            }

            let report = self.evolve_generation()?;
            generations_run += 1;
            first_best.get_or_insert(report.best_fitness);

            if stagnation.observe(report.best_fitness) {
                log::info!(
                    "Converged at generation {} (no improvement for {} generations)",
                    self.generation,
                    stagnation.stagnant()
                );
                converged = true;
                break;
            }
        }

        let best_chromosome = self.best.clone().ok_or(StratevoError::NotSeeded)?;
        let final_best_fitness = best_chromosome.fitness;
        let improvement_ratio = match first_best {
            Some(first) if first > 0.0 => final_best_fitness / first,
            _ => 1.0,
        };

        let summary = EvolutionSummary {
            total_generations: self.generation,
            generations_run,
            final_best_fitness,
            best_chromosome,
            improvement_ratio,
            total_duration_ms: started.elapsed().as_millis() as u64,
            converged,
            cancelled,
        };

        self.state = EngineState::Completed;
        self.emit(EvolutionEvent::RunComplete(summary.clone()));
        Ok(summary)
    }

    pub fn simulate_scenario(&self, chromosome: &StrategyChromosome) -> Arc<SimulatedScenario> {
        self.simulator.simulate(chromosome)
    }

    pub fn calculate_fitness(&self, chromosome: &StrategyChromosome) -> f64 {
        FitnessMetrics::calculate(self.config.fitness_function, &self.simulate_scenario(chromosome))
    }

    /// What-if projections of the `count` fittest chromosomes.
    pub fn simulate_parallel_universes(&self, count: usize) -> Vec<UniverseProjection> {
        let frame = self.simulator.frame();
        parallel_universe::simulate_parallel_universes(self.population.top(count), &frame)
    }

    pub fn optimize_metric(&self, metric: &str, target: f64) -> MetricOptimizationPlan {
        let frame = self.simulator.frame();
        plan_metric(metric, target, frame.snapshot(), &self.config.constraints)
    }

    pub fn best_chromosome(&self) -> Option<&StrategyChromosome> {
        self.best.as_ref()
    }

    pub fn best_fitness(&self) -> f64 {
        self.best.as_ref().map(|c| c.fitness).unwrap_or(0.0)
    }

    /// Best strategy as a flat gene name -> value map.
    pub fn best_strategy(&self) -> Option<BTreeMap<String, GeneValue>> {
        self.best.as_ref().map(StrategyChromosome::genes_as_map)
    }

    /// Pricing levers of the best strategy with their weighted impact.
    pub fn strategy_recommendations(&self) -> Vec<StrategyRecommendation> {
        let Some(best) = &self.best else {
            return Vec::new();
        };

        best.genes
            .iter()
            .filter(|gene| gene.category == GeneCategory::Pricing)
            .map(|gene| StrategyRecommendation {
                category: gene.category,
                parameter: gene.name.clone(),
                suggested_value: gene.value.clone(),
                impact_pct: gene.value.as_f64().unwrap_or(0.0) * gene.weight * 100.0,
                confidence: RECOMMENDATION_CONFIDENCE,
            })
            .collect()
    }

    pub fn evolution_status(&self) -> EvolutionStatus {
        EvolutionStatus {
            state: self.state,
            generation: self.generation,
            population_size: self.population.len(),
            best_fitness: self.best_fitness(),
            avg_fitness: self.population.average_fitness(),
            diversity: self.population.diversity(),
            snapshot_version: self.simulator.frame().version(),
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn config(&self) -> &GeneticEvolutionConfig {
        &self.config
    }

    pub fn simulator(&self) -> &ScenarioSimulator {
        &self.simulator
    }
}

/// Build the members of the next generation: surviving elites followed by
/// offspring that pass the range and constraint checks.
fn breed<R: Rng>(
    config: &GeneticEvolutionConfig,
    parents: &Population,
    frame: &SimulationFrame,
    generation: u32,
    ids: &mut ChromosomeIdGenerator,
    rng: &mut R,
) -> Result<Vec<StrategyChromosome>, StratevoError> {
    let target = config.population_size;
    let mut next = Vec::with_capacity(target);

    for elite in parents.top(config.elite_count()) {
        // a snapshot change can move scenario metrics under an elite
        if satisfies_constraints(elite, &config.constraints, frame) {
            next.push(elite.clone());
        } else {
            log::debug!("Elite {} no longer satisfies constraints", elite.id);
        }
    }

    let budget = config.attempt_budget();
    let mut attempts = 0usize;
    let mut rejected = 0usize;
    let members = parents.members();

    while next.len() < target {
        if attempts >= budget {
            log::warn!(
                "Generation {}: only {}/{} valid offspring after {} attempts",
                generation,
                next.len(),
                target,
                attempts
            );
            return Err(StratevoError::ConstraintExhaustion {
                generation,
                produced: next.len(),
                target,
                attempts,
            });
        }
        attempts += 1;

        let Some(parent1) = tournament_selection(members, config.tournament_size, rng) else {
            return Err(StratevoError::NotSeeded);
        };
        let mut child = if rng.gen::<f64>() < config.crossover_rate {
            let parent2 = tournament_selection(members, config.tournament_size, rng).unwrap_or(parent1);
            blend_crossover(parent1, parent2, ids.next_id(), generation, rng)
        } else {
            clone_chromosome(parent1, ids.next_id(), generation)
        };

        if rng.gen::<f64>() < config.mutation_rate {
            gaussian_mutation(&mut child, rng);
        }

        if child.genes_in_range() && satisfies_constraints(&child, &config.constraints, frame) {
            next.push(child);
        } else {
            rejected += 1;
        }
    }

    if rejected > 0 {
        log::debug!("Generation {}: {} offspring rejected by constraints", generation, rejected);
    }
    Ok(next)
}

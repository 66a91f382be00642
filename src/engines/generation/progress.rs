use crate::engines::generation::genome::StrategyChromosome;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

/// Outcome of one `evolve_generation` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: u32,
    /// Best fitness seen so far in the run; never decreases.
    pub best_fitness: f64,
    /// Top fitness within this generation alone.
    pub generation_best_fitness: f64,
    pub avg_fitness: f64,
    pub diversity: f64,
    pub new_best_found: bool,
    pub duration_ms: u64,
}

/// Outcome of a `run_evolution` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSummary {
    /// Generation counter of the engine after the run.
    pub total_generations: u32,
    /// Generations evolved by this call.
    pub generations_run: u32,
    pub final_best_fitness: f64,
    pub best_chromosome: StrategyChromosome,
    /// Final best fitness over the best fitness after the first generation of the run.
    pub improvement_ratio: f64,
    pub total_duration_ms: u64,
    pub converged: bool,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionEvent {
    PopulationSeeded { size: usize, best_fitness: f64 },
    GenerationComplete(GenerationReport),
    NewBestFound(StrategyChromosome),
    RunComplete(EvolutionSummary),
}

/// Receives engine notifications. Observers run on the driving thread between
/// generations, never during parallel scoring.
pub trait EvolutionObserver: Send {
    fn on_event(&mut self, event: &EvolutionEvent);
}

/// Writes progress through the `log` facade.
pub struct LogObserver;

impl EvolutionObserver for LogObserver {
    fn on_event(&mut self, event: &EvolutionEvent) {
        match event {
            EvolutionEvent::PopulationSeeded { size, best_fitness } => {
                log::info!("Seeded {} strategies, best fitness {:.4}", size, best_fitness);
            }
            EvolutionEvent::GenerationComplete(report) => {
                log::info!(
                    "Generation {} complete. Best fitness: {:.4}, avg: {:.4}, diversity: {:.3}, {} ms",
                    report.generation,
                    report.best_fitness,
                    report.avg_fitness,
                    report.diversity,
                    report.duration_ms
                );
            }
            EvolutionEvent::NewBestFound(chromosome) => {
                log::debug!("New best {} with fitness {:.4}", chromosome.id, chromosome.fitness);
            }
            EvolutionEvent::RunComplete(summary) => {
                log::info!(
                    "Run complete after {} generations: best {:.4} (x{:.3}), converged={}, cancelled={}",
                    summary.generations_run,
                    summary.final_best_fitness,
                    summary.improvement_ratio,
                    summary.converged,
                    summary.cancelled
                );
            }
        }
    }
}

/// Forwards every event over an mpsc channel, e.g. to a host UI thread.
pub struct ChannelObserver {
    sender: Sender<EvolutionEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<EvolutionEvent>) -> Self {
        Self { sender }
    }
}

impl EvolutionObserver for ChannelObserver {
    fn on_event(&mut self, event: &EvolutionEvent) {
        // receiver gone means nobody is listening any more
        let _ = self.sender.send(event.clone());
    }
}

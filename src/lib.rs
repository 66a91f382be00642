pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod types;

pub use config::{AppConfig, ConfigManager, GeneticEvolutionConfig, SimulationConfig};
pub use engines::generation::{EvolutionEngine, EvolutionEvent, StrategyChromosome};
pub use error::{Result, StratevoError};
pub use types::{BusinessSnapshot, SimulatedScenario};

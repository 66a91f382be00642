pub mod traits;
pub mod evolution;
pub mod simulation;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::{
    ConstraintRule, FitnessFunction, GeneticConstraint, GeneticEvolutionConfig,
};
pub use simulation::SimulationConfig;
pub use traits::ConfigSection;

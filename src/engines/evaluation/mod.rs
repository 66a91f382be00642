pub mod simulator;

pub use simulator::{simulate_genes, simulate_scenario, ScenarioSimulator, SimulationFrame};

pub mod constraints;
pub mod evolution_engine;
pub mod genome;
pub mod operators;
pub mod population;
pub mod progress;

pub use evolution_engine::{
    EngineState, EvolutionEngine, EvolutionStatus, StopHandle, StrategyRecommendation,
};
pub use genome::{
    default_gene_templates, ChromosomeId, GeneCategory, GeneKind, GeneRange, GeneTemplate,
    GeneValue, StrategyChromosome, StrategyGene,
};
pub use population::Population;
pub use progress::{
    ChannelObserver, EvolutionEvent, EvolutionObserver, EvolutionSummary, GenerationReport,
    LogObserver,
};

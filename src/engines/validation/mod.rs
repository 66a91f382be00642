pub mod parallel_universe;

pub use parallel_universe::{simulate_parallel_universes, Assumption, UniverseProjection};

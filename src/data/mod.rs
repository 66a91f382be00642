pub mod cache;

pub use cache::ScenarioCache;

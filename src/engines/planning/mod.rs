pub mod planner;
pub mod playbook;

pub use planner::{plan_metric, GapDirection, MetricOptimizationPlan, OptimizationStep};
pub use playbook::{RiskTier, TimeFrame};

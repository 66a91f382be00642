use super::traits::ConfigSection;
use crate::error::StratevoError;
use serde::{Deserialize, Serialize};

/// Knobs of the scenario simulator and the what-if sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Used when the snapshot carries no monthly sales figure.
    pub default_monthly_sales: f64,
    /// Used when the snapshot carries no average margin (percent).
    pub default_average_margin: f64,
    /// Confidence of a scenario built from a complete snapshot (0-100).
    pub base_confidence: f64,
    /// Confidence lost per snapshot field replaced by a default.
    pub default_confidence_penalty: f64,
    /// Relative change applied to one gene for the sensitivity table (percent).
    pub sensitivity_change_pct: f64,
    pub optimistic_multiplier: f64,
    pub realistic_multiplier: f64,
    pub pessimistic_multiplier: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_monthly_sales: 100_000.0,
            default_average_margin: 30.0,
            base_confidence: 90.0,
            default_confidence_penalty: 15.0,
            sensitivity_change_pct: 10.0,
            optimistic_multiplier: 1.2,
            realistic_multiplier: 1.0,
            pessimistic_multiplier: 0.8,
        }
    }
}

impl ConfigSection for SimulationConfig {
    fn section_name() -> &'static str {
        "simulation"
    }

    fn validate(&self) -> Result<(), StratevoError> {
        if !self.default_monthly_sales.is_finite() || self.default_monthly_sales <= 0.0 {
            return Err(StratevoError::Configuration(
                "Default monthly sales must be positive".to_string()
            ));
        }
        if !self.default_average_margin.is_finite() {
            return Err(StratevoError::Configuration(
                "Default average margin must be finite".to_string()
            ));
        }
        if !(0.0..=100.0).contains(&self.base_confidence) {
            return Err(StratevoError::Configuration(
                "Base confidence must be between 0 and 100".to_string()
            ));
        }
        if !self.default_confidence_penalty.is_finite() || self.default_confidence_penalty < 0.0 {
            return Err(StratevoError::Configuration(
                "Confidence penalty must be non-negative".to_string()
            ));
        }
        if !self.sensitivity_change_pct.is_finite() || self.sensitivity_change_pct == 0.0 {
            return Err(StratevoError::Configuration(
                "Sensitivity change must be a non-zero percentage".to_string()
            ));
        }
        for multiplier in [
            self.optimistic_multiplier,
            self.realistic_multiplier,
            self.pessimistic_multiplier,
        ] {
            if !multiplier.is_finite() || multiplier <= 0.0 {
                return Err(StratevoError::Configuration(
                    "Assumption multipliers must be positive".to_string()
                ));
            }
        }
        Ok(())
    }
}

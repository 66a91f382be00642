// src/engines/metrics/fitness.rs
use crate::config::FitnessFunction;
use crate::types::SimulatedScenario;

pub struct FitnessMetrics;

impl FitnessMetrics {
    /// Scalar score of a scenario under the chosen objective. Each objective is
    /// a fixed weighted sum brought to a comparable scale; the result is never
    /// negative or non-finite.
    pub fn calculate(function: FitnessFunction, scenario: &SimulatedScenario) -> f64 {
        let raw = match function {
            FitnessFunction::ProfitMaximization => Self::profit_maximization(scenario),
            FitnessFunction::RiskMinimization => Self::risk_minimization(scenario),
            FitnessFunction::Growth => Self::growth(scenario),
            FitnessFunction::Balanced => Self::balanced(scenario),
        };

        if raw.is_finite() {
            raw.max(0.0)
        } else {
            0.0
        }
    }

    fn profit_maximization(scenario: &SimulatedScenario) -> f64 {
        let p = &scenario.projected;
        (p.profit * 0.5 + p.margin * 10.0 * 0.3 + scenario.confidence_level * 0.2) / 100.0
    }

    fn risk_minimization(scenario: &SimulatedScenario) -> f64 {
        let p = &scenario.projected;
        ((100.0 - p.risk_score) * 0.5 + p.margin * 5.0 * 0.3 + scenario.confidence_level * 0.2)
            / 100.0
    }

    fn growth(scenario: &SimulatedScenario) -> f64 {
        let p = &scenario.projected;
        (p.growth_rate * 20.0 * 0.4 + (p.revenue / 10_000.0) * 0.4 + scenario.confidence_level * 0.2)
            / 100.0
    }

    fn balanced(scenario: &SimulatedScenario) -> f64 {
        let p = &scenario.projected;
        ((p.profit / 1000.0) * 0.3
            + p.margin * 5.0 * 0.2
            + (100.0 - p.risk_score) * 0.2
            + (p.cash_flow / 1000.0) * 0.2
            + scenario.confidence_level * 0.1)
            / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectedResults;
    use std::collections::BTreeMap;

    fn scenario(profit: f64, margin: f64, risk: f64) -> SimulatedScenario {
        SimulatedScenario {
            content_hash: 0,
            assumptions: BTreeMap::new(),
            projected: ProjectedResults {
                revenue: 100_000.0,
                profit,
                margin,
                cash_flow: profit,
                risk_score: risk,
                growth_rate: 0.0,
            },
            confidence_level: 90.0,
            defaults_applied: Vec::new(),
            sensitivity: Vec::new(),
            recommendation_score: 0.0,
        }
    }

    #[test]
    fn test_balanced_weights() {
        let s = scenario(30_000.0, 30.0, 85.0);
        // (30*0.3 + 150*0.2 + 15*0.2 + 30*0.2 + 90*0.1) / 100
        let expected = (9.0 + 30.0 + 3.0 + 6.0 + 9.0) / 100.0;
        assert!((FitnessMetrics::calculate(FitnessFunction::Balanced, &s) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_objectives_rank_differently() {
        let rich_risky = scenario(60_000.0, 40.0, 95.0);
        let lean_safe = scenario(5_000.0, 20.0, 10.0);

        let profit = FitnessFunction::ProfitMaximization;
        let risk = FitnessFunction::RiskMinimization;
        assert!(FitnessMetrics::calculate(profit, &rich_risky) > FitnessMetrics::calculate(profit, &lean_safe));
        assert!(FitnessMetrics::calculate(risk, &lean_safe) > FitnessMetrics::calculate(risk, &rich_risky));
    }

    #[test]
    fn test_never_negative() {
        let losing = scenario(-500_000.0, -80.0, 100.0);
        for function in [
            FitnessFunction::ProfitMaximization,
            FitnessFunction::RiskMinimization,
            FitnessFunction::Growth,
            FitnessFunction::Balanced,
        ] {
            assert!(FitnessMetrics::calculate(function, &losing) >= 0.0);
        }
    }
}

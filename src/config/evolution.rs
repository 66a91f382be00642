use super::traits::ConfigSection;
use crate::engines::generation::genome::{default_gene_templates, GeneKind, GeneTemplate, GeneValue};
use crate::error::StratevoError;
use crate::types::ProjectedResults;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticEvolutionConfig {
    pub population_size: usize,
    pub generation_limit: u32,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elitism_rate: f64,
    pub fitness_function: FitnessFunction,
    pub constraints: Vec<GeneticConstraint>,
    /// Reporting only; never read by the optimizer.
    pub target_metrics: Vec<String>,
    pub tournament_size: usize,
    /// Offspring attempts allowed per population slot before a generation fails.
    pub constraint_retry_limit: usize,
    pub seed: Option<u64>,
    pub genes: Vec<GeneTemplate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessFunction {
    ProfitMaximization,
    RiskMinimization,
    Growth,
    #[default]
    Balanced,
}

/// A bound a chromosome must respect to enter a generation.
///
/// `metric` names a gene first; if no gene has that name it is read from the
/// chromosome's projected scenario (`revenue`, `profit`, `margin`,
/// `cash_flow`, `risk_score`, `growth_rate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticConstraint {
    pub metric: String,
    pub rule: ConstraintRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", content = "value")]
pub enum ConstraintRule {
    #[serde(rename = ">")]
    GreaterThan(f64),
    #[serde(rename = "<")]
    LessThan(f64),
    #[serde(rename = ">=")]
    AtLeast(f64),
    #[serde(rename = "<=")]
    AtMost(f64),
    #[serde(rename = "==")]
    Equals(f64),
    #[serde(rename = "between")]
    Between(f64, f64),
}

const EQUALITY_TOLERANCE: f64 = 1e-9;

impl ConstraintRule {
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            ConstraintRule::GreaterThan(bound) => value > bound,
            ConstraintRule::LessThan(bound) => value < bound,
            ConstraintRule::AtLeast(bound) => value >= bound,
            ConstraintRule::AtMost(bound) => value <= bound,
            ConstraintRule::Equals(bound) => {
                (value - bound).abs() <= EQUALITY_TOLERANCE * bound.abs().max(1.0)
            }
            ConstraintRule::Between(min, max) => value >= min && value <= max,
        }
    }

    fn bounds(&self) -> Vec<f64> {
        match *self {
            ConstraintRule::GreaterThan(b)
            | ConstraintRule::LessThan(b)
            | ConstraintRule::AtLeast(b)
            | ConstraintRule::AtMost(b)
            | ConstraintRule::Equals(b) => vec![b],
            ConstraintRule::Between(min, max) => vec![min, max],
        }
    }
}

impl std::fmt::Display for GeneticConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rule {
            ConstraintRule::GreaterThan(b) => write!(f, "{} > {}", self.metric, b),
            ConstraintRule::LessThan(b) => write!(f, "{} < {}", self.metric, b),
            ConstraintRule::AtLeast(b) => write!(f, "{} >= {}", self.metric, b),
            ConstraintRule::AtMost(b) => write!(f, "{} <= {}", self.metric, b),
            ConstraintRule::Equals(b) => write!(f, "{} == {}", self.metric, b),
            ConstraintRule::Between(min, max) => {
                write!(f, "{} between {} and {}", self.metric, min, max)
            }
        }
    }
}

impl Default for GeneticEvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generation_limit: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            elitism_rate: 0.1,
            fitness_function: FitnessFunction::Balanced,
            constraints: Vec::new(),
            target_metrics: vec![
                "profit".to_string(),
                "margin".to_string(),
                "cashflow".to_string(),
            ],
            tournament_size: 5,
            constraint_retry_limit: 100,
            seed: None,
            genes: default_gene_templates(),
        }
    }
}

impl GeneticEvolutionConfig {
    pub fn elite_count(&self) -> usize {
        (self.population_size as f64 * self.elitism_rate).floor() as usize
    }

    /// Total offspring attempts a single generation may spend.
    pub fn attempt_budget(&self) -> usize {
        self.constraint_retry_limit.saturating_mul(self.population_size)
    }

    fn validate_genes(&self) -> Result<(), StratevoError> {
        if self.genes.is_empty() {
            return Err(StratevoError::Configuration(
                "Gene template set must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for template in &self.genes {
            if !seen.insert(template.name.as_str()) {
                return Err(StratevoError::Configuration(format!(
                    "Duplicate gene template: {}",
                    template.name
                )));
            }
            if !template.weight.is_finite() {
                return Err(StratevoError::Configuration(format!(
                    "Gene {} has a non-finite weight",
                    template.name
                )));
            }
            if let GeneKind::Ranged { min, max } = template.kind {
                let width = max - min;
                if !min.is_finite() || !max.is_finite() || !width.is_finite() || min > max {
                    return Err(StratevoError::Configuration(format!(
                        "Gene {} has an invalid range [{}, {}]",
                        template.name, min, max
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_constraints(&self) -> Result<(), StratevoError> {
        for constraint in &self.constraints {
            let known_gene = self.genes.iter().any(|g| g.name == constraint.metric);
            let known_metric = ProjectedResults::METRIC_NAMES.contains(&constraint.metric.as_str());
            if !known_gene && !known_metric {
                return Err(StratevoError::Configuration(format!(
                    "Constraint references unknown metric: {}",
                    constraint.metric
                )));
            }
            let label_gene = self.genes.iter().any(|g| {
                g.name == constraint.metric
                    && matches!(g.kind, GeneKind::Fixed(GeneValue::Label(_)))
            });
            if label_gene {
                return Err(StratevoError::Configuration(format!(
                    "Constraint on {} compares a text gene",
                    constraint.metric
                )));
            }
            if constraint.rule.bounds().iter().any(|b| !b.is_finite()) {
                return Err(StratevoError::Configuration(format!(
                    "Constraint on {} has a non-finite bound",
                    constraint.metric
                )));
            }
            if let ConstraintRule::Between(min, max) = constraint.rule {
                if min > max {
                    return Err(StratevoError::Configuration(format!(
                        "Constraint on {} has inverted bounds [{}, {}]",
                        constraint.metric, min, max
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ConfigSection for GeneticEvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), StratevoError> {
        if self.population_size < 2 {
            return Err(StratevoError::Configuration(
                "Population size must be at least 2".to_string()
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(StratevoError::Configuration(
                "Mutation rate must be between 0 and 1".to_string()
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(StratevoError::Configuration(
                "Crossover rate must be between 0 and 1".to_string()
            ));
        }
        if !(0.0..1.0).contains(&self.elitism_rate) {
            return Err(StratevoError::Configuration(
                "Elitism rate must be in [0, 1)".to_string()
            ));
        }
        if self.tournament_size == 0 {
            return Err(StratevoError::Configuration(
                "Tournament size must be at least 1".to_string()
            ));
        }
        if self.constraint_retry_limit == 0 {
            return Err(StratevoError::Configuration(
                "Constraint retry limit must be at least 1".to_string()
            ));
        }
        self.validate_genes()?;
        self.validate_constraints()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::GeneCategory;

    #[test]
    fn test_default_is_valid() {
        assert!(GeneticEvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_tiny_population() {
        let config = GeneticEvolutionConfig {
            population_size: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StratevoError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_bad_rates() {
        for (mutation, crossover) in [(-0.1, 0.5), (1.5, 0.5), (0.1, 1.01), (0.1, -2.0)] {
            let config = GeneticEvolutionConfig {
                mutation_rate: mutation,
                crossover_rate: crossover,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} / {}", mutation, crossover);
        }
    }

    #[test]
    fn test_rejects_empty_genes() {
        let config = GeneticEvolutionConfig {
            genes: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_overflowing_range() {
        let config = GeneticEvolutionConfig {
            genes: vec![GeneTemplate {
                name: "wide".to_string(),
                category: GeneCategory::Pricing,
                kind: GeneKind::Ranged {
                    min: -1e308,
                    max: 1e308,
                },
                mutable: true,
                weight: 0.1,
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StratevoError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_constraint_metric() {
        let config = GeneticEvolutionConfig {
            constraints: vec![GeneticConstraint {
                metric: "headcount".to_string(),
                rule: ConstraintRule::AtLeast(1.0),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneticEvolutionConfig {
            constraints: vec![GeneticConstraint {
                metric: "risk_score".to_string(),
                rule: ConstraintRule::AtMost(80.0),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rule_semantics() {
        assert!(ConstraintRule::GreaterThan(1.0).holds(1.5));
        assert!(!ConstraintRule::GreaterThan(1.0).holds(1.0));
        assert!(ConstraintRule::AtLeast(1.0).holds(1.0));
        assert!(ConstraintRule::LessThan(2.0).holds(1.0));
        assert!(ConstraintRule::AtMost(2.0).holds(2.0));
        assert!(ConstraintRule::Equals(1.0).holds(1.0));
        assert!(!ConstraintRule::Equals(1.0).holds(1.01));
        assert!(ConstraintRule::Between(20.0, 40.0).holds(20.0));
        assert!(ConstraintRule::Between(20.0, 40.0).holds(40.0));
        assert!(!ConstraintRule::Between(20.0, 40.0).holds(40.5));
    }

    #[test]
    fn test_constraint_from_toml() {
        let parsed: GeneticEvolutionConfig = toml::from_str(
            r#"
            population_size = 20
            fitness_function = "risk_minimization"

            [[constraints]]
            metric = "payment_term_days"
            rule = { operator = "between", value = [20.0, 45.0] }
            "#,
        )
        .unwrap();

        assert_eq!(parsed.population_size, 20);
        assert_eq!(parsed.fitness_function, FitnessFunction::RiskMinimization);
        assert_eq!(parsed.constraints[0].rule, ConstraintRule::Between(20.0, 45.0));
        assert_eq!(parsed.genes.len(), default_gene_templates().len());
    }
}

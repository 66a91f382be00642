use crate::config::GeneticConstraint;
use crate::engines::evaluation::simulator::SimulationFrame;
use crate::engines::generation::genome::StrategyChromosome;

/// Value a constraint is checked against: the gene of that name if present,
/// otherwise the projected scenario metric.
fn resolve_metric(
    chromosome: &StrategyChromosome,
    metric: &str,
    frame: &SimulationFrame,
) -> Option<f64> {
    match chromosome.gene(metric) {
        Some(gene) => gene.value.as_f64(),
        None => frame.scenario(chromosome).projected.metric(metric),
    }
}

/// First constraint the chromosome breaks, if any. A metric that cannot be
/// resolved counts as a violation.
pub fn first_violation<'a>(
    chromosome: &StrategyChromosome,
    constraints: &'a [GeneticConstraint],
    frame: &SimulationFrame,
) -> Option<&'a GeneticConstraint> {
    constraints.iter().find(|constraint| {
        match resolve_metric(chromosome, &constraint.metric, frame) {
            Some(value) => !constraint.rule.holds(value),
            None => true,
        }
    })
}

pub fn satisfies_constraints(
    chromosome: &StrategyChromosome,
    constraints: &[GeneticConstraint],
    frame: &SimulationFrame,
) -> bool {
    first_violation(chromosome, constraints, frame).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintRule, SimulationConfig};
    use crate::engines::evaluation::simulator::ScenarioSimulator;
    use crate::engines::generation::genome::{default_gene_templates, ChromosomeId};
    use crate::engines::generation::operators::random_chromosome;
    use crate::types::BusinessSnapshot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chromosome_with_margin(margin: f64) -> StrategyChromosome {
        let mut rng = StdRng::seed_from_u64(21);
        let mut c = random_chromosome(&default_gene_templates(), ChromosomeId(1), 0, &mut rng);
        c.genes[0].set_numeric(margin);
        c
    }

    #[test]
    fn test_gene_and_scenario_constraints() {
        let simulator = ScenarioSimulator::new(
            BusinessSnapshot::with_sales(100_000.0, 30.0),
            SimulationConfig::default(),
        );
        let frame = simulator.frame();
        let c = chromosome_with_margin(20.0);

        let gene_rule = vec![GeneticConstraint {
            metric: "base_margin_percentage".to_string(),
            rule: ConstraintRule::AtLeast(25.0),
        }];
        assert_eq!(first_violation(&c, &gene_rule, &frame), Some(&gene_rule[0]));
        assert!(satisfies_constraints(&chromosome_with_margin(30.0), &gene_rule, &frame));

        let revenue = frame.scenario(&c).projected.revenue;
        let scenario_rule = vec![GeneticConstraint {
            metric: "revenue".to_string(),
            rule: ConstraintRule::Between(revenue - 1.0, revenue + 1.0),
        }];
        assert!(satisfies_constraints(&c, &scenario_rule, &frame));
    }

    #[test]
    fn test_flag_constraint_uses_numeric_view() {
        let simulator = ScenarioSimulator::new(BusinessSnapshot::default(), SimulationConfig::default());
        let frame = simulator.frame();
        let mut c = chromosome_with_margin(30.0);
        let flag = c.genes.iter_mut().find(|g| g.name == "dynamic_pricing_enabled").unwrap();
        flag.value = crate::engines::generation::genome::GeneValue::Flag(true);

        let rule = vec![GeneticConstraint {
            metric: "dynamic_pricing_enabled".to_string(),
            rule: ConstraintRule::Equals(1.0),
        }];
        assert!(satisfies_constraints(&c, &rule, &frame));
    }
}

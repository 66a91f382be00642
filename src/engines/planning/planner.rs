use crate::config::GeneticConstraint;
use crate::engines::planning::playbook::{self, PlayEntry, RiskTier, TimeFrame};
use crate::types::BusinessSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapDirection {
    Increase,
    Decrease,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStep {
    pub action: String,
    /// Portion of the gap this step should close, in metric units.
    pub expected_impact: f64,
    pub impact_share: f64,
    pub risk: RiskTier,
    pub dependencies: Vec<String>,
    pub time_frame: TimeFrame,
    pub auto_executable: bool,
}

impl OptimizationStep {
    fn from_entry(entry: &PlayEntry, gap: f64) -> Self {
        Self {
            action: entry.action.to_string(),
            expected_impact: gap * entry.share,
            impact_share: entry.share,
            risk: entry.risk,
            dependencies: entry.dependencies.iter().map(|d| d.to_string()).collect(),
            time_frame: entry.time_frame,
            auto_executable: entry.auto_executable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricOptimizationPlan {
    pub metric: String,
    pub current_value: f64,
    pub target_value: f64,
    pub gap: f64,
    pub direction: GapDirection,
    pub steps: Vec<OptimizationStep>,
    pub estimated_days: u32,
    /// Mean risk-tier confidence of the steps, 0-100.
    pub confidence: f64,
    /// Configured constraints that name this metric.
    pub constraints: Vec<String>,
}

/// Current value of a plannable metric. Missing snapshot figures read as 0.
pub fn current_metric_value(metric: &str, snapshot: &BusinessSnapshot) -> f64 {
    let value = match metric {
        "margin" => snapshot.average_margin,
        "cashflow" | "cash_flow" => snapshot.monthly_cash_flow,
        "revenue" | "sales" => snapshot.monthly_sales,
        "rotation" => match (snapshot.monthly_sales, snapshot.inventory_value) {
            (Some(sales), Some(inventory)) if inventory > 0.0 => Some(sales * 12.0 / inventory),
            _ => None,
        },
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => v,
        _ => {
            log::warn!("No current value for metric '{}', assuming 0", metric);
            0.0
        }
    }
}

fn playbook_for(metric: &str, gap: f64) -> Vec<OptimizationStep> {
    let entries: &[PlayEntry] = match metric {
        "margin" if gap > 0.0 => playbook::MARGIN_INCREASE,
        "cashflow" | "cash_flow" => playbook::CASH_FLOW,
        "rotation" => playbook::ROTATION,
        _ => &[],
    };

    if entries.is_empty() {
        let mut step = OptimizationStep::from_entry(&playbook::FALLBACK, gap);
        step.action = format!("Detailed analysis of {}", metric);
        return vec![step];
    }
    entries
        .iter()
        .map(|entry| OptimizationStep::from_entry(entry, gap))
        .collect()
}

/// Build an ordered remediation plan to move `metric` from its current value
/// towards `target`.
pub fn plan_metric(
    metric: &str,
    target: f64,
    snapshot: &BusinessSnapshot,
    constraints: &[GeneticConstraint],
) -> MetricOptimizationPlan {
    let current_value = current_metric_value(metric, snapshot);
    let gap = target - current_value;
    let direction = if gap > 0.0 {
        GapDirection::Increase
    } else if gap < 0.0 {
        GapDirection::Decrease
    } else {
        GapDirection::Hold
    };

    let steps = playbook_for(metric, gap);
    let estimated_days = steps.iter().map(|s| s.time_frame.days()).sum();
    let confidence = if steps.is_empty() {
        0.0
    } else {
        steps.iter().map(|s| s.risk.confidence()).sum::<f64>() / steps.len() as f64 * 100.0
    };

    let plan = MetricOptimizationPlan {
        metric: metric.to_string(),
        current_value,
        target_value: target,
        gap,
        direction,
        estimated_days,
        confidence,
        constraints: constraints
            .iter()
            .filter(|c| c.metric == metric)
            .map(|c| c.to_string())
            .collect(),
        steps,
    };

    log::info!(
        "Plan for {}: {:.2} -> {:.2} in {} steps (~{} days)",
        plan.metric,
        plan.current_value,
        plan.target_value,
        plan.steps.len(),
        plan.estimated_days
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintRule;

    #[test]
    fn test_margin_increase_impacts_sum_to_gap() {
        let snapshot = BusinessSnapshot::with_sales(100_000.0, 30.0);
        let plan = plan_metric("margin", 40.0, &snapshot, &[]);

        assert_eq!(plan.current_value, 30.0);
        assert_eq!(plan.gap, 10.0);
        assert_eq!(plan.direction, GapDirection::Increase);
        assert_eq!(plan.steps.len(), 3);
        let total: f64 = plan.steps.iter().map(|s| s.expected_impact).sum();
        assert!((total - plan.gap).abs() < 1e-9);
        assert_eq!(plan.steps[1].expected_impact, 4.0);
        assert!(plan.steps[1].auto_executable);
        assert_eq!(plan.estimated_days, 14 + 7 + 30);
        assert!((plan.confidence - (0.9 + 0.7 + 0.7) / 3.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_margin_decrease_falls_back() {
        let snapshot = BusinessSnapshot::with_sales(100_000.0, 30.0);
        let plan = plan_metric("margin", 25.0, &snapshot, &[]);
        assert_eq!(plan.direction, GapDirection::Decrease);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, "Detailed analysis of margin");
        assert_eq!(plan.steps[0].expected_impact, -1.0);
    }

    #[test]
    fn test_cashflow_and_rotation() {
        let snapshot = BusinessSnapshot {
            monthly_cash_flow: Some(20_000.0),
            monthly_sales: Some(50_000.0),
            inventory_value: Some(100_000.0),
            ..Default::default()
        };

        let cash = plan_metric("cashflow", 30_000.0, &snapshot, &[]);
        assert_eq!(cash.steps.len(), 2);
        assert_eq!(cash.steps[0].expected_impact, 4_000.0);
        assert_eq!(cash.steps[1].dependencies, vec!["supplier_relationships"]);
        assert_eq!(cash.estimated_days, 14 + 21);

        let rotation = plan_metric("rotation", 8.0, &snapshot, &[]);
        assert_eq!(rotation.current_value, 6.0);
        assert!(rotation.steps.iter().all(|s| s.auto_executable));
    }

    #[test]
    fn test_unknown_metric_and_missing_values() {
        let plan = plan_metric("loyalty", 5.0, &BusinessSnapshot::default(), &[]);
        assert_eq!(plan.current_value, 0.0);
        assert_eq!(plan.steps.len(), 1);
        assert!((plan.steps[0].expected_impact - 1.0).abs() < 1e-12);
        assert_eq!(plan.estimated_days, 7);
        assert!((plan.confidence - 90.0).abs() < 1e-9);

        // no inventory value, no rotation
        assert_eq!(current_metric_value("rotation", &BusinessSnapshot::with_sales(1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_matching_constraints_listed() {
        let constraints = vec![
            GeneticConstraint {
                metric: "margin".to_string(),
                rule: ConstraintRule::AtLeast(20.0),
            },
            GeneticConstraint {
                metric: "revenue".to_string(),
                rule: ConstraintRule::GreaterThan(0.0),
            },
        ];
        let plan = plan_metric("margin", 35.0, &BusinessSnapshot::with_sales(1.0, 30.0), &constraints);
        assert_eq!(plan.constraints.len(), 1);
        assert!(plan.constraints[0].contains("margin"));
    }
}

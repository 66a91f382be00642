//! Fixed remediation playbooks, one per supported metric.
//!
//! Entries are listed in execution order. `share` is the fraction of the
//! metric gap the step is expected to close.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Confidence contribution of a step at this tier (0-1).
    pub fn confidence(&self) -> f64 {
        match self {
            RiskTier::Low => 0.9,
            RiskTier::Medium => 0.7,
            RiskTier::High => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "unit", content = "count")]
pub enum TimeFrame {
    Days(u32),
    Weeks(u32),
    Months(u32),
}

impl TimeFrame {
    pub fn days(&self) -> u32 {
        match *self {
            TimeFrame::Days(n) => n,
            TimeFrame::Weeks(n) => n * 7,
            TimeFrame::Months(n) => n * 30,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, unit) = match *self {
            TimeFrame::Days(n) => (n, "day"),
            TimeFrame::Weeks(n) => (n, "week"),
            TimeFrame::Months(n) => (n, "month"),
        };
        if n == 1 {
            write!(f, "{} {}", n, unit)
        } else {
            write!(f, "{} {}s", n, unit)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlayEntry {
    pub action: &'static str,
    pub share: f64,
    pub risk: RiskTier,
    pub dependencies: &'static [&'static str],
    pub time_frame: TimeFrame,
    pub auto_executable: bool,
}

pub const MARGIN_INCREASE: &[PlayEntry] = &[
    PlayEntry {
        action: "Cut freight costs by 10-15%",
        share: 0.3,
        risk: RiskTier::Low,
        dependencies: &["negotiation_with_carriers"],
        time_frame: TimeFrame::Weeks(2),
        auto_executable: false,
    },
    PlayEntry {
        action: "Reprice slow-moving products",
        share: 0.4,
        risk: RiskTier::Medium,
        dependencies: &["market_analysis"],
        time_frame: TimeFrame::Weeks(1),
        auto_executable: true,
    },
    PlayEntry {
        action: "Shift the product mix towards high-margin lines",
        share: 0.3,
        risk: RiskTier::Medium,
        dependencies: &["inventory_analysis"],
        time_frame: TimeFrame::Months(1),
        auto_executable: false,
    },
];

pub const CASH_FLOW: &[PlayEntry] = &[
    PlayEntry {
        action: "Accelerate collection of receivables older than 30 days",
        share: 0.4,
        risk: RiskTier::Low,
        dependencies: &["collection_team"],
        time_frame: TimeFrame::Weeks(2),
        auto_executable: true,
    },
    PlayEntry {
        action: "Renegotiate payment terms with suppliers",
        share: 0.3,
        risk: RiskTier::Medium,
        dependencies: &["supplier_relationships"],
        time_frame: TimeFrame::Weeks(3),
        auto_executable: false,
    },
];

pub const ROTATION: &[PlayEntry] = &[
    PlayEntry {
        action: "Promote stagnant products",
        share: 0.5,
        risk: RiskTier::Low,
        dependencies: &["marketing_budget"],
        time_frame: TimeFrame::Weeks(1),
        auto_executable: true,
    },
    PlayEntry {
        action: "Recalibrate reorder points against actual demand",
        share: 0.5,
        risk: RiskTier::Low,
        dependencies: &["demand_forecast"],
        time_frame: TimeFrame::Weeks(1),
        auto_executable: true,
    },
];

/// Share and shape of the single step used when no playbook applies.
pub const FALLBACK: PlayEntry = PlayEntry {
    action: "Detailed analysis",
    share: 0.2,
    risk: RiskTier::Low,
    dependencies: &[],
    time_frame: TimeFrame::Weeks(1),
    auto_executable: false,
};

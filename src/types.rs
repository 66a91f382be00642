use crate::engines::generation::genome::GeneValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction of a tracked business figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

/// Read-only snapshot of the host's business context.
///
/// Fields the simulator depends on are optional; when absent (or not finite)
/// the simulator falls back to the defaults in `SimulationConfig` and lowers
/// the confidence of the resulting scenario. Aliases accept the host's
/// original field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSnapshot {
    // Capital
    #[serde(alias = "capitalTotal")]
    pub total_capital: f64,
    #[serde(alias = "utilidadesMes")]
    pub monthly_profit: f64,
    #[serde(alias = "flujoCajaMes")]
    pub monthly_cash_flow: Option<f64>,
    #[serde(alias = "tendenciaCapital")]
    pub capital_trend: Trend,

    // Sales
    #[serde(alias = "ventasHoy")]
    pub sales_today: f64,
    #[serde(alias = "ventasMes")]
    pub monthly_sales: Option<f64>,
    #[serde(alias = "ventasPromedioDiario")]
    pub average_daily_sales: f64,
    #[serde(alias = "margenPromedio")]
    pub average_margin: Option<f64>,
    #[serde(alias = "tendenciaVentas")]
    pub sales_trend: Trend,

    // Customers
    #[serde(alias = "totalClientes")]
    pub total_customers: u32,
    #[serde(alias = "clientesActivos")]
    pub active_customers: u32,
    #[serde(alias = "clientesConDeuda")]
    pub customers_with_debt: u32,
    #[serde(alias = "deudaTotalClientes")]
    pub customer_debt: f64,

    // Suppliers
    #[serde(alias = "adeudoTotalDistribuidores")]
    pub supplier_debt: f64,
    #[serde(alias = "ordenesEnTransito")]
    pub orders_in_transit: u32,

    // Inventory
    #[serde(alias = "totalProductos")]
    pub total_products: u32,
    #[serde(alias = "productosBajoStock")]
    pub low_stock_products: u32,
    #[serde(alias = "valorInventario")]
    pub inventory_value: Option<f64>,
}

impl BusinessSnapshot {
    /// Snapshot with just the two figures the projection is built on.
    pub fn with_sales(monthly_sales: f64, average_margin: f64) -> Self {
        Self {
            monthly_sales: Some(monthly_sales),
            average_margin: Some(average_margin),
            ..Self::default()
        }
    }
}

/// Headline figures of a projected month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedResults {
    pub revenue: f64,
    pub profit: f64,
    pub margin: f64,
    pub cash_flow: f64,
    pub risk_score: f64,
    pub growth_rate: f64,
}

impl ProjectedResults {
    /// Lookup by metric name, as used by constraints.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "revenue" => Some(self.revenue),
            "profit" => Some(self.profit),
            "margin" => Some(self.margin),
            "cash_flow" | "cashflow" => Some(self.cash_flow),
            "risk_score" => Some(self.risk_score),
            "growth_rate" => Some(self.growth_rate),
            _ => None,
        }
    }

    pub const METRIC_NAMES: [&'static str; 7] = [
        "revenue",
        "profit",
        "margin",
        "cash_flow",
        "cashflow",
        "risk_score",
        "growth_rate",
    ];
}

/// Effect of nudging one gene on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub variable: String,
    pub change_pct: f64,
    pub impact_on_profit_pct: f64,
    pub impact_on_risk_pct: f64,
}

/// Deterministic projection of one strategy against one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedScenario {
    pub content_hash: u64,
    pub assumptions: BTreeMap<String, GeneValue>,
    pub projected: ProjectedResults,
    pub confidence_level: f64,
    pub defaults_applied: Vec<String>,
    pub sensitivity: Vec<SensitivityPoint>,
    pub recommendation_score: f64,
}

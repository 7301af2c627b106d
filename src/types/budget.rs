use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use super::{category::ExpenseCategory, expense::ExpenseRecord, itinerary::BudgetBreakdown};

/// Label of the synthetic row that sums every category.
pub const TOTAL_LABEL: &str = "总计";

/// Row identity in a budget comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLine {
    Category(ExpenseCategory),
    Total,
}

impl BudgetLine {
    pub fn label(self) -> &'static str {
        match self {
            BudgetLine::Category(category) => category.label(),
            BudgetLine::Total => TOTAL_LABEL,
        }
    }
}

impl Serialize for BudgetLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Over,
    Under,
    Exact,
}

impl BudgetStatus {
    pub fn from_difference(difference: f64) -> Self {
        if difference > 0.0 {
            BudgetStatus::Over
        } else if difference < 0.0 {
            BudgetStatus::Under
        } else {
            BudgetStatus::Exact
        }
    }
}

/// Planned versus actual spend for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetComparisonEntry {
    pub category: BudgetLine,
    pub budget: f64,
    pub actual: f64,
    /// `actual - budget`
    pub difference: f64,
    /// `actual / budget * 100`, or 0 when nothing was budgeted
    pub percentage: f64,
    pub status: BudgetStatus,
}

impl BudgetComparisonEntry {
    pub fn new(category: BudgetLine, budget: f64, actual: f64) -> Self {
        let difference = actual - budget;
        let percentage = if budget > 0.0 {
            actual / budget * 100.0
        } else {
            0.0
        };
        Self {
            category,
            budget,
            actual,
            difference,
            percentage,
            status: BudgetStatus::from_difference(difference),
        }
    }
}

/// One row per canonical category plus the total row.
///
/// Serializes as an object keyed by category label, with the total under `总计`.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetComparison {
    pub categories: Vec<BudgetComparisonEntry>,
    pub total: BudgetComparisonEntry,
}

impl BudgetComparison {
    pub fn entry(&self, category: ExpenseCategory) -> Option<&BudgetComparisonEntry> {
        self.categories
            .iter()
            .find(|entry| entry.category == BudgetLine::Category(category))
    }

    pub fn over_budget(&self) -> impl Iterator<Item = &BudgetComparisonEntry> {
        self.categories
            .iter()
            .filter(|entry| entry.status == BudgetStatus::Over)
    }
}

impl Serialize for BudgetComparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len() + 1))?;
        for entry in self.categories.iter().chain(std::iter::once(&self.total)) {
            map.serialize_entry(entry.category.label(), entry)?;
        }
        map.end()
    }
}

/// Inputs for the model-assisted spending analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetAnalysisRequest {
    /// Most recent first
    pub expenses: Vec<ExpenseRecord>,
    pub budget_breakdown: BudgetBreakdown,
    pub total_budget: f64,
    pub destination: String,
    pub remaining_days: i64,
}

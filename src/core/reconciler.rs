//! Budget-versus-actual arithmetic.

use std::collections::BTreeMap;

use crate::types::{
    BudgetBreakdown, BudgetComparison, BudgetComparisonEntry, BudgetLine, ExpenseCategory,
    ExpenseRecord, ExpenseStatistics,
};

/// Sum of amounts per category. Categories with no expenses are absent.
pub fn totals_by_category(expenses: &[ExpenseRecord]) -> BTreeMap<ExpenseCategory, f64> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category).or_insert(0.0) += expense.amount;
    }
    totals
}

/// Compare spend against the plan for every canonical category, plus a total row.
pub fn compare(expenses: &[ExpenseRecord], budget_breakdown: &BudgetBreakdown) -> BudgetComparison {
    let actuals = totals_by_category(expenses);

    let categories: Vec<BudgetComparisonEntry> = ExpenseCategory::ALL
        .iter()
        .map(|&category| {
            BudgetComparisonEntry::new(
                BudgetLine::Category(category),
                budget_breakdown.get(category),
                actuals.get(&category).copied().unwrap_or(0.0),
            )
        })
        .collect();

    let total_budget = categories
        .iter()
        .fold(0.0, |total, entry| total + entry.budget);
    let total_actual = total_amount(expenses);

    BudgetComparison {
        categories,
        total: BudgetComparisonEntry::new(BudgetLine::Total, total_budget, total_actual),
    }
}

/// Plain sum of amounts; an empty slice yields `0.0`.
pub fn total_amount(expenses: &[ExpenseRecord]) -> f64 {
    expenses
        .iter()
        .fold(0.0, |total, expense| total + expense.amount)
}

/// Totals, per-category sums, count and mean for a set of expenses.
pub fn statistics(expenses: &[ExpenseRecord]) -> ExpenseStatistics {
    let total_spent = total_amount(expenses);
    let expense_count = expenses.len();
    let avg_expense = if expense_count > 0 {
        total_spent / expense_count as f64
    } else {
        0.0
    };

    ExpenseStatistics {
        total_spent,
        by_category: totals_by_category(expenses),
        expense_count,
        avg_expense,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BudgetStatus;
    use serde_json::json;

    fn expense(category: ExpenseCategory, amount: f64) -> ExpenseRecord {
        ExpenseRecord::new(category, amount)
    }

    #[test]
    fn test_empty_inputs_are_exact() {
        let comparison = compare(&[], &BudgetBreakdown::default());
        assert_eq!(comparison.categories.len(), 6);
        for entry in comparison
            .categories
            .iter()
            .chain(std::iter::once(&comparison.total))
        {
            assert_eq!(entry.budget, 0.0);
            assert_eq!(entry.actual, 0.0);
            assert_eq!(entry.percentage, 0.0);
            assert_eq!(entry.status, BudgetStatus::Exact);
        }
    }

    #[test]
    fn test_food_scenario() {
        let expenses = [
            expense(ExpenseCategory::Food, 80.0),
            expense(ExpenseCategory::Food, 20.0),
        ];
        let budget = BudgetBreakdown {
            food: 150.0,
            ..Default::default()
        };

        let comparison = compare(&expenses, &budget);
        let food = comparison.entry(ExpenseCategory::Food).unwrap();
        assert_eq!(food.actual, 100.0);
        assert_eq!(food.difference, -50.0);
        assert!((food.percentage - 66.67).abs() < 0.01);
        assert_eq!(food.status, BudgetStatus::Under);

        assert_eq!(comparison.total.budget, 150.0);
        assert_eq!(comparison.total.actual, 100.0);
        assert_eq!(comparison.total.status, BudgetStatus::Under);
    }

    #[test]
    fn test_unbudgeted_spend_is_over() {
        let expenses = [expense(ExpenseCategory::Shopping, 200.0)];
        let comparison = compare(&expenses, &BudgetBreakdown::default());

        let shopping = comparison.entry(ExpenseCategory::Shopping).unwrap();
        assert_eq!(shopping.status, BudgetStatus::Over);
        assert_eq!(shopping.percentage, 0.0);
        assert_eq!(comparison.over_budget().count(), 1);
    }

    #[test]
    fn test_difference_is_exact_subtraction() {
        let amounts = [0.1, 0.2, 1e-9, 123.456, 1e12, 7.0];
        for &budget_amount in &amounts {
            for &actual in &amounts {
                let budget = BudgetBreakdown {
                    other: budget_amount,
                    ..Default::default()
                };
                let comparison = compare(&[expense(ExpenseCategory::Other, actual)], &budget);
                let entry = comparison.entry(ExpenseCategory::Other).unwrap();
                assert_eq!(entry.difference, entry.actual - entry.budget);
            }
        }
    }

    #[test]
    fn test_comparison_serializes_by_label() {
        let budget = BudgetBreakdown {
            transportation: 100.0,
            ..Default::default()
        };
        let comparison = compare(&[expense(ExpenseCategory::Transportation, 100.0)], &budget);
        let value = serde_json::to_value(&comparison).unwrap();

        assert_eq!(value.as_object().unwrap().len(), 7);
        assert_eq!(value["交通"]["status"], "exact");
        assert_eq!(value["交通"]["percentage"], json!(100.0));
        assert_eq!(value["总计"]["actual"], json!(100.0));
    }

    #[test]
    fn test_statistics_of_nothing() {
        let stats = statistics(&[]);
        assert_eq!(stats.total_spent, 0.0);
        assert!(stats.by_category.is_empty());
        assert_eq!(stats.expense_count, 0);
        assert_eq!(stats.avg_expense, 0.0);
    }

    #[test]
    fn test_statistics_groups_and_averages() {
        let stats = statistics(&[
            expense(ExpenseCategory::Food, 80.0),
            expense(ExpenseCategory::Transportation, 30.0),
            expense(ExpenseCategory::Food, 10.0),
        ]);
        assert_eq!(stats.total_spent, 120.0);
        assert_eq!(stats.expense_count, 3);
        assert_eq!(stats.avg_expense, 40.0);
        assert_eq!(stats.by_category[&ExpenseCategory::Food], 90.0);
        assert_eq!(stats.by_category.len(), 2);
    }
}

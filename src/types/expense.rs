use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::OnceLock};

use super::category::ExpenseCategory;
use crate::{
    error::{PlannerError, Result},
    schemas::{CompletionSchema, SchemaHandle},
};

/// A structured expense, either parsed from a voice utterance or read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseRecord {
    /// One of 交通/住宿/餐饮/景点/购物/其他
    pub category: ExpenseCategory,
    /// Amount spent in CNY, never negative
    pub amount: f64,
    /// Short description of the purchase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Where the money was spent, if mentioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// 现金/微信/支付宝/银行卡, if mentioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Parser confidence in [0, 1]
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl ExpenseRecord {
    pub fn new(category: ExpenseCategory, amount: f64) -> Self {
        Self {
            category,
            amount,
            description: None,
            location: None,
            payment_method: None,
            confidence: full_confidence(),
        }
    }

    /// Placeholder handed back when an utterance could not be parsed.
    pub fn unparsed(text: &str) -> Self {
        Self {
            category: ExpenseCategory::Other,
            amount: 0.0,
            description: Some(text.to_string()),
            location: None,
            payment_method: None,
            confidence: 0.0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl CompletionSchema for ExpenseRecord {
    fn schema() -> &'static SchemaHandle {
        static HANDLE: OnceLock<SchemaHandle> = OnceLock::new();
        HANDLE.get_or_init(|| {
            SchemaHandle::from_root_schema(
                "expense_record",
                "ExpenseRecord",
                schemars::schema_for!(ExpenseRecord),
            )
        })
    }
}

/// Insert payload for the `expenses` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub user_id: String,
    pub itinerary_id: String,
    pub category: ExpenseCategory,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub voice_input: bool,
}

/// Client-supplied expense before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseInput {
    pub itinerary_id: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expense_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub voice_input: bool,
}

impl ExpenseInput {
    /// Strict validation for direct entry: unlike voice parsing, nothing is coerced.
    pub fn into_new_expense(self, user_id: &str, today: NaiveDate) -> Result<NewExpense> {
        if self.itinerary_id.trim().is_empty() {
            return Err(PlannerError::InvalidRequest(
                "itinerary_id is required".to_string(),
            ));
        }
        let category = self
            .category
            .parse::<ExpenseCategory>()
            .map_err(PlannerError::InvalidRequest)?;
        validate_amount(self.amount)?;

        Ok(NewExpense {
            user_id: user_id.to_string(),
            itinerary_id: self.itinerary_id,
            category,
            amount: self.amount,
            description: non_empty(self.description),
            expense_date: self.expense_date.unwrap_or(today),
            location: non_empty(self.location),
            payment_method: non_empty(self.payment_method),
            voice_input: self.voice_input,
        })
    }
}

pub(crate) fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(PlannerError::InvalidRequest(
            "Amount must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Partial update for a stored expense; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl ExpenseUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.amount.is_none()
            && self.description.is_none()
            && self.expense_date.is_none()
            && self.location.is_none()
            && self.payment_method.is_none()
    }
}

/// An `expenses` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExpense {
    pub id: String,
    pub user_id: String,
    pub itinerary_id: String,
    #[serde(default)]
    pub expense_date: Option<NaiveDate>,
    #[serde(default)]
    pub voice_input: bool,
    #[serde(flatten)]
    pub record: ExpenseRecord,
}

/// Optional filters for listing expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub itinerary_id: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ExpenseFilter {
    pub fn for_itinerary(itinerary_id: impl Into<String>) -> Self {
        Self {
            itinerary_id: Some(itinerary_id.into()),
            ..Default::default()
        }
    }
}

/// Aggregate spend figures for a set of expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseStatistics {
    pub total_spent: f64,
    pub by_category: BTreeMap<ExpenseCategory, f64>,
    pub expense_count: usize,
    pub avg_expense: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 2).unwrap()
    }

    #[test]
    fn test_input_defaults_date_to_today() {
        let input = ExpenseInput {
            itinerary_id: "it-1".to_string(),
            category: "餐饮".to_string(),
            amount: 80.0,
            description: Some("  ".to_string()),
            ..Default::default()
        };

        let expense = input.into_new_expense("user-1", today()).unwrap();
        assert_eq!(expense.category, ExpenseCategory::Food);
        assert_eq!(expense.expense_date, today());
        assert!(expense.description.is_none());
    }

    #[test]
    fn test_input_rejects_unknown_category_and_negative_amount() {
        let bad_category = ExpenseInput {
            itinerary_id: "it-1".to_string(),
            category: "飞机".to_string(),
            amount: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_category.into_new_expense("u", today()),
            Err(PlannerError::InvalidRequest(_))
        ));

        let negative = ExpenseInput {
            itinerary_id: "it-1".to_string(),
            category: "交通".to_string(),
            amount: -1.0,
            ..Default::default()
        };
        assert!(negative.into_new_expense("u", today()).is_err());
    }

    #[test]
    fn test_stored_expense_reads_row() {
        let row = json!({
            "id": "e-1",
            "user_id": "u-1",
            "itinerary_id": "it-1",
            "category": "住宿",
            "amount": 500.0,
            "expense_date": "2025-05-01",
            "voice_input": true,
            "created_at": "2025-05-01T10:00:00Z"
        });

        let stored: StoredExpense = serde_json::from_value(row).unwrap();
        assert_eq!(stored.record.category, ExpenseCategory::Accommodation);
        assert_eq!(stored.record.confidence, 1.0);
        assert!(stored.voice_input);
    }

    #[test]
    fn test_statistics_serialize_with_labels() {
        let mut stats = ExpenseStatistics::default();
        stats.by_category.insert(ExpenseCategory::Food, 100.0);
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["by_category"]["餐饮"], 100.0);
    }
}

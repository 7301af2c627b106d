//! Expense bookkeeping on top of a [`TripStore`].

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::info;

use super::{planner::remaining_days, reconciler};
use crate::{
    error::{PlannerError, Result},
    services::store::{NewItinerary, StoredItinerary, TripStore},
    types::{
        BudgetAnalysisRequest, BudgetComparison, ExpenseFilter, ExpenseInput, ExpenseRecord,
        ExpenseStatistics, ExpenseUpdate, StoredExpense,
    },
};

#[derive(Clone, Debug)]
pub struct ExpenseLedger {
    store: Arc<dyn TripStore>,
}

impl ExpenseLedger {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn save_itinerary(&self, itinerary: &NewItinerary) -> Result<StoredItinerary> {
        let saved = self.store.insert_itinerary(itinerary).await?;
        info!(target: "trip_planner::ledger", itinerary_id = %saved.id, "itinerary saved");
        Ok(saved)
    }

    pub async fn itineraries(&self, user_id: &str) -> Result<Vec<StoredItinerary>> {
        self.store.list_itineraries(user_id).await
    }

    pub async fn itinerary(&self, user_id: &str, itinerary_id: &str) -> Result<StoredItinerary> {
        require("itinerary_id", itinerary_id)?;
        self.store
            .get_itinerary(user_id, itinerary_id)
            .await?
            .ok_or_else(|| PlannerError::NotFound("Itinerary not found".to_string()))
    }

    pub async fn delete_itinerary(&self, user_id: &str, itinerary_id: &str) -> Result<()> {
        if !self.store.delete_itinerary(user_id, itinerary_id).await? {
            return Err(PlannerError::NotFound("Itinerary not found".to_string()));
        }
        info!(target: "trip_planner::ledger", itinerary_id, "itinerary deleted");
        Ok(())
    }

    /// Record an expense dated today unless the input says otherwise.
    pub async fn add_expense(&self, user_id: &str, input: ExpenseInput) -> Result<StoredExpense> {
        self.add_expense_on(user_id, input, Local::now().date_naive())
            .await
    }

    pub async fn add_expense_on(
        &self,
        user_id: &str,
        input: ExpenseInput,
        today: NaiveDate,
    ) -> Result<StoredExpense> {
        let expense = input.into_new_expense(user_id, today)?;
        let stored = self.store.insert_expense(&expense).await?;
        info!(
            target: "trip_planner::ledger",
            expense_id = %stored.id,
            category = %stored.record.category,
            amount = stored.record.amount,
            "expense created"
        );
        Ok(stored)
    }

    pub async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> Result<Vec<StoredExpense>> {
        self.store.list_expenses(user_id, filter).await
    }

    pub async fn get_expense(&self, user_id: &str, expense_id: &str) -> Result<StoredExpense> {
        self.store
            .get_expense(user_id, expense_id)
            .await?
            .ok_or_else(expense_not_found)
    }

    /// Apply a partial update to an expense the user owns.
    pub async fn update_expense(
        &self,
        user_id: &str,
        expense_id: &str,
        update: &ExpenseUpdate,
    ) -> Result<StoredExpense> {
        let existing = self.get_expense(user_id, expense_id).await?;
        update.validate()?;
        if update.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .store
            .update_expense(user_id, expense_id, update)
            .await?
            .ok_or_else(expense_not_found)?;
        info!(target: "trip_planner::ledger", expense_id, "expense updated");
        Ok(updated)
    }

    pub async fn delete_expense(&self, user_id: &str, expense_id: &str) -> Result<()> {
        self.get_expense(user_id, expense_id).await?;
        if !self.store.delete_expense(user_id, expense_id).await? {
            return Err(expense_not_found());
        }
        info!(target: "trip_planner::ledger", expense_id, "expense deleted");
        Ok(())
    }

    pub async fn statistics(&self, user_id: &str, itinerary_id: &str) -> Result<ExpenseStatistics> {
        let records = self.itinerary_records(user_id, itinerary_id).await?;
        Ok(reconciler::statistics(&records))
    }

    /// Spend per category against the itinerary's stored budget breakdown.
    pub async fn budget_comparison(
        &self,
        user_id: &str,
        itinerary_id: &str,
    ) -> Result<BudgetComparison> {
        let itinerary = self.itinerary(user_id, itinerary_id).await?;
        let records = self.itinerary_records(user_id, itinerary_id).await?;
        Ok(reconciler::compare(&records, &itinerary.budget_breakdown()))
    }

    pub async fn analysis_request(
        &self,
        user_id: &str,
        itinerary_id: &str,
    ) -> Result<BudgetAnalysisRequest> {
        self.analysis_request_on(user_id, itinerary_id, Local::now().date_naive())
            .await
    }

    /// Inputs for [`crate::TripPlanner::analyze_budget`] from a stored itinerary and its expenses.
    pub async fn analysis_request_on(
        &self,
        user_id: &str,
        itinerary_id: &str,
        today: NaiveDate,
    ) -> Result<BudgetAnalysisRequest> {
        let itinerary = self.itinerary(user_id, itinerary_id).await?;
        let expenses = self.itinerary_records(user_id, itinerary_id).await?;

        Ok(BudgetAnalysisRequest {
            expenses,
            budget_breakdown: itinerary.budget_breakdown(),
            total_budget: itinerary.budget,
            remaining_days: remaining_days(itinerary.end_date.as_deref(), today),
            destination: itinerary.destination,
        })
    }

    async fn itinerary_records(
        &self,
        user_id: &str,
        itinerary_id: &str,
    ) -> Result<Vec<ExpenseRecord>> {
        require("itinerary_id", itinerary_id)?;
        let expenses = self
            .store
            .list_expenses(user_id, &ExpenseFilter::for_itinerary(itinerary_id))
            .await?;
        Ok(expenses.into_iter().map(|expense| expense.record).collect())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlannerError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}

fn expense_not_found() -> PlannerError {
    PlannerError::NotFound("Expense not found or unauthorized".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BudgetStatus, ExpenseCategory, NewExpense};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory store keyed the same way the database is.
    #[derive(Debug, Default)]
    struct MemoryStore {
        itineraries: Mutex<Vec<StoredItinerary>>,
        expenses: Mutex<Vec<StoredExpense>>,
    }

    #[async_trait]
    impl TripStore for MemoryStore {
        async fn insert_itinerary(&self, itinerary: &NewItinerary) -> Result<StoredItinerary> {
            let mut rows = self.itineraries.lock().unwrap();
            let row = StoredItinerary {
                id: format!("it-{}", rows.len() + 1),
                user_id: itinerary.user_id.clone(),
                title: Some(itinerary.title.clone()),
                destination: itinerary.destination.clone(),
                start_date: Some(itinerary.start_date.clone()),
                end_date: Some(itinerary.end_date.clone()),
                budget: itinerary.budget,
                people_count: Some(itinerary.people_count),
                preferences: None,
                ai_response: Some(serde_json::to_value(&itinerary.ai_response)?),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn list_itineraries(&self, user_id: &str) -> Result<Vec<StoredItinerary>> {
            let rows = self.itineraries.lock().unwrap();
            Ok(rows.iter().filter(|r| r.user_id == user_id).cloned().collect())
        }

        async fn get_itinerary(
            &self,
            user_id: &str,
            itinerary_id: &str,
        ) -> Result<Option<StoredItinerary>> {
            let rows = self.itineraries.lock().unwrap();
            Ok(rows
                .iter()
                .find(|r| r.id == itinerary_id && r.user_id == user_id)
                .cloned())
        }

        async fn delete_itinerary(&self, user_id: &str, itinerary_id: &str) -> Result<bool> {
            let mut rows = self.itineraries.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| !(r.id == itinerary_id && r.user_id == user_id));
            Ok(rows.len() != before)
        }

        async fn insert_expense(&self, expense: &NewExpense) -> Result<StoredExpense> {
            let mut rows = self.expenses.lock().unwrap();
            let mut record = ExpenseRecord::new(expense.category, expense.amount);
            record.description = expense.description.clone();
            let row = StoredExpense {
                id: format!("e-{}", rows.len() + 1),
                user_id: expense.user_id.clone(),
                itinerary_id: expense.itinerary_id.clone(),
                expense_date: Some(expense.expense_date),
                voice_input: expense.voice_input,
                record,
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn list_expenses(
            &self,
            user_id: &str,
            filter: &ExpenseFilter,
        ) -> Result<Vec<StoredExpense>> {
            let rows = self.expenses.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| r.user_id == user_id)
                .filter(|r| {
                    filter
                        .itinerary_id
                        .as_ref()
                        .map_or(true, |id| &r.itinerary_id == id)
                })
                .cloned()
                .collect())
        }

        async fn get_expense(
            &self,
            user_id: &str,
            expense_id: &str,
        ) -> Result<Option<StoredExpense>> {
            let rows = self.expenses.lock().unwrap();
            Ok(rows
                .iter()
                .find(|r| r.id == expense_id && r.user_id == user_id)
                .cloned())
        }

        async fn update_expense(
            &self,
            user_id: &str,
            expense_id: &str,
            update: &ExpenseUpdate,
        ) -> Result<Option<StoredExpense>> {
            let mut rows = self.expenses.lock().unwrap();
            let Some(row) = rows
                .iter_mut()
                .find(|r| r.id == expense_id && r.user_id == user_id)
            else {
                return Ok(None);
            };
            if let Some(amount) = update.amount {
                row.record.amount = amount;
            }
            if let Some(category) = update.category {
                row.record.category = category;
            }
            Ok(Some(row.clone()))
        }

        async fn delete_expense(&self, user_id: &str, expense_id: &str) -> Result<bool> {
            let mut rows = self.expenses.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| !(r.id == expense_id && r.user_id == user_id));
            Ok(rows.len() != before)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn input(category: &str, amount: f64) -> ExpenseInput {
        ExpenseInput {
            itinerary_id: "it-1".to_string(),
            category: category.to_string(),
            amount,
            ..Default::default()
        }
    }

    async fn ledger_with_trip() -> (ExpenseLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let ledger = ExpenseLedger::new(store.clone());
        let draft = serde_json::from_value(json!({
            "summary": "杭州三日",
            "budget_breakdown": {"food": 150, "transportation": 100}
        }))
        .unwrap();
        let itinerary = NewItinerary {
            user_id: "u-1".to_string(),
            title: "Trip to 杭州".to_string(),
            destination: "杭州".to_string(),
            start_date: "2025-05-01".to_string(),
            end_date: "2025-05-04".to_string(),
            budget: 3000.0,
            people_count: 2,
            preferences: None,
            ai_response: draft,
        };
        ledger.save_itinerary(&itinerary).await.unwrap();
        (ledger, store)
    }

    #[tokio::test]
    async fn test_add_expense_validates_before_storing() {
        let (ledger, store) = ledger_with_trip().await;

        let err = ledger
            .add_expense_on("u-1", input("机票", 10.0), today())
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        let err = ledger
            .add_expense_on("u-1", input("交通", -5.0), today())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(store.expenses.lock().unwrap().is_empty());

        let stored = ledger
            .add_expense_on("u-1", input("交通", 30.0), today())
            .await
            .unwrap();
        assert_eq!(stored.expense_date, Some(today()));
    }

    #[tokio::test]
    async fn test_other_users_rows_are_not_found() {
        let (ledger, _store) = ledger_with_trip().await;
        let stored = ledger
            .add_expense_on("u-1", input("餐饮", 80.0), today())
            .await
            .unwrap();

        let err = ledger.get_expense("u-2", &stored.id).await.unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));

        let update = ExpenseUpdate {
            amount: Some(1.0),
            ..Default::default()
        };
        assert!(ledger.update_expense("u-2", &stored.id, &update).await.is_err());
        assert!(ledger.delete_expense("u-2", &stored.id).await.is_err());
        assert!(ledger.itinerary("u-2", "it-1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (ledger, _store) = ledger_with_trip().await;
        let stored = ledger
            .add_expense_on("u-1", input("餐饮", 80.0), today())
            .await
            .unwrap();

        let negative = ExpenseUpdate {
            amount: Some(-1.0),
            ..Default::default()
        };
        assert!(ledger
            .update_expense("u-1", &stored.id, &negative)
            .await
            .unwrap_err()
            .is_client_error());

        let update = ExpenseUpdate {
            amount: Some(95.0),
            category: Some(ExpenseCategory::Shopping),
            ..Default::default()
        };
        let updated = ledger.update_expense("u-1", &stored.id, &update).await.unwrap();
        assert_eq!(updated.record.amount, 95.0);
        assert_eq!(updated.record.category, ExpenseCategory::Shopping);

        ledger.delete_expense("u-1", &stored.id).await.unwrap();
        assert!(ledger.get_expense("u-1", &stored.id).await.is_err());
    }

    #[tokio::test]
    async fn test_budget_comparison_uses_stored_breakdown() {
        let (ledger, _store) = ledger_with_trip().await;
        for amount in [80.0, 20.0] {
            ledger
                .add_expense_on("u-1", input("餐饮", amount), today())
                .await
                .unwrap();
        }

        let comparison = ledger.budget_comparison("u-1", "it-1").await.unwrap();
        let food = comparison.entry(ExpenseCategory::Food).unwrap();
        assert_eq!(food.actual, 100.0);
        assert_eq!(food.difference, -50.0);
        assert_eq!(food.status, BudgetStatus::Under);
        assert_eq!(comparison.total.budget, 250.0);

        let stats = ledger.statistics("u-1", "it-1").await.unwrap();
        assert_eq!(stats.expense_count, 2);
        assert_eq!(stats.avg_expense, 50.0);
    }

    #[tokio::test]
    async fn test_analysis_request_from_stored_trip() {
        let (ledger, _store) = ledger_with_trip().await;
        ledger
            .add_expense_on("u-1", input("交通", 30.0), today())
            .await
            .unwrap();

        let request = ledger
            .analysis_request_on("u-1", "it-1", today())
            .await
            .unwrap();
        assert_eq!(request.destination, "杭州");
        assert_eq!(request.total_budget, 3000.0);
        assert_eq!(request.remaining_days, 3);
        assert_eq!(request.budget_breakdown.food, 150.0);
        assert_eq!(request.expenses.len(), 1);

        let err = ledger.statistics("u-1", " ").await.unwrap_err();
        assert!(err.is_client_error());
    }
}

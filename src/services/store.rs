//! Persistence collaborator for itineraries and expenses.
//!
//! [`SupabaseStore`] talks to a PostgREST endpoint (`/rest/v1/<table>`).
//! Every keyed read and write is filtered by owner id, so a row owned by
//! someone else looks exactly like a missing row.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    config::PlannerConfig,
    error::{PlannerError, Result},
    types::{
        lenient, BudgetBreakdown, ExpenseFilter, ExpenseUpdate, ItineraryDraft, NewExpense,
        StoredExpense, TripRequest,
    },
};

const ITINERARIES: &str = "itineraries";
const EXPENSES: &str = "expenses";

/// Insert payload for the `itineraries` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewItinerary {
    pub user_id: String,
    pub title: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: f64,
    pub people_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    pub ai_response: ItineraryDraft,
}

impl NewItinerary {
    pub fn from_draft(user_id: &str, request: &TripRequest, draft: ItineraryDraft) -> Self {
        Self {
            user_id: user_id.to_string(),
            title: format!("Trip to {}", request.destination.trim()),
            destination: request.destination.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            budget: request.budget,
            people_count: request.people_count,
            preferences: request.preferences.clone(),
            ai_response: draft,
        }
    }
}

/// An `itineraries` row.
///
/// `ai_response` is kept as raw JSON: rows written by older clients may not
/// match the current draft shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItinerary {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub budget: f64,
    #[serde(default)]
    pub people_count: Option<u32>,
    #[serde(default)]
    pub preferences: Option<Value>,
    #[serde(default)]
    pub ai_response: Option<Value>,
}

impl StoredItinerary {
    /// Planned spend from the stored draft; absent or unreadable → all zero.
    pub fn budget_breakdown(&self) -> BudgetBreakdown {
        BudgetBreakdown::from_value(
            self.ai_response
                .as_ref()
                .and_then(|response| response.get("budget_breakdown")),
        )
    }
}

/// Keyed CRUD over the trip tables, scoped by owner.
#[async_trait]
pub trait TripStore: Send + Sync + std::fmt::Debug {
    async fn insert_itinerary(&self, itinerary: &NewItinerary) -> Result<StoredItinerary>;

    /// Newest first
    async fn list_itineraries(&self, user_id: &str) -> Result<Vec<StoredItinerary>>;

    async fn get_itinerary(
        &self,
        user_id: &str,
        itinerary_id: &str,
    ) -> Result<Option<StoredItinerary>>;

    /// `false` when nothing matched
    async fn delete_itinerary(&self, user_id: &str, itinerary_id: &str) -> Result<bool>;

    async fn insert_expense(&self, expense: &NewExpense) -> Result<StoredExpense>;

    /// Matching expenses ordered by `expense_date`, newest first
    async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> Result<Vec<StoredExpense>>;

    async fn get_expense(&self, user_id: &str, expense_id: &str) -> Result<Option<StoredExpense>>;

    async fn update_expense(
        &self,
        user_id: &str,
        expense_id: &str,
        update: &ExpenseUpdate,
    ) -> Result<Option<StoredExpense>>;

    /// `false` when nothing matched
    async fn delete_expense(&self, user_id: &str, expense_id: &str) -> Result<bool>;
}

/// [`TripStore`] backed by a Supabase (PostgREST) project.
#[derive(Clone, Debug)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            service_key: service_key.into(),
        })
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let (url, key) = config.require_store()?;
        Self::new(url, key, config.request_timeout)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Same as [`Self::request`], asking for the affected rows back.
    fn returning(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=representation")
    }

    async fn rows<T: DeserializeOwned>(&self, table: &str, builder: RequestBuilder) -> Result<Vec<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                target: "trip_planner::store",
                table,
                status = status.as_u16(),
                "database request failed"
            );
            return Err(PlannerError::Provider(format!(
                "database HTTP {} on {}: {}",
                status, table, body
            )));
        }

        let mut deserializer = serde_json::Deserializer::from_str(&body);
        let rows: Vec<T> = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            PlannerError::Provider(format!(
                "unexpected {} row at {}: {}",
                table,
                err.path(),
                err.inner()
            ))
        })?;
        debug!(target: "trip_planner::store", table, rows = rows.len(), "database request ok");
        Ok(rows)
    }

    async fn single<T: DeserializeOwned>(&self, table: &str, builder: RequestBuilder) -> Result<T> {
        self.rows(table, builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::Provider(format!("database returned no {} row", table)))
    }
}

fn eq(column: &str, value: &str) -> (String, String) {
    (column.to_string(), format!("eq.{value}"))
}

/// PostgREST query pairs for an expense listing.
fn expense_query(user_id: &str, filter: &ExpenseFilter) -> Vec<(String, String)> {
    let mut query = vec![("select".to_string(), "*".to_string()), eq("user_id", user_id)];
    if let Some(itinerary_id) = &filter.itinerary_id {
        query.push(eq("itinerary_id", itinerary_id));
    }
    if let Some(category) = filter.category {
        query.push(eq("category", category.label()));
    }
    if let Some(start) = filter.start_date {
        query.push(("expense_date".to_string(), format!("gte.{start}")));
    }
    if let Some(end) = filter.end_date {
        query.push(("expense_date".to_string(), format!("lte.{end}")));
    }
    query.push(("order".to_string(), "expense_date.desc".to_string()));
    query
}

#[async_trait]
impl TripStore for SupabaseStore {
    async fn insert_itinerary(&self, itinerary: &NewItinerary) -> Result<StoredItinerary> {
        let builder = self.returning(Method::POST, ITINERARIES).json(itinerary);
        self.single(ITINERARIES, builder).await
    }

    async fn list_itineraries(&self, user_id: &str) -> Result<Vec<StoredItinerary>> {
        let builder = self.request(Method::GET, ITINERARIES).query(&[
            ("select".to_string(), "*".to_string()),
            eq("user_id", user_id),
            ("order".to_string(), "created_at.desc".to_string()),
        ]);
        self.rows(ITINERARIES, builder).await
    }

    async fn get_itinerary(
        &self,
        user_id: &str,
        itinerary_id: &str,
    ) -> Result<Option<StoredItinerary>> {
        let builder = self.request(Method::GET, ITINERARIES).query(&[
            ("select".to_string(), "*".to_string()),
            eq("id", itinerary_id),
            eq("user_id", user_id),
        ]);
        Ok(self.rows(ITINERARIES, builder).await?.into_iter().next())
    }

    async fn delete_itinerary(&self, user_id: &str, itinerary_id: &str) -> Result<bool> {
        let builder = self
            .returning(Method::DELETE, ITINERARIES)
            .query(&[eq("id", itinerary_id), eq("user_id", user_id)]);
        let deleted: Vec<Value> = self.rows(ITINERARIES, builder).await?;
        Ok(!deleted.is_empty())
    }

    async fn insert_expense(&self, expense: &NewExpense) -> Result<StoredExpense> {
        let builder = self.returning(Method::POST, EXPENSES).json(expense);
        self.single(EXPENSES, builder).await
    }

    async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> Result<Vec<StoredExpense>> {
        let builder = self
            .request(Method::GET, EXPENSES)
            .query(&expense_query(user_id, filter));
        self.rows(EXPENSES, builder).await
    }

    async fn get_expense(&self, user_id: &str, expense_id: &str) -> Result<Option<StoredExpense>> {
        let builder = self.request(Method::GET, EXPENSES).query(&[
            ("select".to_string(), "*".to_string()),
            eq("id", expense_id),
            eq("user_id", user_id),
        ]);
        Ok(self.rows(EXPENSES, builder).await?.into_iter().next())
    }

    async fn update_expense(
        &self,
        user_id: &str,
        expense_id: &str,
        update: &ExpenseUpdate,
    ) -> Result<Option<StoredExpense>> {
        let builder = self
            .returning(Method::PATCH, EXPENSES)
            .query(&[eq("id", expense_id), eq("user_id", user_id)])
            .json(update);
        Ok(self.rows(EXPENSES, builder).await?.into_iter().next())
    }

    async fn delete_expense(&self, user_id: &str, expense_id: &str) -> Result<bool> {
        let builder = self
            .returning(Method::DELETE, EXPENSES)
            .query(&[eq("id", expense_id), eq("user_id", user_id)]);
        let deleted: Vec<Value> = self.rows(EXPENSES, builder).await?;
        Ok(!deleted.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpenseCategory, ItineraryMetadata};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_expense_query_filters() {
        let filter = ExpenseFilter {
            itinerary_id: Some("it-1".to_string()),
            category: Some(ExpenseCategory::Food),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 3),
        };
        let query = expense_query("u-1", &filter);
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        assert!(pairs.contains(&("user_id", "eq.u-1")));
        assert!(pairs.contains(&("itinerary_id", "eq.it-1")));
        assert!(pairs.contains(&("category", "eq.餐饮")));
        assert!(pairs.contains(&("expense_date", "gte.2025-05-01")));
        assert!(pairs.contains(&("expense_date", "lte.2025-05-03")));
        assert_eq!(pairs.last(), Some(&("order", "expense_date.desc")));

        assert_eq!(expense_query("u-1", &ExpenseFilter::default()).len(), 3);
    }

    #[test]
    fn test_stored_itinerary_breakdown() {
        let row: StoredItinerary = serde_json::from_value(json!({
            "id": "it-1",
            "user_id": "u-1",
            "destination": "杭州",
            "end_date": "2025-05-03",
            "budget": "3000",
            "ai_response": {"budget_breakdown": {"food": 600, "shopping": "200"}}
        }))
        .unwrap();

        assert_eq!(row.budget, 3000.0);
        let breakdown = row.budget_breakdown();
        assert_eq!(breakdown.food, 600.0);
        assert_eq!(breakdown.shopping, 200.0);
        assert_eq!(breakdown.transportation, 0.0);

        let bare: StoredItinerary =
            serde_json::from_value(json!({"id": "it-2", "user_id": "u-1"})).unwrap();
        assert_eq!(bare.budget_breakdown(), BudgetBreakdown::default());
    }

    #[test]
    fn test_new_itinerary_from_draft() {
        let request = TripRequest {
            destination: "成都".to_string(),
            start_date: "2025-05-01".to_string(),
            end_date: "2025-05-02".to_string(),
            budget: 2000.0,
            people_count: 1,
            preferences: None,
        };
        let draft = ItineraryDraft {
            summary: Some("吃货之旅".to_string()),
            metadata: Some(ItineraryMetadata::from_request(&request, 2)),
            ..Default::default()
        };

        let row = NewItinerary::from_draft("u-1", &request, draft);
        assert_eq!(row.title, "Trip to 成都");
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["ai_response"]["summary"], "吃货之旅");
        assert!(value.get("preferences").is_none());
    }
}

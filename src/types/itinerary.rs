use chrono::{DateTime, NaiveDate, Utc};
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

use super::{category::ExpenseCategory, lenient};
use crate::{
    error::{PlannerError, Result},
    schemas::{CompletionSchema, SchemaHandle},
};

/// Trip parameters supplied by the user when asking for an itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    /// ISO-8601 date (YYYY-MM-DD)
    pub start_date: String,
    /// ISO-8601 date (YYYY-MM-DD), inclusive
    pub end_date: String,
    /// Total budget in CNY
    #[serde(deserialize_with = "lenient::number")]
    pub budget: f64,
    pub people_count: u32,
    #[serde(default)]
    pub preferences: Option<String>,
}

impl TripRequest {
    /// Decode a request body, reporting the offending field on failure.
    pub fn from_value(body: Value) -> Result<Self> {
        serde_path_to_error::deserialize(body).map_err(|err| {
            PlannerError::InvalidRequest(format!(
                "trip request rejected at {}: {}",
                err.path(),
                err.inner()
            ))
        })
    }

    /// Check the request before any model call and return the parsed date range.
    pub fn validate(&self) -> Result<(NaiveDate, NaiveDate)> {
        if self.destination.trim().is_empty() {
            return Err(PlannerError::InvalidRequest(
                "Missing required field: destination".to_string(),
            ));
        }
        let start = parse_date("start_date", &self.start_date)?;
        let end = parse_date("end_date", &self.end_date)?;
        if end < start {
            return Err(PlannerError::InvalidRequest(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(PlannerError::InvalidRequest(
                "budget must be a non-negative number".to_string(),
            ));
        }
        if self.people_count == 0 {
            return Err(PlannerError::InvalidRequest(
                "people_count must be at least 1".to_string(),
            ));
        }
        Ok((start, end))
    }

    /// Inclusive number of travel days.
    pub fn total_days(&self) -> Result<i64> {
        let (start, end) = self.validate()?;
        Ok((end - start).num_days() + 1)
    }

    pub fn preferences_or_default(&self) -> &str {
        match self.preferences.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => "无特别要求",
        }
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        PlannerError::InvalidRequest(format!("{field} must be YYYY-MM-DD, got '{value}': {err}"))
    })
}

/// Planned spend per category. Missing categories read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BudgetBreakdown {
    #[serde(deserialize_with = "lenient::number")]
    pub transportation: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub accommodation: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub food: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub attractions: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub shopping: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub other: f64,
}

impl BudgetBreakdown {
    pub fn get(&self, category: ExpenseCategory) -> f64 {
        match category {
            ExpenseCategory::Transportation => self.transportation,
            ExpenseCategory::Accommodation => self.accommodation,
            ExpenseCategory::Food => self.food,
            ExpenseCategory::Attractions => self.attractions,
            ExpenseCategory::Shopping => self.shopping,
            ExpenseCategory::Other => self.other,
        }
    }

    pub fn total(&self) -> f64 {
        ExpenseCategory::ALL
            .iter()
            .fold(0.0, |total, category| total + self.get(*category))
    }

    /// Read a stored breakdown object; anything that is not an object yields all zeros.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(value) if value.is_object() => {
                serde_json::from_value(value.clone()).unwrap_or_default()
            }
            _ => Self::default(),
        }
    }
}

/// Kind of stop in a day plan. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Attraction,
    Restaurant,
    Hotel,
    Transportation,
    Other(String),
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Attraction
    }
}

impl From<String> for ItemKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "attraction" => ItemKind::Attraction,
            "restaurant" => ItemKind::Restaurant,
            "hotel" => ItemKind::Hotel,
            "transportation" => ItemKind::Transportation,
            _ => ItemKind::Other(value),
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Attraction => "attraction".to_string(),
            ItemKind::Restaurant => "restaurant".to_string(),
            ItemKind::Hotel => "hotel".to_string(),
            ItemKind::Transportation => "transportation".to_string(),
            ItemKind::Other(value) => value,
        }
    }
}

impl JsonSchema for ItemKind {
    fn schema_name() -> String {
        "ItemKind".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            enum_values: Some(vec![
                Value::from("attraction"),
                Value::from("restaurant"),
                Value::from("hotel"),
                Value::from("transportation"),
            ]),
            ..Default::default()
        }
        .into()
    }
}

/// A single scheduled stop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ItineraryItem {
    /// Start time, e.g. "09:00"
    #[serde(deserialize_with = "lenient::string")]
    pub time: String,
    #[serde(rename = "type", deserialize_with = "item_kind")]
    pub kind: ItemKind,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    /// Street address usable for navigation
    #[serde(deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(deserialize_with = "lenient::number")]
    pub estimated_cost: f64,
    /// Free-form duration, e.g. "2小时"
    #[serde(deserialize_with = "lenient::string")]
    pub duration: String,
    #[serde(deserialize_with = "lenient::string")]
    pub tips: String,
}

fn item_kind<'de, D>(deserializer: D) -> std::result::Result<ItemKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(kind) => ItemKind::from(kind),
        _ => ItemKind::default(),
    })
}

/// One day of the itinerary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DayPlan {
    /// 1-based day counter
    #[serde(deserialize_with = "lenient::count")]
    pub day: u32,
    /// ISO-8601 date of this day
    #[serde(deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(deserialize_with = "lenient::string")]
    pub theme: String,
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<ItineraryItem>,
}

impl DayPlan {
    pub fn estimated_cost(&self) -> f64 {
        self.items
            .iter()
            .fold(0.0, |total, item| total + item.estimated_cost)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AccommodationSuggestion {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(deserialize_with = "lenient::string")]
    pub price_range: String,
    #[serde(deserialize_with = "lenient::string")]
    pub features: String,
    #[serde(deserialize_with = "lenient::string")]
    pub booking_tips: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmergencyContact {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub phone: String,
}

/// Request-derived facts attached after generation. Never produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryMetadata {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub total_days: i64,
    pub budget: f64,
    pub people_count: u32,
    pub generated_at: DateTime<Utc>,
}

impl ItineraryMetadata {
    pub fn from_request(request: &TripRequest, total_days: i64) -> Self {
        Self {
            destination: request.destination.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            total_days,
            budget: request.budget,
            people_count: request.people_count,
            generated_at: Utc::now(),
        }
    }
}

/// Itinerary as produced by the model, possibly incomplete.
///
/// Keys the model left out stay `None`; keys this type does not know about
/// are kept in `extra` so the stored object round-trips unchanged. Values of
/// the wrong type are coerced or dropped field by field, so one bad entry
/// never discards the rest of the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItineraryDraft {
    /// Short trip highlight summary
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub summary: Option<String>,
    /// Planned spend per category
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional"
    )]
    pub budget_breakdown: Option<BudgetBreakdown>,
    /// Day plans in travel order
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_list"
    )]
    pub daily_itinerary: Option<Vec<DayPlan>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_list"
    )]
    pub accommodation_suggestions: Option<Vec<AccommodationSuggestion>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_strings"
    )]
    pub travel_tips: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_list"
    )]
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub metadata: Option<ItineraryMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub parse_error: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

impl ItineraryDraft {
    /// Whether this draft is the placeholder produced for unparsable output
    pub fn is_fallback(&self) -> bool {
        self.parse_error.is_some()
    }

    /// Sum of all per-item estimates across every day
    pub fn estimated_item_cost(&self) -> f64 {
        self.daily_itinerary
            .as_deref()
            .unwrap_or_default()
            .iter()
            .fold(0.0, |total, day| total + day.estimated_cost())
    }
}

impl CompletionSchema for ItineraryDraft {
    fn schema() -> &'static SchemaHandle {
        static HANDLE: OnceLock<SchemaHandle> = OnceLock::new();
        HANDLE.get_or_init(|| {
            SchemaHandle::from_root_schema(
                "itinerary_draft",
                "ItineraryDraft",
                schemars::schema_for!(ItineraryDraft),
            )
        })
    }
}

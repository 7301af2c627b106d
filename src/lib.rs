//! trip-planner-rs: the core of an AI travel planner
//!
//! Turns chat-model replies into structured itineraries and expense records,
//! and reconciles recorded spending against a planned budget. Model output is
//! never trusted: every reply goes through a forgiving extractor and comes
//! back either structured or as a deterministic fallback.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use trip_planner_rs::{PlannerConfig, TripPlanner, TripRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlannerConfig::from_env()?;
//!     let planner = TripPlanner::from_config(&config)?;
//!
//!     let request = TripRequest {
//!         destination: "杭州".to_string(),
//!         start_date: "2025-05-01".to_string(),
//!         end_date: "2025-05-03".to_string(),
//!         budget: 5000.0,
//!         people_count: 2,
//!         preferences: Some("喜欢美食".to_string()),
//!     };
//!
//!     let response = planner.generate_itinerary(&request).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod schemas;
pub mod services;
pub mod types;

pub use config::{ModelSettings, PlannerConfig};
pub use core::{
    compare, extract, normalize, parse_expense, remaining_days, statistics, ExpenseLedger,
    ParseResult, TripPlanner,
};
pub use error::{PlannerError, Result};
pub use schemas::{CompletionSchema, SchemaHandle};
pub use services::{
    ChatCompletionModel, ChatModel, OpenAIClient, SpeechRecognizer, SupabaseStore, TripStore,
};
pub use types::{
    ApiResponse, BudgetAnalysisRequest, BudgetBreakdown, BudgetComparison, BudgetComparisonEntry,
    BudgetStatus, ExpenseCategory, ExpenseRecord, ExpenseStatistics, ItineraryDraft, TripRequest,
};

#[cfg(feature = "cli")]
pub mod cli;

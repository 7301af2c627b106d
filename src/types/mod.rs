pub mod budget;
pub mod category;
pub mod expense;
pub mod itinerary;
pub(crate) mod lenient;
pub mod response;

pub use budget::{
    BudgetAnalysisRequest, BudgetComparison, BudgetComparisonEntry, BudgetLine, BudgetStatus,
};
pub use category::ExpenseCategory;
pub use expense::{
    ExpenseFilter, ExpenseInput, ExpenseRecord, ExpenseStatistics, ExpenseUpdate, NewExpense,
    StoredExpense,
};
pub use itinerary::{
    AccommodationSuggestion, BudgetBreakdown, DayPlan, EmergencyContact, ItemKind, ItineraryDraft,
    ItineraryItem, ItineraryMetadata, TripRequest,
};
pub use response::{deserialize_structured, ApiResponse};

pub mod expense_parser;
pub mod extractor;
pub mod ledger;
pub mod normalizer;
pub mod planner;
pub mod reconciler;

pub use expense_parser::{coerce_expense, parse_expense};
pub use extractor::{extract, ParseResult};
pub use ledger::ExpenseLedger;
pub use normalizer::{fallback_draft, normalize};
pub use planner::{remaining_days, TripPlanner};
pub use reconciler::{compare, statistics, totals_by_category};

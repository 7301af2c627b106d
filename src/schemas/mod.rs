//! JSON schemas for model-produced payloads

pub mod schema;
pub mod validation;

pub use schema::{CompletionSchema, SchemaHandle};
pub use validation::{schema_violations, warn_on_violations};

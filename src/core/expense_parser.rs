//! Voice utterance → [`ExpenseRecord`].

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::extractor::extract;
use crate::{
    error::{PlannerError, Result},
    services::{model::ChatModel, prompts},
    types::{lenient::coerce_f64, ApiResponse, ExpenseCategory, ExpenseRecord},
};

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Parse a spoken expense such as "刚吃饭花了80块".
///
/// Always yields a record: on any failure the envelope is unsuccessful and
/// carries [`ExpenseRecord::unparsed`] with the original text.
pub async fn parse_expense(model: &dyn ChatModel, text: &str) -> ApiResponse<ExpenseRecord> {
    match try_parse_expense(model, text).await {
        Ok(record) => {
            info!(
                target: "trip_planner::expense",
                category = %record.category,
                amount = record.amount,
                confidence = record.confidence,
                "parsed voice expense"
            );
            ApiResponse::ok(record)
        }
        Err(err) => {
            error!(target: "trip_planner::expense", error = %err, "failed to parse voice expense");
            ApiResponse::failure_with(format!("解析失败: {err}"), ExpenseRecord::unparsed(text))
        }
    }
}

async fn try_parse_expense(model: &dyn ChatModel, text: &str) -> Result<ExpenseRecord> {
    if text.trim().is_empty() {
        return Err(PlannerError::InvalidRequest(
            "voice_text is required".to_string(),
        ));
    }

    let prompt = prompts::expense_parsing_prompt(text);
    let reply = model
        .invoke(prompts::EXPENSE_PARSER_SYSTEM_PROMPT, &prompt)
        .await?;
    let object = extract(&reply).into_object()?;
    Ok(coerce_expense(&object))
}

/// Coerce a decoded object into a valid record.
///
/// Bad values are replaced, never rejected: unknown categories become 其他,
/// negative or non-numeric amounts become 0, and confidence is clamped to
/// [0, 1] with 0.5 standing in for a missing or non-numeric value.
pub fn coerce_expense(object: &Map<String, Value>) -> ExpenseRecord {
    ExpenseRecord {
        category: coerce_category(object.get("category")),
        amount: coerce_amount(object.get("amount")),
        description: optional_text(object.get("description")),
        location: optional_text(object.get("location")),
        payment_method: optional_text(object.get("payment_method")),
        confidence: coerce_confidence(object.get("confidence")),
    }
}

fn coerce_category(value: Option<&Value>) -> ExpenseCategory {
    let label = value.and_then(Value::as_str).map(str::trim);
    match label.and_then(ExpenseCategory::from_label) {
        Some(category) => category,
        None => {
            warn!(
                target: "trip_planner::expense",
                category = ?value,
                "invalid category, defaulting to 其他"
            );
            ExpenseCategory::Other
        }
    }
}

fn coerce_amount(value: Option<&Value>) -> f64 {
    match value.and_then(coerce_f64) {
        Some(amount) if amount >= 0.0 => amount,
        Some(amount) => {
            warn!(target: "trip_planner::expense", amount, "negative amount, defaulting to 0");
            0.0
        }
        None => {
            warn!(target: "trip_planner::expense", amount = ?value, "invalid amount, defaulting to 0");
            0.0
        }
    }
}

fn coerce_confidence(value: Option<&Value>) -> f64 {
    value
        .and_then(coerce_f64)
        .map(|confidence| confidence.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

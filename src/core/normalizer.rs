//! Shapes extracted model output into an [`ItineraryDraft`].

use serde_json::{Map, Value};
use tracing::warn;

use super::extractor::ParseResult;
use crate::{
    schemas::{warn_on_violations, CompletionSchema},
    types::{deserialize_structured, BudgetBreakdown, ItineraryDraft, ItineraryMetadata},
};

/// Keys a usable itinerary is expected to carry. Their absence is logged, not fatal.
pub const REQUIRED_KEYS: [&str; 3] = ["summary", "budget_breakdown", "daily_itinerary"];

/// Keys owned by this crate; model-supplied values for them are discarded.
const RESERVED_KEYS: [&str; 3] = ["metadata", "raw_response", "parse_error"];

pub const FALLBACK_SUMMARY: &str = "行程生成成功，但格式解析失败。请查看原始响应。";
pub const FALLBACK_TIP: &str = "请查看原始响应获取完整行程信息";

/// Build the draft for one generation request. Never fails.
///
/// Structured output is kept as the model produced it, with any missing keys
/// left absent. Output that cannot be read as an itinerary becomes the
/// placeholder draft from [`fallback_draft`]. `metadata` always comes from
/// the request and replaces whatever the model put there.
pub fn normalize(result: ParseResult, metadata: ItineraryMetadata) -> ItineraryDraft {
    let mut draft = match result {
        ParseResult::Structured(object) => structured_draft(object),
        ParseResult::Fallback { raw_text, error } => {
            warn!(
                target: "trip_planner::normalizer",
                error = %error,
                "itinerary response could not be parsed, using fallback"
            );
            fallback_draft(raw_text, error)
        }
    };
    draft.metadata = Some(metadata);
    draft
}

fn structured_draft(mut object: Map<String, Value>) -> ItineraryDraft {
    for key in RESERVED_KEYS {
        object.remove(key);
    }

    for key in REQUIRED_KEYS {
        if !object.contains_key(key) {
            warn!(
                target: "trip_planner::normalizer",
                key,
                "missing required key in itinerary response"
            );
        }
    }

    let payload = Value::Object(object);
    warn_on_violations(ItineraryDraft::schema(), &payload);

    match deserialize_structured::<ItineraryDraft>(&payload) {
        Ok(draft) => draft,
        Err(err) => {
            warn!(
                target: "trip_planner::normalizer",
                error = %err,
                "itinerary response has the wrong shape, using fallback"
            );
            fallback_draft(payload.to_string(), err.to_string())
        }
    }
}

/// Deterministic placeholder for output that could not be parsed.
pub fn fallback_draft(raw_response: String, parse_error: String) -> ItineraryDraft {
    ItineraryDraft {
        summary: Some(FALLBACK_SUMMARY.to_string()),
        budget_breakdown: Some(BudgetBreakdown::default()),
        daily_itinerary: Some(Vec::new()),
        travel_tips: Some(vec![FALLBACK_TIP.to_string()]),
        raw_response: Some(raw_response),
        parse_error: Some(parse_error),
        ..Default::default()
    }
}

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{error, info};

use super::{expense_parser, extractor::extract, normalizer::normalize};
use crate::{
    config::{ModelSettings, PlannerConfig},
    error::{PlannerError, Result},
    services::{
        model::ChatModel,
        openai_client::{ChatCompletionModel, OpenAIClient},
        prompts,
    },
    types::{
        ApiResponse, BudgetAnalysisRequest, ExpenseRecord, ItineraryDraft, ItineraryMetadata,
        TripRequest,
    },
};

/// Entry point for every model-backed operation.
///
/// Itinerary generation and the short structured tasks (expense parsing,
/// budget analysis, destination insights) may use differently tuned models.
#[derive(Clone, Debug)]
pub struct TripPlanner {
    itinerary_model: Arc<dyn ChatModel>,
    analysis_model: Arc<dyn ChatModel>,
}

impl TripPlanner {
    /// Use one model for every operation
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            itinerary_model: model.clone(),
            analysis_model: model,
        }
    }

    pub fn with_models(itinerary_model: Arc<dyn ChatModel>, analysis_model: Arc<dyn ChatModel>) -> Self {
        Self {
            itinerary_model,
            analysis_model,
        }
    }

    /// Build chat-completion models from configuration.
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        config.validate()?;
        let mut client = OpenAIClient::new(config.api_key()?, config.request_timeout)?;
        client.set_base_url(config.base_url.clone());

        let itinerary = ChatCompletionModel::new(client, config.model.clone(), ModelSettings::ITINERARY);
        let analysis = itinerary.with_settings(ModelSettings::ANALYSIS);

        info!(
            target: "trip_planner::planner",
            model = %config.model,
            base_url = %config.base_url,
            "planner initialized"
        );
        Ok(Self::with_models(Arc::new(itinerary), Arc::new(analysis)))
    }

    /// Generate an itinerary for a trip.
    ///
    /// Invalid requests fail before the model is called. Model output that
    /// cannot be parsed still succeeds, carrying the fallback draft.
    pub async fn generate_itinerary(&self, request: &TripRequest) -> ApiResponse<ItineraryDraft> {
        match self.itinerary_draft(request).await {
            Ok(draft) => {
                info!(
                    target: "trip_planner::planner",
                    destination = %request.destination,
                    fallback = draft.is_fallback(),
                    "itinerary generated"
                );
                ApiResponse::ok(draft)
            }
            Err(err) => {
                error!(target: "trip_planner::planner", error = %err, "failed to generate itinerary");
                ApiResponse::failure(err.to_string())
            }
        }
    }

    /// [`Self::generate_itinerary`] without the envelope, for callers that map error kinds.
    pub async fn itinerary_draft(&self, request: &TripRequest) -> Result<ItineraryDraft> {
        let total_days = request.total_days()?;
        let prompt = prompts::itinerary_prompt(request, total_days);

        info!(
            target: "trip_planner::planner",
            destination = %request.destination,
            total_days,
            "generating itinerary"
        );
        let reply = self
            .itinerary_model
            .invoke(prompts::ITINERARY_SYSTEM_PROMPT, &prompt)
            .await?;

        Ok(normalize(
            extract(&reply),
            ItineraryMetadata::from_request(request, total_days),
        ))
    }

    /// Parse a spoken expense; see [`expense_parser::parse_expense`].
    pub async fn parse_expense(&self, voice_text: &str) -> ApiResponse<ExpenseRecord> {
        expense_parser::parse_expense(self.analysis_model.as_ref(), voice_text).await
    }

    /// Free-form travel notes for a destination, returned as the model wrote them.
    pub async fn destination_insights(&self, destination: &str) -> ApiResponse<String> {
        let result = async {
            if destination.trim().is_empty() {
                return Err(PlannerError::InvalidRequest(
                    "destination is required".to_string(),
                ));
            }
            self.analysis_model
                .invoke(
                    prompts::INSIGHTS_SYSTEM_PROMPT,
                    &prompts::destination_insights_prompt(destination),
                )
                .await
        }
        .await;

        if let Err(err) = &result {
            error!(target: "trip_planner::planner", error = %err, "failed to get destination insights");
        }
        result.into()
    }

    /// Model-assisted spending analysis: overspend alerts, savings and a trend projection.
    pub async fn analyze_budget(
        &self,
        request: &BudgetAnalysisRequest,
    ) -> ApiResponse<Map<String, Value>> {
        match self.try_analyze_budget(request).await {
            Ok(analysis) => {
                info!(target: "trip_planner::planner", "budget analysis completed");
                ApiResponse::ok(analysis)
            }
            Err(err) => {
                error!(target: "trip_planner::planner", error = %err, "failed to analyze budget");
                ApiResponse::failure(format!("分析失败: {err}"))
            }
        }
    }

    async fn try_analyze_budget(&self, request: &BudgetAnalysisRequest) -> Result<Map<String, Value>> {
        info!(
            target: "trip_planner::planner",
            destination = %request.destination,
            expenses = request.expenses.len(),
            remaining_days = request.remaining_days,
            "analyzing budget"
        );
        let reply = self
            .analysis_model
            .invoke(
                prompts::BUDGET_ANALYST_SYSTEM_PROMPT,
                &prompts::budget_analysis_prompt(request),
            )
            .await?;
        extract(&reply).into_object()
    }
}

/// Whole days left until `end_date`, never negative. Missing or unparsable dates count as 0.
pub fn remaining_days(end_date: Option<&str>, today: NaiveDate) -> i64 {
    end_date
        .and_then(parse_leading_date)
        .map(|end| (end - today).num_days().max(0))
        .unwrap_or(0)
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn parse_leading_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

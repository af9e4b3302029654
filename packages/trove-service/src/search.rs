use serde::{Deserialize, Serialize};

use crate::{
	ServiceError, ServiceResult, TroveService,
	pipeline::{self, PipelineOutcome, PipelineRun, PipelineState},
	rank::RankedProduct,
};

pub const NO_INTENT_MESSAGE: &str = "Failed to analyze query. Please try again.";
pub const NOT_REFINED_MESSAGE: &str = "Could not refine product selection.";
pub const DEFAULT_RESULTS_MESSAGE: &str = "Here are your personalized recommendations.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub user_id: String,
	pub query: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub query_received: String,
	pub user_id: String,
	pub search_results: Vec<RankedProduct>,
	pub message: String,
}

impl TroveService {
	/// Runs the full retrieval-and-ranking pipeline for one free-text query.
	///
	/// Only a blank user id or query is an error. Every downstream failure degrades into an
	/// empty result list with an explanatory message.
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		crate::require_user_id(&req.user_id)?;

		let query = req.query.trim();

		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		pipeline::enter(PipelineState::GatherContext, &req.user_id);

		let ctx = self.gather_context(&req.user_id).await;
		let outcome = self
			.run_pipeline(PipelineRun {
				user_id: &req.user_id,
				raw_query: query,
				ctx: &ctx,
				top_k_per_phrase: self.cfg.search.top_k_per_phrase,
				retrieve_limit: self.cfg.search.primary_limit,
				top_n: self.cfg.search.top_n,
				log_interaction: true,
			})
			.await;
		let (search_results, message) = outcome_parts(outcome);

		Ok(SearchResponse {
			query_received: req.query,
			user_id: req.user_id,
			search_results,
			message,
		})
	}
}

pub(crate) fn outcome_parts(outcome: PipelineOutcome) -> (Vec<RankedProduct>, String) {
	match outcome {
		PipelineOutcome::NoIntent => (Vec::new(), NO_INTENT_MESSAGE.to_string()),
		PipelineOutcome::NotRefined => (Vec::new(), NOT_REFINED_MESSAGE.to_string()),
		PipelineOutcome::Ranked(selection) => {
			let message = selection
				.overall_summary
				.unwrap_or_else(|| DEFAULT_RESULTS_MESSAGE.to_string());

			(selection.products, message)
		},
	}
}

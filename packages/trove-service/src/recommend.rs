use serde::{Deserialize, Serialize};

use crate::{
	ServiceError, ServiceResult, TroveService,
	pipeline::{self, PipelineRun, PipelineState},
	rank::RankedProduct,
	search,
};

pub const ACTIVITY_QUERY: &str = "Recommend products for me based on my previous activity";
pub const POPULAR_QUERY: &str = "Recommend popular products";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendRequest {
	pub user_id: String,
	pub count: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
	pub user_id: String,
	pub query_used: String,
	pub recommendations: Vec<RankedProduct>,
	pub message: String,
}

impl TroveService {
	/// Personalized picks from an implicit query synthesized out of the user's context.
	pub async fn recommend(&self, req: RecommendRequest) -> ServiceResult<RecommendResponse> {
		crate::require_user_id(&req.user_id)?;

		let cfg = &self.cfg.recommend;
		let count = req.count.unwrap_or(cfg.default_count);

		if count == 0 || count > cfg.max_count {
			return Err(ServiceError::InvalidRequest {
				message: format!("count must be between 1 and {}.", cfg.max_count),
			});
		}

		pipeline::enter(PipelineState::GatherContext, &req.user_id);

		let ctx = self.gather_context(&req.user_id).await;
		let query = if ctx.has_no_activity() { POPULAR_QUERY } else { ACTIVITY_QUERY };
		let outcome = self
			.run_pipeline(PipelineRun {
				user_id: &req.user_id,
				raw_query: query,
				ctx: &ctx,
				top_k_per_phrase: cfg.top_k_per_phrase,
				retrieve_limit: cfg.candidate_limit,
				top_n: count,
				log_interaction: false,
			})
			.await;
		let (recommendations, message) = search::outcome_parts(outcome);

		Ok(RecommendResponse {
			user_id: req.user_id,
			query_used: query.to_string(),
			recommendations,
			message,
		})
	}
}

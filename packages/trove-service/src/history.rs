use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use trove_domain::{Interaction, InteractionDetail, interaction};

use crate::{ServiceError, ServiceResult, TroveService};

const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryRequest {
	pub user_id: String,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryResponse {
	pub user_id: String,
	/// Newest first.
	pub interactions: Vec<Interaction>,
	/// The same interactions as one oldest-first context line.
	pub summary: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogInteractionRequest {
	pub user_id: String,
	pub detail: InteractionDetail,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogInteractionResponse {
	pub interaction_id: Uuid,
	pub interaction_type: String,
}

impl TroveService {
	pub async fn history(&self, req: HistoryRequest) -> ServiceResult<HistoryResponse> {
		crate::require_user_id(&req.user_id)?;

		let limit = req.limit.unwrap_or(self.cfg.search.history_interactions);

		if limit == 0 || limit > MAX_HISTORY_LIMIT {
			return Err(ServiceError::InvalidRequest {
				message: format!("limit must be between 1 and {MAX_HISTORY_LIMIT}."),
			});
		}

		let interactions = self.stores.users.recent_interactions(&req.user_id, limit).await?;
		let summary = interaction::summarize_recent(&interactions);

		Ok(HistoryResponse { user_id: req.user_id, interactions, summary })
	}

	/// Records a client-reported interaction such as a product view.
	///
	/// Unlike pipeline logging, a storage failure is returned to the caller.
	pub async fn log_interaction(
		&self,
		req: LogInteractionRequest,
	) -> ServiceResult<LogInteractionResponse> {
		crate::require_user_id(&req.user_id)?;

		let interaction_id = self
			.stores
			.users
			.insert_interaction(&req.user_id, &req.detail, OffsetDateTime::now_utc())
			.await?;

		Ok(LogInteractionResponse {
			interaction_id,
			interaction_type: req.detail.interaction_type().to_string(),
		})
	}
}

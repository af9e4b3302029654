use std::collections::BTreeSet;

use time::OffsetDateTime;
use tracing::{info, warn};

use trove_domain::{Candidate, InteractionDetail, QueryIntent, SearchDetail};

use crate::{
	TroveService,
	cascade::{self, CascadeOutcome},
	context::UserContext,
	fallback,
	rank::RankedSelection,
	retrieve,
};

/// Steps of one pipeline run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
	GatherContext,
	ExtractIntent,
	MatchCategories,
	Retrieve,
	Fallback,
	Rank,
	Log,
	Respond,
}
impl PipelineState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::GatherContext => "gather_context",
			Self::ExtractIntent => "extract_intent",
			Self::MatchCategories => "match_categories",
			Self::Retrieve => "retrieve",
			Self::Fallback => "fallback",
			Self::Rank => "rank",
			Self::Log => "log",
			Self::Respond => "respond",
		}
	}
}

/// Per-run knobs that differ between search and recommendation.
pub(crate) struct PipelineRun<'a> {
	pub(crate) user_id: &'a str,
	pub(crate) raw_query: &'a str,
	pub(crate) ctx: &'a UserContext,
	pub(crate) top_k_per_phrase: u32,
	pub(crate) retrieve_limit: u32,
	pub(crate) top_n: u32,
	pub(crate) log_interaction: bool,
}

pub(crate) enum PipelineOutcome {
	NoIntent,
	NotRefined,
	Ranked(RankedSelection),
}

impl TroveService {
	pub(crate) async fn run_pipeline(&self, run: PipelineRun<'_>) -> PipelineOutcome {
		let PipelineRun {
			user_id,
			raw_query,
			ctx,
			top_k_per_phrase,
			retrieve_limit,
			top_n,
			log_interaction,
		} = run;

		enter(PipelineState::ExtractIntent, user_id);

		let intent = self.extract_intent(raw_query, ctx).await;

		if intent.descriptive_phrases.is_empty() {
			enter(PipelineState::Respond, user_id);

			return PipelineOutcome::NoIntent;
		}

		enter(PipelineState::MatchCategories, user_id);

		let matched = self.match_categories(&intent.descriptive_phrases, top_k_per_phrase).await;

		info!(user_id, matched = matched.len(), "Categories matched.");

		enter(PipelineState::Retrieve, user_id);

		let candidates = self.retrieve_candidates(user_id, &intent, &matched, retrieve_limit).await;

		enter(PipelineState::Rank, user_id);

		let Some(selection) = self.rank_candidates(raw_query, ctx, &candidates, top_n).await else {
			enter(PipelineState::Respond, user_id);

			return PipelineOutcome::NotRefined;
		};

		if log_interaction {
			enter(PipelineState::Log, user_id);

			let detail = InteractionDetail::Search(SearchDetail {
				query: raw_query.to_string(),
				extracted_phrases: intent.descriptive_phrases.clone(),
				matched_categories: matched.iter().cloned().collect(),
				filter_criteria: Some(intent.filter_criteria.clone()),
				retrieved_product_ids: candidates.iter().map(|candidate| candidate.id).collect(),
				ranked_product_ids: selection.products.iter().map(|product| product.id).collect(),
			});

			self.record_interaction(user_id, &detail).await;
		}

		enter(PipelineState::Respond, user_id);

		PipelineOutcome::Ranked(selection)
	}

	/// Primary cascade, escalating once to the fallback cascade on a thin yield.
	async fn retrieve_candidates(
		&self,
		user_id: &str,
		intent: &QueryIntent,
		matched: &BTreeSet<String>,
		limit: u32,
	) -> Vec<Candidate> {
		let catalog = self.stores.catalog.as_ref();
		let stages = retrieve::primary_stages(matched, &intent.filter_criteria);
		let CascadeOutcome { candidates, .. } =
			cascade::run_cascade(catalog, retrieve::PRIMARY, &stages, limit).await;
		let threshold = self.cfg.search.min_candidates_before_fallback as usize;

		if candidates.len() >= threshold {
			info!(user_id, candidates = candidates.len(), threshold, "Primary yield sufficient.");

			return candidates;
		}

		enter(PipelineState::Fallback, user_id);
		info!(user_id, candidates = candidates.len(), threshold, "Primary yield below threshold.");

		let stages = fallback::fallback_stages(intent);
		let fallback = cascade::run_cascade(
			catalog,
			fallback::FALLBACK,
			&stages,
			self.cfg.search.fallback_limit,
		)
		.await;

		if fallback.candidates.is_empty() {
			info!(user_id, "Fallback found nothing. Keeping primary candidates.");

			candidates
		} else {
			info!(
				user_id,
				stage = fallback.stage.unwrap_or_default(),
				candidates = fallback.candidates.len(),
				"Fallback candidates replace primary candidates."
			);

			fallback.candidates
		}
	}

	/// Appends to the interaction log. Failures are reported and swallowed.
	pub(crate) async fn record_interaction(&self, user_id: &str, detail: &InteractionDetail) {
		let now = OffsetDateTime::now_utc();

		if let Err(err) = self.stores.users.insert_interaction(user_id, detail, now).await {
			warn!(
				error = %err,
				user_id,
				interaction_type = detail.interaction_type(),
				"Interaction logging failed."
			);
		}
	}
}

pub(crate) fn enter(state: PipelineState, user_id: &str) {
	info!(state = state.as_str(), user_id, "Pipeline state.");
}

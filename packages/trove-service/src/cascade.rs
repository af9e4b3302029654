use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use trove_domain::Candidate;
use trove_storage::catalog::ProductFilter;

use crate::CatalogStore;

/// One retrieval attempt of a cascade.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Stage {
	pub(crate) name: &'static str,
	pub(crate) query: StageQuery,
}
impl Stage {
	pub(crate) fn filtered(name: &'static str, filter: ProductFilter) -> Self {
		Self { name, query: StageQuery::Filtered(filter) }
	}

	pub(crate) fn sample(name: &'static str) -> Self {
		Self { name, query: StageQuery::Sample }
	}
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum StageQuery {
	Filtered(ProductFilter),
	Sample,
}

#[derive(Debug, Default)]
pub(crate) struct CascadeOutcome {
	pub(crate) candidates: Vec<Candidate>,
	/// Stage that produced the candidates; `None` when every stage came back empty.
	pub(crate) stage: Option<&'static str>,
}

/// Runs `stages` in order and returns the first non-empty yield.
///
/// Later stages are never evaluated once one yields. A failed stage counts as an empty one.
pub(crate) async fn run_cascade(
	catalog: &dyn CatalogStore,
	cascade: &'static str,
	stages: &[Stage],
	limit: u32,
) -> CascadeOutcome {
	for stage in stages {
		let fetched = match &stage.query {
			StageQuery::Filtered(filter) => catalog.find_products(filter, limit).await,
			StageQuery::Sample => catalog.sample_products(limit).await,
		};
		let docs = match fetched {
			Ok(docs) => docs,
			Err(err) => {
				warn!(error = %err, cascade, stage = stage.name, "Retrieval stage failed.");

				continue;
			},
		};
		let candidates = to_candidates(docs, limit as usize);

		debug!(cascade, stage = stage.name, yielded = candidates.len(), "Retrieval stage finished.");

		if !candidates.is_empty() {
			info!(cascade, stage = stage.name, yielded = candidates.len(), "Cascade resolved.");

			return CascadeOutcome { candidates, stage: Some(stage.name) };
		}
	}

	info!(cascade, stages = stages.len(), "Cascade exhausted without candidates.");

	CascadeOutcome::default()
}

/// Converts stored documents, skipping malformed ones and repeated identifiers.
pub(crate) fn to_candidates(docs: Vec<Value>, limit: usize) -> Vec<Candidate> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(docs.len().min(limit));

	for doc in docs {
		let candidate = match Candidate::from_document(doc) {
			Ok(candidate) => candidate,
			Err(err) => {
				warn!(error = %err, "Skipping malformed catalog record.");

				continue;
			},
		};

		if !seen.insert(candidate.id) {
			continue;
		}

		out.push(candidate);

		if out.len() == limit {
			break;
		}
	}

	out
}

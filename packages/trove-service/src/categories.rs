use std::{collections::BTreeSet, sync::Arc};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use trove_config::EmbeddingProviderConfig;

use crate::{CategoryIndex, EmbeddingProvider, ServiceError, ServiceResult, TroveService};

impl TroveService {
	/// Union of the nearest taxonomy categories of every phrase.
	pub(crate) async fn match_categories(
		&self,
		phrases: &[String],
		top_k_per_phrase: u32,
	) -> BTreeSet<String> {
		match_phrases(
			&self.providers.embedding,
			&self.stores.categories,
			&self.cfg.providers.embedding,
			self.cfg.storage.qdrant.vector_dim,
			phrases,
			top_k_per_phrase,
		)
		.await
	}
}

/// Phrases are looked up concurrently. A failed lookup contributes nothing.
pub(crate) async fn match_phrases(
	embedding: &Arc<dyn EmbeddingProvider>,
	index: &Arc<dyn CategoryIndex>,
	cfg: &EmbeddingProviderConfig,
	vector_dim: u32,
	phrases: &[String],
	top_k_per_phrase: u32,
) -> BTreeSet<String> {
	let mut lookups = JoinSet::new();

	for phrase in phrases.iter().filter(|phrase| !phrase.trim().is_empty()) {
		let embedding = embedding.clone();
		let index = index.clone();
		let cfg = cfg.clone();
		let phrase = phrase.clone();

		lookups.spawn(async move {
			let result = lookup_phrase(
				embedding.as_ref(),
				index.as_ref(),
				&cfg,
				vector_dim,
				&phrase,
				top_k_per_phrase,
			)
			.await;

			(phrase, result)
		});
	}

	let mut matched = BTreeSet::new();

	while let Some(joined) = lookups.join_next().await {
		match joined {
			Ok((phrase, Ok(names))) => {
				debug!(phrase = %phrase, matches = names.len(), "Category lookup finished.");

				matched.extend(names);
			},
			Ok((phrase, Err(err))) => {
				warn!(error = %err, phrase = %phrase, "Category lookup failed for phrase.");
			},
			Err(err) => {
				warn!(error = %err, "Category lookup task did not complete.");
			},
		}
	}

	matched
}

async fn lookup_phrase(
	embedding: &dyn EmbeddingProvider,
	index: &dyn CategoryIndex,
	cfg: &EmbeddingProviderConfig,
	vector_dim: u32,
	phrase: &str,
	top_k: u32,
) -> ServiceResult<Vec<String>> {
	let vectors = embedding.embed(cfg, &[phrase.to_string()]).await?;
	let Some(vector) = vectors.into_iter().next() else {
		return Err(ServiceError::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		});
	};

	if vector.len() != vector_dim as usize {
		return Err(ServiceError::Provider {
			message: "Embedding vector dimension mismatch.".to_string(),
		});
	}

	let names = index.nearest_categories(vector, top_k).await?;

	Ok(names)
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use serde_json::Map;

	use super::*;
	use crate::BoxFuture;

	/// Embeds a phrase as a one-hot vector keyed by its length; "broken" fails.
	struct LengthEmbedding;
	impl EmbeddingProvider for LengthEmbedding {
		fn embed<'a>(
			&'a self,
			_cfg: &'a EmbeddingProviderConfig,
			texts: &'a [String],
		) -> BoxFuture<'a, trove_providers::Result<Vec<Vec<f32>>>> {
			Box::pin(async move {
				if texts.iter().any(|text| text == "broken") {
					return Err(trove_providers::Error::InvalidResponse {
						message: "broken phrase".to_string(),
					});
				}

				Ok(texts
					.iter()
					.map(|text| {
						let mut vector = vec![0.0; 4];

						vector[text.len() % 4] = 1.0;

						vector
					})
					.collect())
			})
		}
	}

	/// Names the hot component of the query vector.
	#[derive(Default)]
	struct SlotIndex {
		calls: AtomicUsize,
	}
	impl CategoryIndex for SlotIndex {
		fn nearest_categories<'a>(
			&'a self,
			vector: Vec<f32>,
			_top_k: u32,
		) -> BoxFuture<'a, trove_storage::Result<Vec<String>>> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let slot = vector.iter().position(|value| *value > 0.0).unwrap_or_default();

				Ok(vec![format!("slot-{slot}")])
			})
		}
	}

	fn cfg() -> EmbeddingProviderConfig {
		EmbeddingProviderConfig {
			provider_id: "test".to_string(),
			api_base: "http://127.0.0.1:1".to_string(),
			api_key: "key".to_string(),
			path: "/embeddings".to_string(),
			model: "test".to_string(),
			dimensions: 4,
			timeout_ms: 1_000,
			default_headers: Map::new(),
		}
	}

	fn phrases(items: &[&str]) -> Vec<String> {
		items.iter().map(|item| item.to_string()).collect()
	}

	#[tokio::test]
	async fn empty_phrases_match_nothing_without_lookups() {
		let embedding: Arc<dyn EmbeddingProvider> = Arc::new(LengthEmbedding);
		let index = Arc::new(SlotIndex::default());
		let dyn_index: Arc<dyn CategoryIndex> = index.clone();
		let matched = match_phrases(&embedding, &dyn_index, &cfg(), 4, &[], 1).await;

		assert!(matched.is_empty());
		assert_eq!(index.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn failing_phrase_does_not_block_the_others() {
		let embedding: Arc<dyn EmbeddingProvider> = Arc::new(LengthEmbedding);
		let index: Arc<dyn CategoryIndex> = Arc::new(SlotIndex::default());
		let matched =
			match_phrases(&embedding, &index, &cfg(), 4, &phrases(&["a", "broken", "abc"]), 1).await;

		assert_eq!(matched.into_iter().collect::<Vec<_>>(), vec!["slot-1", "slot-3"]);
	}

	#[tokio::test]
	async fn wrong_dimension_counts_as_a_failed_lookup() {
		let embedding: Arc<dyn EmbeddingProvider> = Arc::new(LengthEmbedding);
		let index: Arc<dyn CategoryIndex> = Arc::new(SlotIndex::default());
		let matched = match_phrases(&embedding, &index, &cfg(), 8, &phrases(&["a"]), 1).await;

		assert!(matched.is_empty());
	}
}

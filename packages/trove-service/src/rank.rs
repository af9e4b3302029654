use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use trove_domain::Candidate;

use crate::{TroveService, context::UserContext};

const RANK_SYSTEM_PROMPT: &str = "\
You are an expert shopping assistant. Review the candidate products and select the few that best \
match the shopper's query and context. Give each selected product a rank (1 is best) and a one \
or two sentence justification. Only select products from the candidate list.";

const RANK_FORMAT: &str = "\
{
  \"ranked_products\": [
    {
      \"product_id\": 123,
      \"title\": \"Product title\",
      \"price\": 99.99,
      \"thumbnail\": \"https://example.com/image.jpg\",
      \"justification\": \"Why this product fits the shopper.\",
      \"rank\": 1
    }
  ],
  \"overall_summary\": \"Optional one or two sentence summary of the selection.\"
}";

/// Ordered ranking output of one request. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedSelection {
	pub products: Vec<RankedProduct>,
	pub overall_summary: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
	pub id: i64,
	pub rank: u32,
	pub justification: String,
	pub title: String,
	pub description: String,
	pub category: String,
	pub price: f64,
	pub thumbnail: Option<String>,
}
impl RankedProduct {
	fn from_candidate(candidate: &Candidate, rank: u32, justification: String) -> Self {
		Self {
			id: candidate.id,
			rank,
			justification,
			title: candidate.title.clone(),
			description: candidate.description.clone(),
			category: candidate.category.clone(),
			price: candidate.price,
			thumbnail: candidate.thumbnail.clone(),
		}
	}
}

impl TroveService {
	/// Asks the ranking model to select at most `top_n` of the first candidates.
	///
	/// `None` for an empty pool (the model is not contacted), a failed call, or an answer that
	/// keeps no usable entry.
	pub(crate) async fn rank_candidates(
		&self,
		raw_query: &str,
		ctx: &UserContext,
		candidates: &[Candidate],
		top_n: u32,
	) -> Option<RankedSelection> {
		if candidates.is_empty() {
			info!("No candidates to rank.");

			return None;
		}

		let window = (self.cfg.search.max_rank_candidates.min(trove_config::MAX_RANK_CANDIDATES))
			as usize;
		let shown = &candidates[..candidates.len().min(window)];
		let messages = rank_messages(raw_query, ctx, shown, top_n);
		let value =
			match self.providers.ranker.complete_json(&self.cfg.providers.ranker, &messages).await {
				Ok(value) => value,
				Err(err) => {
					warn!(error = %err, "Ranking service failed.");

					return None;
				},
			};

		match parse_selection(&value, shown, top_n as usize) {
			Some(selection) => {
				info!(
					shown = shown.len(),
					selected = selection.products.len(),
					"Candidates ranked."
				);

				Some(selection)
			},
			None => {
				warn!("Ranking output kept no usable entries.");

				None
			},
		}
	}
}

fn rank_messages(raw_query: &str, ctx: &UserContext, shown: &[Candidate], top_n: u32) -> Vec<Value> {
	let listing = shown
		.iter()
		.enumerate()
		.map(|(index, candidate)| candidate.prompt_block(index + 1))
		.collect::<String>();
	let user = format!(
		"Shopper's original query: \"{raw_query}\"\nRecent shopper history: \"{history}\"\nCurrent shopper cart: \"{cart}\"\n\nCandidate products:\n---\n{listing}---\n\nSelect the top {top_n} most relevant products. Answer with ONE JSON object shaped like this:\n{RANK_FORMAT}",
		history = ctx.history_summary,
		cart = ctx.cart_summary,
	);

	vec![
		serde_json::json!({ "role": "system", "content": RANK_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

/// Keeps entries in the order given, dropping incomplete ones, unknown ids and repeats.
/// Kept entries are renumbered 1..=n so ranks stay unique and contiguous.
fn parse_selection(value: &Value, shown: &[Candidate], top_n: usize) -> Option<RankedSelection> {
	let entries = value.get("ranked_products").and_then(Value::as_array)?;
	let mut seen = HashSet::new();
	let mut products = Vec::new();

	for entry in entries {
		let Some(product_id) = entry.get("product_id").and_then(product_id_of) else {
			warn!("Dropping ranked entry without product_id.");

			continue;
		};

		if entry.get("rank").and_then(Value::as_u64).is_none() {
			warn!(product_id, "Dropping ranked entry without rank.");

			continue;
		}

		let Some(justification) = entry
			.get("justification")
			.and_then(Value::as_str)
			.map(str::trim)
			.filter(|text| !text.is_empty())
		else {
			warn!(product_id, "Dropping ranked entry without justification.");

			continue;
		};
		let Some(candidate) = shown.iter().find(|candidate| candidate.id == product_id) else {
			warn!(product_id, "Dropping ranked entry that is not a candidate.");

			continue;
		};

		if !seen.insert(product_id) {
			continue;
		}

		products.push((candidate, justification.to_string()));
	}

	products.truncate(top_n);

	if products.is_empty() {
		return None;
	}

	let products = products
		.into_iter()
		.zip(1_u32..)
		.map(|((candidate, justification), rank)| {
			RankedProduct::from_candidate(candidate, rank, justification)
		})
		.collect();
	let overall_summary = value
		.get("overall_summary")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.map(str::to_string);

	Some(RankedSelection { products, overall_summary })
}

fn product_id_of(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(id: i64) -> Candidate {
		serde_json::from_value(serde_json::json!({
			"id": id,
			"title": format!("Product {id}"),
			"description": format!("Description {id}"),
			"category": "furniture",
			"price": id as f64,
			"thumbnail": format!("https://cdn.example.com/{id}.png"),
		}))
		.expect("Failed to build candidate.")
	}

	#[test]
	fn trusts_given_order_and_fills_display_fields() {
		let shown = vec![candidate(1), candidate(2), candidate(3)];
		let value = serde_json::json!({
			"ranked_products": [
				{ "product_id": 3, "rank": 2, "justification": "Second.", "title": "Echoed", "price": 0 },
				{ "product_id": "1", "rank": 1, "justification": "First." }
			],
			"overall_summary": "Two picks."
		});
		let selection = parse_selection(&value, &shown, 3).expect("Selection must parse.");

		assert_eq!(selection.products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![3, 1]);
		assert_eq!(selection.products[0].rank, 1);
		assert_eq!(selection.products[1].rank, 2);
		assert_eq!(selection.products[0].title, "Product 3");
		assert_eq!(selection.products[0].description, "Description 3");
		assert_eq!(selection.products[0].category, "furniture");
		assert_eq!(selection.overall_summary.as_deref(), Some("Two picks."));
	}

	#[test]
	fn drops_incomplete_unknown_and_repeated_entries() {
		let shown = vec![candidate(1), candidate(2)];
		let value = serde_json::json!({
			"ranked_products": [
				{ "product_id": 1, "justification": "No rank." },
				{ "product_id": 2, "rank": 1, "justification": " " },
				{ "product_id": 99, "rank": 1, "justification": "Not a candidate." },
				{ "rank": 1, "justification": "No id." },
				{ "product_id": 2, "rank": 1, "justification": "Kept." },
				{ "product_id": 2, "rank": 2, "justification": "Repeat." }
			]
		});
		let selection = parse_selection(&value, &shown, 3).expect("Selection must parse.");

		assert_eq!(selection.products.len(), 1);
		assert_eq!(selection.products[0].justification, "Kept.");
		assert!(selection.overall_summary.is_none());
	}

	#[test]
	fn renumbers_duplicate_and_sparse_ranks() {
		let shown = vec![candidate(1), candidate(2), candidate(3)];
		let value = serde_json::json!({
			"ranked_products": [
				{ "product_id": 2, "rank": 1, "justification": "Best fit." },
				{ "product_id": 1, "rank": 1, "justification": "Also good." },
				{ "product_id": 3, "rank": 7, "justification": "Budget pick." }
			]
		});
		let selection = parse_selection(&value, &shown, 3).expect("Selection must parse.");

		assert_eq!(selection.products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 1, 3]);
		assert_eq!(selection.products.iter().map(|p| p.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
	}

	#[test]
	fn truncates_to_top_n() {
		let shown = (1..=5).map(candidate).collect::<Vec<_>>();
		let entries = (1..=5)
			.map(|id| serde_json::json!({ "product_id": id, "rank": id, "justification": "Fits." }))
			.collect::<Vec<_>>();
		let value = serde_json::json!({ "ranked_products": entries });
		let selection = parse_selection(&value, &shown, 3).expect("Selection must parse.");

		assert_eq!(selection.products.len(), 3);
	}

	#[test]
	fn missing_or_empty_selection_is_none() {
		let shown = vec![candidate(1)];

		assert!(parse_selection(&serde_json::json!({ "picks": [] }), &shown, 3).is_none());
		assert!(parse_selection(&serde_json::json!({ "ranked_products": [] }), &shown, 3).is_none());
	}

	#[test]
	fn prompt_lists_every_shown_candidate() {
		let shown = vec![candidate(4), candidate(5)];
		let messages = rank_messages("desk", &UserContext::default(), &shown, 3);
		let content = messages[1]["content"].as_str().expect("content must be a string");

		assert!(content.contains("Product 1 (ID: 4)"));
		assert!(content.contains("Product 2 (ID: 5)"));
		assert!(content.contains("Select the top 3"));
	}
}

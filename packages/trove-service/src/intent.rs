use serde_json::Value;
use tracing::{info, warn};

use trove_domain::QueryIntent;

use crate::{TroveService, context::UserContext};

const INTENT_SYSTEM_PROMPT: &str = "\
You help shoppers discover products. Analyze the shopper's query together with their recent \
activity and current cart, then answer with ONE JSON object and nothing else:
{
  \"descriptive_category_phrases\": [\"1 to 3 short phrases naming the product types wanted\"],
  \"filter_criteria\": {
    \"price_min\": number (optional),
    \"price_max\": number (optional),
    \"brand\": \"Brand\" or [\"Brand A\", \"Brand B\"] (optional),
    \"keywords_for_db_search\": [\"specific attributes such as waterproof or bluetooth\"] (optional)
  },
  \"extracted_tags\": [\"optional search tags\"],
  \"user_intent_summary\": \"one or two sentences describing what the shopper wants\"
}
Omit filter keys the shopper did not state or clearly imply.";

impl TroveService {
	/// Structured intent for `raw_query`. Falls back to word splitting on any service failure.
	pub(crate) async fn extract_intent(&self, raw_query: &str, ctx: &UserContext) -> QueryIntent {
		let messages = intent_messages(raw_query, ctx);
		let max_phrases = self.cfg.search.max_phrases as usize;

		match self.providers.intent.complete_json(&self.cfg.providers.intent, &messages).await {
			Ok(value) => match QueryIntent::from_service_output(value, max_phrases) {
				Ok(intent) => {
					info!(phrases = intent.descriptive_phrases.len(), "Intent extracted.");

					intent
				},
				Err(violation) => {
					warn!(error = %violation, "Intent output rejected. Using local fallback intent.");

					QueryIntent::fallback(raw_query)
				},
			},
			Err(err) => {
				warn!(error = %err, "Intent service failed. Using local fallback intent.");

				QueryIntent::fallback(raw_query)
			},
		}
	}
}

fn intent_messages(raw_query: &str, ctx: &UserContext) -> Vec<Value> {
	let user = format!(
		"Shopper's raw query: \"{raw_query}\"\nRecent shopper history: \"{}\"\nCurrent shopper cart: \"{}\"\n\nReturn the JSON object.",
		ctx.history_summary, ctx.cart_summary,
	);

	vec![
		serde_json::json!({ "role": "system", "content": INTENT_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

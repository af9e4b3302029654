use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub recommend: Recommend,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Collection holding one point per taxonomy category, with a `category_name` payload.
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	/// Text-understanding model that turns a raw query into structured intent.
	pub intent: LlmProviderConfig,
	/// Ranking model that selects and justifies the final products.
	pub ranker: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Result cap applied to every stage of the primary retrieval cascade.
	pub primary_limit: u32,
	/// Result cap applied to every stage of the fallback cascade.
	pub fallback_limit: u32,
	/// Primary yields below this count escalate to the fallback cascade.
	pub min_candidates_before_fallback: u32,
	pub top_k_per_phrase: u32,
	pub top_n: u32,
	/// Upper bound on candidates shown to the ranking model.
	pub max_rank_candidates: u32,
	pub history_interactions: u32,
	pub max_phrases: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			primary_limit: 20,
			fallback_limit: 20,
			min_candidates_before_fallback: 5,
			top_k_per_phrase: 1,
			top_n: 3,
			max_rank_candidates: 10,
			history_interactions: 3,
			max_phrases: 3,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Recommend {
	pub top_k_per_phrase: u32,
	pub candidate_limit: u32,
	pub default_count: u32,
	pub max_count: u32,
}
impl Default for Recommend {
	fn default() -> Self {
		Self { top_k_per_phrase: 2, candidate_limit: 30, default_count: 5, max_count: 10 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

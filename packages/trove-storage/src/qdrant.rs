use std::collections::HashMap;

use qdrant_client::qdrant::{Query, QueryPointsBuilder, Value, value::Kind};

use crate::Result;

/// Payload key carrying the taxonomy category name of each indexed point.
pub const CATEGORY_NAME_KEY: &str = "category_name";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &trove_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Category names of the `top_k` nearest points, nearest first. Points without a
	/// `category_name` payload are ignored.
	pub async fn search_categories(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<String>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.limit(u64::from(top_k))
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(response
			.result
			.into_iter()
			.filter_map(|point| payload_string(&point.payload, CATEGORY_NAME_KEY))
			.collect())
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match payload.get(key)?.kind.as_ref() {
		Some(Kind::StringValue(text)) if !text.trim().is_empty() => Some(text.clone()),
		_ => None,
	}
}

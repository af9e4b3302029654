pub mod cart;
pub mod catalog;
pub mod history;
pub mod pipeline;
pub mod recommend;
pub mod search;

mod cascade;
mod categories;
mod context;
mod error;
mod fallback;
mod intent;
mod rank;
mod retrieve;
mod stores;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

pub use cart::{AddCartItemRequest, CartResponse};
pub use catalog::{CategoryListResponse, ProductListRequest, ProductListResponse};
pub use error::{ServiceError, ServiceResult};
pub use history::{HistoryRequest, HistoryResponse, LogInteractionRequest, LogInteractionResponse};
pub use pipeline::PipelineState;
pub use rank::{RankedProduct, RankedSelection};
pub use recommend::{RecommendRequest, RecommendResponse};
pub use search::{SearchRequest, SearchResponse};
pub use stores::Stores;
use trove_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use trove_domain::{Cart, Interaction, InteractionDetail};
use trove_providers::{chat, embedding};
use trove_storage::{
	catalog::{ProductFilter, ProductPage, ProductSort},
	db::Db,
	qdrant::QdrantStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, trove_providers::Result<Vec<Vec<f32>>>>;
}

/// A chat model that answers with one JSON object.
pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete_json<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, trove_providers::Result<Value>>;
}

/// Read access to the product catalog.
pub trait CatalogStore
where
	Self: Send + Sync,
{
	fn find_products<'a>(
		&'a self,
		filter: &'a ProductFilter,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Value>>>;

	fn sample_products<'a>(&'a self, limit: u32)
	-> BoxFuture<'a, trove_storage::Result<Vec<Value>>>;

	fn get_product<'a>(&'a self, product_id: i64)
	-> BoxFuture<'a, trove_storage::Result<Option<Value>>>;

	fn list_products<'a>(
		&'a self,
		filter: &'a ProductFilter,
		sort: Option<ProductSort>,
		page: u32,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<ProductPage>>;

	fn list_categories<'a>(&'a self) -> BoxFuture<'a, trove_storage::Result<Vec<String>>>;
}

/// Nearest-neighbor lookup from an embedding to taxonomy category names.
pub trait CategoryIndex
where
	Self: Send + Sync,
{
	fn nearest_categories<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<String>>>;
}

/// Per-user carts and the interaction log.
pub trait UserStore
where
	Self: Send + Sync,
{
	fn recent_interactions<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Interaction>>>;

	fn insert_interaction<'a>(
		&'a self,
		user_id: &'a str,
		detail: &'a InteractionDetail,
		created_at: OffsetDateTime,
	) -> BoxFuture<'a, trove_storage::Result<Uuid>>;

	fn get_cart<'a>(&'a self, user_id: &'a str)
	-> BoxFuture<'a, trove_storage::Result<Option<Cart>>>;

	fn add_cart_item<'a>(
		&'a self,
		user_id: &'a str,
		product_id: i64,
		quantity: i32,
	) -> BoxFuture<'a, trove_storage::Result<Cart>>;

	fn remove_cart_item<'a>(
		&'a self,
		user_id: &'a str,
		product_id: i64,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>>;

	fn clear_cart<'a>(&'a self, user_id: &'a str)
	-> BoxFuture<'a, trove_storage::Result<Option<Cart>>>;

	fn delete_cart<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, trove_storage::Result<bool>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub intent: Arc<dyn ChatProvider>,
	pub ranker: Arc<dyn ChatProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		intent: Arc<dyn ChatProvider>,
		ranker: Arc<dyn ChatProvider>,
	) -> Self {
		Self { embedding, intent, ranker }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), intent: provider.clone(), ranker: provider }
	}
}

pub struct TroveService {
	pub cfg: Config,
	pub stores: Stores,
	pub providers: Providers,
}
impl TroveService {
	pub fn new(cfg: Config, db: Arc<Db>, qdrant: Arc<QdrantStore>) -> Self {
		Self { cfg, stores: Stores::backed_by(db, qdrant), providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		db: Arc<Db>,
		qdrant: Arc<QdrantStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, stores: Stores::backed_by(db, qdrant), providers }
	}

	pub fn with_stores(cfg: Config, stores: Stores, providers: Providers) -> Self {
		Self { cfg, stores, providers }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, trove_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl ChatProvider for DefaultProviders {
	fn complete_json<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, trove_providers::Result<Value>> {
		Box::pin(chat::complete_json(cfg, messages))
	}
}

pub(crate) fn require_user_id(user_id: &str) -> ServiceResult<()> {
	if user_id.trim().is_empty() {
		return Err(ServiceError::InvalidRequest { message: "user_id must be non-empty.".to_string() });
	}

	Ok(())
}

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use trove_domain::{Cart, Interaction, InteractionDetail};
use trove_storage::{
	carts,
	catalog::{self, ProductFilter, ProductPage, ProductSort},
	db::Db,
	history,
	qdrant::QdrantStore,
};

use crate::{BoxFuture, CatalogStore, CategoryIndex, UserStore};

/// Shared handles to every external store the pipeline reads or writes.
#[derive(Clone)]
pub struct Stores {
	pub catalog: Arc<dyn CatalogStore>,
	pub categories: Arc<dyn CategoryIndex>,
	pub users: Arc<dyn UserStore>,
}
impl Stores {
	pub fn new(
		catalog: Arc<dyn CatalogStore>,
		categories: Arc<dyn CategoryIndex>,
		users: Arc<dyn UserStore>,
	) -> Self {
		Self { catalog, categories, users }
	}

	/// Postgres for catalog and user data, Qdrant for the category index.
	pub fn backed_by(db: Arc<Db>, qdrant: Arc<QdrantStore>) -> Self {
		let postgres = Arc::new(PostgresStore { db });

		Self {
			catalog: postgres.clone(),
			categories: Arc::new(QdrantCategoryIndex { qdrant }),
			users: postgres,
		}
	}
}

struct PostgresStore {
	db: Arc<Db>,
}
impl CatalogStore for PostgresStore {
	fn find_products<'a>(
		&'a self,
		filter: &'a ProductFilter,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Value>>> {
		Box::pin(catalog::find_products(&self.db, filter, limit))
	}

	fn sample_products<'a>(
		&'a self,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Value>>> {
		Box::pin(catalog::sample_products(&self.db, limit))
	}

	fn get_product<'a>(
		&'a self,
		product_id: i64,
	) -> BoxFuture<'a, trove_storage::Result<Option<Value>>> {
		Box::pin(catalog::get_product(&self.db, product_id))
	}

	fn list_products<'a>(
		&'a self,
		filter: &'a ProductFilter,
		sort: Option<ProductSort>,
		page: u32,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<ProductPage>> {
		Box::pin(catalog::list_products(&self.db, filter, sort, page, limit))
	}

	fn list_categories<'a>(&'a self) -> BoxFuture<'a, trove_storage::Result<Vec<String>>> {
		Box::pin(catalog::list_categories(&self.db))
	}
}
impl UserStore for PostgresStore {
	fn recent_interactions<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Interaction>>> {
		Box::pin(history::recent_interactions(&self.db, user_id, limit))
	}

	fn insert_interaction<'a>(
		&'a self,
		user_id: &'a str,
		detail: &'a InteractionDetail,
		created_at: OffsetDateTime,
	) -> BoxFuture<'a, trove_storage::Result<Uuid>> {
		Box::pin(history::insert_interaction(&self.db, user_id, detail, created_at))
	}

	fn get_cart<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>> {
		Box::pin(carts::get_cart(&self.db, user_id))
	}

	fn add_cart_item<'a>(
		&'a self,
		user_id: &'a str,
		product_id: i64,
		quantity: i32,
	) -> BoxFuture<'a, trove_storage::Result<Cart>> {
		Box::pin(carts::add_item(&self.db, user_id, product_id, quantity))
	}

	fn remove_cart_item<'a>(
		&'a self,
		user_id: &'a str,
		product_id: i64,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>> {
		Box::pin(carts::remove_item(&self.db, user_id, product_id))
	}

	fn clear_cart<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>> {
		Box::pin(carts::clear_cart(&self.db, user_id))
	}

	fn delete_cart<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, trove_storage::Result<bool>> {
		Box::pin(carts::delete_cart(&self.db, user_id))
	}
}

struct QdrantCategoryIndex {
	qdrant: Arc<QdrantStore>,
}
impl CategoryIndex for QdrantCategoryIndex {
	fn nearest_categories<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<String>>> {
		Box::pin(self.qdrant.search_categories(vector, top_k))
	}
}

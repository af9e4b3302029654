use std::sync::Arc;

use trove_service::TroveService;
use trove_storage::{db::Db, qdrant::QdrantStore};

/// Process-wide handles shared by every request handler.
#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TroveService>,
	db: Option<Arc<Db>>,
}
impl AppState {
	/// Connects Postgres once, ensures the schema and builds the Qdrant client.
	pub async fn new(config: trove_config::Config) -> color_eyre::Result<Self> {
		let db = Arc::new(Db::connect(&config.storage.postgres).await?);

		db.ensure_schema().await?;

		let qdrant = Arc::new(QdrantStore::new(&config.storage.qdrant)?);
		let service = TroveService::new(config, db.clone(), qdrant);

		Ok(Self { service: Arc::new(service), db: Some(db) })
	}

	/// State around an already assembled service that owns no connection pool.
	pub fn with_service(service: TroveService) -> Self {
		Self { service: Arc::new(service), db: None }
	}

	pub async fn close(&self) {
		if let Some(db) = &self.db {
			db.close().await;
		}
	}
}

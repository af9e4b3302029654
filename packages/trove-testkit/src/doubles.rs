//! In-memory stand-ins for the catalog, the category index, the user store and the model
//! providers. Each one counts its calls so tests can assert which collaborators were reached.

use std::{
	collections::{BTreeSet, HashMap, HashSet, VecDeque},
	sync::{
		Mutex, MutexGuard,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use trove_config::{EmbeddingProviderConfig, LlmProviderConfig};
use trove_domain::{Cart, CartItem, Interaction, InteractionDetail};
use trove_service::{BoxFuture, CatalogStore, CategoryIndex, ChatProvider, EmbeddingProvider, UserStore};
use trove_storage::catalog::{ProductFilter, ProductPage, ProductSort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

fn injected(what: &str) -> trove_storage::Error {
	trove_storage::Error::InvalidArgument(format!("Injected {what} failure."))
}

/// Catalog over a fixed list of product documents.
///
/// Documents are kept as raw JSON so malformed records can be seeded on purpose. Filtering
/// mirrors the Postgres catalog: exact categories, loose category terms, price bounds, brands
/// and any-term text matching over title, description, category and tags.
#[derive(Default)]
pub struct MemoryCatalog {
	docs: Vec<Value>,
	fail_filtered: bool,
	fail_text: bool,
	fail_sample: bool,
	find_calls: Mutex<Vec<ProductFilter>>,
	sample_calls: AtomicUsize,
}
impl MemoryCatalog {
	pub fn new(docs: Vec<Value>) -> Self {
		Self { docs, ..Default::default() }
	}

	/// Every filtered query fails. Sampling still works.
	pub fn failing_filtered(mut self) -> Self {
		self.fail_filtered = true;

		self
	}

	/// Filtered queries carrying text keywords fail.
	pub fn failing_text(mut self) -> Self {
		self.fail_text = true;

		self
	}

	/// Random sampling fails.
	pub fn failing_sample(mut self) -> Self {
		self.fail_sample = true;

		self
	}

	/// Filters passed to `find_products`, in call order.
	pub fn find_calls(&self) -> Vec<ProductFilter> {
		lock(&self.find_calls).clone()
	}

	pub fn sample_calls(&self) -> usize {
		self.sample_calls.load(Ordering::SeqCst)
	}

	fn matching(&self, filter: &ProductFilter) -> Vec<Value> {
		self.docs.iter().filter(|doc| matches_filter(doc, filter)).cloned().collect()
	}
}
impl CatalogStore for MemoryCatalog {
	fn find_products<'a>(
		&'a self,
		filter: &'a ProductFilter,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Value>>> {
		Box::pin(async move {
			lock(&self.find_calls).push(filter.clone());

			if self.fail_filtered || (self.fail_text && filter.has_text()) {
				return Err(injected("catalog"));
			}

			Ok(self.matching(filter).into_iter().take(limit as usize).collect())
		})
	}

	fn sample_products<'a>(
		&'a self,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Value>>> {
		Box::pin(async move {
			self.sample_calls.fetch_add(1, Ordering::SeqCst);

			if self.fail_sample {
				return Err(injected("sample"));
			}

			Ok(self.docs.iter().take(limit as usize).cloned().collect())
		})
	}

	fn get_product<'a>(
		&'a self,
		product_id: i64,
	) -> BoxFuture<'a, trove_storage::Result<Option<Value>>> {
		Box::pin(async move {
			Ok(self.docs.iter().find(|doc| doc_id(doc) == Some(product_id)).cloned())
		})
	}

	fn list_products<'a>(
		&'a self,
		filter: &'a ProductFilter,
		sort: Option<ProductSort>,
		page: u32,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<ProductPage>> {
		Box::pin(async move {
			if page == 0 || limit == 0 {
				return Err(trove_storage::Error::InvalidArgument(
					"page and limit must be greater than zero.".to_string(),
				));
			}

			let mut docs = self.matching(filter);

			match sort {
				Some(ProductSort::PriceAsc) => {
					docs.sort_by(|a, b| number(a, "price").total_cmp(&number(b, "price")))
				},
				Some(ProductSort::PriceDesc) => {
					docs.sort_by(|a, b| number(b, "price").total_cmp(&number(a, "price")))
				},
				Some(ProductSort::RatingDesc) => {
					docs.sort_by(|a, b| number(b, "rating").total_cmp(&number(a, "rating")))
				},
				None => docs.sort_by_key(|doc| doc_id(doc).unwrap_or(i64::MAX)),
			}

			let total = docs.len() as i64;
			let skip = ((page - 1) * limit) as usize;
			let docs = docs.into_iter().skip(skip).take(limit as usize).collect();

			Ok(ProductPage { docs, total })
		})
	}

	fn list_categories<'a>(&'a self) -> BoxFuture<'a, trove_storage::Result<Vec<String>>> {
		Box::pin(async move {
			let names = self
				.docs
				.iter()
				.filter_map(|doc| text(doc, "category"))
				.map(str::to_string)
				.collect::<BTreeSet<_>>();

			Ok(names.into_iter().collect())
		})
	}
}

fn doc_id(doc: &Value) -> Option<i64> {
	doc.get("id").or_else(|| doc.get("product_id")).and_then(Value::as_i64)
}

fn text<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
	doc.get(key).and_then(Value::as_str)
}

fn number(doc: &Value, key: &str) -> f64 {
	doc.get(key).and_then(Value::as_f64).unwrap_or(f64::NEG_INFINITY)
}

fn matches_filter(doc: &Value, filter: &ProductFilter) -> bool {
	let category = text(doc, "category").unwrap_or_default();
	let price = doc.get("price").and_then(Value::as_f64);

	if !filter.categories.is_empty() && !filter.categories.iter().any(|name| name == category) {
		return false;
	}
	if !filter.category_terms.is_empty() {
		let lowered = category.to_lowercase();
		let hit = filter.category_terms.iter().any(|term| {
			*term == lowered || lowered.split('-').any(|part| part == term.as_str())
		});

		if !hit {
			return false;
		}
	}
	if filter.price_min.is_some_and(|min| !price.is_some_and(|price| price >= min)) {
		return false;
	}
	if filter.price_max.is_some_and(|max| !price.is_some_and(|price| price <= max)) {
		return false;
	}
	if !filter.brands.is_empty() {
		let brand = text(doc, "brand").unwrap_or_default();

		if !filter.brands.iter().any(|name| name == brand) {
			return false;
		}
	}
	if filter.has_text() {
		let mut haystack = format!(
			"{} {} {category}",
			text(doc, "title").unwrap_or_default(),
			text(doc, "description").unwrap_or_default()
		);

		if let Some(tags) = doc.get("tags").and_then(Value::as_array) {
			for tag in tags.iter().filter_map(Value::as_str) {
				haystack.push(' ');
				haystack.push_str(tag);
			}
		}

		let haystack = haystack.to_lowercase();

		if !filter.text_keywords.iter().any(|keyword| haystack.contains(&keyword.to_lowercase())) {
			return false;
		}
	}

	true
}

/// Deterministic embeddings derived from the text alone.
///
/// Identical texts embed identically, so a category index seeded with
/// [`StubEmbedding::vector_for`] returns an exact match for the seeding phrase.
pub struct StubEmbedding {
	dimensions: u32,
	failing: HashSet<String>,
	calls: AtomicUsize,
}
impl StubEmbedding {
	pub fn new(dimensions: u32) -> Self {
		Self { dimensions, failing: HashSet::new(), calls: AtomicUsize::new(0) }
	}

	/// Embedding `phrase` fails.
	pub fn failing_on(mut self, phrase: &str) -> Self {
		self.failing.insert(phrase.to_string());

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn vector_for(&self, text: &str) -> Vec<f32> {
		(0..self.dimensions)
			.map(|component| {
				// FNV-1a over the component index and the text.
				let mut hash = 0xcbf2_9ce4_8422_2325_u64;

				for byte in component.to_le_bytes().into_iter().chain(text.bytes()) {
					hash ^= u64::from(byte);
					hash = hash.wrapping_mul(0x0100_0000_01b3);
				}

				(hash % 2_001) as f32 / 1_000.0 - 1.0
			})
			.collect()
	}
}
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, trove_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some(text) = texts.iter().find(|text| self.failing.contains(text.as_str())) {
				return Err(trove_providers::Error::InvalidResponse {
					message: format!("Injected embedding failure for {text:?}."),
				});
			}

			Ok(texts.iter().map(|text| self.vector_for(text)).collect())
		})
	}
}

/// Exact cosine nearest-neighbor search over seeded category vectors.
#[derive(Default)]
pub struct MemoryCategoryIndex {
	entries: Vec<(String, Vec<f32>)>,
	failing: bool,
	calls: AtomicUsize,
}
impl MemoryCategoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_category(mut self, name: &str, vector: Vec<f32>) -> Self {
		self.entries.push((name.to_string(), vector));

		self
	}

	pub fn failing(mut self) -> Self {
		self.failing = true;

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl CategoryIndex for MemoryCategoryIndex {
	fn nearest_categories<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<String>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if self.failing {
				return Err(injected("category index"));
			}

			let mut scored = self
				.entries
				.iter()
				.map(|(name, stored)| (cosine(&vector, stored), name))
				.collect::<Vec<_>>();

			scored.sort_by(|a, b| b.0.total_cmp(&a.0));

			Ok(scored.into_iter().take(top_k as usize).map(|(_, name)| name.clone()).collect())
		})
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
	let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
	let denom = norm(a) * norm(b);

	if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Carts and the interaction log in memory.
///
/// Products that may be added to carts are registered up front with their title and price.
#[derive(Default)]
pub struct MemoryUserStore {
	products: HashMap<i64, (String, f64)>,
	carts: Mutex<HashMap<String, Cart>>,
	interactions: Mutex<Vec<Interaction>>,
	fail_reads: bool,
	fail_writes: bool,
	insert_calls: AtomicUsize,
}
impl MemoryUserStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_product(mut self, product_id: i64, title: &str, price: f64) -> Self {
		self.products.insert(product_id, (title.to_string(), price));

		self
	}

	/// History and cart lookups fail.
	pub fn failing_reads(mut self) -> Self {
		self.fail_reads = true;

		self
	}

	/// Interaction inserts fail.
	pub fn failing_writes(mut self) -> Self {
		self.fail_writes = true;

		self
	}

	pub fn insert_calls(&self) -> usize {
		self.insert_calls.load(Ordering::SeqCst)
	}

	/// Stored interactions, oldest first.
	pub fn interactions(&self) -> Vec<Interaction> {
		lock(&self.interactions).clone()
	}

	/// Appends a stored interaction directly, as if logged at `created_at`.
	pub fn seed_interaction(&self, user_id: &str, detail: InteractionDetail, created_at: OffsetDateTime) {
		lock(&self.interactions).push(Interaction {
			interaction_id: Uuid::new_v4(),
			user_id: user_id.to_string(),
			interaction_type: detail.interaction_type().to_string(),
			detail: Some(detail),
			created_at,
		});
	}
}
impl UserStore for MemoryUserStore {
	fn recent_interactions<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, trove_storage::Result<Vec<Interaction>>> {
		Box::pin(async move {
			if self.fail_reads {
				return Err(injected("history"));
			}

			let mut recent = lock(&self.interactions)
				.iter()
				.filter(|interaction| interaction.user_id == user_id)
				.cloned()
				.collect::<Vec<_>>();

			recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
			recent.truncate(limit as usize);

			Ok(recent)
		})
	}

	fn insert_interaction<'a>(
		&'a self,
		user_id: &'a str,
		detail: &'a InteractionDetail,
		created_at: OffsetDateTime,
	) -> BoxFuture<'a, trove_storage::Result<Uuid>> {
		Box::pin(async move {
			self.insert_calls.fetch_add(1, Ordering::SeqCst);

			if self.fail_writes {
				return Err(injected("interaction log"));
			}

			let interaction_id = Uuid::new_v4();

			lock(&self.interactions).push(Interaction {
				interaction_id,
				user_id: user_id.to_string(),
				interaction_type: detail.interaction_type().to_string(),
				detail: Some(detail.clone()),
				created_at,
			});

			Ok(interaction_id)
		})
	}

	fn get_cart<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>> {
		Box::pin(async move {
			if self.fail_reads {
				return Err(injected("cart"));
			}

			Ok(lock(&self.carts).get(user_id).cloned())
		})
	}

	fn add_cart_item<'a>(
		&'a self,
		user_id: &'a str,
		product_id: i64,
		quantity: i32,
	) -> BoxFuture<'a, trove_storage::Result<Cart>> {
		Box::pin(async move {
			if quantity <= 0 {
				return Err(trove_storage::Error::InvalidArgument(
					"quantity must be greater than zero.".to_string(),
				));
			}

			let Some((title, price)) = self.products.get(&product_id) else {
				return Err(trove_storage::Error::NotFound(format!(
					"Product {product_id} not found."
				)));
			};
			let mut carts = lock(&self.carts);
			let cart = carts.entry(user_id.to_string()).or_insert_with(|| Cart::empty(user_id));

			match cart.items.iter_mut().find(|item| item.product_id == product_id) {
				Some(item) => item.quantity += quantity,
				None => cart.items.push(CartItem {
					product_id,
					title: title.clone(),
					price: *price,
					thumbnail: None,
					quantity,
				}),
			}

			cart.last_updated = OffsetDateTime::now_utc();

			Ok(cart.clone())
		})
	}

	fn remove_cart_item<'a>(
		&'a self,
		user_id: &'a str,
		product_id: i64,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>> {
		Box::pin(async move {
			let mut carts = lock(&self.carts);
			let Some(cart) = carts.get_mut(user_id) else {
				return Ok(None);
			};
			let before = cart.items.len();

			cart.items.retain(|item| item.product_id != product_id);

			if cart.items.len() == before {
				return Ok(None);
			}

			cart.last_updated = OffsetDateTime::now_utc();

			Ok(Some(cart.clone()))
		})
	}

	fn clear_cart<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, trove_storage::Result<Option<Cart>>> {
		Box::pin(async move {
			let mut carts = lock(&self.carts);
			let Some(cart) = carts.get_mut(user_id) else {
				return Ok(None);
			};

			cart.items.clear();
			cart.last_updated = OffsetDateTime::now_utc();

			Ok(Some(cart.clone()))
		})
	}

	fn delete_cart<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, trove_storage::Result<bool>> {
		Box::pin(async move { Ok(lock(&self.carts).remove(user_id).is_some()) })
	}
}

/// A chat model answering from a script.
///
/// Scripted replies are consumed in order; once exhausted, the fallback reply (if any) is
/// repeated, otherwise the call fails.
#[derive(Default)]
pub struct ScriptedChat {
	script: Mutex<VecDeque<Option<Value>>>,
	fallback: Option<Value>,
	calls: AtomicUsize,
	requests: Mutex<Vec<Vec<Value>>>,
}
impl ScriptedChat {
	/// Answers every call with `reply`.
	pub fn replying(reply: Value) -> Self {
		Self { fallback: Some(reply), ..Default::default() }
	}

	/// Fails every call.
	pub fn failing() -> Self {
		Self::default()
	}

	/// Queues one reply. `None` queues one failure.
	pub fn then(self, reply: Option<Value>) -> Self {
		lock(&self.script).push_back(reply);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Message lists received, in call order.
	pub fn requests(&self) -> Vec<Vec<Value>> {
		lock(&self.requests).clone()
	}
}
impl ChatProvider for ScriptedChat {
	fn complete_json<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, trove_providers::Result<Value>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			lock(&self.requests).push(messages.to_vec());

			let reply = match lock(&self.script).pop_front() {
				Some(scripted) => scripted,
				None => self.fallback.clone(),
			};

			reply.ok_or_else(|| trove_providers::Error::InvalidResponse {
				message: "Injected chat failure.".to_string(),
			})
		})
	}
}

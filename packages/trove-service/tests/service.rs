use std::sync::Arc;

use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};

use trove_domain::{InteractionDetail, SearchDetail};
use trove_service::{
	AddCartItemRequest, HistoryRequest, LogInteractionRequest, ProductListRequest, Providers,
	RecommendRequest, SearchRequest, ServiceError, Stores, TroveService, recommend, search,
};
use trove_testkit::{
	MemoryCatalog, MemoryCategoryIndex, MemoryUserStore, ScriptedChat, StubEmbedding,
	TEST_VECTOR_DIM,
};

struct Harness {
	service: TroveService,
	catalog: Arc<MemoryCatalog>,
	users: Arc<MemoryUserStore>,
	intent: Arc<ScriptedChat>,
	ranker: Arc<ScriptedChat>,
}

struct Parts {
	catalog: MemoryCatalog,
	index: MemoryCategoryIndex,
	users: MemoryUserStore,
	embedding: StubEmbedding,
	intent: ScriptedChat,
	ranker: ScriptedChat,
}
impl Parts {
	fn new(docs: Vec<Value>) -> Self {
		let embedding = StubEmbedding::new(TEST_VECTOR_DIM);
		let index = MemoryCategoryIndex::new()
			.with_category("mens-shoes", embedding.vector_for("running shoes"))
			.with_category("kitchen-accessories", embedding.vector_for("coffee mug"));

		Self {
			catalog: MemoryCatalog::new(docs),
			index,
			users: MemoryUserStore::new(),
			embedding,
			intent: ScriptedChat::failing(),
			ranker: ScriptedChat::replying(rank_reply(&[1, 2, 3, 4])),
		}
	}

	fn build(self) -> Harness {
		let catalog = Arc::new(self.catalog);
		let users = Arc::new(self.users);
		let intent = Arc::new(self.intent);
		let ranker = Arc::new(self.ranker);
		let stores = Stores::new(catalog.clone(), Arc::new(self.index), users.clone());
		let providers = Providers::new(Arc::new(self.embedding), intent.clone(), ranker.clone());
		let service = TroveService::with_stores(trove_testkit::test_config(), stores, providers);

		Harness { service, catalog, users, intent, ranker }
	}
}

fn product(id: i64, title: &str, category: &str, price: f64) -> Value {
	json!({
		"id": id,
		"title": title,
		"description": format!("{title} built for daily use."),
		"category": category,
		"price": price,
		"brand": "Stride",
		"thumbnail": format!("https://cdn.example.com/{id}.png"),
	})
}

fn footwear(count: i64) -> Vec<Value> {
	(1..=count)
		.map(|id| product(id, &format!("Running Shoe Model {id}"), "mens-shoes", 50.0 + id as f64))
		.collect()
}

fn intent_reply(phrases: &[&str], filter_criteria: Value) -> Value {
	json!({
		"descriptive_category_phrases": phrases,
		"filter_criteria": filter_criteria,
		"user_intent_summary": "Shopper wants footwear.",
	})
}

fn rank_reply(ids: &[i64]) -> Value {
	let entries = ids
		.iter()
		.enumerate()
		.map(|(index, id)| {
			json!({ "product_id": id, "rank": index + 1, "justification": "Fits the query." })
		})
		.collect::<Vec<_>>();

	json!({ "ranked_products": entries, "overall_summary": "Picked for you." })
}

fn search_request(query: &str) -> SearchRequest {
	SearchRequest { user_id: "u-1".to_string(), query: query.to_string() }
}

fn ranker_prompt(harness: &Harness) -> String {
	let requests = harness.ranker.requests();
	let last = requests.last().expect("Ranker must have been called.");

	last[1]["content"].as_str().expect("Prompt must be a string.").to_string()
}

#[tokio::test]
async fn scenario_a_ranks_first_stage_matches_without_fallback() {
	let mut parts = Parts::new(footwear(6));

	parts.intent = ScriptedChat::replying(intent_reply(&["running shoes"], json!({})));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert!(!response.search_results.is_empty());
	assert!(response.search_results.len() <= 3);
	assert_eq!(response.message, "Picked for you.");
	assert_eq!(response.query_received, "running shoes");

	let finds = harness.catalog.find_calls();

	assert_eq!(finds.len(), 1);
	assert_eq!(finds[0].categories, vec!["mens-shoes"]);
	assert_eq!(harness.catalog.sample_calls(), 0);
	assert_eq!(harness.ranker.calls(), 1);
}

#[tokio::test]
async fn scenario_b_nonsense_query_still_returns_sampled_products() {
	let mut docs = footwear(2);

	docs.push(product(3, "Ceramic Mug", "kitchen-accessories", 9.0));

	let mut parts = Parts::new(docs);

	parts.index = MemoryCategoryIndex::new();
	parts.intent = ScriptedChat::replying(intent_reply(
		&["xyzxyz nonsense"],
		json!({ "keywords_for_db_search": ["xyzxyz"] }),
	));
	parts.ranker = ScriptedChat::replying(rank_reply(&[3]));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("xyzxyz nonsense")).await.expect("Search failed.");

	assert_eq!(harness.catalog.sample_calls(), 1);
	assert_eq!(response.search_results.len(), 1);
	assert_eq!(response.search_results[0].id, 3);
	assert_eq!(response.search_results[0].title, "Ceramic Mug");
	assert!(ranker_prompt(&harness).contains("(ID: 1)"));
}

#[tokio::test]
async fn scenario_c_intent_failure_falls_back_to_word_splitting() {
	let harness = Parts::new(footwear(6)).build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert_eq!(harness.intent.calls(), 1);
	assert!(!response.search_results.is_empty());

	let finds = harness.catalog.find_calls();

	assert_eq!(finds[0].categories, vec!["mens-shoes"]);
	assert_eq!(finds[0].text_keywords, vec!["running", "shoes"]);
}

#[tokio::test]
async fn schema_invalid_intent_output_never_fails_the_request() {
	let mut parts = Parts::new(footwear(6));

	parts.intent = ScriptedChat::replying(json!({ "descriptive_category_phrases": [] }));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert!(!response.search_results.is_empty());
}

#[tokio::test]
async fn failing_phrase_lookup_keeps_the_other_phrases() {
	let mut parts = Parts::new(vec![product(7, "Coffee Mug", "kitchen-accessories", 12.0)]);

	parts.embedding = StubEmbedding::new(TEST_VECTOR_DIM).failing_on("running shoes");
	parts.intent = ScriptedChat::replying(intent_reply(&["running shoes", "coffee mug"], json!({})));
	parts.ranker = ScriptedChat::replying(rank_reply(&[7]));

	let harness = parts.build();

	harness.service.search(search_request("shoes and a mug")).await.expect("Search failed.");

	assert_eq!(harness.catalog.find_calls()[0].categories, vec!["kitchen-accessories"]);
}

#[tokio::test]
async fn thin_primary_yield_is_replaced_by_the_fallback_pool() {
	let mut docs = footwear(2);

	docs.extend((20..=22).map(|id| product(id, &format!("Running Pole {id}"), "outdoor-gear", 30.0)));

	let mut parts = Parts::new(docs);

	parts.intent = ScriptedChat::replying(intent_reply(
		&["running shoes"],
		json!({ "keywords_for_db_search": ["running"] }),
	));
	parts.ranker = ScriptedChat::replying(rank_reply(&[20]));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running gear")).await.expect("Search failed.");
	let finds = harness.catalog.find_calls();

	// Full query yields two, then exactly one fallback stage runs.
	assert_eq!(finds.len(), 2);
	assert_eq!(finds[1].categories, Vec::<String>::new());
	assert_eq!(finds[1].text_keywords, vec!["running"]);
	assert_eq!(harness.catalog.sample_calls(), 0);
	assert!(ranker_prompt(&harness).contains("(ID: 20)"));
	assert_eq!(response.search_results[0].id, 20);
}

#[tokio::test]
async fn failed_stages_count_as_empty_and_sampling_still_yields() {
	let mut parts = Parts::new(footwear(3));

	parts.catalog = MemoryCatalog::new(footwear(3)).failing_filtered();
	parts.intent = ScriptedChat::replying(intent_reply(&["running shoes"], json!({})));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert_eq!(harness.catalog.sample_calls(), 1);
	assert!(!response.search_results.is_empty());
}

#[tokio::test]
async fn failing_text_search_moves_on_to_the_untexted_stage() {
	let mut parts = Parts::new(footwear(6));

	parts.catalog = MemoryCatalog::new(footwear(6)).failing_text();
	parts.intent = ScriptedChat::replying(intent_reply(
		&["running shoes"],
		json!({ "price_max": 100, "keywords_for_db_search": ["trail"] }),
	));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("trail shoes")).await.expect("Search failed.");
	let finds = harness.catalog.find_calls();

	assert_eq!(finds.len(), 2);
	assert_eq!(finds[0].text_keywords, vec!["trail"]);
	assert_eq!(finds[1].categories, vec!["mens-shoes"]);
	assert_eq!(finds[1].price_max, Some(100.0));
	assert!(finds[1].text_keywords.is_empty());
	assert_eq!(harness.catalog.sample_calls(), 0);
	assert!(!response.search_results.is_empty());
}

#[tokio::test]
async fn empty_stages_relax_down_to_category_only() {
	let mut parts = Parts::new(footwear(6));

	parts.intent = ScriptedChat::replying(intent_reply(
		&["running shoes"],
		json!({ "price_max": 10, "keywords_for_db_search": ["trail"] }),
	));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("cheap trail shoes")).await.expect("Search failed.");
	let finds = harness.catalog.find_calls();

	assert_eq!(finds.len(), 3);
	assert_eq!(finds[0].text_keywords, vec!["trail"]);
	assert!(finds[1].text_keywords.is_empty());
	assert_eq!(finds[1].price_max, Some(10.0));
	assert_eq!(finds[2].categories, vec!["mens-shoes"]);
	assert_eq!(finds[2].price_max, None);
	assert_eq!(harness.catalog.sample_calls(), 0);
	assert!(!response.search_results.is_empty());
}

#[tokio::test]
async fn empty_fallback_pool_keeps_the_primary_candidates() {
	let mut parts = Parts::new(footwear(2));

	parts.catalog = MemoryCatalog::new(footwear(2)).failing_sample();
	parts.index = MemoryCategoryIndex::new()
		.with_category("mens-shoes", parts.embedding.vector_for("sprint trainers"));
	parts.intent = ScriptedChat::replying(intent_reply(&["sprint trainers"], json!({})));
	parts.ranker = ScriptedChat::replying(rank_reply(&[2, 1]));

	let harness = parts.build();
	let response =
		harness.service.search(search_request("sprint trainers")).await.expect("Search failed.");
	let finds = harness.catalog.find_calls();

	// Primary category query, then the fallback's category-term stage, then sampling.
	assert_eq!(finds.len(), 2);
	assert_eq!(finds[1].category_terms, vec!["sprint", "trainers"]);
	assert_eq!(harness.catalog.sample_calls(), 1);
	assert_eq!(response.search_results.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 1]);

	let prompt = ranker_prompt(&harness);

	assert!(prompt.contains("(ID: 1)"));
	assert!(prompt.contains("(ID: 2)"));
}

#[tokio::test]
async fn malformed_records_are_skipped() {
	let mut docs = vec![json!({ "id": 99, "title": "Broken record" })];

	docs.extend(footwear(5));

	let mut parts = Parts::new(docs);

	parts.index = MemoryCategoryIndex::new();
	parts.intent = ScriptedChat::replying(intent_reply(&["xyz"], json!({})));

	let harness = parts.build();

	harness.service.search(search_request("xyz")).await.expect("Search failed.");

	let prompt = ranker_prompt(&harness);

	assert!(!prompt.contains("(ID: 99)"));
	assert!(prompt.contains("(ID: 1)"));
}

#[tokio::test]
async fn empty_catalog_never_contacts_the_ranker() {
	let harness = Parts::new(Vec::new()).build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert!(response.search_results.is_empty());
	assert_eq!(response.message, search::NOT_REFINED_MESSAGE);
	assert_eq!(harness.ranker.calls(), 0);
	assert_eq!(harness.users.insert_calls(), 0);
}

#[tokio::test]
async fn ranker_failure_is_not_refined_and_not_logged() {
	let mut parts = Parts::new(footwear(6));

	parts.ranker = ScriptedChat::failing();

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert!(response.search_results.is_empty());
	assert_eq!(response.message, "Could not refine product selection.");
	assert_eq!(harness.users.insert_calls(), 0);
}

#[tokio::test]
async fn ranker_sees_at_most_ten_candidates() {
	let harness = Parts::new(footwear(15)).build();

	harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	let prompt = ranker_prompt(&harness);

	assert!(prompt.contains("(ID: 10)"));
	assert!(!prompt.contains("(ID: 11)"));
}

#[tokio::test]
async fn logging_failure_does_not_fail_the_search() {
	let mut parts = Parts::new(footwear(6));

	parts.users = MemoryUserStore::new().failing_writes();

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert!(!response.search_results.is_empty());
	assert_eq!(harness.users.insert_calls(), 1);
}

#[tokio::test]
async fn context_lookup_failures_leave_empty_summaries() {
	let mut parts = Parts::new(footwear(6));

	parts.users = MemoryUserStore::new().failing_reads();

	let harness = parts.build();
	let response =
		harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	assert!(!response.search_results.is_empty());

	let requests = harness.intent.requests();
	let prompt = requests[0][1]["content"].as_str().expect("Prompt must be a string.");

	assert!(prompt.contains("Recent shopper history: \"\""));
	assert!(prompt.contains("Current shopper cart: \"\""));
}

#[tokio::test]
async fn logged_search_appears_in_later_context_and_history() {
	let harness = Parts::new(footwear(6)).build();

	harness.service.search(search_request("running shoes")).await.expect("Search failed.");

	let logged = harness.users.interactions();

	assert_eq!(logged.len(), 1);

	let Some(InteractionDetail::Search(detail)) = &logged[0].detail else {
		panic!("Expected a search interaction.");
	};

	assert_eq!(detail.query, "running shoes");
	assert_eq!(detail.matched_categories, vec!["mens-shoes"]);
	assert!(!detail.ranked_product_ids.is_empty());

	let history = harness
		.service
		.history(HistoryRequest { user_id: "u-1".to_string(), limit: None })
		.await
		.expect("History failed.");

	assert_eq!(history.summary, "Searched for 'running shoes'");

	harness.service.search(search_request("trail shoes")).await.expect("Search failed.");

	let requests = harness.intent.requests();
	let prompt = requests[1][1]["content"].as_str().expect("Prompt must be a string.");

	assert!(prompt.contains("Searched for 'running shoes'"));
}

#[tokio::test]
async fn history_summary_is_oldest_first() {
	let harness = Parts::new(Vec::new()).build();
	let now = OffsetDateTime::now_utc();

	harness.users.seed_interaction(
		"u-1",
		InteractionDetail::Search(SearchDetail { query: "desk".to_string(), ..Default::default() }),
		now - Duration::minutes(2),
	);
	harness.users.seed_interaction(
		"u-1",
		InteractionDetail::ViewProduct { product_id: 4, product_title: "Oak Desk".to_string() },
		now - Duration::minutes(1),
	);

	let history = harness
		.service
		.history(HistoryRequest { user_id: "u-1".to_string(), limit: None })
		.await
		.expect("History failed.");

	assert_eq!(history.interactions.len(), 2);
	assert_eq!(history.summary, "Searched for 'desk'; Viewed product 'Oak Desk' (ID: 4)");
}

#[tokio::test]
async fn blank_request_fields_are_rejected() {
	let harness = Parts::new(footwear(1)).build();
	let blank_query = harness.service.search(search_request("   ")).await;
	let blank_user = harness
		.service
		.search(SearchRequest { user_id: " ".to_string(), query: "desk".to_string() })
		.await;

	assert!(matches!(blank_query, Err(ServiceError::InvalidRequest { .. })));
	assert!(matches!(blank_user, Err(ServiceError::InvalidRequest { .. })));
	assert_eq!(harness.intent.calls(), 0);
}

#[tokio::test]
async fn recommend_without_activity_asks_for_popular_products() {
	let harness = Parts::new(footwear(6)).build();
	let response = harness
		.service
		.recommend(RecommendRequest { user_id: "u-1".to_string(), count: Some(2) })
		.await
		.expect("Recommend failed.");

	assert_eq!(response.query_used, recommend::POPULAR_QUERY);
	assert_eq!(response.recommendations.len(), 2);
	assert_eq!(harness.users.insert_calls(), 0);
}

#[tokio::test]
async fn recommend_with_cart_uses_activity_query() {
	let mut parts = Parts::new(footwear(6));

	parts.users = MemoryUserStore::new().with_product(1, "Running Shoe Model 1", 51.0);

	let harness = parts.build();

	harness
		.service
		.add_cart_item(AddCartItemRequest { user_id: "u-1".to_string(), product_id: 1, quantity: 1 })
		.await
		.expect("Add failed.");

	let response = harness
		.service
		.recommend(RecommendRequest { user_id: "u-1".to_string(), count: None })
		.await
		.expect("Recommend failed.");

	assert_eq!(response.query_used, recommend::ACTIVITY_QUERY);
}

#[tokio::test]
async fn recommend_rejects_out_of_range_counts() {
	let harness = Parts::new(footwear(6)).build();

	for count in [0, 11] {
		let result = harness
			.service
			.recommend(RecommendRequest { user_id: "u-1".to_string(), count: Some(count) })
			.await;

		assert!(matches!(result, Err(ServiceError::InvalidRequest { .. })), "count {count}");
	}
}

#[tokio::test]
async fn cart_add_increments_and_logs() {
	let mut parts = Parts::new(Vec::new());

	parts.users = MemoryUserStore::new().with_product(5, "Desk Lamp", 25.0);

	let harness = parts.build();
	let add = |quantity| AddCartItemRequest { user_id: "u-1".to_string(), product_id: 5, quantity };

	harness.service.add_cart_item(add(1)).await.expect("Add failed.");

	let cart = harness.service.add_cart_item(add(2)).await.expect("Add failed.");

	assert_eq!(cart.cart.items.len(), 1);
	assert_eq!(cart.cart.items[0].quantity, 3);
	assert_eq!(cart.summary, "User's cart contains: Desk Lamp (Qty: 3).");

	let logged = harness.users.interactions();

	assert_eq!(logged.len(), 2);
	assert_eq!(logged[1].summary_line(), "Added 'Desk Lamp' (Qty: 2) to cart");
}

#[tokio::test]
async fn cart_rejects_bad_quantities_and_unknown_products() {
	let mut parts = Parts::new(Vec::new());

	parts.users = MemoryUserStore::new().with_product(5, "Desk Lamp", 25.0);

	let harness = parts.build();
	let zero = harness
		.service
		.add_cart_item(AddCartItemRequest { user_id: "u-1".to_string(), product_id: 5, quantity: 0 })
		.await;
	let unknown = harness
		.service
		.add_cart_item(AddCartItemRequest { user_id: "u-1".to_string(), product_id: 6, quantity: 1 })
		.await;
	let missing_line = harness.service.remove_cart_item("u-1", 5).await;

	assert!(matches!(zero, Err(ServiceError::InvalidRequest { .. })));
	assert!(matches!(unknown, Err(ServiceError::NotFound { .. })));
	assert!(matches!(missing_line, Err(ServiceError::NotFound { .. })));
	assert_eq!(harness.users.insert_calls(), 0);
}

#[tokio::test]
async fn missing_cart_reads_as_empty_and_delete_is_not_found() {
	let harness = Parts::new(Vec::new()).build();
	let cart = harness.service.get_cart("u-1").await.expect("Get failed.");

	assert!(cart.cart.items.is_empty());
	assert_eq!(cart.summary, "User's cart is empty.");
	assert!(matches!(harness.service.delete_cart("u-1").await, Err(ServiceError::NotFound { .. })));
}

#[tokio::test]
async fn view_product_interactions_are_logged_on_request() {
	let harness = Parts::new(Vec::new()).build();
	let logged = harness
		.service
		.log_interaction(LogInteractionRequest {
			user_id: "u-1".to_string(),
			detail: InteractionDetail::ViewProduct {
				product_id: 4,
				product_title: "Oak Desk".to_string(),
			},
		})
		.await
		.expect("Log failed.");

	assert_eq!(logged.interaction_type, "view_product");
	assert_eq!(harness.users.interactions()[0].interaction_id, logged.interaction_id);
}

#[tokio::test]
async fn product_listing_paginates_and_sorts() {
	let harness = Parts::new(footwear(5)).build();
	let listing = harness
		.service
		.list_products(ProductListRequest {
			page: Some(2),
			limit: Some(2),
			category: Some("mens-shoes".to_string()),
			sort: Some("price_desc".to_string()),
			..Default::default()
		})
		.await
		.expect("Listing failed.");

	assert_eq!(listing.total, 5);
	assert_eq!(listing.total_pages, 3);
	let ids = listing.products.iter().filter_map(|doc| doc["id"].as_i64()).collect::<Vec<_>>();

	assert_eq!(ids, vec![3, 2]);

	let bad_sort = harness
		.service
		.list_products(ProductListRequest { sort: Some("newest".to_string()), ..Default::default() })
		.await;

	assert!(matches!(bad_sort, Err(ServiceError::InvalidRequest { .. })));
}

#[tokio::test]
async fn product_lookup_and_categories() {
	let mut docs = footwear(2);

	docs.push(product(3, "Ceramic Mug", "kitchen-accessories", 9.0));

	let harness = Parts::new(docs).build();
	let product = harness.service.get_product(3).await.expect("Lookup failed.");
	let missing = harness.service.get_product(404).await;
	let categories = harness.service.list_categories().await.expect("Categories failed.");

	assert_eq!(product["title"], "Ceramic Mug");
	assert!(matches!(missing, Err(ServiceError::NotFound { .. })));
	assert_eq!(categories.categories, vec!["kitchen-accessories", "mens-shoes"]);
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::intent::FilterCriteria;

pub const SEARCH: &str = "search";
pub const VIEW_PRODUCT: &str = "view_product";
pub const ADD_TO_CART: &str = "add_to_cart";

/// Payload of one logged interaction, keyed by `interaction_type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "interaction_type", rename_all = "snake_case")]
pub enum InteractionDetail {
	Search(SearchDetail),
	ViewProduct { product_id: i64, product_title: String },
	AddToCart { product_id: i64, product_title: String, quantity: i32 },
}
impl InteractionDetail {
	pub fn interaction_type(&self) -> &'static str {
		match self {
			Self::Search(_) => SEARCH,
			Self::ViewProduct { .. } => VIEW_PRODUCT,
			Self::AddToCart { .. } => ADD_TO_CART,
		}
	}

	pub fn summary_line(&self) -> String {
		match self {
			Self::Search(detail) => format!("Searched for '{}'", detail.query),
			Self::ViewProduct { product_id, product_title } => {
				format!("Viewed product '{product_title}' (ID: {product_id})")
			},
			Self::AddToCart { product_title, quantity, .. } => {
				format!("Added '{product_title}' (Qty: {quantity}) to cart")
			},
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDetail {
	pub query: String,
	#[serde(default)]
	pub extracted_phrases: Vec<String>,
	#[serde(default)]
	pub matched_categories: Vec<String>,
	#[serde(default)]
	pub filter_criteria: Option<FilterCriteria>,
	#[serde(default)]
	pub retrieved_product_ids: Vec<i64>,
	#[serde(default)]
	pub ranked_product_ids: Vec<i64>,
}

/// A stored interaction row. `detail` is `None` when the stored payload does not match any known
/// interaction shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Interaction {
	pub interaction_id: Uuid,
	pub user_id: String,
	pub interaction_type: String,
	pub detail: Option<InteractionDetail>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}
impl Interaction {
	pub fn from_stored(
		interaction_id: Uuid,
		user_id: String,
		interaction_type: String,
		details: Value,
		created_at: OffsetDateTime,
	) -> Self {
		let detail = serde_json::from_value::<InteractionDetail>(details)
			.ok()
			.filter(|detail| detail.interaction_type() == interaction_type);

		Self { interaction_id, user_id, interaction_type, detail, created_at }
	}

	pub fn summary_line(&self) -> String {
		match &self.detail {
			Some(detail) => detail.summary_line(),
			None => format!("Performed '{}' action", self.interaction_type),
		}
	}
}

/// Joins interactions given newest-first into an oldest-first summary.
pub fn summarize_recent(newest_first: &[Interaction]) -> String {
	newest_first.iter().rev().map(Interaction::summary_line).collect::<Vec<_>>().join("; ")
}

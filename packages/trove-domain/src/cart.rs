use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const EMPTY_CART_SUMMARY: &str = "User's cart is empty.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
	pub product_id: i64,
	pub title: String,
	pub price: f64,
	pub thumbnail: Option<String>,
	pub quantity: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
	pub user_id: String,
	pub items: Vec<CartItem>,
	#[serde(with = "crate::time_serde")]
	pub last_updated: OffsetDateTime,
}
impl Cart {
	pub fn empty(user_id: &str) -> Self {
		Self {
			user_id: user_id.to_string(),
			items: Vec::new(),
			last_updated: OffsetDateTime::now_utc(),
		}
	}

	/// Context line describing the cart contents for the language models.
	pub fn summary(&self) -> String {
		summarize_items(&self.items)
	}
}

pub fn summarize_items(items: &[CartItem]) -> String {
	if items.is_empty() {
		return EMPTY_CART_SUMMARY.to_string();
	}

	let lines = items
		.iter()
		.map(|item| format!("{} (Qty: {})", item.title, item.quantity))
		.collect::<Vec<_>>();

	format!("User's cart contains: {}.", lines.join(", "))
}

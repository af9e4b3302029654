use serde::{Deserialize, Serialize};
use serde_json::Value;

const DESCRIPTION_SUMMARY_CHARS: usize = 200;

/// A catalog record as stored in the product document column.
///
/// Only `id`, `title`, `description`, `category` and `price` are required; a stored document
/// missing any of them does not convert and is skipped by retrieval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
	#[serde(alias = "product_id")]
	pub id: i64,
	pub title: String,
	pub description: String,
	pub category: String,
	pub price: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub brand: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub discount_percentage: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rating: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stock: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sku: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub weight: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dimensions: Option<Dimensions>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub warranty_information: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipping_information: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub availability_status: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub return_policy: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub minimum_order_quantity: Option<i64>,
	#[serde(default)]
	pub images: Vec<String>,
	#[serde(default)]
	pub reviews: Vec<Review>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}
impl Candidate {
	pub fn from_document(doc: Value) -> serde_json::Result<Self> {
		serde_json::from_value(doc)
	}

	/// Description cut to the length shown to the ranking model.
	pub fn description_summary(&self) -> String {
		if self.description.chars().count() > DESCRIPTION_SUMMARY_CHARS {
			let head: String = self.description.chars().take(DESCRIPTION_SUMMARY_CHARS).collect();

			format!("{head}...")
		} else {
			self.description.clone()
		}
	}

	/// One numbered block of the candidate listing sent to the ranking model.
	pub fn prompt_block(&self, position: usize) -> String {
		let tags = if self.tags.is_empty() { "N/A".to_string() } else { self.tags.join(", ") };

		format!(
			"Product {position} (ID: {id}):\n  Title: {title}\n  Category: {category}\n  Brand: {brand}\n  Price: ${price:.2}\n  Description Summary: {description}\n  Tags: {tags}\n  Thumbnail: {thumbnail}\n",
			id = self.id,
			title = self.title,
			category = self.category,
			brand = self.brand.as_deref().unwrap_or("N/A"),
			price = self.price,
			description = self.description_summary(),
			thumbnail = self.thumbnail.as_deref().unwrap_or("N/A"),
		)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
	pub width: f64,
	pub height: f64,
	pub depth: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
	pub rating: i64,
	pub comment: String,
	pub date: String,
	pub reviewer_name: String,
	pub reviewer_email: String,
}

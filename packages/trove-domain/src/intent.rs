
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::terms;

/// Structured interpretation of one raw query plus user context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
	pub descriptive_phrases: Vec<String>,
	pub filter_criteria: FilterCriteria,
	#[serde(default)]
	pub extracted_tags: Vec<String>,
	pub intent_summary: String,
}
impl QueryIntent {
	/// Deterministic intent built from the raw query alone. Never fails.
	pub fn fallback(raw_query: &str) -> Self {
		Self {
			descriptive_phrases: vec![raw_query.trim().to_string()],
			filter_criteria: FilterCriteria {
				keywords: terms::query_keywords(raw_query),
				..Default::default()
			},
			extracted_tags: Vec::new(),
			intent_summary: format!("User wants to find: {raw_query}"),
		}
	}

	/// Validates and normalizes the JSON produced by the text-understanding service.
	pub fn from_service_output(value: Value, max_phrases: usize) -> Result<Self, IntentViolation> {
		if !value.is_object() {
			return Err(IntentViolation::NotAnObject);
		}

		let raw: RawIntent = serde_json::from_value(value)
			.map_err(|err| IntentViolation::Malformed { message: err.to_string() })?;
		let mut descriptive_phrases = clean_list(raw.descriptive_category_phrases);

		descriptive_phrases.truncate(max_phrases);

		if descriptive_phrases.is_empty() {
			return Err(IntentViolation::NoPhrases);
		}

		let intent_summary = raw.user_intent_summary.trim().to_string();

		if intent_summary.is_empty() {
			return Err(IntentViolation::BlankSummary);
		}

		let filter_criteria = raw.filter_criteria.unwrap_or_default().normalized()?;

		Ok(Self {
			descriptive_phrases,
			filter_criteria,
			extracted_tags: clean_list(raw.extracted_tags.unwrap_or_default()),
			intent_summary,
		})
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price_min: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price_max: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub brand: Option<BrandFilter>,
	#[serde(default, alias = "keywords_for_db_search", skip_serializing_if = "Vec::is_empty")]
	pub keywords: Vec<String>,
}
impl FilterCriteria {
	pub fn brands(&self) -> Vec<String> {
		self.brand.as_ref().map(BrandFilter::values).unwrap_or_default()
	}

	fn normalized(self) -> Result<Self, IntentViolation> {
		for price in [self.price_min, self.price_max].into_iter().flatten() {
			if !price.is_finite() || price < 0.0 {
				return Err(IntentViolation::InvalidPrice);
			}
		}
		if let (Some(min), Some(max)) = (self.price_min, self.price_max)
			&& min > max
		{
			return Err(IntentViolation::InvertedPriceRange);
		}

		let brand = self.brand.and_then(BrandFilter::normalized);

		Ok(Self {
			price_min: self.price_min,
			price_max: self.price_max,
			brand,
			keywords: clean_list(self.keywords),
		})
	}
}

/// Brand constraint: a single brand matches by equality, several by set membership.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrandFilter {
	One(String),
	Many(Vec<String>),
}
impl BrandFilter {
	pub fn values(&self) -> Vec<String> {
		match self {
			Self::One(brand) => vec![brand.clone()],
			Self::Many(brands) => brands.clone(),
		}
	}

	fn normalized(self) -> Option<Self> {
		match self {
			Self::One(brand) => {
				let brand = brand.trim();

				(!brand.is_empty()).then(|| Self::One(brand.to_string()))
			},
			Self::Many(brands) => {
				let brands = clean_list(brands);

				(!brands.is_empty()).then_some(Self::Many(brands))
			},
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IntentViolation {
	#[error("Intent output is not a JSON object.")]
	NotAnObject,
	#[error("Intent output is malformed: {message}.")]
	Malformed { message: String },
	#[error("Intent output has no descriptive phrases.")]
	NoPhrases,
	#[error("Intent output has a blank intent summary.")]
	BlankSummary,
	#[error("Intent output has a negative or non-finite price.")]
	InvalidPrice,
	#[error("Intent output has price_min above price_max.")]
	InvertedPriceRange,
}

#[derive(Deserialize)]
struct RawIntent {
	#[serde(alias = "descriptive_phrases")]
	descriptive_category_phrases: Vec<String>,
	#[serde(default)]
	filter_criteria: Option<FilterCriteria>,
	#[serde(default)]
	extracted_tags: Option<Vec<String>>,
	#[serde(alias = "intent_summary")]
	user_intent_summary: String,
}

fn clean_list(values: Vec<String>) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(values.len());

	for value in values {
		let trimmed = value.trim();

		if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
			continue;
		}

		out.push(trimmed.to_string());
	}

	out
}

use std::str::FromStr;

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use trove_domain::Candidate;

use crate::{Error, Result, db::Db};

/// Structured constraints for one catalog query. Empty fields impose no constraint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
	/// Exact category membership.
	pub categories: Vec<String>,
	/// Lowercased terms matched against the category name or any of its `-` separated parts.
	pub category_terms: Vec<String>,
	pub price_min: Option<f64>,
	pub price_max: Option<f64>,
	pub brands: Vec<String>,
	/// Full-text terms; a product matches when any term matches.
	pub text_keywords: Vec<String>,
}
impl ProductFilter {
	pub fn is_unconstrained(&self) -> bool {
		self.categories.is_empty()
			&& self.category_terms.is_empty()
			&& self.price_min.is_none()
			&& self.price_max.is_none()
			&& self.brands.is_empty()
			&& self.text_keywords.is_empty()
	}

	pub fn has_text(&self) -> bool {
		!self.text_keywords.is_empty()
	}

	fn text_query(&self) -> String {
		self.text_keywords.join(" or ")
	}

	fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		builder.push(" WHERE TRUE");

		if !self.categories.is_empty() {
			builder.push(" AND category = ANY(").push_bind(self.categories.clone()).push(")");
		}
		if !self.category_terms.is_empty() {
			builder
				.push(" AND (lower(category) = ANY(")
				.push_bind(self.category_terms.clone())
				.push(") OR string_to_array(lower(category), '-') && ")
				.push_bind(self.category_terms.clone())
				.push("::text[])");
		}
		if let Some(price_min) = self.price_min {
			builder.push(" AND price >= ").push_bind(price_min);
		}
		if let Some(price_max) = self.price_max {
			builder.push(" AND price <= ").push_bind(price_max);
		}
		if !self.brands.is_empty() {
			builder.push(" AND brand = ANY(").push_bind(self.brands.clone()).push(")");
		}
		if self.has_text() {
			builder
				.push(" AND search_vector @@ websearch_to_tsquery('english', ")
				.push_bind(self.text_query())
				.push(")");
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSort {
	PriceAsc,
	PriceDesc,
	RatingDesc,
}
impl ProductSort {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::PriceAsc => "price_asc",
			Self::PriceDesc => "price_desc",
			Self::RatingDesc => "rating_desc",
		}
	}

	fn order_by(self) -> &'static str {
		match self {
			Self::PriceAsc => " ORDER BY price ASC, product_id ASC",
			Self::PriceDesc => " ORDER BY price DESC, product_id ASC",
			Self::RatingDesc => " ORDER BY rating DESC NULLS LAST, product_id ASC",
		}
	}
}
impl FromStr for ProductSort {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"price_asc" => Ok(Self::PriceAsc),
			"price_desc" => Ok(Self::PriceDesc),
			"rating_desc" => Ok(Self::RatingDesc),
			other => Err(Error::InvalidArgument(format!("Unsupported sort order {other:?}."))),
		}
	}
}

#[derive(Debug)]
pub struct ProductPage {
	pub docs: Vec<Value>,
	pub total: i64,
}

/// Returns stored product documents matching `filter`, best text matches first.
pub async fn find_products(db: &Db, filter: &ProductFilter, limit: u32) -> Result<Vec<Value>> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT doc FROM products");

	filter.push_where(&mut builder);

	if filter.has_text() {
		builder
			.push(" ORDER BY ts_rank(search_vector, websearch_to_tsquery('english', ")
			.push_bind(filter.text_query())
			.push(")) DESC, product_id ASC");
	} else {
		builder.push(" ORDER BY product_id ASC");
	}

	builder.push(" LIMIT ").push_bind(i64::from(limit));

	let docs = builder.build_query_scalar::<Value>().fetch_all(&db.pool).await?;

	Ok(docs)
}

/// Up to `limit` arbitrary product documents.
pub async fn sample_products(db: &Db, limit: u32) -> Result<Vec<Value>> {
	let docs = sqlx::query_scalar::<_, Value>("SELECT doc FROM products ORDER BY random() LIMIT $1")
		.bind(i64::from(limit))
		.fetch_all(&db.pool)
		.await?;

	Ok(docs)
}

pub async fn get_product(db: &Db, product_id: i64) -> Result<Option<Value>> {
	let doc = sqlx::query_scalar::<_, Value>("SELECT doc FROM products WHERE product_id = $1")
		.bind(product_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(doc)
}

pub async fn list_products(
	db: &Db,
	filter: &ProductFilter,
	sort: Option<ProductSort>,
	page: u32,
	limit: u32,
) -> Result<ProductPage> {
	if page == 0 || limit == 0 {
		return Err(Error::InvalidArgument("page and limit must be greater than zero.".to_string()));
	}

	let mut count = QueryBuilder::<Postgres>::new("SELECT count(*) FROM products");

	filter.push_where(&mut count);

	let total = count.build_query_scalar::<i64>().fetch_one(&db.pool).await?;
	let mut builder = QueryBuilder::<Postgres>::new("SELECT doc FROM products");

	filter.push_where(&mut builder);
	builder.push(sort.map(ProductSort::order_by).unwrap_or(" ORDER BY product_id ASC"));
	builder
		.push(" LIMIT ")
		.push_bind(i64::from(limit))
		.push(" OFFSET ")
		.push_bind(i64::from(page - 1) * i64::from(limit));

	let docs = builder.build_query_scalar::<Value>().fetch_all(&db.pool).await?;

	Ok(ProductPage { docs, total })
}

pub async fn upsert_product(db: &Db, product: &Candidate) -> Result<()> {
	let doc = serde_json::to_value(product)?;

	sqlx::query(
		"\
INSERT INTO products (product_id, title, category, brand, price, rating, search_text, doc)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (product_id) DO UPDATE
SET
	title = EXCLUDED.title,
	category = EXCLUDED.category,
	brand = EXCLUDED.brand,
	price = EXCLUDED.price,
	rating = EXCLUDED.rating,
	search_text = EXCLUDED.search_text,
	doc = EXCLUDED.doc,
	updated_at = now()",
	)
	.bind(product.id)
	.bind(product.title.as_str())
	.bind(product.category.as_str())
	.bind(product.brand.as_deref())
	.bind(product.price)
	.bind(product.rating)
	.bind(search_text(product))
	.bind(doc)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Category names from the master list, falling back to distinct product categories.
pub async fn list_categories(db: &Db) -> Result<Vec<String>> {
	let names = sqlx::query_scalar::<_, String>(
		"SELECT category_name FROM categories ORDER BY category_name ASC",
	)
	.fetch_all(&db.pool)
	.await?;

	if !names.is_empty() {
		return Ok(names);
	}

	let names = sqlx::query_scalar::<_, String>(
		"SELECT DISTINCT category FROM products ORDER BY category ASC",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(names)
}

pub async fn upsert_category(db: &Db, category_name: &str, description: Option<&str>) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO categories (category_name, description)
VALUES ($1, $2)
ON CONFLICT (category_name) DO UPDATE
SET description = EXCLUDED.description",
	)
	.bind(category_name)
	.bind(description)
	.execute(&db.pool)
	.await?;

	Ok(())
}

fn search_text(product: &Candidate) -> String {
	let mut parts =
		vec![product.title.as_str(), product.description.as_str(), product.category.as_str()];

	if let Some(brand) = product.brand.as_deref() {
		parts.push(brand);
	}

	parts.extend(product.tags.iter().map(String::as_str));

	parts.join(" ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_filter_is_unconstrained() {
		assert!(ProductFilter::default().is_unconstrained());
		assert!(
			!ProductFilter { price_max: Some(10.0), ..Default::default() }.is_unconstrained()
		);
	}

	#[test]
	fn search_text_covers_category() {
		let product = serde_json::from_value::<Candidate>(serde_json::json!({
			"id": 1,
			"title": "Trail Runner",
			"description": "Grippy sole.",
			"category": "mens-shoes",
			"price": 89.0,
			"brand": "Stride",
			"tags": ["outdoor"],
		}))
		.expect("Failed to build candidate.");

		assert_eq!(search_text(&product), "Trail Runner Grippy sole. mens-shoes Stride outdoor");
	}

	#[test]
	fn builds_conjunctive_where_clause() {
		let filter = ProductFilter {
			categories: vec!["mens-shoes".to_string()],
			price_min: Some(10.0),
			brands: vec!["Stride".to_string()],
			text_keywords: vec!["trail".to_string(), "grip".to_string()],
			..Default::default()
		};
		let mut builder = QueryBuilder::<Postgres>::new("SELECT doc FROM products");

		filter.push_where(&mut builder);

		let sql = builder.sql();

		assert!(sql.contains("category = ANY($1)"));
		assert!(sql.contains("price >= $2"));
		assert!(!sql.contains("price <="));
		assert!(sql.contains("brand = ANY($3)"));
		assert!(sql.contains("websearch_to_tsquery('english', $4)"));
		assert_eq!(filter.text_query(), "trail or grip");
	}

	#[test]
	fn parses_sort_orders() {
		assert_eq!("rating_desc".parse::<ProductSort>().ok(), Some(ProductSort::RatingDesc));
		assert!("newest".parse::<ProductSort>().is_err());
	}
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use trove_storage::catalog::{ProductFilter, ProductSort};

use crate::{ServiceError, ServiceResult, TroveService};

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductListRequest {
	pub page: Option<u32>,
	pub limit: Option<u32>,
	pub category: Option<String>,
	pub brand: Option<String>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
	/// One of `price_asc`, `price_desc` or `rating_desc`.
	pub sort: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
	pub products: Vec<Value>,
	pub total: i64,
	pub page: u32,
	pub limit: u32,
	pub total_pages: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryListResponse {
	pub categories: Vec<String>,
}

impl TroveService {
	pub async fn get_product(&self, product_id: i64) -> ServiceResult<Value> {
		self.stores.catalog.get_product(product_id).await?.ok_or_else(|| ServiceError::NotFound {
			message: format!("Product {product_id} not found."),
		})
	}

	pub async fn list_products(&self, req: ProductListRequest) -> ServiceResult<ProductListResponse> {
		let page = req.page.unwrap_or(1);
		let limit = req.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

		if page == 0 {
			return Err(ServiceError::InvalidRequest {
				message: "page must be greater than zero.".to_string(),
			});
		}
		if limit == 0 || limit > MAX_PAGE_LIMIT {
			return Err(ServiceError::InvalidRequest {
				message: format!("limit must be between 1 and {MAX_PAGE_LIMIT}."),
			});
		}
		if matches!((req.min_price, req.max_price), (Some(min), Some(max)) if min > max) {
			return Err(ServiceError::InvalidRequest {
				message: "min_price must not exceed max_price.".to_string(),
			});
		}

		let sort = req.sort.as_deref().map(str::parse::<ProductSort>).transpose()?;
		let filter = list_filter(&req);
		let found = self.stores.catalog.list_products(&filter, sort, page, limit).await?;
		let total_pages = u32::try_from((found.total.max(0) as u64).div_ceil(u64::from(limit)))
			.unwrap_or(u32::MAX);

		Ok(ProductListResponse { products: found.docs, total: found.total, page, limit, total_pages })
	}

	pub async fn list_categories(&self) -> ServiceResult<CategoryListResponse> {
		Ok(CategoryListResponse { categories: self.stores.catalog.list_categories().await? })
	}
}

fn list_filter(req: &ProductListRequest) -> ProductFilter {
	let non_blank = |value: &Option<String>| {
		value.as_deref().map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
	};

	ProductFilter {
		categories: non_blank(&req.category).into_iter().collect(),
		price_min: req.min_price,
		price_max: req.max_price,
		brands: non_blank(&req.brand).into_iter().collect(),
		..Default::default()
	}
}

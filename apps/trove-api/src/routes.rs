use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use trove_service::{
	AddCartItemRequest, CartResponse, CategoryListResponse, HistoryRequest, HistoryResponse,
	LogInteractionRequest, LogInteractionResponse, ProductListRequest, ProductListResponse,
	RecommendRequest, RecommendResponse, SearchRequest, SearchResponse, ServiceError,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/recommend", post(recommend))
		.route("/v1/carts/items", post(add_cart_item))
		.route("/v1/carts/{user_id}", get(get_cart).delete(delete_cart))
		.route("/v1/carts/{user_id}/clear", post(clear_cart))
		.route("/v1/carts/{user_id}/items/{product_id}", delete(remove_cart_item))
		.route("/v1/history/{user_id}", get(history))
		.route("/v1/interactions", post(log_interaction))
		.route("/v1/products", get(list_products))
		.route("/v1/products/{product_id}", get(get_product))
		.route("/v1/categories", get(list_categories))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	Ok(Json(state.service.search(payload).await?))
}

async fn recommend(
	State(state): State<AppState>,
	Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
	Ok(Json(state.service.recommend(payload).await?))
}

async fn get_cart(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
	Ok(Json(state.service.get_cart(&user_id).await?))
}

async fn add_cart_item(
	State(state): State<AppState>,
	Json(payload): Json<AddCartItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
	Ok(Json(state.service.add_cart_item(payload).await?))
}

async fn remove_cart_item(
	State(state): State<AppState>,
	Path((user_id, product_id)): Path<(String, i64)>,
) -> Result<Json<CartResponse>, ApiError> {
	Ok(Json(state.service.remove_cart_item(&user_id, product_id).await?))
}

async fn clear_cart(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
	Ok(Json(state.service.clear_cart(&user_id).await?))
}

async fn delete_cart(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
	state.service.delete_cart(&user_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
	limit: Option<u32>,
}

async fn history(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
	Ok(Json(state.service.history(HistoryRequest { user_id, limit: query.limit }).await?))
}

async fn log_interaction(
	State(state): State<AppState>,
	Json(payload): Json<LogInteractionRequest>,
) -> Result<(StatusCode, Json<LogInteractionResponse>), ApiError> {
	let response = state.service.log_interaction(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn list_products(
	State(state): State<AppState>,
	Query(query): Query<ProductListRequest>,
) -> Result<Json<ProductListResponse>, ApiError> {
	Ok(Json(state.service.list_products(query).await?))
}

async fn get_product(
	State(state): State<AppState>,
	Path(product_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
	Ok(Json(state.service.get_product(product_id).await?))
}

async fn list_categories(
	State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, ApiError> {
	Ok(Json(state.service.list_categories().await?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

/// JSON error body with a status code. Backend failures carry a generic message only.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => {
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
			},
			ServiceError::NotFound { message } => Self::new(StatusCode::NOT_FOUND, "not_found", message),
			ServiceError::Provider { message } => {
				warn!(error = %message, "Provider failure surfaced to a request.");

				Self::new(StatusCode::BAD_GATEWAY, "provider_error", "Upstream model service failed.")
			},
			ServiceError::Storage { message } | ServiceError::Qdrant { message } => {
				warn!(error = %message, "Storage failure surfaced to a request.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Storage is unavailable.")
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

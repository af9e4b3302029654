use serde::{Deserialize, Serialize};

use trove_domain::{Cart, InteractionDetail};

use crate::{ServiceError, ServiceResult, TroveService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddCartItemRequest {
	pub user_id: String,
	pub product_id: i64,
	#[serde(default = "default_quantity")]
	pub quantity: i32,
}

/// A cart as returned to callers. A user without a cart row gets an empty one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartResponse {
	pub cart: Cart,
	pub summary: String,
}
impl CartResponse {
	fn new(cart: Cart) -> Self {
		let summary = cart.summary();

		Self { cart, summary }
	}

	fn empty(user_id: &str) -> Self {
		Self::new(Cart::empty(user_id))
	}
}

impl TroveService {
	pub async fn get_cart(&self, user_id: &str) -> ServiceResult<CartResponse> {
		crate::require_user_id(user_id)?;

		let cart = self.stores.users.get_cart(user_id).await?;

		Ok(cart.map(CartResponse::new).unwrap_or_else(|| CartResponse::empty(user_id)))
	}

	/// Adds `quantity` of a catalog product, incrementing an existing line.
	///
	/// The addition is logged as an `add_to_cart` interaction; a logging failure does not
	/// undo the cart change.
	pub async fn add_cart_item(&self, req: AddCartItemRequest) -> ServiceResult<CartResponse> {
		crate::require_user_id(&req.user_id)?;

		if req.quantity <= 0 {
			return Err(ServiceError::InvalidRequest {
				message: "quantity must be greater than zero.".to_string(),
			});
		}

		let cart = self.stores.users.add_cart_item(&req.user_id, req.product_id, req.quantity).await?;
		let product_title = cart
			.items
			.iter()
			.find(|item| item.product_id == req.product_id)
			.map(|item| item.title.clone())
			.unwrap_or_default();
		let detail = InteractionDetail::AddToCart {
			product_id: req.product_id,
			product_title,
			quantity: req.quantity,
		};

		self.record_interaction(&req.user_id, &detail).await;

		Ok(CartResponse::new(cart))
	}

	pub async fn remove_cart_item(
		&self,
		user_id: &str,
		product_id: i64,
	) -> ServiceResult<CartResponse> {
		crate::require_user_id(user_id)?;

		match self.stores.users.remove_cart_item(user_id, product_id).await? {
			Some(cart) => Ok(CartResponse::new(cart)),
			None => Err(ServiceError::NotFound {
				message: format!("Product {product_id} is not in the cart of user {user_id}."),
			}),
		}
	}

	pub async fn clear_cart(&self, user_id: &str) -> ServiceResult<CartResponse> {
		crate::require_user_id(user_id)?;

		let cart = self.stores.users.clear_cart(user_id).await?;

		Ok(cart.map(CartResponse::new).unwrap_or_else(|| CartResponse::empty(user_id)))
	}

	pub async fn delete_cart(&self, user_id: &str) -> ServiceResult<()> {
		crate::require_user_id(user_id)?;

		if !self.stores.users.delete_cart(user_id).await? {
			return Err(ServiceError::NotFound {
				message: format!("User {user_id} has no cart."),
			});
		}

		Ok(())
	}
}

fn default_quantity() -> i32 {
	1
}

use tracing::warn;

use trove_domain::{cart, interaction};

use crate::TroveService;

/// Context strings handed to both language models. Either may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct UserContext {
	pub(crate) history_summary: String,
	pub(crate) cart_summary: String,
	pub(crate) cart_items: usize,
}
impl UserContext {
	/// No recorded history and nothing in the cart.
	pub(crate) fn has_no_activity(&self) -> bool {
		self.history_summary.is_empty() && self.cart_items == 0
	}
}

impl TroveService {
	pub(crate) async fn gather_context(&self, user_id: &str) -> UserContext {
		let (cart_summary, cart_items) = self.cart_summary(user_id).await;

		UserContext { history_summary: self.history_summary(user_id).await, cart_summary, cart_items }
	}

	/// Recent interactions, oldest first. Empty on lookup failure.
	pub(crate) async fn history_summary(&self, user_id: &str) -> String {
		let limit = self.cfg.search.history_interactions;

		match self.stores.users.recent_interactions(user_id, limit).await {
			Ok(recent) => interaction::summarize_recent(&recent),
			Err(err) => {
				warn!(error = %err, user_id, "History lookup failed. Continuing without history.");

				String::new()
			},
		}
	}

	/// Cart contents line and line count. The line is empty on lookup failure.
	pub(crate) async fn cart_summary(&self, user_id: &str) -> (String, usize) {
		match self.stores.users.get_cart(user_id).await {
			Ok(Some(cart)) => (cart.summary(), cart.items.len()),
			Ok(None) => (cart::EMPTY_CART_SUMMARY.to_string(), 0),
			Err(err) => {
				warn!(error = %err, user_id, "Cart lookup failed. Continuing without cart.");

				(String::new(), 0)
			},
		}
	}
}

use time::OffsetDateTime;

use trove_domain::{Cart, CartItem};

use crate::{Error, Result, db::Db};

#[derive(sqlx::FromRow)]
struct CartItemRow {
	product_id: i64,
	title: String,
	price: f64,
	thumbnail: Option<String>,
	quantity: i32,
}

pub async fn get_cart(db: &Db, user_id: &str) -> Result<Option<Cart>> {
	let last_updated = sqlx::query_scalar::<_, OffsetDateTime>(
		"SELECT last_updated FROM carts WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;
	let Some(last_updated) = last_updated else {
		return Ok(None);
	};
	let rows = sqlx::query_as::<_, CartItemRow>(
		"\
SELECT product_id, title, price, thumbnail, quantity
FROM cart_items
WHERE user_id = $1
ORDER BY added_at ASC, product_id ASC",
	)
	.bind(user_id)
	.fetch_all(&db.pool)
	.await?;
	let items = rows
		.into_iter()
		.map(|row| CartItem {
			product_id: row.product_id,
			title: row.title,
			price: row.price,
			thumbnail: row.thumbnail,
			quantity: row.quantity,
		})
		.collect();

	Ok(Some(Cart { user_id: user_id.to_string(), items, last_updated }))
}

/// Adds `quantity` of a product, incrementing an existing line. Creates the cart on first use.
pub async fn add_item(db: &Db, user_id: &str, product_id: i64, quantity: i32) -> Result<Cart> {
	if quantity <= 0 {
		return Err(Error::InvalidArgument("quantity must be greater than zero.".to_string()));
	}

	let mut tx = db.pool.begin().await?;
	let product = sqlx::query_as::<_, (String, f64, Option<String>)>(
		"SELECT title, price, doc->>'thumbnail' FROM products WHERE product_id = $1",
	)
	.bind(product_id)
	.fetch_optional(&mut *tx)
	.await?;
	let Some((title, price, thumbnail)) = product else {
		return Err(Error::NotFound(format!("Product {product_id} does not exist.")));
	};
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO carts (user_id, last_updated)
VALUES ($1, $2)
ON CONFLICT (user_id) DO UPDATE
SET last_updated = EXCLUDED.last_updated",
	)
	.bind(user_id)
	.bind(now)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"\
INSERT INTO cart_items (user_id, product_id, title, price, thumbnail, quantity, added_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (user_id, product_id) DO UPDATE
SET quantity = cart_items.quantity + EXCLUDED.quantity",
	)
	.bind(user_id)
	.bind(product_id)
	.bind(title)
	.bind(price)
	.bind(thumbnail)
	.bind(quantity)
	.bind(now)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	get_cart(db, user_id)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Cart for user {user_id} disappeared.")))
}

/// Removes a product line. `None` when the cart does not hold the product.
pub async fn remove_item(db: &Db, user_id: &str, product_id: i64) -> Result<Option<Cart>> {
	let removed = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
		.bind(user_id)
		.bind(product_id)
		.execute(&db.pool)
		.await?
		.rows_affected();

	if removed == 0 {
		return Ok(None);
	}

	touch(db, user_id).await?;
	get_cart(db, user_id).await
}

/// Empties the cart but keeps it. `None` when the user has no cart.
pub async fn clear_cart(db: &Db, user_id: &str) -> Result<Option<Cart>> {
	if !touch(db, user_id).await? {
		return Ok(None);
	}

	sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
		.bind(user_id)
		.execute(&db.pool)
		.await?;

	get_cart(db, user_id).await
}

/// Deletes the cart and its lines. Returns whether a cart existed.
pub async fn delete_cart(db: &Db, user_id: &str) -> Result<bool> {
	let deleted = sqlx::query("DELETE FROM carts WHERE user_id = $1")
		.bind(user_id)
		.execute(&db.pool)
		.await?
		.rows_affected();

	Ok(deleted > 0)
}

async fn touch(db: &Db, user_id: &str) -> Result<bool> {
	let updated = sqlx::query("UPDATE carts SET last_updated = $2 WHERE user_id = $1")
		.bind(user_id)
		.bind(OffsetDateTime::now_utc())
		.execute(&db.pool)
		.await?
		.rows_affected();

	Ok(updated > 0)
}

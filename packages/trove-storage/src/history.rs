use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use trove_domain::{Interaction, InteractionDetail};

use crate::{Result, db::Db};

#[derive(sqlx::FromRow)]
struct InteractionRow {
	interaction_id: Uuid,
	user_id: String,
	interaction_type: String,
	details: Value,
	created_at: OffsetDateTime,
}

pub async fn insert_interaction(
	db: &Db,
	user_id: &str,
	detail: &InteractionDetail,
	created_at: OffsetDateTime,
) -> Result<Uuid> {
	let interaction_id = Uuid::new_v4();
	let details = serde_json::to_value(detail)?;

	sqlx::query(
		"\
INSERT INTO user_interactions (interaction_id, user_id, interaction_type, details, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(interaction_id)
	.bind(user_id)
	.bind(detail.interaction_type())
	.bind(details)
	.bind(created_at)
	.execute(&db.pool)
	.await?;

	Ok(interaction_id)
}

/// The `limit` most recent interactions of a user, newest first.
pub async fn recent_interactions(db: &Db, user_id: &str, limit: u32) -> Result<Vec<Interaction>> {
	let rows = sqlx::query_as::<_, InteractionRow>(
		"\
SELECT interaction_id, user_id, interaction_type, details, created_at
FROM user_interactions
WHERE user_id = $1
ORDER BY created_at DESC, interaction_id DESC
LIMIT $2",
	)
	.bind(user_id)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows
		.into_iter()
		.map(|row| {
			Interaction::from_stored(
				row.interaction_id,
				row.user_id,
				row.interaction_type,
				row.details,
				row.created_at,
			)
		})
		.collect())
}

use sqlx::{PgPool, Row};
use time::OffsetDateTime;

use crate::{Result, models::CachedPayload};

pub async fn fetch_cache_payload(
	pool: &PgPool,
	key: &str,
	now: OffsetDateTime,
) -> Result<Option<CachedPayload>> {
	let row =
		sqlx::query("SELECT payload FROM search_cache WHERE cache_key = $1 AND expires_at > $2")
			.bind(key)
			.bind(now)
			.fetch_optional(pool)
			.await?;
	let Some(row) = row else { return Ok(None) };
	let value: serde_json::Value = row.try_get("payload")?;
	let size_bytes = serde_json::to_vec(&value).map(|raw| raw.len()).unwrap_or(0);

	Ok(Some(CachedPayload { value, size_bytes }))
}

/// Upserts a cache entry. Returns the stored payload size, or `None` when
/// the payload exceeds `max_payload_bytes` and was skipped.
pub async fn store_cache_payload(
	pool: &PgPool,
	key: &str,
	payload: serde_json::Value,
	item_ids: &[i64],
	stored_at: OffsetDateTime,
	expires_at: OffsetDateTime,
	max_payload_bytes: Option<u64>,
) -> Result<Option<u64>> {
	let size_bytes = serde_json::to_vec(&payload).map(|raw| raw.len() as u64).unwrap_or(u64::MAX);

	if let Some(max) = max_payload_bytes
		&& size_bytes > max
	{
		return Ok(None);
	}

	sqlx::query(
		"INSERT INTO search_cache (cache_key, payload, item_ids, stored_at, expires_at) \
		 VALUES ($1, $2, $3, $4, $5) \
		 ON CONFLICT (cache_key) \
		 DO UPDATE SET payload = $2, item_ids = $3, stored_at = $4, expires_at = $5",
	)
	.bind(key)
	.bind(payload)
	.bind(item_ids.to_vec())
	.bind(stored_at)
	.bind(expires_at)
	.execute(pool)
	.await?;

	Ok(Some(size_bytes))
}

pub async fn delete_all(pool: &PgPool) -> Result<()> {
	sqlx::query("DELETE FROM search_cache").execute(pool).await?;

	Ok(())
}

/// Removes every entry whose tag index references the item. Used when
/// catalog data for an item changes.
pub async fn delete_for_item(pool: &PgPool, item_id: i64) -> Result<()> {
	sqlx::query("DELETE FROM search_cache WHERE item_ids @> ARRAY[$1]::bigint[]")
		.bind(item_id)
		.execute(pool)
		.await?;

	Ok(())
}

pub async fn purge_expired(pool: &PgPool, now: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query("DELETE FROM search_cache WHERE expires_at <= $1")
		.bind(now)
		.execute(pool)
		.await?;

	Ok(result.rows_affected())
}

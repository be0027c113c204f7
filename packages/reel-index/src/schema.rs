use sqlx::PgPool;

use crate::Result;

pub const CREATE_MOVIES: &str = "\
CREATE TABLE IF NOT EXISTS movies (
	item_id      BIGINT PRIMARY KEY,
	title        TEXT NOT NULL,
	genres       TEXT[] NOT NULL DEFAULT '{}',
	year         INT,
	popularity   REAL NOT NULL DEFAULT 0,
	title_tokens TEXT[] NOT NULL DEFAULT '{}',
	genre_tokens TEXT[] NOT NULL DEFAULT '{}',
	tag_tokens   TEXT[] NOT NULL DEFAULT '{}'
)";

pub const CREATE_MOVIES_TOKEN_INDEXES: &str = "\
CREATE INDEX IF NOT EXISTS movies_title_tokens_idx ON movies USING GIN (title_tokens);
CREATE INDEX IF NOT EXISTS movies_genre_tokens_idx ON movies USING GIN (genre_tokens);
CREATE INDEX IF NOT EXISTS movies_tag_tokens_idx ON movies USING GIN (tag_tokens)";

pub const CREATE_SEARCH_CACHE: &str = "\
CREATE TABLE IF NOT EXISTS search_cache (
	cache_key  TEXT PRIMARY KEY,
	payload    JSONB NOT NULL,
	item_ids   BIGINT[] NOT NULL DEFAULT '{}',
	stored_at  TIMESTAMPTZ NOT NULL,
	expires_at TIMESTAMPTZ NOT NULL
)";

pub const CREATE_SEARCH_CACHE_INDEXES: &str = "\
CREATE INDEX IF NOT EXISTS search_cache_expires_at_idx ON search_cache (expires_at);
CREATE INDEX IF NOT EXISTS search_cache_item_ids_idx ON search_cache USING GIN (item_ids)";

pub async fn init_schema(pool: &PgPool) -> Result<()> {
	sqlx::query(CREATE_MOVIES).execute(pool).await?;

	for statement in CREATE_MOVIES_TOKEN_INDEXES.split(';') {
		sqlx::query(statement).execute(pool).await?;
	}

	sqlx::query(CREATE_SEARCH_CACHE).execute(pool).await?;

	for statement in CREATE_SEARCH_CACHE_INDEXES.split(';') {
		sqlx::query(statement).execute(pool).await?;
	}

	Ok(())
}

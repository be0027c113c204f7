use sqlx::{PgPool, Row};

use crate::{
	Result,
	models::{LexicalDoc, MovieMetadata},
};

/// Fetches catalog rows whose indexed tokens overlap the query tokens.
/// Ordered by item id so repeated calls see the same candidate set; the
/// real-valued overlap score is computed by the caller.
pub async fn lexical_candidates(
	pool: &PgPool,
	tokens: &[String],
	limit: u32,
) -> Result<Vec<LexicalDoc>> {
	if tokens.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query(
		"SELECT item_id, title, genres, year, popularity, title_tokens, genre_tokens, tag_tokens \
		 FROM movies \
		 WHERE title_tokens && $1 OR genre_tokens && $1 OR tag_tokens && $1 \
		 ORDER BY item_id \
		 LIMIT $2",
	)
	.bind(tokens.to_vec())
	.bind(limit as i64)
	.fetch_all(pool)
	.await?;

	let mut out = Vec::with_capacity(rows.len());

	for row in rows {
		out.push(LexicalDoc {
			item_id: row.try_get("item_id")?,
			title_tokens: row.try_get("title_tokens")?,
			genre_tokens: row.try_get("genre_tokens")?,
			tag_tokens: row.try_get("tag_tokens")?,
			metadata: MovieMetadata {
				title: row.try_get("title")?,
				genres: row.try_get("genres")?,
				year: row.try_get("year")?,
				popularity: row.try_get("popularity")?,
			},
		});
	}

	Ok(out)
}

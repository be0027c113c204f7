/// Catalog metadata snapshot attached to every candidate at retrieval time.
/// Never mutated after creation; ranking stages only touch scores.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MovieMetadata {
	pub title: String,
	pub genres: Vec<String>,
	pub year: Option<i32>,
	pub popularity: f32,
}

/// One nearest-neighbor hit from the vector index, similarity as returned
/// by the backend (cosine, [-1, 1]).
#[derive(Debug, Clone)]
pub struct MovieHit {
	pub item_id: i64,
	pub similarity: f32,
	pub metadata: MovieMetadata,
}

/// Pre-tokenized catalog row used by the lexical channel.
#[derive(Debug, Clone)]
pub struct LexicalDoc {
	pub item_id: i64,
	pub title_tokens: Vec<String>,
	pub genre_tokens: Vec<String>,
	pub tag_tokens: Vec<String>,
	pub metadata: MovieMetadata,
}

#[derive(Debug, Clone)]
pub struct CachedPayload {
	pub value: serde_json::Value,
	pub size_bytes: usize,
}

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub fusion: Fusion,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub optimize: Optimize,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Channel weights applied when fusing semantic and lexical candidate lists.
/// The per-intent pairs override the base pair for queries classified as
/// similarity or genre search.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Fusion {
	pub semantic_weight: f32,
	pub lexical_weight: f32,
	pub similarity_semantic_weight: f32,
	pub similarity_lexical_weight: f32,
	pub genre_semantic_weight: f32,
	pub genre_lexical_weight: f32,
}
impl Default for Fusion {
	fn default() -> Self {
		Self {
			semantic_weight: 0.7,
			lexical_weight: 0.3,
			similarity_semantic_weight: 0.85,
			similarity_lexical_weight: 0.15,
			genre_semantic_weight: 0.55,
			genre_lexical_weight: 0.45,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Per-channel deadline. A channel that misses it degrades to empty.
	pub timeout_ms: u64,
	/// Over-fetch multiplier applied to the requested limit before fusion.
	pub overfetch_factor: u32,
	/// Semantic hits below this rescaled score are discarded.
	pub min_semantic_score: f32,
	pub default_limit: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { timeout_ms: 800, overfetch_factor: 3, min_semantic_score: 0.1, default_limit: 10 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub l1_max_entries: u32,
	pub l1_ttl_seconds: i64,
	pub l2_ttl_seconds: i64,
	pub max_payload_bytes: Option<u64>,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			enabled: true,
			l1_max_entries: 1_024,
			l1_ttl_seconds: 1_800,
			l2_ttl_seconds: 86_400,
			max_payload_bytes: None,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Optimize {
	/// Queries with fewer tokens than this are candidates for expansion.
	pub rewrite_short_token_threshold: u32,
	/// Queries with more tokens than this are candidates for simplification.
	pub rewrite_long_token_threshold: u32,
	pub personalization_boost: f32,
	/// Upper bound on the total multiplicative boost any item can receive.
	pub personalization_max_boost: f32,
	pub diversity_max_consecutive_genre: u32,
	/// EMA smoothing factor for query performance profiles.
	pub profile_alpha: f32,
}
impl Default for Optimize {
	fn default() -> Self {
		Self {
			rewrite_short_token_threshold: 2,
			rewrite_long_token_threshold: 6,
			personalization_boost: 1.1,
			personalization_max_boost: 1.25,
			diversity_max_consecutive_genre: 2,
			profile_alpha: 0.3,
		}
	}
}

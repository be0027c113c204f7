pub mod feedback;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

use time::{Duration, OffsetDateTime};

use reel_config::{Config, EmbeddingProviderConfig};
use reel_domain::NormalizerTables;
use reel_index::{
	db::Db,
	models::{CachedPayload, LexicalDoc, MovieHit},
	qdrant::QdrantStore,
};

pub use feedback::{FeedbackEvent, InteractionKind, InteractionSignal};
pub use search::{
	CandidateItem, Provenance, RankedResult, RequestFilters, SearchRequest, UserContext,
	cache::{CacheStatsSnapshot, CacheStatus, InvalidationScope},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Empty or whitespace-only input. Surfaced to the caller, never retried.
	#[error("Invalid query: {message}")]
	InvalidQuery { message: String },
	/// Both retrieval channels failed. Surfaced as service-unavailable; safe
	/// for the caller to retry with backoff.
	#[error("Retrieval unavailable: {message}")]
	RetrievalUnavailable { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Vector index error: {message}")]
	VectorIndex { message: String },
}
impl From<reel_index::Error> for Error {
	fn from(err: reel_index::Error) -> Self {
		match err {
			reel_index::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			reel_index::Error::Qdrant(inner) => Self::VectorIndex { message: inner.to_string() },
			reel_index::Error::InvalidArgument(message) => Self::Storage { message },
		}
	}
}
impl From<reel_providers::Error> for Error {
	fn from(err: reel_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, vector: Vec<f32>, top_k: u32) -> BoxFuture<'a, Result<Vec<MovieHit>>>;
}

pub trait CatalogStore
where
	Self: Send + Sync,
{
	fn lexical_candidates<'a>(
		&'a self,
		tokens: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<LexicalDoc>>>;
}

/// Shared (L2) cache. Implementations must tolerate the backing store being
/// unreachable; callers treat every error as a miss.
pub trait SharedCacheBackend
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedPayload>>>;
	fn put<'a>(
		&'a self,
		key: &'a str,
		payload: serde_json::Value,
		item_ids: Vec<i64>,
		ttl_seconds: i64,
	) -> BoxFuture<'a, Result<()>>;
	fn invalidate<'a>(&'a self, scope: &'a InvalidationScope) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone)]
pub struct Backends {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub vector: Arc<dyn VectorIndex>,
	pub catalog: Arc<dyn CatalogStore>,
	pub shared_cache: Arc<dyn SharedCacheBackend>,
}
impl Backends {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		vector: Arc<dyn VectorIndex>,
		catalog: Arc<dyn CatalogStore>,
		shared_cache: Arc<dyn SharedCacheBackend>,
	) -> Self {
		Self { embedding, vector, catalog, shared_cache }
	}

	pub fn postgres_qdrant(db: Db, qdrant: QdrantStore) -> Self {
		Self {
			embedding: Arc::new(HttpEmbedding),
			vector: Arc::new(QdrantVectorIndex { store: qdrant }),
			catalog: Arc::new(PgCatalog { db: db.clone() }),
			shared_cache: Arc::new(PgSharedCache { db }),
		}
	}
}

pub struct ReelService {
	pub cfg: Config,
	pub backends: Backends,
	pub(crate) tables: NormalizerTables,
	pub(crate) cache: search::cache::CacheManager,
	pub(crate) optimizer: search::optimize::OptimizationController,
}
impl ReelService {
	/// Wires the default Postgres + Qdrant backends. Must be called from
	/// within a Tokio runtime; the interaction worker is spawned here.
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let backends = Backends::postgres_qdrant(db, qdrant);

		Self::with_backends(cfg, backends)
	}

	pub fn with_backends(cfg: Config, backends: Backends) -> Self {
		let cache = search::cache::CacheManager::new(&cfg.cache, backends.shared_cache.clone());
		let optimizer = search::optimize::OptimizationController::spawn();

		Self { cfg, backends, tables: NormalizerTables::default(), cache, optimizer }
	}

	/// Replaces the normalization tables, e.g. for a different catalog
	/// vocabulary.
	pub fn with_tables(mut self, tables: NormalizerTables) -> Self {
		self.tables = tables;

		self
	}

	/// Non-blocking: enqueues the signal for the interaction worker and
	/// returns immediately.
	pub fn record_interaction(&self, signal: InteractionSignal) {
		self.optimizer.record_signal(signal);
	}

	pub async fn invalidate_cache(&self, scope: &InvalidationScope) {
		self.cache.invalidate(scope).await;
	}

	pub fn cache_stats(&self) -> CacheStatsSnapshot {
		self.cache.stats()
	}
}

struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(reel_providers::embedding::embed(cfg, texts).await?) })
	}
}

struct QdrantVectorIndex {
	store: QdrantStore,
}
impl VectorIndex for QdrantVectorIndex {
	fn search<'a>(&'a self, vector: Vec<f32>, top_k: u32) -> BoxFuture<'a, Result<Vec<MovieHit>>> {
		Box::pin(async move {
			let points = self.store.search_nearest(vector, top_k).await?;

			Ok(points.iter().filter_map(reel_index::qdrant::point_to_hit).collect())
		})
	}
}

struct PgCatalog {
	db: Db,
}
impl CatalogStore for PgCatalog {
	fn lexical_candidates<'a>(
		&'a self,
		tokens: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<LexicalDoc>>> {
		Box::pin(async move {
			Ok(reel_index::catalog::lexical_candidates(&self.db.pool, tokens, limit).await?)
		})
	}
}

struct PgSharedCache {
	db: Db,
}
impl SharedCacheBackend for PgSharedCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedPayload>>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(reel_index::cache::fetch_cache_payload(&self.db.pool, key, now).await?)
		})
	}

	fn put<'a>(
		&'a self,
		key: &'a str,
		payload: serde_json::Value,
		item_ids: Vec<i64>,
		ttl_seconds: i64,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let stored_at = OffsetDateTime::now_utc();
			let expires_at = stored_at + Duration::seconds(ttl_seconds);

			reel_index::cache::store_cache_payload(
				&self.db.pool,
				key,
				payload,
				&item_ids,
				stored_at,
				expires_at,
				None,
			)
			.await?;

			Ok(())
		})
	}

	fn invalidate<'a>(&'a self, scope: &'a InvalidationScope) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			match scope {
				InvalidationScope::All => reel_index::cache::delete_all(&self.db.pool).await?,
				InvalidationScope::Item(item_id) =>
					reel_index::cache::delete_for_item(&self.db.pool, *item_id).await?,
			}

			Ok(())
		})
	}
}

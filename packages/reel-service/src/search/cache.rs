use std::{
	num::NonZeroUsize,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::{Duration, Instant},
};

use lru::LruCache;
use parking_lot::Mutex;

use reel_domain::Query;

use crate::{
	Error, Result, SharedCacheBackend,
	search::{CachedSearch, UserContext},
};

const SEARCH_CACHE_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
	L1Hit,
	L2Hit,
	Miss,
}
impl CacheStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::L1Hit => "l1_hit",
			Self::L2Hit => "l2_hit",
			Self::Miss => "miss",
		}
	}
}

/// Typed invalidation predicate. `Item` clears every entry whose result set
/// references the given catalog item; the shared tier resolves it through
/// its tag index rather than a full scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
	All,
	Item(i64),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStatsSnapshot {
	pub l1_hits: u64,
	pub l2_hits: u64,
	pub misses: u64,
	pub evictions: u64,
}
impl CacheStatsSnapshot {
	pub fn hit_rate(&self) -> f64 {
		let hits = self.l1_hits + self.l2_hits;
		let total = hits + self.misses;

		if total == 0 { 0.0 } else { hits as f64 / total as f64 }
	}
}

struct L1Entry {
	payload: CachedSearch,
	stored_at: Instant,
	last_access: Instant,
	hit_count: u64,
}

/// Two-tier cache: a bounded in-process LRU in front of the shared backend.
/// Shared-tier failures are logged and treated as misses; they never fail
/// the request.
pub struct CacheManager {
	l1: Mutex<LruCache<String, L1Entry>>,
	shared: Arc<dyn SharedCacheBackend>,
	l1_ttl: Duration,
	l2_ttl_seconds: i64,
	max_payload_bytes: Option<u64>,
	l1_hits: AtomicU64,
	l2_hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
}
impl CacheManager {
	pub fn new(cfg: &reel_config::Cache, shared: Arc<dyn SharedCacheBackend>) -> Self {
		let capacity =
			NonZeroUsize::new(cfg.l1_max_entries as usize).unwrap_or(NonZeroUsize::MIN);

		Self {
			l1: Mutex::new(LruCache::new(capacity)),
			shared,
			l1_ttl: Duration::from_secs(cfg.l1_ttl_seconds.max(1) as u64),
			l2_ttl_seconds: cfg.l2_ttl_seconds,
			max_payload_bytes: cfg.max_payload_bytes,
			l1_hits: AtomicU64::new(0),
			l2_hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
		}
	}

	pub async fn get(&self, key: &str) -> Option<(CachedSearch, CacheStatus)> {
		let now = Instant::now();

		{
			let mut l1 = self.l1.lock();
			let expired = match l1.get_mut(key) {
				Some(entry) if now.duration_since(entry.stored_at) <= self.l1_ttl => {
					entry.last_access = now;
					entry.hit_count += 1;
					self.l1_hits.fetch_add(1, Ordering::Relaxed);
					tracing::info!(
						cache_key_prefix = cache_key_prefix(key),
						hit = true,
						tier = "l1",
						"Cache hit."
					);

					return Some((entry.payload.clone(), CacheStatus::L1Hit));
				},
				Some(_) => true,
				None => false,
			};

			if expired {
				l1.pop(key);
				self.evictions.fetch_add(1, Ordering::Relaxed);
			}
		}

		match self.shared.get(key).await {
			Ok(Some(payload)) => match serde_json::from_value::<CachedSearch>(payload.value) {
				Ok(decoded) => {
					self.l2_hits.fetch_add(1, Ordering::Relaxed);
					tracing::info!(
						cache_key_prefix = cache_key_prefix(key),
						hit = true,
						tier = "l2",
						payload_size = payload.size_bytes,
						"Cache hit."
					);
					self.insert_l1(key, decoded.clone(), now);

					Some((decoded, CacheStatus::L2Hit))
				},
				Err(err) => {
					self.misses.fetch_add(1, Ordering::Relaxed);
					tracing::warn!(
						error = %err,
						cache_key_prefix = cache_key_prefix(key),
						"Cache payload decode failed."
					);

					None
				},
			},
			Ok(None) => {
				self.misses.fetch_add(1, Ordering::Relaxed);
				tracing::info!(
					cache_key_prefix = cache_key_prefix(key),
					hit = false,
					"Cache miss."
				);

				None
			},
			Err(err) => {
				self.misses.fetch_add(1, Ordering::Relaxed);
				tracing::warn!(error = %err, "Cache read failed; treating as miss.");

				None
			},
		}
	}

	/// Write-through: populates L1 and the shared tier. A payload above the
	/// configured size cap is kept in L1 only.
	pub async fn put(&self, key: &str, value: &CachedSearch) {
		self.insert_l1(key, value.clone(), Instant::now());

		let payload = match serde_json::to_value(value) {
			Ok(payload) => payload,
			Err(err) => {
				tracing::warn!(error = %err, "Cache payload encode failed.");

				return;
			},
		};
		let payload_size = serde_json::to_vec(&payload).map(|raw| raw.len() as u64).unwrap_or(0);

		if let Some(max) = self.max_payload_bytes
			&& payload_size > max
		{
			tracing::warn!(
				cache_key_prefix = cache_key_prefix(key),
				payload_size,
				"Cache payload skipped for shared tier due to size."
			);

			return;
		}

		let item_ids: Vec<i64> = value.items.iter().map(|item| item.item_id).collect();

		match self.shared.put(key, payload, item_ids, self.l2_ttl_seconds).await {
			Ok(()) => {
				tracing::info!(
					cache_key_prefix = cache_key_prefix(key),
					payload_size,
					ttl_seconds = self.l2_ttl_seconds,
					"Cache stored."
				);
			},
			Err(err) => {
				tracing::warn!(error = %err, "Cache write failed; continuing with L1 only.");
			},
		}
	}

	/// All matching entries are unreachable in both tiers when this returns;
	/// a shared-tier failure is logged, not surfaced.
	pub async fn invalidate(&self, scope: &InvalidationScope) {
		{
			let mut l1 = self.l1.lock();

			match scope {
				InvalidationScope::All => {
					l1.clear();
				},
				InvalidationScope::Item(item_id) => {
					let keys: Vec<String> = l1
						.iter()
						.filter(|(_, entry)| {
							entry.payload.items.iter().any(|item| item.item_id == *item_id)
						})
						.map(|(key, _)| key.clone())
						.collect();

					for key in keys {
						l1.pop(&key);
					}
				},
			}
		}

		if let Err(err) = self.shared.invalidate(scope).await {
			tracing::warn!(error = %err, "Shared cache invalidation failed.");
		}
	}

	pub fn stats(&self) -> CacheStatsSnapshot {
		CacheStatsSnapshot {
			l1_hits: self.l1_hits.load(Ordering::Relaxed),
			l2_hits: self.l2_hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
		}
	}

	fn insert_l1(&self, key: &str, payload: CachedSearch, now: Instant) {
		let mut l1 = self.l1.lock();

		if l1
			.push(key.to_string(), L1Entry { payload, stored_at: now, last_access: now, hit_count: 0 })
			.is_some_and(|(evicted_key, _)| evicted_key != key)
		{
			self.evictions.fetch_add(1, Ordering::Relaxed);
		}
	}
}

/// Stable key over everything that affects the cached ranking: the
/// normalized query, active filters, the requested limit, and the
/// personalization bucket. Volatile fields like timestamps never
/// participate.
pub fn build_search_cache_key(
	query: &Query,
	limit: u32,
	user: Option<&UserContext>,
) -> Result<String> {
	let bucket = user.map(|user| {
		let mut genres: Vec<String> =
			user.preferred_genres.iter().map(|genre| genre.to_lowercase()).collect();

		genres.sort();

		serde_json::json!({
			"preferred_genres": genres,
			"preferred_year_start": user.preferred_year_start,
			"preferred_year_end": user.preferred_year_end,
		})
	});
	let payload = serde_json::json!({
		"kind": "search",
		"schema_version": SEARCH_CACHE_SCHEMA_VERSION,
		"query": query.normalized,
		"intent": query.intent.as_str(),
		"years": query.constraints.years,
		"genres": query.constraints.genres,
		"limit": limit,
		"personalization": bucket,
	});
	let raw = serde_json::to_vec(&payload).map_err(|err| Error::Storage {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub fn cache_key_prefix(key: &str) -> &str {
	let len = key.len().min(12);

	&key[..len]
}

#[cfg(test)]
mod tests {
	use super::*;

	use reel_domain::{NormalizerTables, normalize};

	fn query(text: &str) -> Query {
		normalize(text, &NormalizerTables::default()).expect("query should normalize")
	}

	#[test]
	fn key_is_stable_for_identical_input() {
		let q = query("dark thriller");
		let first = build_search_cache_key(&q, 10, None).expect("key should build");
		let second = build_search_cache_key(&q, 10, None).expect("key should build");

		assert_eq!(first, second);
	}

	#[test]
	fn key_changes_with_limit_and_personalization_bucket() {
		let q = query("dark thriller");
		let base = build_search_cache_key(&q, 10, None).expect("key should build");
		let other_limit = build_search_cache_key(&q, 20, None).expect("key should build");
		let user = UserContext {
			user_id: Some("u1".to_string()),
			preferred_genres: vec!["Horror".to_string()],
			preferred_year_start: None,
			preferred_year_end: None,
		};
		let personalized = build_search_cache_key(&q, 10, Some(&user)).expect("key should build");

		assert_ne!(base, other_limit);
		assert_ne!(base, personalized);
	}

	#[test]
	fn preferred_genre_order_does_not_change_the_key() {
		let q = query("dark thriller");
		let forward = UserContext {
			user_id: None,
			preferred_genres: vec!["Horror".to_string(), "Comedy".to_string()],
			preferred_year_start: None,
			preferred_year_end: None,
		};
		let reverse = UserContext {
			user_id: None,
			preferred_genres: vec!["Comedy".to_string(), "Horror".to_string()],
			preferred_year_start: None,
			preferred_year_end: None,
		};
		let first = build_search_cache_key(&q, 10, Some(&forward)).expect("key should build");
		let second = build_search_cache_key(&q, 10, Some(&reverse)).expect("key should build");

		assert_eq!(first, second);
	}
}

pub mod cache;
pub mod fusion;
pub mod optimize;
pub mod retrieval;

use std::time::Instant;

use reel_domain::{Query, YearRange, normalize};

use crate::{Error, ReelService, Result, search::cache::CacheStatus};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub limit: Option<u32>,
	pub filters: Option<RequestFilters>,
	pub user: Option<UserContext>,
}

/// Caller-supplied hard filters, merged into the query's extracted
/// constraints before the pipeline runs.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RequestFilters {
	#[serde(default)]
	pub genres: Vec<String>,
	pub year_start: Option<i32>,
	pub year_end: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserContext {
	pub user_id: Option<String>,
	#[serde(default)]
	pub preferred_genres: Vec<String>,
	pub preferred_year_start: Option<i32>,
	pub preferred_year_end: Option<i32>,
}

/// A single ranked candidate. The metadata snapshot (title, genres, year,
/// popularity) is fixed at retrieval time; ranking stages only update
/// scores.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateItem {
	pub item_id: i64,
	pub title: String,
	pub genres: Vec<String>,
	pub year: Option<i32>,
	pub popularity: f32,
	pub semantic_score: f32,
	pub lexical_score: f32,
	pub combined_score: f32,
	pub in_semantic: bool,
	pub in_lexical: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
	/// The last stage that produced the ordering: "fusion", "cache", or
	/// "optimized".
	pub stage: String,
	pub rewritten: bool,
	pub rewritten_query: Option<String>,
	pub cache: CacheStatus,
	pub semantic_degraded: bool,
	pub lexical_degraded: bool,
	/// Set when a contradictory year range was extracted and therefore not
	/// applied as a hard filter.
	pub year_filter_skipped: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RankedResult {
	pub items: Vec<CandidateItem>,
	pub provenance: Provenance,
}

/// The payload cached across requests: the fused, pre-personalization list.
/// Personalization and diversity are deterministic and re-applied on top of
/// cached entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedSearch {
	pub items: Vec<CandidateItem>,
	pub semantic_degraded: bool,
	pub lexical_degraded: bool,
	pub year_filter_skipped: bool,
}

impl ReelService {
	/// The single entry point: normalize, optimize (cache, retrieve, fuse),
	/// personalize, diversify. Returns a complete result or one of the two
	/// surfaced errors; every other failure degrades.
	pub async fn search(&self, req: SearchRequest) -> Result<RankedResult> {
		let started = Instant::now();
		let limit = req.limit.unwrap_or(self.cfg.retrieval.default_limit).max(1);
		let query = normalize(&req.query, &self.tables)
			.map_err(|err| Error::InvalidQuery { message: err.to_string() })?;
		let query = merge_request_filters(query, req.filters.as_ref());
		let profile_key = query.normalized.clone();
		let user = req.user.clone();
		let user_ref = user.as_ref();
		let result = self
			.optimizer
			.optimize_and_search(&self.cfg, query, user_ref, |rewritten| {
				self.base_search(rewritten, limit, user_ref)
			})
			.await?;
		let latency_ms = started.elapsed().as_secs_f32() * 1_000.0;

		self.optimizer.profiles().record(
			&profile_key,
			latency_ms,
			result.items.len() as f32,
			self.cfg.optimize.profile_alpha,
		);

		Ok(result)
	}

	/// Cache-then-retrieve-then-fuse. Called by the optimization controller
	/// with the (possibly rewritten) query.
	pub(crate) async fn base_search(
		&self,
		query: Query,
		limit: u32,
		user: Option<&UserContext>,
	) -> Result<RankedResult> {
		let cache_key = if self.cfg.cache.enabled {
			match cache::build_search_cache_key(&query, limit, user) {
				Ok(key) => Some(key),
				Err(err) => {
					tracing::warn!(error = %err, "Cache key build failed.");

					None
				},
			}
		} else {
			None
		};

		if let Some(key) = cache_key.as_deref()
			&& let Some((cached, status)) = self.cache.get(key).await
		{
			return Ok(RankedResult {
				items: cached.items,
				provenance: Provenance {
					stage: "cache".to_string(),
					rewritten: false,
					rewritten_query: None,
					cache: status,
					semantic_degraded: cached.semantic_degraded,
					lexical_degraded: cached.lexical_degraded,
					year_filter_skipped: cached.year_filter_skipped,
				},
			});
		}

		let channels = retrieval::retrieve(&self.cfg, &self.backends, &query, limit).await?;
		let semantic_degraded = channels.semantic_degraded;
		let lexical_degraded = channels.lexical_degraded;
		let weights = fusion::weights_for_intent(&self.cfg.fusion, query.intent);
		let (mut items, year_filter_skipped) =
			fusion::fuse(channels.semantic, channels.lexical, &query, weights);

		items.truncate(limit as usize);

		if let Some(key) = cache_key.as_deref() {
			let cached = CachedSearch {
				items: items.clone(),
				semantic_degraded,
				lexical_degraded,
				year_filter_skipped,
			};

			self.cache.put(key, &cached).await;
		}

		Ok(RankedResult {
			items,
			provenance: Provenance {
				stage: "fusion".to_string(),
				rewritten: false,
				rewritten_query: None,
				cache: CacheStatus::Miss,
				semantic_degraded,
				lexical_degraded,
				year_filter_skipped,
			},
		})
	}
}

fn merge_request_filters(mut query: Query, filters: Option<&RequestFilters>) -> Query {
	let Some(filters) = filters else { return query };

	for genre in &filters.genres {
		let genre = genre.to_lowercase();

		if !query.constraints.genres.iter().any(|existing| existing.eq_ignore_ascii_case(&genre)) {
			query.constraints.genres.push(genre);
		}
	}

	// An explicit request range overrides anything extracted from the text.
	if filters.year_start.is_some() || filters.year_end.is_some() {
		let contradictory = matches!(
			(filters.year_start, filters.year_end),
			(Some(start), Some(end)) if start > end
		);

		query.constraints.years =
			Some(YearRange { start: filters.year_start, end: filters.year_end, contradictory });
	}

	query
}

use std::{
	collections::{HashMap, HashSet, VecDeque},
	future::Future,
	sync::Arc,
};

use parking_lot::RwLock;
use time::OffsetDateTime;

use reel_config::{Config, Optimize};
use reel_domain::{Query, normalize::MAX_QUERY_TOKENS, text};

use crate::{
	Result,
	feedback::{FeedbackEvent, FeedbackHub, InteractionSignal, InteractionStats},
	search::{CandidateItem, RankedResult, UserContext, fusion},
};

/// A profile this healthy vetoes rewriting: the query already returns
/// enough results, or fast enough, as-is.
const HEALTHY_RESULT_COUNT: f32 = 5.0;
const HEALTHY_LATENCY_MS: f32 = 250.0;

/// Bounded contribution of aggregate interaction signals to the
/// personalization factor.
const INTERACTION_BIAS_WEIGHT: f32 = 0.1;

/// Rolling statistics for one normalized query. Updated after every served
/// request; read before deciding whether to rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPerformanceProfile {
	pub avg_latency_ms: f32,
	pub avg_result_count: f32,
	pub served_count: u64,
	pub click_count: u64,
	pub samples: u64,
}
impl QueryPerformanceProfile {
	pub fn click_through(&self) -> f32 {
		if self.served_count == 0 {
			0.0
		} else {
			self.click_count as f32 / self.served_count as f32
		}
	}
}

/// Shared across concurrent requests. Updates are best-effort; a lost
/// increment under contention is acceptable.
#[derive(Default)]
pub struct ProfileStore {
	inner: RwLock<HashMap<String, QueryPerformanceProfile>>,
}
impl ProfileStore {
	pub fn get(&self, key: &str) -> Option<QueryPerformanceProfile> {
		self.inner.read().get(key).copied()
	}

	pub fn record(&self, key: &str, latency_ms: f32, result_count: f32, alpha: f32) {
		let mut inner = self.inner.write();
		let profile = inner.entry(key.to_string()).or_default();

		if profile.samples == 0 {
			profile.avg_latency_ms = latency_ms;
			profile.avg_result_count = result_count;
		} else {
			profile.avg_latency_ms = alpha * latency_ms + (1.0 - alpha) * profile.avg_latency_ms;
			profile.avg_result_count =
				alpha * result_count + (1.0 - alpha) * profile.avg_result_count;
		}

		profile.samples += 1;
	}

	pub fn note_served(&self, key: &str) {
		self.inner.write().entry(key.to_string()).or_default().served_count += 1;
	}

	pub fn note_click(&self, key: &str) {
		self.inner.write().entry(key.to_string()).or_default().click_count += 1;
	}
}

/// Rewrite vocabulary: per-genre expansion terms for thin queries, phrase
/// replacements for redundant ones.
struct RewriteTables {
	expansions: Vec<(&'static str, &'static [&'static str])>,
	simplifications: Vec<(&'static str, &'static str)>,
}
impl Default for RewriteTables {
	fn default() -> Self {
		Self {
			expansions: vec![
				("action", &["thriller", "adventure", "intense"]),
				("comedy", &["funny", "humorous", "amusing"]),
				("horror", &["suspense", "frightening"]),
				("romance", &["love", "relationship"]),
				("drama", &["emotional", "serious"]),
				("fantasy", &["magical", "adventure"]),
				("animation", &["children", "family"]),
				("thriller", &["suspense", "intense"]),
			],
			simplifications: vec![
				("very good", "good"),
				("really great", "great"),
				("highly recommended", "recommended"),
				("movies like", "similar to"),
				("films similar to", "similar to"),
				("something like", "similar to"),
			],
		}
	}
}

pub struct OptimizationController {
	profiles: Arc<ProfileStore>,
	feedback: FeedbackHub,
	rewrite: RewriteTables,
}
impl OptimizationController {
	/// Must be called from within a Tokio runtime; spawns the interaction
	/// worker.
	pub fn spawn() -> Self {
		let profiles = Arc::new(ProfileStore::default());
		let feedback = FeedbackHub::spawn(profiles.clone());

		Self { profiles, feedback, rewrite: RewriteTables::default() }
	}

	pub fn profiles(&self) -> &ProfileStore {
		&self.profiles
	}

	pub fn interaction_stats(&self) -> &Arc<InteractionStats> {
		self.feedback.stats()
	}

	pub fn record_signal(&self, signal: InteractionSignal) {
		self.feedback.record(FeedbackEvent::Signal(signal));
	}

	/// Rewrites the query at most once, runs the base pipeline, then applies
	/// the best-effort post-ranking passes. Any optimization failure falls
	/// back to the unoptimized base result.
	pub async fn optimize_and_search<F, Fut>(
		&self,
		cfg: &Config,
		query: Query,
		user: Option<&UserContext>,
		base_search: F,
	) -> Result<RankedResult>
	where
		F: FnOnce(Query) -> Fut,
		Fut: Future<Output = Result<RankedResult>>,
	{
		let original_normalized = query.normalized.clone();
		let (query, rewritten) = match self.plan_rewrite(&cfg.optimize, &query) {
			Some(rewritten_query) => {
				tracing::debug!(
					original = %query.normalized,
					rewritten = %rewritten_query.normalized,
					"Query rewritten."
				);

				(rewritten_query, true)
			},
			None => (query, false),
		};
		let rewritten_text = rewritten.then(|| query.normalized.clone());
		let mut result = base_search(query.clone()).await?;

		result.provenance.rewritten = rewritten;
		result.provenance.rewritten_query = rewritten_text;

		match self.post_rank(cfg, user, result.items.clone()) {
			Ok(items) => {
				result.items = items;
				result.provenance.stage = "optimized".to_string();
			},
			Err(message) => {
				tracing::warn!(error = %message, "Ranking optimization failed; serving base ranking.");
			},
		}

		self.feedback.record(FeedbackEvent::Served {
			query: original_normalized,
			result_count: result.items.len() as u32,
			recorded_at: OffsetDateTime::now_utc(),
		});

		Ok(result)
	}

	/// At most one rewrite per request: expand thin queries, simplify
	/// redundant ones. A healthy performance profile vetoes either.
	fn plan_rewrite(&self, cfg: &Optimize, query: &Query) -> Option<Query> {
		if query.tokens.is_empty() {
			return None;
		}

		let token_count = query.tokens.len() as u32;
		let profile = self.profiles.get(&query.normalized);

		if token_count < cfg.rewrite_short_token_threshold {
			if profile
				.map(|profile| {
					profile.samples > 0 && profile.avg_result_count >= HEALTHY_RESULT_COUNT
				})
				.unwrap_or(false)
			{
				return None;
			}

			return self.expand(&query.normalized).map(|text| rebuild_query(query, text));
		}
		if token_count > cfg.rewrite_long_token_threshold {
			if profile
				.map(|profile| {
					profile.samples > 0 && profile.avg_latency_ms <= HEALTHY_LATENCY_MS
				})
				.unwrap_or(false)
			{
				return None;
			}

			return self.simplify(&query.normalized).map(|text| rebuild_query(query, text));
		}

		None
	}

	fn expand(&self, normalized: &str) -> Option<String> {
		let words: HashSet<&str> = normalized.split_whitespace().collect();

		for (genre, terms) in &self.rewrite.expansions {
			if !words.contains(genre) {
				continue;
			}
			if let Some(term) = terms.iter().find(|term| !words.contains(**term)) {
				return Some(format!("{normalized} {term}"));
			}
		}

		None
	}

	fn simplify(&self, normalized: &str) -> Option<String> {
		let mut padded = format!(" {normalized} ");

		for (phrase, replacement) in &self.rewrite.simplifications {
			let needle = format!(" {phrase} ");
			let substitute = format!(" {replacement} ");

			while let Some(pos) = padded.find(&needle) {
				padded.replace_range(pos..pos + needle.len(), &substitute);
			}
		}

		let mut seen = HashSet::new();
		let deduped: Vec<&str> =
			padded.split_whitespace().filter(|word| seen.insert(*word)).collect();
		let simplified = deduped.join(" ");

		(simplified != normalized).then_some(simplified)
	}

	fn post_rank(
		&self,
		cfg: &Config,
		user: Option<&UserContext>,
		mut items: Vec<CandidateItem>,
	) -> std::result::Result<Vec<CandidateItem>, String> {
		let opt = &cfg.optimize;

		if !opt.personalization_boost.is_finite() || !opt.personalization_max_boost.is_finite() {
			return Err("Personalization boost configuration is not finite.".to_string());
		}

		for item in &mut items {
			let mut factor = 1.0_f32;

			if let Some(user) = user {
				if !user.preferred_genres.is_empty()
					&& item.genres.iter().any(|genre| {
						user.preferred_genres
							.iter()
							.any(|preferred| preferred.eq_ignore_ascii_case(genre))
					}) {
					factor *= opt.personalization_boost;
				}
				if let Some(year) = item.year
					&& user.preferred_year_start.map(|start| year >= start).unwrap_or(true)
					&& user.preferred_year_end.map(|end| year <= end).unwrap_or(true)
					&& (user.preferred_year_start.is_some() || user.preferred_year_end.is_some())
				{
					factor *= opt.personalization_boost;
				}
			}

			let signal = self.feedback.stats().signal(item.item_id);

			if signal > 0.0 {
				factor *= 1.0 + INTERACTION_BIAS_WEIGHT * signal.clamp(0.0, 1.0);
			}

			item.combined_score *= factor.min(opt.personalization_max_boost);
		}

		items.sort_by(fusion::compare_candidates);

		Ok(enforce_genre_spacing(items, opt.diversity_max_consecutive_genre as usize))
	}
}

/// Builds the rewritten query without re-running the normalizer: the intent
/// and extracted constraints of the original are kept, only the text and
/// its tokens change.
fn rebuild_query(query: &Query, normalized: String) -> Query {
	let tokens = text::tokenize(&normalized, MAX_QUERY_TOKENS);

	Query {
		raw: query.raw.clone(),
		normalized,
		tokens,
		intent: query.intent,
		confidence: query.confidence,
		constraints: query.constraints.clone(),
	}
}

/// Stable local reordering that caps consecutive same-primary-genre runs at
/// `max_run`. Items are never dropped; when no other genre remains the run
/// continues unavoidably.
pub fn enforce_genre_spacing(items: Vec<CandidateItem>, max_run: usize) -> Vec<CandidateItem> {
	if max_run == 0 || items.len() <= max_run {
		return items;
	}

	let mut pending: VecDeque<CandidateItem> = items.into();
	let mut out: Vec<CandidateItem> = Vec::with_capacity(pending.len());
	let mut run_genre = String::new();
	let mut run_len = 0_usize;

	while let Some(front) = pending.front() {
		let mut pick = 0_usize;

		if run_len >= max_run && !out.is_empty() && primary_genre(front) == run_genre {
			if let Some(idx) = pending.iter().position(|item| primary_genre(item) != run_genre) {
				pick = idx;
			}
		}

		let Some(item) = pending.remove(pick) else { break };
		let genre = primary_genre(&item);

		if genre == run_genre {
			run_len += 1;
		} else {
			run_genre = genre;
			run_len = 1;
		}

		out.push(item);
	}

	out
}

fn primary_genre(item: &CandidateItem) -> String {
	item.genres.first().map(|genre| genre.to_lowercase()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item_with_genre(id: i64, score: f32, genre: &str) -> CandidateItem {
		CandidateItem {
			item_id: id,
			title: format!("Movie {id}"),
			genres: vec![genre.to_string()],
			year: Some(2000),
			popularity: 0.0,
			semantic_score: score,
			lexical_score: 0.0,
			combined_score: score,
			in_semantic: true,
			in_lexical: false,
		}
	}

	#[test]
	fn genre_spacing_promotes_breakers_in_stable_order() {
		let mut items = Vec::new();

		for id in 0..8 {
			items.push(item_with_genre(id, 1.0 - id as f32 * 0.05, "Drama"));
		}

		items.push(item_with_genre(100, 0.5, "Comedy"));
		items.push(item_with_genre(101, 0.4, "Horror"));
		items.sort_by(fusion::compare_candidates);

		let spaced = enforce_genre_spacing(items, 2);
		let ids: Vec<i64> = spaced.iter().map(|item| item.item_id).collect();

		// Each breaker is promoted to the earliest slot that would otherwise
		// start a third consecutive drama; the trailing run is unavoidable
		// once both breakers are spent.
		assert_eq!(ids, vec![0, 1, 100, 2, 3, 101, 4, 5, 6, 7]);
	}

	#[test]
	fn genre_spacing_never_drops_items() {
		let items = vec![
			item_with_genre(1, 0.9, "Drama"),
			item_with_genre(2, 0.8, "Drama"),
			item_with_genre(3, 0.7, "Drama"),
			item_with_genre(4, 0.6, "Comedy"),
		];
		let spaced = enforce_genre_spacing(items, 2);
		let mut ids: Vec<i64> = spaced.iter().map(|item| item.item_id).collect();

		ids.sort_unstable();

		assert_eq!(ids, vec![1, 2, 3, 4]);
		// The comedy item breaks the drama run at position three.
		assert_eq!(spaced[2].item_id, 4);
	}

	#[test]
	fn diversity_boundary_eight_of_ten_share_a_genre() {
		let mut items = Vec::new();

		for id in 0..8 {
			items.push(item_with_genre(id, 1.0 - id as f32 * 0.01, "Drama"));
		}

		items.push(item_with_genre(50, 0.55, "Comedy"));
		items.push(item_with_genre(51, 0.54, "Horror"));
		items.sort_by(fusion::compare_candidates);

		let spaced = enforce_genre_spacing(items, 2);
		// No three consecutive positions share the genre while an
		// alternative is still available. The two breakers split the eight
		// dramas into runs of at most two until both are used up.
		let genres: Vec<String> = spaced.iter().map(|item| item.genres[0].clone()).collect();
		let mut worst_run_before_exhaustion = 0_usize;
		let mut run = 0_usize;
		let mut last = "";
		let mut breakers_left = 2_i32;

		for genre in &genres {
			if genre.as_str() == last {
				run += 1;
			} else {
				if last == "Comedy" || last == "Horror" {
					breakers_left -= 1;
				}

				run = 1;
				last = genre.as_str();
			}
			if breakers_left > 0 {
				worst_run_before_exhaustion = worst_run_before_exhaustion.max(run);
			}
		}

		assert!(worst_run_before_exhaustion <= 2);
		assert_eq!(spaced.len(), 10);
	}

	#[test]
	fn simplify_collapses_redundancy_once() {
		let controller = OptimizationController::test_instance();
		let simplified = controller
			.simplify("very good very good action movie action")
			.expect("should simplify");

		assert_eq!(simplified, "good action movie");
	}

	#[test]
	fn expand_adds_one_related_term() {
		let controller = OptimizationController::test_instance();
		let expanded = controller.expand("comedy").expect("should expand");

		assert_eq!(expanded, "comedy funny");
		assert!(controller.expand("zzkqr").is_none());
	}
}

#[cfg(test)]
impl OptimizationController {
	/// Controller without a worker task, for synchronous unit tests.
	fn test_instance() -> Self {
		let profiles = Arc::new(ProfileStore::default());
		let feedback = FeedbackHub::detached();

		Self { profiles, feedback, rewrite: RewriteTables::default() }
	}
}

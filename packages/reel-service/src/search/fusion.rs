use std::{cmp::Ordering, collections::HashMap};

use reel_config::Fusion;
use reel_domain::{Intent, Query};

use crate::search::CandidateItem;

#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
	pub semantic: f32,
	pub lexical: f32,
}

/// Resolves the channel weights for the query's intent. Similarity queries
/// lean on the semantic channel, keyword-heavy genre searches on the
/// lexical one; everything else uses the base pair.
pub fn weights_for_intent(cfg: &Fusion, intent: Intent) -> FusionWeights {
	match intent {
		Intent::Similarity => FusionWeights {
			semantic: cfg.similarity_semantic_weight,
			lexical: cfg.similarity_lexical_weight,
		},
		Intent::GenreSearch =>
			FusionWeights { semantic: cfg.genre_semantic_weight, lexical: cfg.genre_lexical_weight },
		_ => FusionWeights { semantic: cfg.semantic_weight, lexical: cfg.lexical_weight },
	}
}

/// Merges both channel lists into one deduplicated ranking. Hard metadata
/// filters run before scoring; an out-of-range item is excluded, never
/// down-ranked. Returns the ranking and whether a contradictory year range
/// was skipped instead of applied.
pub fn fuse(
	semantic: Vec<CandidateItem>,
	lexical: Vec<CandidateItem>,
	query: &Query,
	weights: FusionWeights,
) -> (Vec<CandidateItem>, bool) {
	let year_filter_skipped =
		query.constraints.years.map(|range| range.contradictory).unwrap_or(false);
	let mut by_id: HashMap<i64, CandidateItem> = HashMap::new();

	for item in semantic {
		if passes_filters(&item, query, year_filter_skipped) {
			by_id.insert(item.item_id, item);
		}
	}
	for item in lexical {
		if !passes_filters(&item, query, year_filter_skipped) {
			continue;
		}

		match by_id.get_mut(&item.item_id) {
			Some(existing) => {
				existing.lexical_score = item.lexical_score;
				existing.in_lexical = true;
			},
			None => {
				by_id.insert(item.item_id, item);
			},
		}
	}

	let mut out: Vec<CandidateItem> = by_id.into_values().collect();

	for item in &mut out {
		item.combined_score = combined_score(item, weights);
	}

	out.sort_by(compare_candidates);

	(out, year_filter_skipped)
}

/// The combined score is a pure function of the component scores and the
/// weights in effect: an item found by one channel only gets that channel's
/// weighted term, nothing more.
fn combined_score(item: &CandidateItem, weights: FusionWeights) -> f32 {
	let mut score = 0.0_f32;

	if item.in_semantic {
		score += weights.semantic * item.semantic_score;
	}
	if item.in_lexical {
		score += weights.lexical * item.lexical_score;
	}

	score
}

/// Deterministic ordering: combined score descending, then presence in both
/// channels, then catalog popularity, then item id ascending. Insertion
/// order never decides a tie.
pub fn compare_candidates(a: &CandidateItem, b: &CandidateItem) -> Ordering {
	cmp_f32_desc(a.combined_score, b.combined_score)
		.then_with(|| {
			let a_both = a.in_semantic && a.in_lexical;
			let b_both = b.in_semantic && b.in_lexical;

			b_both.cmp(&a_both)
		})
		.then_with(|| cmp_f32_desc(a.popularity, b.popularity))
		.then_with(|| a.item_id.cmp(&b.item_id))
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

fn passes_filters(item: &CandidateItem, query: &Query, skip_years: bool) -> bool {
	if !skip_years
		&& let Some(range) = query.constraints.years
	{
		let Some(year) = item.year else { return false };

		if !range.contains(year) {
			return false;
		}
	}

	if !query.constraints.genres.is_empty() {
		let matched = query.constraints.genres.iter().any(|wanted| {
			item.genres.iter().any(|have| genre_matches(have, wanted))
		});

		if !matched {
			return false;
		}
	}

	true
}

/// Case-insensitive genre comparison with the common sci-fi aliases folded
/// together, so a detected "science fiction" constraint matches a catalog
/// "Sci-Fi" label.
fn genre_matches(have: &str, wanted: &str) -> bool {
	canonical_genre(have) == canonical_genre(wanted)
}

fn canonical_genre(genre: &str) -> String {
	let lowered = genre.trim().to_lowercase();

	match lowered.as_str() {
		"sci-fi" | "scifi" | "science fiction" => "science fiction".to_string(),
		"kids" => "children".to_string(),
		_ => lowered,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use reel_domain::{NormalizerTables, YearRange, normalize};

	fn item(id: i64, semantic: Option<f32>, lexical: Option<f32>) -> CandidateItem {
		CandidateItem {
			item_id: id,
			title: format!("Movie {id}"),
			genres: vec!["Drama".to_string()],
			year: Some(2000),
			popularity: 0.0,
			semantic_score: semantic.unwrap_or(0.0),
			lexical_score: lexical.unwrap_or(0.0),
			combined_score: 0.0,
			in_semantic: semantic.is_some(),
			in_lexical: lexical.is_some(),
		}
	}

	fn plain_query(text: &str) -> Query {
		normalize(text, &NormalizerTables::default()).expect("query should normalize")
	}

	fn default_weights() -> FusionWeights {
		FusionWeights { semantic: 0.7, lexical: 0.3 }
	}

	#[test]
	fn weighted_sum_orders_results() {
		// 0.9 * 0.7 + 0.1 * 0.3 = 0.66 beats 0.5 * 0.7 + 0.9 * 0.3 = 0.62.
		let first = item(1, Some(0.9), Some(0.1));
		let second = item(2, Some(0.5), Some(0.9));
		let query = plain_query("zzkqr plomb");
		let (fused, _) =
			fuse(vec![first, second], Vec::new(), &query, default_weights());

		assert_eq!(fused[0].item_id, 1);
		assert!((fused[0].combined_score - 0.66).abs() < 1e-6);
		assert!((fused[1].combined_score - 0.62).abs() < 1e-6);
	}

	#[test]
	fn union_deduplicates_by_item_id() {
		let semantic = vec![item(1, Some(0.8), None), item(2, Some(0.6), None)];
		let lexical = vec![item(1, None, Some(0.5)), item(3, None, Some(0.9))];
		let query = plain_query("zzkqr plomb");
		let (fused, _) = fuse(semantic, lexical, &query, default_weights());
		let mut ids: Vec<i64> = fused.iter().map(|entry| entry.item_id).collect();

		ids.sort_unstable();
		ids.dedup();

		assert_eq!(ids.len(), fused.len());

		let merged = fused.iter().find(|entry| entry.item_id == 1).expect("item 1 should survive");

		assert!(merged.in_semantic && merged.in_lexical);
		assert!((merged.combined_score - (0.8 * 0.7 + 0.5 * 0.3)).abs() < 1e-6);
	}

	#[test]
	fn single_channel_items_get_only_their_weighted_term() {
		let query = plain_query("zzkqr plomb");
		let (fused, _) = fuse(vec![item(1, Some(0.8), None)], Vec::new(), &query, default_weights());

		assert!((fused[0].combined_score - 0.56).abs() < 1e-6);
	}

	#[test]
	fn ties_break_on_both_channels_then_popularity_then_id() {
		let query = plain_query("zzkqr plomb");
		// With equal weights, 0.5 * 0.4 + 0.5 * 0.4 ties exactly with 0.5 * 0.8.
		let even = FusionWeights { semantic: 0.5, lexical: 0.5 };
		let both = item(5, Some(0.4), None);
		let single = item(3, Some(0.8), None);
		let (fused, _) =
			fuse(vec![single, both], vec![item(5, None, Some(0.4))], &query, even);

		assert_eq!(fused[0].item_id, 5);

		let mut popular = item(9, Some(0.5), None);
		let mut obscure = item(4, Some(0.5), None);

		popular.popularity = 10.0;
		obscure.popularity = 1.0;

		let (fused, _) = fuse(vec![obscure, popular], Vec::new(), &query, default_weights());

		assert_eq!(fused[0].item_id, 9);

		let (fused, _) = fuse(
			vec![item(7, Some(0.5), None), item(2, Some(0.5), None)],
			Vec::new(),
			&query,
			default_weights(),
		);

		assert_eq!(fused[0].item_id, 2);
	}

	#[test]
	fn year_filter_is_hard_not_a_score_adjustment() {
		let mut in_range = item(1, Some(0.2), None);
		let mut out_of_range = item(2, Some(0.9), None);

		in_range.year = Some(1995);
		out_of_range.year = Some(2010);

		let mut query = plain_query("zzkqr plomb");

		query.constraints.years =
			Some(YearRange { start: Some(1990), end: Some(1999), contradictory: false });

		let (fused, skipped) =
			fuse(vec![in_range, out_of_range], Vec::new(), &query, default_weights());

		assert!(!skipped);
		assert_eq!(fused.len(), 1);
		assert_eq!(fused[0].item_id, 1);
	}

	#[test]
	fn contradictory_year_filter_is_skipped_and_reported() {
		let mut query = plain_query("zzkqr plomb");

		query.constraints.years =
			Some(YearRange { start: Some(2050), end: Some(1999), contradictory: true });

		let (fused, skipped) =
			fuse(vec![item(1, Some(0.5), None)], Vec::new(), &query, default_weights());

		assert!(skipped);
		assert_eq!(fused.len(), 1);
	}

	#[test]
	fn genre_filter_folds_scifi_aliases() {
		let mut scifi = item(1, Some(0.5), None);

		scifi.genres = vec!["Sci-Fi".to_string()];

		let mut query = plain_query("zzkqr plomb");

		query.constraints.genres = vec!["science fiction".to_string()];

		let (fused, _) = fuse(vec![scifi, item(2, Some(0.9), None)], Vec::new(), &query, default_weights());

		assert_eq!(fused.len(), 1);
		assert_eq!(fused[0].item_id, 1);
	}

	#[test]
	fn similarity_intent_boosts_semantic_weight() {
		let cfg = Fusion::default();
		let weights = weights_for_intent(&cfg, Intent::Similarity);

		assert!(weights.semantic > cfg.semantic_weight);

		let weights = weights_for_intent(&cfg, Intent::GenreSearch);

		assert!(weights.lexical > cfg.lexical_weight);
	}
}

use std::collections::HashSet;

/// Lowercases, folds non-alphanumerics to spaces, and returns deduplicated
/// tokens of two or more characters in first-seen order.
pub fn tokenize(text: &str, max_terms: usize) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for token in normalized.split_whitespace() {
		if token.len() < 2 {
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
		if out.len() >= max_terms {
			break;
		}
	}

	out
}

/// Per-field weights for the lexical overlap score. Title matches carry the
/// most signal, genre matches less, free-text tag matches the least.
#[derive(Debug, Clone, Copy)]
pub struct FieldWeights {
	pub title: f32,
	pub genres: f32,
	pub tags: f32,
}
impl Default for FieldWeights {
	fn default() -> Self {
		Self { title: 3.0, genres: 2.0, tags: 1.0 }
	}
}

/// Weighted token-overlap score in [0, 1]. Fields with no indexed tokens do
/// not dilute the score; their weight is excluded from the denominator.
pub fn weighted_overlap(
	query_tokens: &[String],
	title_tokens: &[String],
	genre_tokens: &[String],
	tag_tokens: &[String],
	weights: &FieldWeights,
) -> f32 {
	if query_tokens.is_empty() {
		return 0.0;
	}

	let mut score = 0.0_f32;
	let mut total_weight = 0.0_f32;

	for (field_tokens, weight) in [
		(title_tokens, weights.title),
		(genre_tokens, weights.genres),
		(tag_tokens, weights.tags),
	] {
		if field_tokens.is_empty() || weight <= 0.0 {
			continue;
		}

		let field_set: HashSet<&str> = field_tokens.iter().map(|token| token.as_str()).collect();
		let matched = query_tokens
			.iter()
			.filter(|token| field_set.contains(token.as_str()))
			.count();

		score += weight * (matched as f32 / query_tokens.len() as f32);
		total_weight += weight;
	}

	if total_weight <= 0.0 {
		return 0.0;
	}

	(score / total_weight).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn tokenize_dedupes_and_drops_short_tokens() {
		let out = tokenize("The  Dark, dark Knight! a", 16);

		assert_eq!(out, vec!["the", "dark", "knight"]);
	}

	#[test]
	fn overlap_is_zero_without_query_tokens() {
		assert_eq!(weighted_overlap(&[], &tokens(&["toy"]), &[], &[], &FieldWeights::default()), 0.0);
	}

	#[test]
	fn title_matches_outweigh_tag_matches() {
		let query = tokens(&["toy", "story"]);
		let weights = FieldWeights::default();
		let title_hit =
			weighted_overlap(&query, &tokens(&["toy", "story"]), &[], &[], &weights);
		let tag_hit = weighted_overlap(&query, &tokens(&["unrelated"]), &[], &tokens(&["toy", "story"]), &weights);

		assert!(title_hit > tag_hit);
		assert!(title_hit <= 1.0);
	}

	#[test]
	fn empty_fields_do_not_dilute() {
		let query = tokens(&["comedy"]);
		let full = weighted_overlap(&query, &[], &tokens(&["comedy"]), &[], &FieldWeights::default());

		assert_eq!(full, 1.0);
	}
}

use std::collections::HashSet;

/// Coarse classification of what a query is trying to accomplish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Recommendation,
	Similarity,
	GenreSearch,
	MoodSearch,
	QualitySearch,
	Unknown,
}
impl Intent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Recommendation => "recommendation",
			Self::Similarity => "similarity",
			Self::GenreSearch => "genre_search",
			Self::MoodSearch => "mood_search",
			Self::QualitySearch => "quality_search",
			Self::Unknown => "unknown",
		}
	}
}

pub const GENRE_TERMS: &[&str] = &[
	"action",
	"adventure",
	"animation",
	"children",
	"comedy",
	"crime",
	"documentary",
	"drama",
	"family",
	"fantasy",
	"horror",
	"musical",
	"mystery",
	"romance",
	"thriller",
	"war",
	"western",
];

const RECOMMENDATION_TERMS: &[&str] = &["recommend", "recommendation", "suggest", "suggestion"];

const QUALITY_TERMS: &[&str] =
	&["acclaimed", "award", "best", "good", "great", "highly", "rated", "top"];

const MOOD_TERMS: &[&str] = &[
	"dark",
	"emotional",
	"exciting",
	"funny",
	"happy",
	"lighthearted",
	"nostalgic",
	"sad",
	"scary",
	"uplifting",
];

/// Classifies intent from cleaned query text using a fixed priority order:
/// similarity cues outrank recommendation cues, which outrank genre terms,
/// which outrank quality terms, which outrank mood terms. No cue at all
/// resolves to `Unknown` with zero confidence.
pub fn classify(text: &str) -> (Intent, f32) {
	let words: HashSet<&str> = text.split_whitespace().collect();

	if words.contains("like") || text.contains("similar") {
		return (Intent::Similarity, 0.9);
	}
	if RECOMMENDATION_TERMS.iter().any(|term| words.contains(term)) {
		return (Intent::Recommendation, 0.8);
	}
	if text.contains("science fiction") || GENRE_TERMS.iter().any(|term| words.contains(term)) {
		return (Intent::GenreSearch, 0.7);
	}
	if QUALITY_TERMS.iter().any(|term| words.contains(term)) {
		return (Intent::QualitySearch, 0.6);
	}
	if MOOD_TERMS.iter().any(|term| words.contains(term)) {
		return (Intent::MoodSearch, 0.6);
	}

	(Intent::Unknown, 0.0)
}

/// Collects the canonical genre terms present in the text, in the fixed
/// order of `GENRE_TERMS` so the result is reproducible.
pub fn detect_genres(text: &str) -> Vec<String> {
	let words: HashSet<&str> = text.split_whitespace().collect();
	let mut out = Vec::new();

	if text.contains("science fiction") {
		out.push("science fiction".to_string());
	}

	for term in GENRE_TERMS {
		if words.contains(term) {
			out.push(term.to_string());
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn similarity_cue_outranks_genre() {
		let (intent, confidence) = classify("action movies like heat");

		assert_eq!(intent, Intent::Similarity);
		assert!(confidence > 0.0);
	}

	#[test]
	fn genre_outranks_mood() {
		let (intent, _) = classify("dark comedy");

		assert_eq!(intent, Intent::GenreSearch);
	}

	#[test]
	fn no_cue_is_unknown_with_zero_confidence() {
		assert_eq!(classify("zzqx 42"), (Intent::Unknown, 0.0));
	}

	#[test]
	fn detects_multi_word_genre() {
		let genres = detect_genres("science fiction adventure");

		assert_eq!(genres, vec!["science fiction", "adventure"]);
	}
}

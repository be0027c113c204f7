use std::collections::{HashMap, HashSet};

use unicode_normalization::UnicodeNormalization;

use crate::{
	intent::{self, Intent},
	text,
	year::{self, YearRange},
};

pub const MAX_QUERY_TOKENS: usize = 32;

/// Immutable output of the normalizer. Produced once per request and
/// consumed read-only by the retriever and the optimization controller.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Query {
	pub raw: String,
	pub normalized: String,
	pub tokens: Vec<String>,
	pub intent: Intent,
	pub confidence: f32,
	pub constraints: QueryConstraints,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryConstraints {
	pub years: Option<YearRange>,
	pub genres: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
	Empty,
}
impl std::fmt::Display for QueryError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Empty => write!(f, "Query is empty or whitespace-only."),
		}
	}
}
impl std::error::Error for QueryError {}

/// Data tables driving normalization. Swappable as a unit; the defaults
/// cover the movie domain.
#[derive(Debug, Clone)]
pub struct NormalizerTables {
	/// Lead-in phrases carrying no search signal, stripped at word
	/// boundaries ("find me", "movies like", ...).
	pub artifact_phrases: Vec<String>,
	pub spelling: HashMap<String, String>,
	/// Single word to replacement text; replacements may be multi-word.
	pub synonyms: HashMap<String, String>,
	pub stop_words: HashSet<String>,
	/// Domain terms kept even when they appear in the stop-word list.
	pub preserve_words: HashSet<String>,
}

impl Default for NormalizerTables {
	fn default() -> Self {
		let artifact_phrases = [
			"movies like",
			"films like",
			"movie like",
			"film like",
			"something like",
			"similar to",
			"find me",
			"show me",
			"looking for",
			"search for",
			"i want",
			"i need",
		]
		.into_iter()
		.map(str::to_string)
		.collect();
		let spelling = [
			("recomend", "recommend"),
			("movei", "movie"),
			("moive", "movie"),
			("fim", "film"),
			("wath", "watch"),
			("similer", "similar"),
			("similiar", "similar"),
			("genere", "genre"),
			("commedy", "comedy"),
			("horrer", "horror"),
			("fantacy", "fantasy"),
			("acton", "action"),
			("thriler", "thriller"),
		]
		.into_iter()
		.map(|(misspelling, correction)| (misspelling.to_string(), correction.to_string()))
		.collect();
		let synonyms = [
			("sci-fi", "science fiction"),
			("scifi", "science fiction"),
			("romcom", "romantic comedy"),
			("rom-com", "romantic comedy"),
			("kids", "children family"),
			("kid", "children"),
			("child", "children"),
			("animated", "animation children"),
			("superhero", "action adventure fantasy"),
			("zombie", "horror thriller"),
			("vampire", "horror fantasy"),
			("space", "science fiction adventure"),
			("movies", "movie"),
			("films", "movie"),
			("film", "movie"),
			("flick", "movie"),
			("flicks", "movie"),
			("cinema", "movie"),
			("funny", "comedy"),
			("hilarious", "comedy"),
			("scary", "horror"),
			("frightening", "horror"),
			("terrifying", "horror"),
			("romantic", "romance"),
			("love", "romance"),
			("old", "classic"),
			("vintage", "classic"),
			("retro", "classic"),
			("modern", "new"),
			("recent", "new"),
			("latest", "new"),
		]
		.into_iter()
		.map(|(word, expansion)| (word.to_string(), expansion.to_string()))
		.collect();
		let stop_words = [
			"the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
			"by", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
			"does", "did", "will", "would", "could", "should", "i", "you", "he", "she", "it",
			"we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our",
			"their", "this", "that", "these", "those", "some", "any", "all", "no", "not",
		]
		.into_iter()
		.map(str::to_string)
		.collect();
		let preserve_words = [
			"action",
			"comedy",
			"drama",
			"horror",
			"thriller",
			"romance",
			"fantasy",
			"animation",
			"documentary",
			"mystery",
			"adventure",
			"family",
			"western",
			"children",
			"dark",
			"classic",
			"new",
			"movie",
		]
		.into_iter()
		.map(str::to_string)
		.collect();

		Self { artifact_phrases, spelling, synonyms, stop_words, preserve_words }
	}
}

/// Normalizes a raw query into an immutable [`Query`]. Pure function of the
/// input text and the tables; the only failure is empty input.
pub fn normalize(raw: &str, tables: &NormalizerTables) -> Result<Query, QueryError> {
	if raw.trim().is_empty() {
		return Err(QueryError::Empty);
	}

	let cleaned = clean(raw);
	let corrected = map_words(&cleaned, |word| {
		tables.spelling.get(word).map(String::as_str).unwrap_or(word).to_string()
	});
	let (intent, confidence) = intent::classify(&corrected);
	let stripped = strip_artifacts(&corrected, &tables.artifact_phrases);
	let (remaining, years) = year::extract_years(&stripped);
	let expanded = map_words(&remaining, |word| {
		tables.synonyms.get(word).map(String::as_str).unwrap_or(word).to_string()
	});
	let genres = intent::detect_genres(&expanded);
	let normalized = remove_stop_words(&expanded, tables);
	let tokens = text::tokenize(&normalized, MAX_QUERY_TOKENS);

	Ok(Query {
		raw: raw.to_string(),
		normalized,
		tokens,
		intent,
		confidence,
		constraints: QueryConstraints { years, genres },
	})
}

/// NFKD-normalizes, lowercases, folds punctuation to spaces (keeping
/// apostrophes and hyphens), and expands common contractions.
fn clean(input: &str) -> String {
	let mut folded = String::with_capacity(input.len());

	for ch in input.nfkd() {
		if ch.is_alphanumeric() {
			for lower in ch.to_lowercase() {
				folded.push(lower);
			}
		} else if matches!(ch, '\'' | '-') {
			folded.push(ch);
		} else {
			folded.push(' ');
		}
	}

	let words: Vec<String> = folded.split_whitespace().map(expand_contraction).collect();

	collapse(&words.join(" "))
}

fn expand_contraction(word: &str) -> String {
	for (suffix, replacement) in [
		("n't", " not"),
		("'re", " are"),
		("'ll", " will"),
		("'ve", " have"),
		("'d", " would"),
		("'s", ""),
	] {
		if let Some(stem) = word.strip_suffix(suffix)
			&& !stem.is_empty()
		{
			return format!("{stem}{replacement}");
		}
	}

	word.trim_matches('\'').to_string()
}

fn strip_artifacts(text: &str, phrases: &[String]) -> String {
	let mut padded = format!(" {text} ");

	for phrase in phrases {
		let needle = format!(" {phrase} ");

		while let Some(pos) = padded.find(&needle) {
			padded.replace_range(pos..pos + needle.len(), " ");
		}
	}

	collapse(&padded)
}

fn map_words<F>(text: &str, map: F) -> String
where
	F: Fn(&str) -> String,
{
	let words: Vec<String> = text.split_whitespace().map(|word| map(word)).collect();

	collapse(&words.join(" "))
}

/// Stop-word removal. A query that consists solely of stop words degrades
/// to empty normalized text, which downstream stages treat as an
/// empty-candidate request rather than an error.
fn remove_stop_words(text: &str, tables: &NormalizerTables) -> String {
	let words: Vec<&str> = text
		.split_whitespace()
		.filter(|word| {
			tables.preserve_words.contains(*word) || !tables.stop_words.contains(*word)
		})
		.collect();

	words.join(" ")
}

fn collapse(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

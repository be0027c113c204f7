use reel_domain::{Intent, NormalizerTables, QueryError, YearRange, normalize};

fn tables() -> NormalizerTables {
	NormalizerTables::default()
}

#[test]
fn normalize_is_deterministic() {
	let tables = tables();
	let first = normalize("Find me ACTION movies like Heat!", &tables).expect("should normalize");
	let second = normalize("Find me ACTION movies like Heat!", &tables).expect("should normalize");

	assert_eq!(first, second);
}

#[test]
fn empty_query_is_rejected() {
	let tables = tables();

	assert_eq!(normalize("", &tables), Err(QueryError::Empty));
	assert_eq!(normalize("   \t  ", &tables), Err(QueryError::Empty));
}

#[test]
fn strips_artifact_phrases_and_lowercases() {
	let query = normalize("Show me animated movies", &tables()).expect("should normalize");

	assert!(!query.normalized.contains("show"));
	assert!(query.normalized.contains("animation"));
	assert_eq!(query.normalized, query.normalized.to_lowercase());
}

#[test]
fn expands_genre_synonyms() {
	let query = normalize("sci-fi for kids", &tables()).expect("should normalize");

	assert!(query.normalized.contains("science fiction"));
	assert!(query.normalized.contains("children"));
	assert!(query.constraints.genres.iter().any(|genre| genre == "science fiction"));
}

#[test]
fn corrects_known_misspellings() {
	let query = normalize("commedy thriler", &tables()).expect("should normalize");

	assert!(query.tokens.contains(&"comedy".to_string()));
	assert!(query.tokens.contains(&"thriller".to_string()));
}

#[test]
fn unknown_tokens_pass_through_spelling_correction() {
	let query = normalize("xqzzy comedy", &tables()).expect("should normalize");

	assert!(query.tokens.contains(&"xqzzy".to_string()));
}

#[test]
fn extracts_year_constraint_and_removes_it_from_text() {
	let query = normalize("thrillers after 2000", &tables()).expect("should normalize");
	let years = query.constraints.years.expect("year constraint expected");

	assert_eq!(years.start, Some(2000));
	assert_eq!(years.end, None);
	assert!(!query.normalized.contains("2000"));
	assert!(!query.normalized.contains("after"));
}

#[test]
fn contradictory_year_range_is_flagged_passthrough() {
	let query = normalize("drama after 2050 before 2000", &tables()).expect("should normalize");
	let years = query.constraints.years.expect("year constraint expected");

	assert_eq!(
		years,
		YearRange { start: Some(2050), end: Some(1999), contradictory: true }
	);
}

#[test]
fn similarity_cue_outranks_genre_terms() {
	let query = normalize("comedy movies like Airplane", &tables()).expect("should normalize");

	assert_eq!(query.intent, Intent::Similarity);
	assert!(query.confidence > 0.0);
}

#[test]
fn genre_terms_outrank_mood_terms() {
	let query = normalize("dark thriller", &tables()).expect("should normalize");

	assert_eq!(query.intent, Intent::GenreSearch);
}

#[test]
fn cueless_query_is_unknown_with_zero_confidence() {
	let query = normalize("zzkqr plomb", &tables()).expect("should normalize");

	assert_eq!(query.intent, Intent::Unknown);
	assert_eq!(query.confidence, 0.0);
}

#[test]
fn stop_word_only_query_degrades_to_empty_text() {
	let query = normalize("the of and", &tables()).expect("should normalize");

	assert!(query.normalized.is_empty());
	assert!(query.tokens.is_empty());
}

#[test]
fn numeric_only_query_degrades_to_year_constraint() {
	let query = normalize("1995", &tables()).expect("should normalize");
	let years = query.constraints.years.expect("year constraint expected");

	assert_eq!(years.start, Some(1995));
	assert_eq!(years.end, Some(1995));
	assert!(query.tokens.is_empty());
}

#[test]
fn special_character_query_degrades_gracefully() {
	let query = normalize("!!! ??? ***", &tables()).expect("should normalize");

	assert!(query.normalized.is_empty());
	assert_eq!(query.intent, Intent::Unknown);
}

#[test]
fn synonym_table_is_swappable() {
	let mut tables = tables();

	tables.synonyms.insert("noir".to_string(), "crime drama".to_string());

	let query = normalize("noir", &tables).expect("should normalize");

	assert!(query.normalized.contains("crime drama"));
}

#[test]
fn contractions_are_expanded() {
	let query = normalize("can't stop watching westerns", &tables()).expect("should normalize");

	assert!(!query.normalized.contains("can't"));
	assert!(query.tokens.contains(&"western".to_string()) || query.normalized.contains("western"));
}

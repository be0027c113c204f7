use std::time::Duration;

use tokio::time::{error::Elapsed, timeout};

use reel_domain::{Query, text};

use crate::{Backends, Error, Result, search::CandidateItem};

/// How many catalog rows the lexical channel may scan per request, as a
/// multiple of the over-fetched limit. The catalog returns rows in id order,
/// so the scoring pool must be wider than the final list.
const LEXICAL_SCAN_FACTOR: u32 = 4;

#[derive(Debug, Default)]
pub struct RetrievedChannels {
	pub semantic: Vec<CandidateItem>,
	pub lexical: Vec<CandidateItem>,
	pub semantic_degraded: bool,
	pub lexical_degraded: bool,
}

/// Runs the semantic and lexical channels concurrently, each bounded by the
/// configured deadline. A failed or timed-out channel degrades to an empty
/// list; only both failing raises [`Error::RetrievalUnavailable`].
pub async fn retrieve(
	cfg: &reel_config::Config,
	backends: &Backends,
	query: &Query,
	limit: u32,
) -> Result<RetrievedChannels> {
	if query.normalized.trim().is_empty() {
		return Ok(RetrievedChannels::default());
	}

	let fetch_k = limit.saturating_mul(cfg.retrieval.overfetch_factor.max(2));
	let deadline = Duration::from_millis(cfg.retrieval.timeout_ms);
	let (semantic, lexical) = tokio::join!(
		timeout(deadline, semantic_channel(cfg, backends, query, fetch_k)),
		timeout(deadline, lexical_channel(backends, query, fetch_k)),
	);
	let (semantic, semantic_degraded) = flatten_channel(semantic, "semantic");
	let (lexical, lexical_degraded) = flatten_channel(lexical, "lexical");

	if semantic_degraded && lexical_degraded {
		return Err(Error::RetrievalUnavailable {
			message: "Both semantic and lexical channels failed.".to_string(),
		});
	}

	Ok(RetrievedChannels { semantic, lexical, semantic_degraded, lexical_degraded })
}

/// Maps raw cosine similarity (assumed in [-1, 1]) into [0, 1].
pub fn rescale_similarity(similarity: f32) -> f32 {
	((similarity.clamp(-1.0, 1.0) + 1.0) / 2.0).clamp(0.0, 1.0)
}

fn flatten_channel(
	outcome: Result<Result<Vec<CandidateItem>>, Elapsed>,
	channel: &'static str,
) -> (Vec<CandidateItem>, bool) {
	match outcome {
		Ok(Ok(items)) => (items, false),
		Ok(Err(err)) => {
			tracing::warn!(error = %err, channel, "Retrieval channel failed; degrading to partial results.");

			(Vec::new(), true)
		},
		Err(_) => {
			tracing::warn!(channel, "Retrieval channel timed out; degrading to partial results.");

			(Vec::new(), true)
		},
	}
}

async fn semantic_channel(
	cfg: &reel_config::Config,
	backends: &Backends,
	query: &Query,
	fetch_k: u32,
) -> Result<Vec<CandidateItem>> {
	let embeddings = backends
		.embedding
		.embed(&cfg.providers.embedding, std::slice::from_ref(&query.normalized))
		.await?;
	let vector = embeddings.into_iter().next().ok_or_else(|| Error::Provider {
		message: "Embedding provider returned no vectors.".to_string(),
	})?;

	if vector.len() != cfg.storage.qdrant.vector_dim as usize {
		return Err(Error::Provider {
			message: "Embedding vector dimension mismatch.".to_string(),
		});
	}

	let hits = backends.vector.search(vector, fetch_k).await?;
	let min_score = cfg.retrieval.min_semantic_score;
	let mut out = Vec::with_capacity(hits.len());

	for hit in hits {
		let score = rescale_similarity(hit.similarity);

		if score < min_score {
			continue;
		}

		out.push(CandidateItem {
			item_id: hit.item_id,
			title: hit.metadata.title,
			genres: hit.metadata.genres,
			year: hit.metadata.year,
			popularity: hit.metadata.popularity,
			semantic_score: score,
			lexical_score: 0.0,
			combined_score: 0.0,
			in_semantic: true,
			in_lexical: false,
		});
	}

	Ok(out)
}

async fn lexical_channel(
	backends: &Backends,
	query: &Query,
	fetch_k: u32,
) -> Result<Vec<CandidateItem>> {
	if query.tokens.is_empty() {
		return Ok(Vec::new());
	}

	let scan_limit = fetch_k.saturating_mul(LEXICAL_SCAN_FACTOR);
	let docs = backends.catalog.lexical_candidates(&query.tokens, scan_limit).await?;
	let weights = text::FieldWeights::default();
	let mut out = Vec::with_capacity(docs.len());

	for doc in docs {
		let score = text::weighted_overlap(
			&query.tokens,
			&doc.title_tokens,
			&doc.genre_tokens,
			&doc.tag_tokens,
			&weights,
		);

		if score <= 0.0 {
			continue;
		}

		out.push(CandidateItem {
			item_id: doc.item_id,
			title: doc.metadata.title,
			genres: doc.metadata.genres,
			year: doc.metadata.year,
			popularity: doc.metadata.popularity,
			semantic_score: 0.0,
			lexical_score: score,
			combined_score: 0.0,
			in_semantic: false,
			in_lexical: true,
		});
	}

	out.sort_by(|a, b| {
		super::fusion::cmp_f32_desc(a.lexical_score, b.lexical_score)
			.then_with(|| a.item_id.cmp(&b.item_id))
	});
	out.truncate(fetch_k as usize);

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rescales_cosine_into_unit_interval() {
		assert_eq!(rescale_similarity(1.0), 1.0);
		assert_eq!(rescale_similarity(-1.0), 0.0);
		assert_eq!(rescale_similarity(0.0), 0.5);
		assert_eq!(rescale_similarity(2.0), 1.0);
		assert_eq!(rescale_similarity(-2.0), 0.0);
	}
}

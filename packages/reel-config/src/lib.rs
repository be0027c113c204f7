mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, EmbeddingProviderConfig, Fusion, Optimize, Postgres, Providers, Qdrant,
	Retrieval, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("fusion.semantic_weight", cfg.fusion.semantic_weight),
		("fusion.lexical_weight", cfg.fusion.lexical_weight),
		("fusion.similarity_semantic_weight", cfg.fusion.similarity_semantic_weight),
		("fusion.similarity_lexical_weight", cfg.fusion.similarity_lexical_weight),
		("fusion.genre_semantic_weight", cfg.fusion.genre_semantic_weight),
		("fusion.genre_lexical_weight", cfg.fusion.genre_lexical_weight),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}
	if cfg.fusion.semantic_weight + cfg.fusion.lexical_weight <= 0.0 {
		return Err(Error::Validation {
			message: "fusion.semantic_weight and fusion.lexical_weight must not both be zero."
				.to_string(),
		});
	}

	if cfg.retrieval.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.default_limit == 0 {
		return Err(Error::Validation {
			message: "retrieval.default_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.retrieval.min_semantic_score.is_finite()
		|| !(0.0..=1.0).contains(&cfg.retrieval.min_semantic_score)
	{
		return Err(Error::Validation {
			message: "retrieval.min_semantic_score must be in the range 0.0-1.0.".to_string(),
		});
	}

	if cfg.cache.l1_max_entries == 0 {
		return Err(Error::Validation {
			message: "cache.l1_max_entries must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.l1_ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "cache.l1_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.l2_ttl_seconds <= 0 {
		return Err(Error::Validation {
			message: "cache.l2_ttl_seconds must be greater than zero.".to_string(),
		});
	}

	if let Some(max) = cfg.cache.max_payload_bytes
		&& max == 0
	{
		return Err(Error::Validation {
			message: "cache.max_payload_bytes must be greater than zero.".to_string(),
		});
	}

	if cfg.optimize.rewrite_short_token_threshold >= cfg.optimize.rewrite_long_token_threshold {
		return Err(Error::Validation {
			message: "optimize.rewrite_short_token_threshold must be less than optimize.rewrite_long_token_threshold."
				.to_string(),
		});
	}
	if !cfg.optimize.personalization_boost.is_finite() || cfg.optimize.personalization_boost < 1.0 {
		return Err(Error::Validation {
			message: "optimize.personalization_boost must be 1.0 or greater.".to_string(),
		});
	}
	if !cfg.optimize.personalization_max_boost.is_finite()
		|| cfg.optimize.personalization_max_boost < cfg.optimize.personalization_boost
	{
		return Err(Error::Validation {
			message: "optimize.personalization_max_boost must be at least optimize.personalization_boost."
				.to_string(),
		});
	}
	if cfg.optimize.diversity_max_consecutive_genre == 0 {
		return Err(Error::Validation {
			message: "optimize.diversity_max_consecutive_genre must be greater than zero."
				.to_string(),
		});
	}
	if !cfg.optimize.profile_alpha.is_finite()
		|| !(0.0..=1.0).contains(&cfg.optimize.profile_alpha)
	{
		return Err(Error::Validation {
			message: "optimize.profile_alpha must be in the range 0.0-1.0.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// An over-fetch factor below 2 defeats fusion; the retriever assumes at
	// least twice the requested limit per channel.
	if cfg.retrieval.overfetch_factor < 2 {
		cfg.retrieval.overfetch_factor = 2;
	}
}

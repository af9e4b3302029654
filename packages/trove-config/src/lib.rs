mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Qdrant, Recommend,
	Search, Service, Storage,
};

use std::{fs, path::Path};

/// Hard ceiling on how many candidates a ranking request may carry.
pub const MAX_RANK_CANDIDATES: u32 = 10;

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
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

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("intent", &cfg.providers.intent.api_key),
		("ranker", &cfg.providers.ranker.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	for (label, temperature) in [
		("intent", cfg.providers.intent.temperature),
		("ranker", cfg.providers.ranker.temperature),
	] {
		if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
			return Err(Error::Validation {
				message: format!("providers.{label}.temperature must be in the range 0.0-2.0."),
			});
		}
	}

	let search = &cfg.search;

	for (label, value) in [
		("search.primary_limit", search.primary_limit),
		("search.fallback_limit", search.fallback_limit),
		("search.top_k_per_phrase", search.top_k_per_phrase),
		("search.top_n", search.top_n),
		("search.max_rank_candidates", search.max_rank_candidates),
		("search.max_phrases", search.max_phrases),
		("recommend.top_k_per_phrase", cfg.recommend.top_k_per_phrase),
		("recommend.candidate_limit", cfg.recommend.candidate_limit),
		("recommend.default_count", cfg.recommend.default_count),
		("recommend.max_count", cfg.recommend.max_count),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if search.max_rank_candidates > MAX_RANK_CANDIDATES {
		return Err(Error::Validation {
			message: format!("search.max_rank_candidates must be {MAX_RANK_CANDIDATES} or less."),
		});
	}
	if search.top_n > search.max_rank_candidates {
		return Err(Error::Validation {
			message: "search.top_n must not exceed search.max_rank_candidates.".to_string(),
		});
	}
	if cfg.recommend.default_count > cfg.recommend.max_count {
		return Err(Error::Validation {
			message: "recommend.default_count must not exceed recommend.max_count.".to_string(),
		});
	}
	if cfg.recommend.max_count > search.max_rank_candidates {
		return Err(Error::Validation {
			message: "recommend.max_count must not exceed search.max_rank_candidates."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	for api_base in [
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.intent.api_base,
		&mut cfg.providers.ranker.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}
}

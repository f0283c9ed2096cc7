mod error;
mod eval;
mod types;

pub use error::{Error, Result};
pub use eval::{
	Dataset, EvalConfig, EvalTargets, FailurePolicy, Judge, OllamaJudge, OpenAiJudge, Scoring,
};
pub use types::{
	Config, EmbeddingProviderConfig, Indexing, IntentKeywords, LlmProviderConfig, MetadataFields,
	Prompts, Providers, Qdrant, QueryParsing, Ranking, Retrieval, Service, SeniorityTokens,
	SkillNormalization, SkillRule, Storage, TechnologySynonym,
};

use std::{env, fs, path::Path};

use serde::de::DeserializeOwned;

pub fn load(path: &Path) -> Result<Config> {
	let mut cfg: Config = read_toml(path)?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn load_eval(path: &Path) -> Result<EvalConfig> {
	let mut cfg: EvalConfig = read_toml(path)?;

	normalize_eval(&mut cfg, env::var("OPENAI_API_KEY").ok());

	validate_eval(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (key, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.qdrant.collection", &cfg.storage.qdrant.collection),
	] {
		if value.trim().is_empty() {
			return Err(invalid(format!("{key} must be non-empty.")));
		}
	}

	if !matches!(cfg.storage.backend.as_str(), "qdrant" | "memory") {
		return Err(invalid("storage.backend must be one of qdrant or memory."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(invalid("providers.embedding.dimensions must be greater than zero."));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(invalid(
			"providers.embedding.dimensions must match storage.qdrant.vector_dim.",
		));
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(invalid("Provider embedding api_key must be non-empty."));
	}
	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(invalid("providers.llm.temperature must be a finite number, zero or greater."));
	}
	if cfg.retrieval.limit == 0 {
		return Err(invalid("retrieval.limit must be greater than zero."));
	}
	if cfg.retrieval.structured_max_attempts == 0 {
		return Err(invalid("retrieval.structured_max_attempts must be greater than zero."));
	}
	if cfg.indexing.primary_skills_max_count == 0 {
		return Err(invalid("indexing.primary_skills_max_count must be greater than zero."));
	}
	if cfg.indexing.strong_skill_levels.is_empty() {
		return Err(invalid("indexing.strong_skill_levels must be non-empty."));
	}
	if !cfg.prompts.human.contains("{input}") {
		return Err(invalid("prompts.human must contain the {input} placeholder."));
	}

	validate_ranking(&cfg.ranking)?;
	validate_query_parsing(&cfg.query_parsing)?;

	if cfg.skill_normalization.rules.is_empty() {
		return Err(invalid("skill_normalization.rules must be non-empty."));
	}

	for rule in &cfg.skill_normalization.rules {
		if rule.pattern.trim().is_empty() || rule.canonical.trim().is_empty() {
			return Err(invalid(
				"skill_normalization.rules entries must have a non-empty pattern and canonical.",
			));
		}
	}

	Ok(())
}

pub fn validate_eval(cfg: &EvalConfig) -> Result<()> {
	if !matches!(cfg.judge.provider.as_str(), "openai" | "ollama" | "heuristic") {
		return Err(invalid("judge.provider must be one of openai, ollama, or heuristic."));
	}
	if cfg.judge.runs == 0 {
		return Err(invalid("judge.runs must be greater than zero."));
	}
	if cfg.failure_policy.min_successful_runs > cfg.judge.runs {
		return Err(invalid(
			"failure_policy.min_successful_runs must be less than or equal to judge.runs.",
		));
	}
	if !cfg.judge.temperature.is_finite() {
		return Err(invalid("judge.temperature must be a finite number."));
	}
	if cfg.judge.provider == "ollama" && cfg.judge.ollama.model.trim().is_empty() {
		return Err(invalid("judge.ollama.model must be non-empty when judge.provider is ollama."));
	}
	if cfg.judge.provider == "openai"
		&& cfg.judge.openai.api_key.is_some()
		&& cfg.judge.openai.model.trim().is_empty()
	{
		return Err(invalid("judge.openai.model must be non-empty when an API key is set."));
	}

	for (key, value) in [
		("scoring.tie_tolerance", cfg.scoring.tie_tolerance),
		("scoring.heuristic_tie_tolerance", cfg.scoring.heuristic_tie_tolerance),
	] {
		if !value.is_finite() {
			return Err(invalid(format!("{key} must be a finite number.")));
		}
		if value < 0.0 {
			return Err(invalid(format!("{key} must be zero or greater.")));
		}
	}
	for (key, value) in
		[("targets.dotnet_url", &cfg.targets.dotnet_url), ("targets.python_url", &cfg.targets.python_url)]
	{
		if value.is_empty() {
			return Err(invalid(format!("{key} must be non-empty.")));
		}
	}

	Ok(())
}

fn validate_ranking(ranking: &Ranking) -> Result<()> {
	for (key, weight) in [
		("ranking.technical_weight", ranking.technical_weight),
		("ranking.seniority_weight", ranking.seniority_weight),
		("ranking.leadership_weight", ranking.leadership_weight),
		("ranking.experience_weight", ranking.experience_weight),
	] {
		if !weight.is_finite() {
			return Err(invalid(format!("{key} must be a finite number.")));
		}
		if weight < 0.0 {
			return Err(invalid(format!("{key} must be zero or greater.")));
		}
	}

	if !ranking.max_leadership_contribution.is_finite()
		|| !(0.0..=1.0).contains(&ranking.max_leadership_contribution)
	{
		return Err(invalid("ranking.max_leadership_contribution must be in the range 0.0-1.0."));
	}
	if ranking.leadership_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
		return Err(invalid("ranking.leadership_keywords must not contain blank entries."));
	}

	Ok(())
}

fn validate_query_parsing(parsing: &QueryParsing) -> Result<()> {
	if parsing.intents.is_empty() {
		return Err(invalid("query_parsing.intents must be non-empty."));
	}
	if parsing.technology_synonyms.is_empty() {
		return Err(invalid("query_parsing.technology_synonyms must be non-empty."));
	}
	if parsing.seniority_tokens.is_empty() {
		return Err(invalid("query_parsing.seniority_tokens must be non-empty."));
	}
	if parsing.experience_patterns.is_empty() {
		return Err(invalid("query_parsing.experience_patterns must be non-empty."));
	}

	let blank_keyword = parsing
		.intents
		.iter()
		.flat_map(|entry| entry.keywords.iter())
		.chain(parsing.seniority_tokens.iter().flat_map(|entry| entry.tokens.iter()))
		.chain(parsing.technology_synonyms.iter().map(|entry| &entry.token))
		.any(|token| token.trim().is_empty());

	if blank_keyword {
		return Err(invalid("query_parsing tables must not contain blank tokens."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.storage.backend = cfg.storage.backend.trim().to_ascii_lowercase();

	trim_trailing_slash(&mut cfg.providers.embedding.api_base);
	trim_trailing_slash(&mut cfg.providers.llm.api_base);
}

fn normalize_eval(cfg: &mut EvalConfig, env_api_key: Option<String>) {
	cfg.judge.provider = cfg.judge.provider.trim().to_ascii_lowercase();

	if cfg.judge.openai.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(true) {
		cfg.judge.openai.api_key = env_api_key.filter(|key| !key.trim().is_empty());
	}

	trim_trailing_slash(&mut cfg.targets.dotnet_url);
	trim_trailing_slash(&mut cfg.targets.python_url);
	trim_trailing_slash(&mut cfg.judge.openai.api_base);
	trim_trailing_slash(&mut cfg.judge.ollama.host);
}

fn read_toml<T>(path: &Path) -> Result<T>
where
	T: DeserializeOwned,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	toml::from_str(&raw).map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })
}

fn trim_trailing_slash(value: &mut String) {
	let trimmed = value.trim().trim_end_matches('/').to_string();

	*value = trimmed;
}

fn invalid(message: impl Into<String>) -> Error {
	Error::Validation { message: message.into() }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn eval_config(raw: &str) -> EvalConfig {
		toml::from_str(raw).expect("Failed to parse eval config.")
	}

	#[test]
	fn env_api_key_fills_missing_openai_key() {
		let mut cfg = eval_config("[judge]\nprovider = \" OpenAI \"\n");

		normalize_eval(&mut cfg, Some("sk-test".to_string()));

		assert_eq!(cfg.judge.provider, "openai");
		assert_eq!(cfg.judge.openai.api_key.as_deref(), Some("sk-test"));
	}

	#[test]
	fn configured_openai_key_wins_over_env() {
		let mut cfg = eval_config("[judge.openai]\napi_key = \"sk-config\"\n");

		normalize_eval(&mut cfg, Some("sk-env".to_string()));

		assert_eq!(cfg.judge.openai.api_key.as_deref(), Some("sk-config"));
	}

	#[test]
	fn blank_env_key_is_ignored() {
		let mut cfg = eval_config("");

		normalize_eval(&mut cfg, Some("  ".to_string()));

		assert!(cfg.judge.openai.api_key.is_none());
	}

	#[test]
	fn trailing_slashes_are_trimmed() {
		let mut cfg = eval_config("[targets]\ndotnet_url = \"http://localhost:5000/\"\n");

		normalize_eval(&mut cfg, None);

		assert_eq!(cfg.targets.dotnet_url, "http://localhost:5000");
	}
}

use regex::Regex;

use talent_config::SkillNormalization;

use crate::{Error, Result};

/// Rewrites free-form skill names ("Java 8", "ReactJS 18") to canonical names.
///
/// Rules are tried top to bottom against the whole trimmed input and the first match wins, so the
/// table must list specific patterns before generic ones. Construction rejects any table where a
/// canonical name would itself be rewritten, which keeps `normalize` idempotent.
#[derive(Debug)]
pub struct SkillNormalizer {
	rules: Vec<(Regex, String)>,
}
impl SkillNormalizer {
	pub fn new(cfg: &SkillNormalization) -> Result<Self> {
		if cfg.rules.is_empty() {
			return Err(Error::EmptyTable { table: "skill_normalization.rules" });
		}

		let rules = cfg
			.rules
			.iter()
			.map(|rule| {
				Regex::new(&format!("(?i)^(?:{})$", rule.pattern))
					.map(|regex| (regex, rule.canonical.trim().to_string()))
					.map_err(|err| Error::InvalidPattern {
						table: "skill_normalization.rules",
						pattern: rule.pattern.clone(),
						source: Box::new(err),
					})
			})
			.collect::<Result<Vec<_>>>()?;
		let normalizer = Self { rules };

		for (_, canonical) in &normalizer.rules {
			let rewritten = normalizer.normalize(canonical);

			if &rewritten != canonical {
				return Err(Error::NonIdempotentRule { canonical: canonical.clone(), rewritten });
			}
		}

		Ok(normalizer)
	}

	pub fn normalize(&self, skill: &str) -> String {
		if skill.is_empty() {
			return String::new();
		}

		let trimmed = skill.trim();

		self.rules
			.iter()
			.find(|(regex, _)| regex.is_match(trimmed))
			.map(|(_, canonical)| canonical.clone())
			.unwrap_or_else(|| trimmed.to_string())
	}
}

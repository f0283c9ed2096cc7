//! Structural parsing of free-text recruiting questions.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use talent_config::{IntentKeywords, QueryParsing, SeniorityTokens, TechnologySynonym};

use crate::{Error, Result, seniority::SeniorityLevel};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
	FindBest,
	ListAll,
	Compare,
	Explain,
	General,
}
impl QueryIntent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::FindBest => "find_best",
			Self::ListAll => "list_all",
			Self::Compare => "compare",
			Self::Explain => "explain",
			Self::General => "general",
		}
	}

	fn from_key(key: &str) -> Result<Self> {
		match key {
			"find_best" => Ok(Self::FindBest),
			"list_all" => Ok(Self::ListAll),
			"compare" => Ok(Self::Compare),
			"explain" => Ok(Self::Explain),
			_ => Err(Error::UnknownIntent { name: key.to_string() }),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedQuery {
	pub query_text: String,
	pub query_intent: QueryIntent,
	/// Canonical names, deduplicated and sorted.
	pub required_technologies: Vec<String>,
	pub min_seniority_level: Option<SeniorityLevel>,
	pub min_years_experience: Option<u32>,
}

/// First intent whose keyword occurs anywhere in the lower-cased query.
#[derive(Debug)]
pub struct IntentClassifier {
	rules: Vec<(QueryIntent, Vec<String>)>,
}
impl IntentClassifier {
	pub fn new(entries: &[IntentKeywords]) -> Result<Self> {
		if entries.is_empty() {
			return Err(Error::EmptyTable { table: "query_parsing.intents" });
		}

		let rules = entries
			.iter()
			.map(|entry| {
				let keywords: Vec<String> =
					entry.keywords.iter().map(|keyword| keyword.to_lowercase()).collect();

				QueryIntent::from_key(entry.intent.trim()).map(|intent| (intent, keywords))
			})
			.collect::<Result<_>>()?;

		Ok(Self { rules })
	}

	pub fn classify(&self, query: &str) -> QueryIntent {
		let lowered = query.to_lowercase();

		self.rules
			.iter()
			.find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword.as_str())))
			.map(|(intent, _)| *intent)
			.unwrap_or(QueryIntent::General)
	}
}

/// Whole-word synonym lookup. A match must not touch a word character on either side, which keeps
/// `ts` out of `its` and still lets symbolic tokens such as `c#` or `node.js` match.
#[derive(Debug)]
pub struct TechnologyMatcher {
	patterns: Vec<(Regex, String)>,
}
impl TechnologyMatcher {
	pub fn new(synonyms: &[TechnologySynonym]) -> Result<Self> {
		if synonyms.is_empty() {
			return Err(Error::EmptyTable { table: "query_parsing.technology_synonyms" });
		}

		let patterns = synonyms
			.iter()
			.map(|synonym| {
				let token = synonym.token.trim();
				let pattern = format!(r"(?i)(?:^|[^\w]){}(?:$|[^\w])", regex::escape(token));

				Regex::new(&pattern)
					.map(|regex| (regex, synonym.canonical.clone()))
					.map_err(|err| Error::InvalidPattern {
						table: "query_parsing.technology_synonyms",
						pattern: token.to_string(),
						source: Box::new(err),
					})
			})
			.collect::<Result<_>>()?;

		Ok(Self { patterns })
	}

	pub fn find(&self, query: &str) -> Vec<String> {
		let found: BTreeSet<&str> = self
			.patterns
			.iter()
			.filter(|(regex, _)| regex.is_match(query))
			.map(|(_, canonical)| canonical.as_str())
			.collect();

		found.into_iter().map(str::to_string).collect()
	}
}

/// Flattened `(token, level)` list. Table order decides ties, not the highest level.
#[derive(Debug)]
pub struct SeniorityMatcher {
	tokens: Vec<(String, SeniorityLevel)>,
}
impl SeniorityMatcher {
	pub fn new(entries: &[SeniorityTokens]) -> Result<Self> {
		if entries.is_empty() {
			return Err(Error::EmptyTable { table: "query_parsing.seniority_tokens" });
		}

		let mut tokens = Vec::new();

		for entry in entries {
			let level: SeniorityLevel = entry.level.trim().parse()?;

			tokens.extend(entry.tokens.iter().map(|token| (token.to_lowercase(), level)));
		}

		Ok(Self { tokens })
	}

	pub fn find(&self, query: &str) -> Option<SeniorityLevel> {
		let lowered = query.to_lowercase();

		self.tokens
			.iter()
			.find(|(token, _)| lowered.contains(token.as_str()))
			.map(|(_, level)| *level)
	}
}

#[derive(Debug)]
pub struct ExperienceParser {
	patterns: Vec<Regex>,
}
impl ExperienceParser {
	pub fn new(patterns: &[String]) -> Result<Self> {
		if patterns.is_empty() {
			return Err(Error::EmptyTable { table: "query_parsing.experience_patterns" });
		}

		let patterns = patterns
			.iter()
			.map(|pattern| {
				let regex = Regex::new(pattern).map_err(|err| Error::InvalidPattern {
					table: "query_parsing.experience_patterns",
					pattern: pattern.clone(),
					source: Box::new(err),
				})?;

				if regex.captures_len() < 2 {
					return Err(Error::MissingCapture { pattern: pattern.clone() });
				}

				Ok(regex)
			})
			.collect::<Result<_>>()?;

		Ok(Self { patterns })
	}

	/// Patterns run against the lower-cased query; the first pattern with a numeric capture wins.
	/// A capture that does not fit in `u32` counts as no match, so later patterns still get a turn.
	pub fn parse(&self, query: &str) -> Option<u32> {
		let lowered = query.to_lowercase();

		self.patterns.iter().find_map(|regex| {
			regex.captures(&lowered).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse().ok())
		})
	}
}

#[derive(Debug)]
pub struct QueryParser {
	intents: IntentClassifier,
	technologies: TechnologyMatcher,
	seniority: SeniorityMatcher,
	experience: ExperienceParser,
}
impl QueryParser {
	pub fn new(cfg: &QueryParsing) -> Result<Self> {
		Ok(Self {
			intents: IntentClassifier::new(&cfg.intents)?,
			technologies: TechnologyMatcher::new(&cfg.technology_synonyms)?,
			seniority: SeniorityMatcher::new(&cfg.seniority_tokens)?,
			experience: ExperienceParser::new(&cfg.experience_patterns)?,
		})
	}

	pub fn parse(&self, query: &str) -> ParsedQuery {
		ParsedQuery {
			query_text: query.to_string(),
			query_intent: self.intents.classify(query),
			required_technologies: self.technologies.find(query),
			min_seniority_level: self.seniority.find(query),
			min_years_experience: self.experience.parse(query),
		}
	}
}

#[cfg(test)]
mod tests {
	use talent_config::{QueryParsing, SeniorityTokens};

	use super::*;

	fn parser() -> QueryParser {
		QueryParser::new(&QueryParsing::default()).expect("Default tables must compile.")
	}

	#[test]
	fn parses_senior_java_query() {
		let parsed = parser().parse("senior java developer with 5+ years");

		assert_eq!(parsed.query_intent, QueryIntent::General);
		assert_eq!(parsed.required_technologies, vec!["Java".to_string()]);
		assert_eq!(parsed.min_seniority_level, Some(SeniorityLevel::Senior));
		assert_eq!(parsed.min_years_experience, Some(5));
	}

	#[test]
	fn parses_documented_example_queries() {
		let parser = parser();
		let senior = parser.parse("looking for a senior java developer with at least 5 years experience");

		assert_eq!(senior.query_intent, QueryIntent::General);
		assert_eq!(senior.required_technologies, vec!["Java".to_string()]);
		assert_eq!(senior.min_seniority_level, Some(SeniorityLevel::Senior));
		assert_eq!(senior.min_years_experience, Some(5));

		let best = parser.parse("who is the best candidate for java?");

		assert_eq!(best.query_intent, QueryIntent::FindBest);
		assert_eq!(best.required_technologies, vec!["Java".to_string()]);
		assert_eq!(best.min_seniority_level, None);
		assert_eq!(best.min_years_experience, None);
	}

	#[test]
	fn oversized_year_capture_is_skipped() {
		assert_eq!(parser().parse("99999999999 years").min_years_experience, None);
	}

	#[test]
	fn first_intent_in_table_order_wins() {
		let parser = parser();

		assert_eq!(parser.parse("Find the best React developer").query_intent, QueryIntent::FindBest);
		assert_eq!(parser.parse("List and compare candidates").query_intent, QueryIntent::ListAll);
		assert_eq!(parser.parse("Explain why Anna fits").query_intent, QueryIntent::Explain);
		assert_eq!(parser.parse("Kotlin developer").query_intent, QueryIntent::General);
	}

	#[test]
	fn technologies_are_whole_word_and_sorted() {
		let parser = parser();

		assert_eq!(
			parser.parse("Need nodejs or React, plus k8s").required_technologies,
			vec!["Kubernetes".to_string(), "Node.js".to_string(), "React".to_string()]
		);
		assert!(parser.parse("its a javascriptish thing").required_technologies.is_empty());
		assert_eq!(parser.parse("C# developer").required_technologies, vec!["C#".to_string()]);
		assert_eq!(
			parser.parse("JS and JavaScript").required_technologies,
			vec!["JavaScript".to_string()]
		);
	}

	#[test]
	fn experience_patterns_capture_years() {
		let parser = parser();

		assert_eq!(parser.parse("at least 3 years of Python").min_years_experience, Some(3));
		assert_eq!(parser.parse("minimum 7 yrs").min_years_experience, Some(7));
		assert_eq!(parser.parse("10 years experience").min_years_experience, Some(10));
		assert_eq!(parser.parse("Python developer").min_years_experience, None);
	}

	#[test]
	fn seniority_follows_table_order() {
		let parser = parser();

		assert_eq!(parser.parse("a team lead").min_seniority_level, Some(SeniorityLevel::Lead));
		assert_eq!(
			parser.parse("staff engineer wanted").min_seniority_level,
			Some(SeniorityLevel::Principal)
		);
		assert_eq!(parser.parse("any engineer").min_seniority_level, None);
	}

	#[test]
	fn unknown_seniority_label_fails_construction() {
		let entries = vec![SeniorityTokens { level: "Wizard".to_string(), tokens: vec![] }];
		let err = SeniorityMatcher::new(&entries).expect_err("Expected unknown seniority error.");

		assert!(matches!(err, Error::UnknownSeniority { .. }));
	}

	#[test]
	fn experience_pattern_without_capture_fails_construction() {
		let err = ExperienceParser::new(&[r"\d+ years".to_string()])
			.expect_err("Expected missing capture error.");

		assert!(matches!(err, Error::MissingCapture { .. }));
	}
}

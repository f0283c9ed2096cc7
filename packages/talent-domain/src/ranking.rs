use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use talent_config::{MetadataFields, Ranking};

use crate::{
	candidate::AggregatedCandidate,
	query::{ParsedQuery, QueryIntent},
	seniority::SeniorityLevel,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedCandidate {
	#[serde(flatten)]
	pub candidate: AggregatedCandidate,
	pub technical_score: f64,
	pub seniority_score: f64,
	pub leadership_score: f64,
	pub experience_score: f64,
	pub total_score: f64,
}

/// Weighted four-signal heuristic over aggregated candidates.
#[derive(Clone, Debug)]
pub struct CandidateRanker {
	weights: Ranking,
	fields: MetadataFields,
	leadership_keywords: Vec<String>,
}
impl CandidateRanker {
	pub fn new(weights: &Ranking, fields: &MetadataFields) -> Self {
		Self {
			weights: weights.clone(),
			fields: fields.clone(),
			leadership_keywords: weights
				.leadership_keywords
				.iter()
				.map(|keyword| keyword.trim().to_lowercase())
				.collect(),
		}
	}

	/// Scores every candidate and sorts by total, highest first. Ties keep input order.
	pub fn rank(&self, candidates: Vec<AggregatedCandidate>, parsed: &ParsedQuery) -> Vec<RankedCandidate> {
		let leadership_relevant = self.is_leadership_relevant(parsed);
		let mut ranked: Vec<RankedCandidate> = candidates
			.into_iter()
			.map(|candidate| self.score(candidate, parsed, leadership_relevant))
			.collect();

		ranked.sort_by(|a, b| b.total_score.partial_cmp(&a.total_score).unwrap_or(Ordering::Equal));

		ranked
	}

	fn score(
		&self,
		candidate: AggregatedCandidate,
		parsed: &ParsedQuery,
		leadership_relevant: bool,
	) -> RankedCandidate {
		let technical_score = self.technical_score(&candidate, parsed);
		let seniority_score = self.seniority_score(&candidate, parsed);
		let leadership_score =
			if leadership_relevant { self.leadership_score(&candidate) } else { 0.0 };
		let experience_score = self.experience_score(&candidate, parsed);
		let total_score = self.weights.technical_weight * technical_score
			+ self.weights.seniority_weight * seniority_score
			+ self.weights.leadership_weight * leadership_score
			+ self.weights.experience_weight * experience_score;

		RankedCandidate {
			candidate,
			technical_score,
			seniority_score,
			leadership_score,
			experience_score,
			total_score,
		}
	}

	fn technical_score(&self, candidate: &AggregatedCandidate, parsed: &ParsedQuery) -> f64 {
		let required = &parsed.required_technologies;

		if required.is_empty() {
			return 1.0;
		}

		let skills = primary_skills(candidate.metadata.get(&self.fields.primary_skills));

		if skills.is_empty() {
			return 0.0;
		}

		let matched = required
			.iter()
			.filter(|tech| {
				let tech = tech.to_lowercase();

				skills.iter().any(|skill| skill.contains(&tech))
			})
			.count();

		(matched as f64 / required.len() as f64).min(1.0)
	}

	fn seniority_score(&self, candidate: &AggregatedCandidate, parsed: &ParsedQuery) -> f64 {
		let Some(min_level) = parsed.min_seniority_level else {
			return 1.0;
		};
		let Some(level) =
			candidate.metadata_str(&self.fields.seniority_level).and_then(SeniorityLevel::from_label)
		else {
			return 0.0;
		};
		let excess = i64::from(level.ordinal()) - i64::from(min_level.ordinal());

		if excess < 0 {
			return 0.0;
		}

		let delta = i64::from(self.weights.max_seniority_delta);

		if delta == 0 {
			return if excess == 0 { 1.0 } else { 0.0 };
		}

		excess.min(delta) as f64 / delta as f64
	}

	fn is_leadership_relevant(&self, parsed: &ParsedQuery) -> bool {
		if parsed.query_intent == QueryIntent::FindBest {
			return true;
		}

		let lowered = parsed.query_text.to_lowercase();

		self.leadership_keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
	}

	/// Counts distinct leadership keywords present anywhere in the candidate's documents.
	fn leadership_score(&self, candidate: &AggregatedCandidate) -> f64 {
		let text = candidate.documents.join(" ").to_lowercase();
		let hits = self
			.leadership_keywords
			.iter()
			.filter(|keyword| text.contains(keyword.as_str()))
			.count();

		if hits == 0 || hits < self.weights.leadership_keyword_threshold as usize {
			return 0.0;
		}

		self.weights.max_leadership_contribution.min(1.0)
	}

	fn experience_score(&self, candidate: &AggregatedCandidate, parsed: &ParsedQuery) -> f64 {
		let Some(min_years) = parsed.min_years_experience else {
			return 1.0;
		};
		let Some(years) =
			candidate.metadata.get(&self.fields.years_experience).and_then(crate::coerce_years)
		else {
			return 0.0;
		};
		let excess = years - i64::from(min_years);

		if excess < 0 {
			return 0.0;
		}

		(excess as f64 / 10.0).min(1.0)
	}
}

/// Lower-cased skill names from a comma-separated string or a JSON array of strings.
fn primary_skills(value: Option<&Value>) -> Vec<String> {
	let normalize = |skill: &str| {
		let skill = skill.trim().to_lowercase();

		(!skill.is_empty()).then_some(skill)
	};

	match value {
		Some(Value::String(raw)) => raw.split(',').filter_map(normalize).collect(),
		Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).filter_map(normalize).collect(),
		_ => Vec::new(),
	}
}

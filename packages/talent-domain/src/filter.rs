use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use talent_config::MetadataFields;

use crate::{
	candidate::AggregatedCandidate, indexing, query::ParsedQuery, seniority::SeniorityLevel,
};

const MAX_DROP_REASONS: usize = 5;

/// Backend-neutral metadata predicate.
///
/// Vector stores translate this tree into their own filter language; the in-memory store and tests
/// evaluate it directly.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterCondition {
	Eq { field: String, value: Value },
	In { field: String, values: Vec<Value> },
	Gte { field: String, value: i64 },
	And(Vec<FilterCondition>),
}
impl FilterCondition {
	/// Joins conditions with AND. None for an empty list, the condition itself for a single one.
	pub fn conjunction(mut conditions: Vec<Self>) -> Option<Self> {
		match conditions.len() {
			0 => None,
			1 => conditions.pop(),
			_ => Some(Self::And(conditions)),
		}
	}

	/// Renders the `{"field": {"$in": [...]}}` dictionary form used in traces and payloads.
	pub fn to_value(&self) -> Value {
		match self {
			Self::Eq { field, value } => serde_json::json!({ field.as_str(): value }),
			Self::In { field, values } => serde_json::json!({ field.as_str(): { "$in": values } }),
			Self::Gte { field, value } => serde_json::json!({ field.as_str(): { "$gte": value } }),
			Self::And(conditions) => {
				serde_json::json!({ "$and": conditions.iter().map(Self::to_value).collect::<Vec<_>>() })
			},
		}
	}

	/// Returns whether the metadata passes and, if not, the first failing reason.
	pub fn evaluate(&self, metadata: &Map<String, Value>) -> (bool, Option<String>) {
		match self {
			Self::Eq { field, value } => {
				let matches = metadata.get(field) == Some(value);

				(matches, Some(format!("eq:{field}")).filter(|_| !matches))
			},
			Self::In { field, values } => {
				let matches = metadata.get(field).map(|actual| values.contains(actual)).unwrap_or(false);

				(matches, Some(format!("in:{field}")).filter(|_| !matches))
			},
			Self::Gte { field, value } => {
				let matches = metadata
					.get(field)
					.and_then(numeric_value)
					.map(|actual| actual >= *value as f64)
					.unwrap_or(false);

				(matches, Some(format!("gte:{field}")).filter(|_| !matches))
			},
			Self::And(conditions) => {
				for condition in conditions {
					let (passed, reason) = condition.evaluate(metadata);

					if !passed {
						return (false, reason);
					}
				}

				(true, None)
			},
		}
	}
}

/// Caller-supplied restrictions on top of what the question implies.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RequestFilters {
	#[serde(default)]
	pub prepared: Option<bool>,
	/// CEFR level or descriptive label, e.g. "B2" or "Fluent".
	#[serde(default)]
	pub english_min: Option<String>,
	#[serde(default)]
	pub candidate_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FilterReport {
	pub candidate_count_pre: usize,
	pub candidate_count_post: usize,
	pub dropped_total: usize,
	pub top_drop_reasons: Vec<DropReason>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DropReason {
	pub reason: String,
	pub count: usize,
}

#[derive(Clone, Debug)]
pub struct MetadataFilterBuilder {
	fields: MetadataFields,
}
impl MetadataFilterBuilder {
	pub fn new(fields: &MetadataFields) -> Self {
		Self { fields: fields.clone() }
	}

	/// Store-side pre-filter for the seniority and experience constraints of a query.
	pub fn build_candidate_filters(&self, parsed: &ParsedQuery) -> Vec<FilterCondition> {
		let mut filters = Vec::new();

		if let Some(min_level) = parsed.min_seniority_level {
			filters.push(FilterCondition::In {
				field: self.fields.seniority_level.clone(),
				values: min_level.at_or_above().map(|level| Value::from(level.as_str())).collect(),
			});
		}
		if let Some(min_years) = parsed.min_years_experience {
			filters.push(FilterCondition::Gte {
				field: self.fields.years_experience.clone(),
				value: i64::from(min_years),
			});
		}

		filters
	}

	/// Restricts retrieval to skill documents naming one of the required technologies.
	pub fn build_technology_filters(&self, parsed: &ParsedQuery) -> Option<FilterCondition> {
		if parsed.required_technologies.is_empty() {
			return None;
		}

		Some(FilterCondition::And(vec![
			FilterCondition::Eq {
				field: self.fields.doc_type.clone(),
				value: Value::from(self.fields.skill_type.as_str()),
			},
			FilterCondition::In {
				field: self.fields.skill_name.clone(),
				values: parsed.required_technologies.iter().map(|tech| Value::from(tech.as_str())).collect(),
			},
		]))
	}

	/// Store-side form of the caller's restrictions.
	pub fn build_request_filters(&self, request: &RequestFilters) -> Vec<FilterCondition> {
		let mut conditions = Vec::new();

		if let Some(prepared) = request.prepared {
			conditions
				.push(FilterCondition::Eq { field: self.fields.prepared.clone(), value: Value::Bool(prepared) });
		}
		if let Some(min_level) = request_english_min(request) {
			conditions.push(FilterCondition::Gte {
				field: self.fields.english_level_num.clone(),
				value: min_level,
			});
		}
		if !request.candidate_ids.is_empty() {
			conditions.push(FilterCondition::In {
				field: self.fields.candidate_id.clone(),
				values: request.candidate_ids.iter().map(|id| Value::from(id.as_str())).collect(),
			});
		}

		conditions
	}

	/// Filter passed to the vector store: request restrictions, then query minimums, then the
	/// technology filter, joined with AND.
	pub fn build_retrieval_filter(
		&self,
		parsed: &ParsedQuery,
		request: &RequestFilters,
	) -> Option<FilterCondition> {
		let mut conditions = self.build_request_filters(request);

		conditions.extend(self.build_candidate_filters(parsed));
		conditions.extend(self.build_technology_filters(parsed));

		FilterCondition::conjunction(conditions)
	}

	/// Authoritative in-memory re-check after aggregation; the store-side filter is only a hint.
	pub fn filter_aggregated_candidates(
		&self,
		candidates: Vec<AggregatedCandidate>,
		parsed: &ParsedQuery,
	) -> Vec<AggregatedCandidate> {
		let request = RequestFilters::default();

		candidates
			.into_iter()
			.filter(|candidate| self.check(candidate, parsed, &request).is_ok())
			.collect()
	}

	/// Re-checks the query minimums and the caller's restrictions, counting why candidates drop.
	pub fn filter_with_report(
		&self,
		candidates: Vec<AggregatedCandidate>,
		parsed: &ParsedQuery,
		request: &RequestFilters,
	) -> (Vec<AggregatedCandidate>, FilterReport) {
		let pre = candidates.len();
		let mut kept = Vec::with_capacity(pre);
		let mut dropped_reason_counts: HashMap<String, usize> = HashMap::new();

		for candidate in candidates {
			match self.check(&candidate, parsed, request) {
				Ok(()) => kept.push(candidate),
				Err(reason) => *dropped_reason_counts.entry(reason).or_insert(0) += 1,
			}
		}

		let mut top_drop_reasons: Vec<_> = dropped_reason_counts
			.into_iter()
			.map(|(reason, count)| DropReason { reason, count })
			.collect();

		top_drop_reasons.sort_by(|a, b| match b.count.cmp(&a.count) {
			Ordering::Equal => a.reason.cmp(&b.reason),
			other => other,
		});
		top_drop_reasons.truncate(MAX_DROP_REASONS);

		let post = kept.len();
		let report = FilterReport {
			candidate_count_pre: pre,
			candidate_count_post: post,
			dropped_total: pre.saturating_sub(post),
			top_drop_reasons,
		};

		tracing::debug!(
			pre = report.candidate_count_pre,
			post = report.candidate_count_post,
			reasons = ?report.top_drop_reasons,
			"Filtered aggregated candidates."
		);

		(kept, report)
	}

	fn check(
		&self,
		candidate: &AggregatedCandidate,
		parsed: &ParsedQuery,
		request: &RequestFilters,
	) -> Result<(), String> {
		self.check_request(candidate, request)?;

		if let Some(min_level) = parsed.min_seniority_level {
			let field = &self.fields.seniority_level;
			let level = candidate
				.metadata_str(field)
				.and_then(SeniorityLevel::from_label)
				.ok_or_else(|| format!("{field}:missing"))?;

			if level < min_level {
				return Err(format!("{field}:below_minimum"));
			}
		}
		if let Some(min_years) = parsed.min_years_experience {
			let field = &self.fields.years_experience;
			let years = candidate
				.metadata
				.get(field)
				.and_then(crate::coerce_years)
				.ok_or_else(|| format!("{field}:missing"))?;

			if years < i64::from(min_years) {
				return Err(format!("{field}:below_minimum"));
			}
		}

		Ok(())
	}

	fn check_request(
		&self,
		candidate: &AggregatedCandidate,
		request: &RequestFilters,
	) -> Result<(), String> {
		if !request.candidate_ids.is_empty()
			&& !request.candidate_ids.iter().any(|id| *id == candidate.candidate_id)
		{
			return Err(format!("{}:not_requested", self.fields.candidate_id));
		}
		if let Some(prepared) = request.prepared {
			let field = &self.fields.prepared;
			let actual = candidate
				.metadata
				.get(field)
				.and_then(Value::as_bool)
				.ok_or_else(|| format!("{field}:missing"))?;

			if actual != prepared {
				return Err(format!("{field}:mismatch"));
			}
		}
		if let Some(min_level) = request_english_min(request) {
			let field = &self.fields.english_level_num;
			let level = candidate
				.metadata
				.get(field)
				.and_then(numeric_value)
				.ok_or_else(|| format!("{field}:missing"))?;

			if level < min_level as f64 {
				return Err(format!("{field}:below_minimum"));
			}
		}

		Ok(())
	}
}

/// Numeric English minimum; levels that map to 0 impose no restriction.
fn request_english_min(request: &RequestFilters) -> Option<i64> {
	request.english_min.as_deref().map(indexing::english_level_num).filter(|level| *level > 0)
}

fn numeric_value(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64(),
		Value::String(raw) => raw.trim().parse::<f64>().ok().filter(|number| number.is_finite()),
		_ => None,
	}
}

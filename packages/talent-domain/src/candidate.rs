use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

pub const UNKNOWN_CANDIDATE_ID: &str = "unknown";

/// One retrieved document with its similarity score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchHit {
	pub document: String,
	pub metadata: Map<String, Value>,
	pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregatedCandidate {
	pub candidate_id: String,
	pub documents: Vec<String>,
	/// Union of every hit's metadata; a later hit overwrites earlier values for the same key.
	pub metadata: Map<String, Value>,
	pub max_score: f64,
	pub all_scores: Vec<f64>,
}
impl AggregatedCandidate {
	fn new(candidate_id: String) -> Self {
		Self {
			candidate_id,
			documents: Vec::new(),
			metadata: Map::new(),
			max_score: 0.0,
			all_scores: Vec::new(),
		}
	}

	fn absorb(&mut self, hit: SearchHit) {
		self.documents.push(hit.document);
		self.metadata.extend(hit.metadata);
		self.all_scores.push(hit.score);
		self.max_score = self.all_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
	}

	pub fn metadata_str(&self, key: &str) -> Option<&str> {
		self.metadata.get(key).and_then(Value::as_str)
	}

	/// Display name, falling back to the id when the profile has none.
	pub fn fullname(&self, key: &str) -> &str {
		self.metadata_str(key).filter(|name| !name.trim().is_empty()).unwrap_or(&self.candidate_id)
	}
}

/// Groups hits by candidate, preserving the order in which candidates were first seen.
#[derive(Clone, Debug)]
pub struct CandidateAggregator {
	id_field: String,
}
impl CandidateAggregator {
	pub fn new(id_field: impl Into<String>) -> Self {
		Self { id_field: id_field.into() }
	}

	pub fn aggregate(&self, hits: Vec<SearchHit>) -> Vec<AggregatedCandidate> {
		let mut candidates: Vec<AggregatedCandidate> = Vec::new();
		let mut index: HashMap<String, usize> = HashMap::new();

		for hit in hits {
			let candidate_id = candidate_id_of(&hit.metadata, &self.id_field);
			let slot = *index.entry(candidate_id.clone()).or_insert_with(|| {
				candidates.push(AggregatedCandidate::new(candidate_id));

				candidates.len() - 1
			});

			candidates[slot].absorb(hit);
		}

		candidates
	}
}

fn candidate_id_of(metadata: &Map<String, Value>, field: &str) -> String {
	match metadata.get(field) {
		Some(Value::String(id)) => id.clone(),
		Some(Value::Number(id)) => id.to_string(),
		_ => UNKNOWN_CANDIDATE_ID.to_string(),
	}
}

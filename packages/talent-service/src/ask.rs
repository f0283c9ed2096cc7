//! Question answering over the candidate index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use talent_domain::{
	filter::{FilterCondition, RequestFilters},
	ranking::RankedCandidate,
};
use talent_providers::{chat, json_output, prompt::render_template};

use crate::{Error, Result, TalentService};

pub const NO_CANDIDATES_ANSWER: &str = "No candidates found matching the specified criteria.";

const UNKNOWN_SECTION: &str = "unknown";
const CONTENT_SUFFIX: &str = "...";
const CONTEXT_SEPARATOR: &str = "\n\n";
const JSON_CORRECTION: &str = "Your previous response was not valid JSON. Respond ONLY with the valid \
JSON object. No markdown, no explanation.";

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
	pub question: String,
	#[serde(default)]
	pub filters: Option<RequestFilters>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
	pub answer: String,
	pub sources: Vec<ChatSource>,
	pub metadata: Map<String, Value>,
}
impl ChatResponse {
	fn no_candidates() -> Self {
		Self { answer: NO_CANDIDATES_ANSWER.to_string(), sources: Vec::new(), metadata: Map::new() }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatSource {
	pub candidate_id: String,
	pub section: String,
	pub content: String,
	pub score: f64,
}

#[derive(Debug, Deserialize)]
struct Justification {
	justification: String,
}

impl TalentService {
	pub async fn ask(&self, req: ChatRequest) -> Result<ChatResponse> {
		let question = req.question.trim();

		if question.is_empty() {
			return Err(Error::InvalidField {
				field: "question".to_string(),
				message: "question must be non-empty.".to_string(),
			});
		}

		let parsed = self.parser.parse(question);

		tracing::info!(
			intent = parsed.query_intent.as_str(),
			technologies = ?parsed.required_technologies,
			min_seniority = ?parsed.min_seniority_level,
			min_years = ?parsed.min_years_experience,
			"Parsed question."
		);

		let vector = self
			.embed_checked(&[question.to_string()])
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			})?;
		let request_filters = req.filters.unwrap_or_default();
		let filter = self.filters.build_retrieval_filter(&parsed, &request_filters);
		let hits = self.store.search(&vector, self.cfg.retrieval.limit, filter.as_ref()).await?;

		tracing::info!(
			hits = hits.len(),
			filter = ?filter.as_ref().map(FilterCondition::to_value),
			"Retrieved documents."
		);

		if hits.is_empty() {
			return Ok(ChatResponse::no_candidates());
		}

		let (candidates, report) = self.filters.filter_with_report(
			self.aggregator.aggregate(hits),
			&parsed,
			&request_filters,
		);

		tracing::info!(
			pre = report.candidate_count_pre,
			post = report.candidate_count_post,
			dropped = report.dropped_total,
			reasons = ?report.top_drop_reasons,
			"Applied candidate post-filter."
		);

		if candidates.is_empty() {
			return Ok(ChatResponse::no_candidates());
		}

		let ranked = self.ranker.rank(candidates, &parsed);
		let context = self.build_context(&ranked);
		let sources = self.build_sources(&ranked);
		let justification = self.justify(question, &context).await?;
		let fullname_field = &self.cfg.metadata.fullname;
		let top = &ranked[0].candidate;
		let fullname = top.fullname(fullname_field);
		let answer = format!(
			"Selected Candidate: {fullname} (ID: {}, Rank: 1)\n\nJustification: {justification}",
			top.candidate_id
		);
		let ranking: Vec<Value> = ranked
			.iter()
			.enumerate()
			.map(|(idx, entry)| {
				json!({
					"rank": idx + 1,
					"candidate_id": entry.candidate.candidate_id,
					"fullname": entry.candidate.fullname(fullname_field),
					"technical_score": entry.technical_score,
					"seniority_score": entry.seniority_score,
					"leadership_score": entry.leadership_score,
					"experience_score": entry.experience_score,
					"total_score": entry.total_score,
				})
			})
			.collect();
		let mut metadata = Map::new();

		metadata.insert(
			"selected_candidate".to_string(),
			json!({ "fullname": fullname, "candidate_id": top.candidate_id, "rank": 1 }),
		);
		metadata.insert("justification".to_string(), Value::String(justification));
		metadata.insert("query".to_string(), json!(parsed));
		metadata.insert("ranking".to_string(), Value::Array(ranking));
		metadata.insert("filter_report".to_string(), json!(report));

		Ok(ChatResponse { answer, sources, metadata })
	}

	fn build_context(&self, ranked: &[RankedCandidate]) -> String {
		let mut parts = Vec::new();

		for (idx, entry) in ranked.iter().enumerate() {
			let candidate = &entry.candidate;

			parts.push(format!(
				"=== CANDIDATE #{}: {} (ID: {}) ===",
				idx + 1,
				candidate.fullname(&self.cfg.metadata.fullname),
				candidate.candidate_id
			));
			parts.extend(candidate.documents.iter().cloned());
			parts.push(String::new());
		}

		parts.join(CONTEXT_SEPARATOR)
	}

	fn build_sources(&self, ranked: &[RankedCandidate]) -> Vec<ChatSource> {
		let limit = self.cfg.retrieval.content_preview_chars;
		let mut sources = Vec::new();

		for entry in ranked {
			let candidate = &entry.candidate;
			let section =
				candidate.metadata_str(&self.cfg.metadata.doc_type).unwrap_or(UNKNOWN_SECTION);

			for (idx, document) in candidate.documents.iter().enumerate() {
				sources.push(ChatSource {
					candidate_id: candidate.candidate_id.clone(),
					section: section.to_string(),
					content: preview(document, limit),
					score: candidate.all_scores.get(idx).copied().unwrap_or(0.0),
				});
			}
		}

		sources
	}

	/// Asks the chat model for a JSON justification, feeding parse failures back as corrections.
	async fn justify(&self, question: &str, context: &str) -> Result<String> {
		let prompts = &self.cfg.prompts;
		let attempts = self.cfg.retrieval.structured_max_attempts.max(1);
		let mut messages = vec![
			chat::message("system", prompts.system.as_str()),
			chat::message("system", format!("Candidate profiles:{CONTEXT_SEPARATOR}{context}")),
			chat::message(
				"user",
				render_template(&prompts.human, &[("context", context), ("input", question)]),
			),
		];
		let mut last_error = String::new();

		for attempt in 1..=attempts {
			let raw = self.providers.chat.complete(&self.cfg.providers.llm, &messages).await?;

			match json_output::parse_structured::<Justification>(&raw) {
				Ok(parsed) => return Ok(parsed.justification),
				Err(err) => {
					tracing::warn!(
						attempt,
						max_attempts = attempts,
						error = %err,
						"Justification was not valid JSON."
					);

					last_error = err.to_string();

					messages.push(chat::message("assistant", raw));
					messages.push(chat::message("user", JSON_CORRECTION));
				},
			}
		}

		Err(Error::Provider {
			message: format!(
				"Justification was not valid JSON after {attempts} attempts: {last_error}"
			),
		})
	}
}

fn preview(document: &str, limit: usize) -> String {
	match document.char_indices().nth(limit) {
		Some((cut, _)) => format!("{}{CONTENT_SUFFIX}", &document[..cut]),
		None => document.to_string(),
	}
}

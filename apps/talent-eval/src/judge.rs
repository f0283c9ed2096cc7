//! Pairwise answer judges and multi-run aggregation.

use std::time::Duration;

use color_eyre::eyre;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use talent_config::Scoring;
use talent_providers::{auth_headers, json_output, prompt::render_template};

pub const DEFAULT_TEMPLATE: &str = "You are comparing two recruiting assistants that answered the \
same question about job candidates.

Question:
{question}

Expected criteria:
{expected_criteria}

Response A (dotnet):
{dotnet_response}

Response B (python):
{python_response}

Score each response from 0 to 10 for relevance, correctness, clarity and how actionable the \
recommendation is. Reply with a JSON object:
{\"dotnet_score\": <number>, \"python_score\": <number>, \"winner\": \"dotnet\" | \"python\" | \"tie\", \
\"comment\": \"<one or two sentences>\"}";

const STRICT_SYSTEM_PROMPT: &str =
	"You are a strict evaluator. Respond ONLY valid JSON matching the schema.";
const OLLAMA_SUFFIX: &str = "\n\nRespond ONLY with a valid JSON object.";
const HEURISTIC_COMMENT: &str = "Heuristic baseline judge used (no external LLM).";
const ACTIONABLE_KEYWORDS: [&str; 5] = ["recommend", "next step", "should", "interview", "hire"];
const RANKING_KEYWORDS: [&str; 6] = ["rank", "ranking", "top", "1.", "2.", "3."];
const CLARITY_MARKERS: [&str; 5] = ["\n- ", "\n* ", "1.", "2.", "3."];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
	Dotnet,
	Python,
	Tie,
}
impl Winner {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Dotnet => "dotnet",
			Self::Python => "python",
			Self::Tie => "tie",
		}
	}
}

/// Scores within `tolerance` of each other are a tie.
pub fn determine_winner(dotnet_score: f64, python_score: f64, tolerance: f64) -> Winner {
	if (dotnet_score - python_score).abs() <= tolerance {
		Winner::Tie
	} else if dotnet_score > python_score {
		Winner::Dotnet
	} else {
		Winner::Python
	}
}

/// One judge run. A model-supplied winner is ignored; it is recomputed from the scores.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Verdict {
	pub dotnet_score: f64,
	pub python_score: f64,
	#[serde(default)]
	pub comment: String,
}

#[derive(Clone, Copy, Debug)]
pub struct JudgeInput<'a> {
	pub question: &'a str,
	pub dotnet_response: &'a str,
	pub python_response: &'a str,
	pub expected_criteria: &'a [String],
}

#[derive(Clone, Debug)]
enum Backend {
	OpenAi { api_key: String, api_base: String, model: String },
	Ollama { host: String, model: String },
	Heuristic,
}

#[derive(Clone, Debug)]
pub struct Judge {
	backend: Backend,
	client: Client,
	temperature: f32,
	template: String,
	tie_tolerance: f64,
}
impl Judge {
	/// `openai` needs an API key and otherwise falls back to the heuristic judge, as does any
	/// provider other than `ollama`.
	pub fn from_config(
		cfg: &talent_config::Judge,
		scoring: &Scoring,
		template: String,
	) -> color_eyre::Result<Self> {
		let openai_key =
			cfg.openai.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty());
		let (backend, timeout_ms, tie_tolerance) = match (cfg.provider.as_str(), openai_key) {
			("openai", Some(api_key)) => (
				Backend::OpenAi {
					api_key: api_key.to_string(),
					api_base: cfg.openai.api_base.clone(),
					model: cfg.openai.model.clone(),
				},
				cfg.openai.timeout_ms,
				scoring.tie_tolerance,
			),
			("ollama", _) => (
				Backend::Ollama { host: cfg.ollama.host.clone(), model: cfg.ollama.model.clone() },
				cfg.ollama.timeout_ms,
				scoring.tie_tolerance,
			),
			_ => (Backend::Heuristic, cfg.ollama.timeout_ms, scoring.heuristic_tie_tolerance),
		};
		let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;

		Ok(Self { backend, client, temperature: cfg.temperature, template, tie_tolerance })
	}

	pub fn name(&self) -> &'static str {
		match self.backend {
			Backend::OpenAi { .. } => "openai",
			Backend::Ollama { .. } => "ollama",
			Backend::Heuristic => "heuristic",
		}
	}

	pub fn tie_tolerance(&self) -> f64 {
		self.tie_tolerance
	}

	/// The heuristic judge is deterministic, so repeating it adds nothing.
	pub fn effective_runs(&self, configured: u32) -> u32 {
		match self.backend {
			Backend::Heuristic => 1,
			_ => configured.max(1),
		}
	}

	/// Success threshold for one prompt, capped at the number of runs this judge actually makes.
	pub fn effective_min_successful_runs(
		&self,
		configured_runs: u32,
		min_successful_runs: u32,
	) -> u32 {
		min_successful_runs.min(self.effective_runs(configured_runs))
	}

	pub async fn evaluate(&self, input: &JudgeInput<'_>) -> color_eyre::Result<Verdict> {
		let verdict = match &self.backend {
			Backend::OpenAi { api_key, api_base, model } =>
				self.evaluate_openai(input, api_key, api_base, model).await?,
			Backend::Ollama { host, model } => self.evaluate_ollama(input, host, model).await?,
			Backend::Heuristic => heuristic_verdict(input),
		};

		if !verdict.dotnet_score.is_finite() || !verdict.python_score.is_finite() {
			return Err(eyre::eyre!("Judge returned a non-finite score."));
		}

		Ok(Verdict {
			dotnet_score: verdict.dotnet_score.clamp(0.0, 10.0),
			python_score: verdict.python_score.clamp(0.0, 10.0),
			comment: verdict.comment,
		})
	}

	fn prompt(&self, input: &JudgeInput<'_>) -> String {
		let criteria = input
			.expected_criteria
			.iter()
			.map(|criterion| format!("- {criterion}"))
			.collect::<Vec<_>>()
			.join("\n");

		render_template(
			&self.template,
			&[
				("question", input.question),
				("expected_criteria", criteria.as_str()),
				("dotnet_response", input.dotnet_response),
				("python_response", input.python_response),
			],
		)
	}

	async fn evaluate_openai(
		&self,
		input: &JudgeInput<'_>,
		api_key: &str,
		api_base: &str,
		model: &str,
	) -> color_eyre::Result<Verdict> {
		let body = serde_json::json!({
			"model": model,
			"temperature": self.temperature,
			"response_format": { "type": "json_object" },
			"messages": [
				{ "role": "system", "content": STRICT_SYSTEM_PROMPT },
				{ "role": "user", "content": self.prompt(input) },
			],
		});
		let json: Value = self
			.client
			.post(format!("{api_base}/chat/completions"))
			.headers(auth_headers(api_key, &Map::new())?)
			.json(&body)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		let content = json
			.get("choices")
			.and_then(|choices| choices.get(0))
			.and_then(|choice| choice.get("message"))
			.and_then(|message| message.get("content"))
			.and_then(Value::as_str)
			.ok_or_else(|| eyre::eyre!("OpenAI judge response is missing message content."))?;

		Ok(json_output::parse_structured(content)?)
	}

	async fn evaluate_ollama(
		&self,
		input: &JudgeInput<'_>,
		host: &str,
		model: &str,
	) -> color_eyre::Result<Verdict> {
		let body = serde_json::json!({
			"model": model,
			"prompt": format!("{}{OLLAMA_SUFFIX}", self.prompt(input)),
			"stream": false,
			"options": { "temperature": self.temperature },
		});
		let json: Value = self
			.client
			.post(format!("{host}/api/generate"))
			.json(&body)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		let text = json.get("response").and_then(Value::as_str).unwrap_or_default();

		Ok(json_output::parse_structured(text)?)
	}
}

fn heuristic_verdict(input: &JudgeInput<'_>) -> Verdict {
	Verdict {
		dotnet_score: heuristic_score(input.dotnet_response, input.expected_criteria),
		python_score: heuristic_score(input.python_response, input.expected_criteria),
		comment: HEURISTIC_COMMENT.to_string(),
	}
}

/// Keyword and shape based score in `[0, 10]`, rounded to two decimals. Empty or failed answers
/// score 1.
pub fn heuristic_score(response: &str, criteria: &[String]) -> f64 {
	let text = response.to_lowercase();

	if text.is_empty() || text.starts_with("error:") {
		return 1.0;
	}

	let coverage = if criteria.is_empty() {
		0.0
	} else {
		let hits =
			criteria.iter().filter(|criterion| text.contains(&criterion.to_lowercase())).count();

		hits as f64 / criteria.len() as f64
	};
	let length = match response.chars().count() {
		n if n > 800 => 1.0,
		n if n > 300 => 0.7,
		n if n > 120 => 0.4,
		_ => 0.1,
	};
	let clarity = if CLARITY_MARKERS.iter().any(|marker| text.contains(marker)) {
		0.8
	} else if text.contains("\n\n") {
		0.5
	} else {
		0.2
	};
	let keyword_score =
		|keywords: &[&str]| if keywords.iter().any(|keyword| text.contains(keyword)) { 1.0 } else { 0.2 };
	let raw = 3.5 * coverage
		+ 2.5 * length
		+ 1.5 * clarity
		+ 1.25 * keyword_score(&ACTIONABLE_KEYWORDS)
		+ 1.25 * keyword_score(&RANKING_KEYWORDS);

	round2(raw.clamp(0.0, 10.0))
}

/// Combined outcome of every judge run for one prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
	pub dotnet_score: f64,
	pub python_score: f64,
	pub winner: Winner,
	pub comment: String,
	pub runs_attempted: u32,
	pub runs_succeeded: u32,
	pub dotnet_score_stdev: f64,
	pub python_score_stdev: f64,
	/// Share of successful runs whose winner matches the majority winner.
	pub agreement: f64,
}

/// Averages successful runs. With fewer than `min_successful_runs` successes the prompt is scored
/// 0/0 as a tie and the comment names the last failure.
pub fn aggregate_runs(
	outcomes: Vec<Result<Verdict, String>>,
	min_successful_runs: u32,
	tolerance: f64,
) -> RunSummary {
	let runs_attempted = outcomes.len() as u32;
	let mut verdicts = Vec::new();
	let mut last_failure = None;

	for outcome in outcomes {
		match outcome {
			Ok(verdict) => verdicts.push(verdict),
			Err(err) => last_failure = Some(err),
		}
	}

	let runs_succeeded = verdicts.len() as u32;

	if verdicts.is_empty() || runs_succeeded < min_successful_runs {
		let reason = last_failure.unwrap_or_else(|| "no judge runs".to_string());

		return RunSummary {
			dotnet_score: 0.0,
			python_score: 0.0,
			winner: Winner::Tie,
			comment: format!(
				"Judge failed: {runs_succeeded} of {runs_attempted} runs succeeded, \
{min_successful_runs} required. Last error: {reason}"
			),
			runs_attempted,
			runs_succeeded,
			dotnet_score_stdev: 0.0,
			python_score_stdev: 0.0,
			agreement: 0.0,
		};
	}

	let dotnet: Vec<f64> = verdicts.iter().map(|verdict| verdict.dotnet_score).collect();
	let python: Vec<f64> = verdicts.iter().map(|verdict| verdict.python_score).collect();
	let dotnet_score = mean(&dotnet);
	let python_score = mean(&python);
	let winner = determine_winner(dotnet_score, python_score, tolerance);
	let run_winners: Vec<Winner> = verdicts
		.iter()
		.map(|verdict| determine_winner(verdict.dotnet_score, verdict.python_score, tolerance))
		.collect();
	let majority = majority_winner(&run_winners, winner);
	let agreeing = run_winners.iter().filter(|run| **run == majority).count();
	let comment = verdicts
		.iter()
		.map(|verdict| verdict.comment.trim())
		.find(|comment| !comment.is_empty())
		.unwrap_or_default()
		.to_string();

	RunSummary {
		dotnet_score: round2(dotnet_score),
		python_score: round2(python_score),
		winner,
		comment,
		runs_attempted,
		runs_succeeded,
		dotnet_score_stdev: round2(population_stdev(&dotnet, dotnet_score)),
		python_score_stdev: round2(population_stdev(&python, python_score)),
		agreement: round2(agreeing as f64 / run_winners.len() as f64),
	}
}

/// Most frequent winner; a count tie goes to `preferred` when it is among the leaders.
fn majority_winner(run_winners: &[Winner], preferred: Winner) -> Winner {
	let count = |target: Winner| run_winners.iter().filter(|winner| **winner == target).count();
	let best = [Winner::Dotnet, Winner::Python, Winner::Tie].into_iter().map(count).max().unwrap_or(0);

	if count(preferred) == best {
		return preferred;
	}

	[Winner::Dotnet, Winner::Python, Winner::Tie]
		.into_iter()
		.find(|winner| count(*winner) == best)
		.unwrap_or(preferred)
}

fn mean(values: &[f64]) -> f64 {
	values.iter().sum::<f64>() / values.len() as f64
}

fn population_stdev(values: &[f64], mean: f64) -> f64 {
	let variance =
		values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64;

	variance.sqrt()
}

fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
	use super::*;

	fn verdict(dotnet: f64, python: f64) -> Result<Verdict, String> {
		Ok(Verdict { dotnet_score: dotnet, python_score: python, comment: format!("{dotnet}/{python}") })
	}

	#[test]
	fn winner_respects_tolerance() {
		assert_eq!(determine_winner(7.0, 7.01, 0.01), Winner::Tie);
		assert_eq!(determine_winner(7.5, 7.0, 0.25), Winner::Dotnet);
		assert_eq!(determine_winner(6.0, 8.0, 0.25), Winner::Python);
	}

	#[test]
	fn heuristic_scores_failures_as_one() {
		assert_eq!(heuristic_score("", &[]), 1.0);
		assert_eq!(heuristic_score("Error: HTTP 500", &[]), 1.0);
	}

	#[test]
	fn heuristic_combines_signals() {
		let criteria = vec!["Java".to_string(), "Kafka".to_string()];
		let response = "Top pick: Dana, a Java engineer.\n- Ranked first\n- We recommend an interview.";

		// coverage 0.5, length 0.1, clarity 0.8, actionability 1.0, ranking 1.0
		assert_eq!(heuristic_score(response, &criteria), 5.7);
		assert_eq!(heuristic_score("plain answer", &[]), 1.05);
	}

	#[test]
	fn heuristic_judge_runs_once() {
		let judge = Judge::from_config(
			&talent_config::Judge { provider: "heuristic".to_string(), ..Default::default() },
			&Scoring::default(),
			DEFAULT_TEMPLATE.to_string(),
		)
		.expect("Judge must build.");

		assert_eq!(judge.name(), "heuristic");
		assert_eq!(judge.effective_runs(5), 1);
		assert_eq!(judge.tie_tolerance(), 0.25);
	}

	#[test]
	fn openai_without_key_falls_back_to_heuristic() {
		let judge = Judge::from_config(
			&talent_config::Judge { provider: "openai".to_string(), ..Default::default() },
			&Scoring::default(),
			DEFAULT_TEMPLATE.to_string(),
		)
		.expect("Judge must build.");

		assert_eq!(judge.name(), "heuristic");
	}

	#[test]
	fn prompt_lists_criteria_and_keeps_schema_braces() {
		let judge = Judge::from_config(
			&talent_config::Judge::default(),
			&Scoring::default(),
			DEFAULT_TEMPLATE.to_string(),
		)
		.expect("Judge must build.");
		let criteria = vec!["Java".to_string()];
		let prompt = judge.prompt(&JudgeInput {
			question: "Who?",
			dotnet_response: "A {python_response}",
			python_response: "B",
			expected_criteria: &criteria,
		});

		assert_eq!(judge.name(), "ollama");
		assert!(prompt.contains("Question:\nWho?"));
		assert!(prompt.contains("- Java"));
		assert!(prompt.contains("Response A (dotnet):\nA {python_response}"));
		assert!(prompt.contains("{\"dotnet_score\": <number>"));
	}

	#[test]
	fn aggregates_mean_stdev_and_agreement() {
		let summary =
			aggregate_runs(vec![verdict(8.0, 6.0), verdict(6.0, 6.0), verdict(7.0, 3.0)], 1, 0.01);

		assert_eq!(summary.dotnet_score, 7.0);
		assert_eq!(summary.python_score, 5.0);
		assert_eq!(summary.winner, Winner::Dotnet);
		assert_eq!(summary.runs_succeeded, 3);
		assert_eq!(summary.dotnet_score_stdev, 0.82);
		assert_eq!(summary.python_score_stdev, 1.41);
		assert_eq!(summary.agreement, 0.67);
		assert_eq!(summary.comment, "8/6");
	}

	#[test]
	fn failed_runs_below_minimum_score_zero() {
		let summary = aggregate_runs(
			vec![Err("timeout".to_string()), verdict(9.0, 1.0), Err("bad json".to_string())],
			2,
			0.01,
		);

		assert_eq!(summary.winner, Winner::Tie);
		assert_eq!((summary.dotnet_score, summary.python_score), (0.0, 0.0));
		assert_eq!(summary.runs_attempted, 3);
		assert_eq!(summary.runs_succeeded, 1);
		assert!(summary.comment.contains("bad json"));
	}

	#[test]
	fn failed_runs_are_skipped_when_enough_succeed() {
		let summary = aggregate_runs(vec![Err("timeout".to_string()), verdict(4.0, 9.0)], 1, 0.01);

		assert_eq!(summary.winner, Winner::Python);
		assert_eq!(summary.runs_succeeded, 1);
		assert_eq!(summary.agreement, 1.0);
	}
}

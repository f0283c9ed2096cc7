//! A/B evaluator: asks two deployed chatbots the same HR questions and has a judge score them.

pub mod client;
pub mod judge;
pub mod report;

use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use talent_config::EvalConfig;

use crate::{
	client::ChatbotClient,
	judge::{DEFAULT_TEMPLATE, Judge, JudgeInput},
	report::EvaluationResult,
};

#[derive(Debug, Parser)]
#[command(
	version = talent_cli::VERSION,
	rename_all = "kebab",
	styles = talent_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Overrides `dataset.prompts_path`.
	#[arg(long, short = 'p', value_name = "FILE")]
	pub prompts: Option<PathBuf>,
	/// Overrides `dataset.output_dir`.
	#[arg(long, short = 'o', value_name = "DIR")]
	pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PromptFile {
	hr_evaluation_prompts: Vec<EvalPrompt>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EvalPrompt {
	pub id: String,
	pub question: String,
	#[serde(default)]
	pub expected_criteria: Vec<String>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = talent_config::load_eval(&args.config)?;

	init_tracing(&cfg);

	let prompts_path = args.prompts.as_deref().unwrap_or(cfg.dataset.prompts_path.as_path());
	let prompts = load_prompts(prompts_path)?;
	let template = match &cfg.judge.prompt_path {
		Some(path) => fs::read_to_string(path)?,
		None => DEFAULT_TEMPLATE.to_string(),
	};
	let judge = Judge::from_config(&cfg.judge, &cfg.scoring, template)?;
	let dotnet = ChatbotClient::new(&cfg.targets.dotnet_url, cfg.targets.request_timeout_ms)?;
	let python = ChatbotClient::new(&cfg.targets.python_url, cfg.targets.request_timeout_ms)?;

	tracing::info!(
		dotnet = dotnet.base_url(),
		python = python.base_url(),
		judge = judge.name(),
		prompts = prompts.len(),
		"Starting evaluation."
	);

	let mut results = Vec::with_capacity(prompts.len());

	for prompt in &prompts {
		let result = evaluate_prompt(&cfg, &judge, &dotnet, &python, prompt).await;

		tracing::info!(
			prompt = %prompt.id,
			winner = result.summary.winner.as_str(),
			dotnet_score = result.summary.dotnet_score,
			python_score = result.summary.python_score,
			"Evaluated prompt."
		);

		results.push(result);
	}

	let output_dir = args.output_dir.unwrap_or_else(|| cfg.dataset.output_dir.clone());

	report::write_outputs(&output_dir, judge.name(), &results, OffsetDateTime::now_utc())?;

	tracing::info!(output_dir = %output_dir.display(), "Evaluation complete.");

	Ok(())
}

pub fn load_prompts(path: &Path) -> color_eyre::Result<Vec<EvalPrompt>> {
	let raw = fs::read_to_string(path)?;
	let file: PromptFile = serde_json::from_str(&raw)?;

	Ok(file.hr_evaluation_prompts)
}

/// Collects both answers, then runs the judge as many times as configured.
pub async fn evaluate_prompt(
	cfg: &EvalConfig,
	judge: &Judge,
	dotnet: &ChatbotClient,
	python: &ChatbotClient,
	prompt: &EvalPrompt,
) -> EvaluationResult {
	let dotnet_response = dotnet.ask(&prompt.question).await;
	let python_response = python.ask(&prompt.question).await;
	let input = JudgeInput {
		question: &prompt.question,
		dotnet_response: &dotnet_response,
		python_response: &python_response,
		expected_criteria: &prompt.expected_criteria,
	};
	let runs = judge.effective_runs(cfg.judge.runs);
	let mut outcomes = Vec::with_capacity(runs as usize);

	for run in 1..=runs {
		match judge.evaluate(&input).await {
			Ok(verdict) => outcomes.push(Ok(verdict)),
			Err(err) => {
				tracing::warn!(prompt = %prompt.id, run, error = %err, "Judge run failed.");

				outcomes.push(Err(err.to_string()));
			},
		}
	}

	let min_successful_runs =
		judge.effective_min_successful_runs(cfg.judge.runs, cfg.failure_policy.min_successful_runs);
	let summary = judge::aggregate_runs(outcomes, min_successful_runs, judge.tie_tolerance());

	EvaluationResult {
		prompt_id: prompt.id.clone(),
		question: prompt.question.clone(),
		dotnet_response,
		python_response,
		summary,
	}
}

fn init_tracing(cfg: &EvalConfig) {
	let filter = EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

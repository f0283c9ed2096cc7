use std::path::PathBuf;

use serde::Deserialize;

/// Settings for the offline A/B evaluator.
#[derive(Debug, Deserialize)]
pub struct EvalConfig {
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default)]
	pub targets: EvalTargets,
	#[serde(default)]
	pub judge: Judge,
	#[serde(default)]
	pub scoring: Scoring,
	#[serde(default)]
	pub failure_policy: FailurePolicy,
	#[serde(default)]
	pub dataset: Dataset,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EvalTargets {
	pub dotnet_url: String,
	pub python_url: String,
	pub request_timeout_ms: u64,
}
impl Default for EvalTargets {
	fn default() -> Self {
		Self {
			dotnet_url: "http://localhost:5000".to_string(),
			python_url: "http://localhost:8000".to_string(),
			request_timeout_ms: 120_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Judge {
	/// One of openai, ollama, or heuristic.
	pub provider: String,
	pub runs: u32,
	pub temperature: f32,
	/// Optional override for the built-in judge prompt template.
	pub prompt_path: Option<PathBuf>,
	pub openai: OpenAiJudge,
	pub ollama: OllamaJudge,
}
impl Default for Judge {
	fn default() -> Self {
		Self {
			provider: "ollama".to_string(),
			runs: 3,
			temperature: 0.0,
			prompt_path: None,
			openai: OpenAiJudge::default(),
			ollama: OllamaJudge::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OpenAiJudge {
	/// Falls back to `OPENAI_API_KEY` when unset.
	pub api_key: Option<String>,
	pub api_base: String,
	pub model: String,
	pub timeout_ms: u64,
}
impl Default for OpenAiJudge {
	fn default() -> Self {
		Self {
			api_key: None,
			api_base: "https://api.openai.com/v1".to_string(),
			model: "gpt-4o-mini".to_string(),
			timeout_ms: 60_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OllamaJudge {
	pub host: String,
	pub model: String,
	pub timeout_ms: u64,
}
impl Default for OllamaJudge {
	fn default() -> Self {
		Self {
			host: "http://localhost:11434".to_string(),
			model: "llama3.1:8b".to_string(),
			timeout_ms: 120_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scoring {
	/// Score difference treated as a tie for LLM judges.
	pub tie_tolerance: f64,
	/// Wider tie band for the heuristic judge, whose scores are coarse.
	pub heuristic_tie_tolerance: f64,
}
impl Default for Scoring {
	fn default() -> Self {
		Self { tie_tolerance: 0.01, heuristic_tie_tolerance: 0.25 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FailurePolicy {
	pub min_successful_runs: u32,
}
impl Default for FailurePolicy {
	fn default() -> Self {
		Self { min_successful_runs: 1 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dataset {
	pub prompts_path: PathBuf,
	pub output_dir: PathBuf,
}
impl Default for Dataset {
	fn default() -> Self {
		Self {
			prompts_path: PathBuf::from("prompts/hr_evaluation_prompts.json"),
			output_dir: PathBuf::from("results"),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

use std::{fs, path::Path};

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::judge::{RunSummary, Winner};

pub const REPORT_FILE: &str = "evaluation_report.md";
pub const RESULTS_FILE: &str = "evaluation_results.json";

#[derive(Clone, Debug, Serialize)]
pub struct EvaluationResult {
	pub prompt_id: String,
	pub question: String,
	pub dotnet_response: String,
	pub python_response: String,
	#[serde(flatten)]
	pub summary: RunSummary,
}

#[derive(Debug, Serialize)]
struct ResultsFile<'a> {
	generated_at: String,
	judge: &'a str,
	results: &'a [EvaluationResult],
}

pub fn render_markdown(results: &[EvaluationResult], judge: &str) -> String {
	let total = results.len();
	let wins = |winner: Winner| results.iter().filter(|result| result.summary.winner == winner).count();
	let share = |count: usize| if total == 0 { 0.0 } else { count as f64 / total as f64 * 100.0 };
	let average = |score: fn(&RunSummary) -> f64| {
		if total == 0 {
			0.0
		} else {
			results.iter().map(|result| score(&result.summary)).sum::<f64>() / total as f64
		}
	};
	let (dotnet_wins, python_wins, ties) = (wins(Winner::Dotnet), wins(Winner::Python), wins(Winner::Tie));
	let mut out = String::from("# LLM-as-a-Judge Evaluation Report\n\n## Summary\n");

	out.push_str(&format!("- Judge: {judge}\n"));
	out.push_str(&format!("- Total prompts evaluated: {total}\n"));
	out.push_str(&format!("- .NET wins: {dotnet_wins} ({:.1}%)\n", share(dotnet_wins)));
	out.push_str(&format!("- Python wins: {python_wins} ({:.1}%)\n", share(python_wins)));
	out.push_str(&format!("- Ties: {ties} ({:.1}%)\n\n", share(ties)));
	out.push_str("## Average Scores\n");
	out.push_str(&format!("- .NET: {:.2}/10\n", average(|summary| summary.dotnet_score)));
	out.push_str(&format!("- Python: {:.2}/10\n\n", average(|summary| summary.python_score)));
	out.push_str("## Detailed Results\n");

	for result in results {
		let summary = &result.summary;

		out.push_str(&format!("\n### {}\n", result.prompt_id));
		out.push_str(&format!("**Question:** {}\n\n", result.question));
		out.push_str("**Scores:**\n");
		out.push_str(&format!(
			"- .NET: {}/10 (stdev {})\n",
			summary.dotnet_score, summary.dotnet_score_stdev
		));
		out.push_str(&format!(
			"- Python: {}/10 (stdev {})\n",
			summary.python_score, summary.python_score_stdev
		));
		out.push_str(&format!("- **Winner:** {}\n", summary.winner.as_str().to_uppercase()));
		out.push_str(&format!(
			"- Runs: {}/{} succeeded, agreement {:.0}%\n\n",
			summary.runs_succeeded,
			summary.runs_attempted,
			summary.agreement * 100.0
		));
		out.push_str(&format!("**Judge Comment:** {}\n\n---\n", summary.comment));
	}

	out
}

/// Writes the markdown report and the JSON results into `output_dir`, creating it if needed.
pub fn write_outputs(
	output_dir: &Path,
	judge: &str,
	results: &[EvaluationResult],
	generated_at: OffsetDateTime,
) -> color_eyre::Result<()> {
	fs::create_dir_all(output_dir)?;
	fs::write(output_dir.join(REPORT_FILE), render_markdown(results, judge))?;

	let file = ResultsFile { generated_at: generated_at.format(&Rfc3339)?, judge, results };

	fs::write(output_dir.join(RESULTS_FILE), serde_json::to_string_pretty(&file)?)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn result(id: &str, dotnet: f64, python: f64, winner: Winner) -> EvaluationResult {
		EvaluationResult {
			prompt_id: id.to_string(),
			question: format!("question {id}"),
			dotnet_response: "a".to_string(),
			python_response: "b".to_string(),
			summary: RunSummary {
				dotnet_score: dotnet,
				python_score: python,
				winner,
				comment: "ok".to_string(),
				runs_attempted: 1,
				runs_succeeded: 1,
				dotnet_score_stdev: 0.0,
				python_score_stdev: 0.0,
				agreement: 1.0,
			},
		}
	}

	#[test]
	fn summary_counts_wins_and_averages() {
		let markdown = render_markdown(
			&[
				result("p1", 8.0, 6.0, Winner::Dotnet),
				result("p2", 5.0, 7.0, Winner::Python),
				result("p3", 6.0, 6.0, Winner::Tie),
				result("p4", 9.0, 4.0, Winner::Dotnet),
			],
			"heuristic",
		);

		assert!(markdown.starts_with("# LLM-as-a-Judge Evaluation Report\n"));
		assert!(markdown.contains("- Total prompts evaluated: 4\n"));
		assert!(markdown.contains("- .NET wins: 2 (50.0%)\n"));
		assert!(markdown.contains("- Ties: 1 (25.0%)\n"));
		assert!(markdown.contains("- .NET: 7.00/10\n"));
		assert!(markdown.contains("- Python: 5.75/10\n"));
		assert!(markdown.contains("### p2\n**Question:** question p2"));
		assert!(markdown.contains("- **Winner:** PYTHON\n"));
	}

	#[test]
	fn empty_results_do_not_divide_by_zero() {
		let markdown = render_markdown(&[], "ollama");

		assert!(markdown.contains("- .NET wins: 0 (0.0%)\n"));
		assert!(markdown.contains("- Python: 0.00/10\n"));
	}

	#[test]
	fn results_json_is_flat_with_timestamp() {
		let dir = std::env::temp_dir().join(format!("talent-eval-report-{}", std::process::id()));
		let generated_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Valid timestamp.");

		write_outputs(&dir, "heuristic", &[result("p1", 8.0, 6.0, Winner::Dotnet)], generated_at)
			.expect("Outputs must be written.");

		let raw = fs::read_to_string(dir.join(RESULTS_FILE)).expect("Results file must exist.");
		let json: serde_json::Value = serde_json::from_str(&raw).expect("Results must be JSON.");

		assert!(dir.join(REPORT_FILE).is_file());
		fs::remove_dir_all(&dir).expect("Temp dir must be removable.");

		assert_eq!(json["generated_at"], serde_json::json!("2023-11-14T22:13:20Z"));
		assert_eq!(json["results"][0]["winner"], serde_json::json!("dotnet"));
		assert_eq!(json["results"][0]["dotnet_score"], serde_json::json!(8.0));
		assert_eq!(json["results"][0]["prompt_id"], serde_json::json!("p1"));
	}
}

use std::{fs, net::SocketAddr};

use axum::{Json, Router, http::StatusCode, routing::post};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use talent_config::{EvalConfig, FailurePolicy, Judge as JudgeConfig, Scoring};
use talent_eval::{
	EvalPrompt,
	client::ChatbotClient,
	evaluate_prompt,
	judge::{DEFAULT_TEMPLATE, Judge, Winner},
	load_prompts,
};

async fn spawn(app: Router) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener.");
	let addr = listener.local_addr().expect("Listener must have an address.");

	tokio::spawn(async move {
		axum::serve(listener, app).await.expect("Test server failed.");
	});

	addr
}

fn heuristic_config() -> EvalConfig {
	EvalConfig {
		log_level: "info".to_string(),
		targets: Default::default(),
		judge: JudgeConfig { provider: "heuristic".to_string(), ..Default::default() },
		scoring: Scoring::default(),
		failure_policy: Default::default(),
		dataset: Default::default(),
	}
}

#[tokio::test]
async fn client_reads_answer_and_reports_http_errors() {
	let ok = spawn(Router::new().route(
		"/chat",
		post(|Json(body): Json<Value>| async move {
			Json(json!({ "answer": format!("You asked: {}", body["question"].as_str().unwrap_or_default()) }))
		}),
	))
	.await;
	let failing =
		spawn(Router::new().route("/chat", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))).await;
	let ok_client = ChatbotClient::new(&format!("http://{ok}/"), 5_000).expect("Client must build.");
	let failing_client =
		ChatbotClient::new(&format!("http://{failing}"), 5_000).expect("Client must build.");

	assert_eq!(ok_client.base_url(), format!("http://{ok}"));
	assert_eq!(ok_client.ask("who?").await, "You asked: who?");
	assert_eq!(failing_client.ask("who?").await, "Error: HTTP 500");
}

#[tokio::test]
async fn heuristic_evaluation_prefers_the_working_bot() {
	let answer = "Top candidates, ranked:\n1. Dana Smith, Senior Java engineer with Kafka.\n2. Lee Park.\n\nWe recommend an interview with Dana as the next step.";
	let dotnet = spawn(Router::new().route(
		"/chat",
		post(move || async move { Json(json!({ "answer": answer })) }),
	))
	.await;
	let python =
		spawn(Router::new().route("/chat", post(|| async { StatusCode::BAD_GATEWAY }))).await;
	let cfg = heuristic_config();
	let judge = Judge::from_config(&cfg.judge, &cfg.scoring, DEFAULT_TEMPLATE.to_string())
		.expect("Judge must build.");
	let prompt = EvalPrompt {
		id: "hr-01".to_string(),
		question: "Best senior Java engineer?".to_string(),
		expected_criteria: vec!["Java".to_string(), "Kafka".to_string()],
	};
	let result = evaluate_prompt(
		&cfg,
		&judge,
		&ChatbotClient::new(&format!("http://{dotnet}"), 5_000).expect("Client must build."),
		&ChatbotClient::new(&format!("http://{python}"), 5_000).expect("Client must build."),
		&prompt,
	)
	.await;

	assert_eq!(result.python_response, "Error: HTTP 502");
	assert_eq!(result.summary.python_score, 1.0);
	assert!(result.summary.dotnet_score > 5.0);
	assert_eq!(result.summary.winner, Winner::Dotnet);
	assert_eq!(result.summary.runs_attempted, 1);
}

#[tokio::test]
async fn heuristic_judge_meets_a_multi_run_failure_policy() {
	let dotnet = spawn(Router::new().route(
		"/chat",
		post(|| async { Json(json!({ "answer": "1. Dana Smith knows Java.\n2. Lee Park." })) }),
	))
	.await;
	let python = spawn(Router::new().route("/chat", post(|| async { Json(json!({ "answer": "" })) })))
		.await;
	let cfg = EvalConfig {
		judge: JudgeConfig { provider: "heuristic".to_string(), runs: 3, ..Default::default() },
		failure_policy: FailurePolicy { min_successful_runs: 2 },
		..heuristic_config()
	};
	let judge = Judge::from_config(&cfg.judge, &cfg.scoring, DEFAULT_TEMPLATE.to_string())
		.expect("Judge must build.");

	assert_eq!(judge.effective_min_successful_runs(3, 2), 1);

	let prompt = EvalPrompt {
		id: "hr-02".to_string(),
		question: "Who knows Java?".to_string(),
		expected_criteria: vec!["Java".to_string()],
	};
	let result = evaluate_prompt(
		&cfg,
		&judge,
		&ChatbotClient::new(&format!("http://{dotnet}"), 5_000).expect("Client must build."),
		&ChatbotClient::new(&format!("http://{python}"), 5_000).expect("Client must build."),
		&prompt,
	)
	.await;

	assert_eq!(result.summary.runs_attempted, 1);
	assert_eq!(result.summary.runs_succeeded, 1);
	assert!(!result.summary.comment.starts_with("Judge failed"));
	assert_eq!(result.summary.python_score, 1.0);
	assert!(result.summary.dotnet_score > 1.0);
	assert_eq!(result.summary.winner, Winner::Dotnet);
}

#[test]
fn loads_prompt_file() {
	let path = std::env::temp_dir().join(format!("talent-eval-prompts-{}.json", std::process::id()));

	fs::write(
		&path,
		json!({
			"hr_evaluation_prompts": [
				{ "id": "hr-01", "question": "Who?", "expected_criteria": ["Java"] },
				{ "id": "hr-02", "question": "Why?" },
			]
		})
		.to_string(),
	)
	.expect("Prompt file must be writable.");

	let prompts = load_prompts(&path).expect("Prompts must load.");

	fs::remove_file(&path).expect("Prompt file must be removable.");

	assert_eq!(prompts.len(), 2);
	assert_eq!(prompts[0].expected_criteria, vec!["Java".to_string()]);
	assert!(prompts[1].expected_criteria.is_empty());
}

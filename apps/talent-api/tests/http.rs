use std::{
	fs,
	path::PathBuf,
	sync::Arc,
	time::{SystemTime, UNIX_EPOCH},
};

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value, json};
use tower::util::ServiceExt;

use talent_api::{routes, state::AppState};
use talent_config::{
	Config, EmbeddingProviderConfig, Indexing, LlmProviderConfig, MetadataFields, Prompts, Qdrant,
	QueryParsing, Ranking, Retrieval, Service, SkillNormalization, Storage,
};
use talent_service::{BoxFuture, ChatProvider, EmbeddingProvider, Providers, TalentService};
use talent_storage::memory::MemoryStore;

const DIM: u32 = 3;

struct FlatEmbedding;
impl EmbeddingProvider for FlatEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, talent_providers::Result<Vec<Vec<f32>>>> {
		let vectors = vec![vec![1.0; cfg.dimensions as usize]; texts.len()];

		Box::pin(async move { Ok(vectors) })
	}
}

struct FixedChat {
	reply: &'static str,
}
impl ChatProvider for FixedChat {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, talent_providers::Result<String>> {
		let reply = self.reply.to_string();

		Box::pin(async move { Ok(reply) })
	}
}

fn test_config(candidates_dir: PathBuf) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			backend: "memory".to_string(),
			qdrant: Qdrant {
				url: "http://localhost:6334".to_string(),
				collection: "candidates".to_string(),
				vector_dim: DIM,
			},
		},
		providers: talent_config::Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test".to_string(),
				dimensions: DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: String::new(),
				path: "/chat/completions".to_string(),
				model: "test".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval::default(),
		indexing: Indexing { candidates_dir, ..Indexing::default() },
		prompts: Prompts::default(),
		metadata: MetadataFields::default(),
		query_parsing: QueryParsing::default(),
		skill_normalization: SkillNormalization::default(),
		ranking: Ranking::default(),
	}
}

fn state_with(candidates_dir: PathBuf, reply: &'static str) -> AppState {
	let providers = Providers::new(Arc::new(FlatEmbedding), Arc::new(FixedChat { reply }));
	let service = TalentService::with_providers(
		test_config(candidates_dir),
		Arc::new(MemoryStore::new(DIM)),
		providers,
	)
	.expect("Default rule tables must compile.");

	AppState::from_service(service)
}

fn temp_candidates_dir() -> PathBuf {
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock is after epoch.").as_nanos();
	let dir = std::env::temp_dir().join(format!("talent-api-{}-{nanos}", std::process::id()));

	fs::create_dir_all(&dir).expect("Temp dir must be creatable.");
	fs::write(
		dir.join("ana.json"),
		json!({
			"Summary": "Backend engineer.",
			"GeneralInfo": { "CandidateId": "cand-ana", "Fullname": "Ana Reyes", "SeniorityLevel": "Senior" },
			"SkillMatrix": [{ "SkillName": "Rust", "SkillLevel": "High" }],
		})
		.to_string(),
	)
	.expect("Fixture must be writable.");

	dir
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(body.to_string()))
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&bytes).expect("Response body must be JSON.")
}

#[tokio::test]
async fn health_is_ok() {
	let app = routes::router(state_with(PathBuf::from("unused"), "{}"));
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blank_question_is_invalid_request() {
	let app = routes::router(state_with(PathBuf::from("unused"), "{}"));
	let response = app
		.oneshot(post_json("/chat", r#"{"question": "  "}"#))
		.await
		.expect("Failed to call /chat.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], json!("invalid_request"));
	assert_eq!(body["fields"], json!(["question"]));
}

#[tokio::test]
async fn malformed_body_is_invalid_request() {
	let app = routes::router(state_with(PathBuf::from("unused"), "{}"));
	let response =
		app.oneshot(post_json("/chat", r#"{"query": "x"}"#)).await.expect("Failed to call /chat.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], json!("invalid_request"));
	assert_eq!(body["fields"], Value::Null);
}

#[tokio::test]
async fn chat_on_empty_index_returns_no_candidates() {
	let app = routes::router(state_with(PathBuf::from("unused"), "{}"));
	let response = app
		.oneshot(post_json("/chat", r#"{"question": "rust engineer"}"#))
		.await
		.expect("Failed to call /chat.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["answer"], json!(talent_service::NO_CANDIDATES_ANSWER));
	assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn admin_index_then_chat_selects_candidate() {
	let dir = temp_candidates_dir();
	let state = state_with(dir.clone(), r#"{"justification": "Strong Rust."}"#);
	let index = routes::admin_router(state.clone())
		.oneshot(post_json("/v1/admin/index", ""))
		.await
		.expect("Failed to call /v1/admin/index.");

	fs::remove_dir_all(&dir).expect("Temp dir must be removable.");

	assert_eq!(index.status(), StatusCode::OK);

	let report = json_body(index).await;

	assert_eq!(report["candidates"], json!(1));
	assert!(report["points"].as_u64().expect("points is a number.") > 0);

	let response = routes::router(state)
		.oneshot(post_json("/chat", r#"{"question": "rust engineer", "filters": {"candidate_ids": ["cand-ana"]}}"#))
		.await
		.expect("Failed to call /chat.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(
		body["answer"],
		json!("Selected Candidate: Ana Reyes (ID: cand-ana, Rank: 1)\n\nJustification: Strong Rust.")
	);
	assert_eq!(body["metadata"]["selected_candidate"]["rank"], json!(1));
}

#[tokio::test]
async fn unparseable_model_output_is_provider_error() {
	let dir = temp_candidates_dir();
	let state = state_with(dir.clone(), "no json at all");

	state.service.index_directory().await.expect("Indexing must succeed.");
	fs::remove_dir_all(&dir).expect("Temp dir must be removable.");

	let response = routes::router(state)
		.oneshot(post_json("/chat", r#"{"question": "backend engineer"}"#))
		.await
		.expect("Failed to call /chat.");

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert_eq!(json_body(response).await["error_code"], json!("provider_error"));
}

#[tokio::test]
async fn missing_candidates_dir_is_internal_error() {
	let app = routes::admin_router(state_with(std::env::temp_dir().join("talent-api-missing"), "{}"));
	let response =
		app.oneshot(post_json("/v1/admin/index", "")).await.expect("Failed to call /v1/admin/index.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json_body(response).await["error_code"], json!("internal_error"));
}

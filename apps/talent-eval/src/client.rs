use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

const CHAT_ENDPOINT: &str = "/chat";

/// Asks one deployed chatbot a question. Failures become `Error: ...` answers, which the judges
/// score as failed responses instead of aborting the run.
#[derive(Clone, Debug)]
pub struct ChatbotClient {
	base_url: String,
	client: Client,
}
impl ChatbotClient {
	pub fn new(base_url: &str, timeout_ms: u64) -> color_eyre::Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;

		Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub async fn ask(&self, question: &str) -> String {
		let url = format!("{}{CHAT_ENDPOINT}", self.base_url);
		let res = match self
			.client
			.post(url)
			.json(&serde_json::json!({ "question": question }))
			.send()
			.await
		{
			Ok(res) => res,
			Err(err) => return format!("Error: {err}"),
		};
		let status = res.status();

		if status != StatusCode::OK {
			return format!("Error: HTTP {}", status.as_u16());
		}

		match res.json::<Value>().await {
			Ok(body) => body.get("answer").and_then(Value::as_str).unwrap_or_default().to_string(),
			Err(err) => format!("Error: {err}"),
		}
	}
}

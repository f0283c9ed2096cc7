use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use talent_config::LlmProviderConfig;

use crate::{Error, Result};

/// Builds a `{"role", "content"}` chat message.
pub fn message(role: &str, content: impl Into<String>) -> Value {
	serde_json::json!({ "role": role, "content": content.into() })
}

/// Sends one chat completion request and returns the raw assistant text.
pub async fn complete(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"stream": false,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(&json)
}

fn parse_completion_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat completion response is missing choices[0].message.content.".to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_first_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "role": "assistant", "content": "{\"justification\": \"ok\"}" } },
				{ "message": { "role": "assistant", "content": "ignored" } }
			]
		});

		assert_eq!(
			parse_completion_content(&json).expect("Failed to parse completion."),
			"{\"justification\": \"ok\"}"
		);
	}

	#[test]
	fn missing_content_is_an_invalid_response() {
		let json = serde_json::json!({ "choices": [] });

		assert!(matches!(parse_completion_content(&json), Err(Error::InvalidResponse { .. })));
	}
}

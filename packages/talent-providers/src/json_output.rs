//! Recovery of a JSON object from free-form model output.
//!
//! Reasoning models wrap answers in `<think>` blocks and chat models like markdown fences, so the
//! raw text is cleaned before the outermost balanced object is taken.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

pub fn parse_structured<T>(raw: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	Ok(serde_json::from_value(extract_json(raw)?)?)
}

pub fn extract_json(raw: &str) -> Result<Value> {
	let cleaned = strip_markdown_fences(&strip_think_blocks(raw));
	let object = outermost_object(&cleaned).ok_or(Error::MissingJson)?;

	Ok(serde_json::from_str(object)?)
}

/// Removes `<think>...</think>` spans, case-insensitively. An unclosed block drops the remainder.
pub fn strip_think_blocks(raw: &str) -> String {
	// ASCII lowering keeps byte offsets aligned with `raw`.
	let lowered = raw.to_ascii_lowercase();
	let mut out = String::with_capacity(raw.len());
	let mut cursor = 0;

	while let Some(start) = lowered[cursor..].find(THINK_OPEN).map(|offset| cursor + offset) {
		out.push_str(&raw[cursor..start]);

		match lowered[start..].find(THINK_CLOSE) {
			Some(offset) => cursor = start + offset + THINK_CLOSE.len(),
			None => return out,
		}
	}

	out.push_str(&raw[cursor..]);

	out
}

pub fn strip_markdown_fences(raw: &str) -> String {
	raw.lines()
		.filter(|line| !line.trim_start().starts_with("```"))
		.collect::<Vec<_>>()
		.join("\n")
}

/// First `{` through its matching `}`, ignoring braces inside string literals.
fn outermost_object(text: &str) -> Option<&str> {
	let start = text.find('{')?;
	let mut depth = 0_usize;
	let mut in_string = false;
	let mut escaped = false;

	for (offset, ch) in text[start..].char_indices() {
		if in_string {
			match ch {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'"' => in_string = false,
				_ => {},
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'{' => depth += 1,
			'}' => {
				depth -= 1;

				if depth == 0 {
					return Some(&text[start..start + offset + 1]);
				}
			},
			_ => {},
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_think_blocks_case_insensitively() {
		assert_eq!(strip_think_blocks("<THINK>plan</Think>answer"), "answer");
		assert_eq!(strip_think_blocks("a<think>x</think>b<think>y</think>c"), "abc");
		assert_eq!(strip_think_blocks("keep<think>never closed"), "keep");
	}

	#[test]
	fn extracts_object_from_fenced_output() {
		let raw = "<think>hmm {not json}</think>\nSure:\n```json\n{\"justification\": \"Uses {braces} and \\\"quotes\\\"\"}\n```\nThanks!";
		let value = extract_json(raw).expect("Expected a JSON object.");

		assert_eq!(value["justification"], "Uses {braces} and \"quotes\"");
	}

	#[test]
	fn takes_the_outermost_balanced_object() {
		let value = extract_json("prefix {\"a\": {\"b\": 1}} trailing {\"c\": 2}")
			.expect("Expected a JSON object.");

		assert_eq!(value, serde_json::json!({ "a": { "b": 1 } }));
	}

	#[test]
	fn reports_missing_json() {
		assert!(matches!(extract_json("no braces here"), Err(Error::MissingJson)));
		assert!(matches!(extract_json("{\"unterminated\": 1"), Err(Error::MissingJson)));
	}

	#[test]
	fn invalid_json_is_a_parse_error() {
		assert!(matches!(extract_json("{not: json}"), Err(Error::SerdeJson(_))));
	}
}

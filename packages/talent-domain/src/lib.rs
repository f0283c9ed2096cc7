//! Query understanding and candidate ranking.
//!
//! Everything here is synchronous and deterministic. Tables are compiled once from
//! [`talent_config`] sections and then shared by reference.

pub mod candidate;
pub mod filter;
pub mod indexing;
pub mod query;
pub mod ranking;
pub mod seniority;
pub mod skills;

mod error;

pub use error::{Error, Result};

use serde_json::Value;

/// Reads a year count from metadata: integers, floats (truncated), or numeric strings.
pub fn coerce_years(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) =>
			number.as_i64().or_else(|| number.as_f64().map(|years| years.trunc() as i64)),
		Value::String(raw) => {
			let raw = raw.trim();

			raw.parse::<i64>().ok().or_else(|| {
				raw.parse::<f64>()
					.ok()
					.filter(|years| years.is_finite())
					.map(|years| years.trunc() as i64)
			})
		},
		_ => None,
	}
}

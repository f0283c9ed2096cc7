pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Construction-time failures. Per-item data problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid pattern in {table}: {pattern:?}.")]
	InvalidPattern {
		table: &'static str,
		pattern: String,
		#[source]
		source: Box<regex::Error>,
	},
	#[error("{table} must be non-empty.")]
	EmptyTable { table: &'static str },
	#[error("Unknown seniority level {label:?}.")]
	UnknownSeniority { label: String },
	#[error("Unknown query intent {name:?}.")]
	UnknownIntent { name: String },
	#[error("Experience pattern {pattern:?} must contain a capture group.")]
	MissingCapture { pattern: String },
	#[error("Skill rule for {canonical:?} is not idempotent; the table rewrites it to {rewritten:?}.")]
	NonIdempotentRule { canonical: String, rewritten: String },
}

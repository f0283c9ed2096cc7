pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid request: {message}")]
	InvalidField { field: String, message: String },
	#[error("Invalid configuration: {message}")]
	InvalidConfig { message: String },
	#[error("Candidate records error: {message}")]
	Records { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<talent_storage::Error> for Error {
	fn from(err: talent_storage::Error) -> Self {
		match err {
			talent_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<talent_providers::Error> for Error {
	fn from(err: talent_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<talent_domain::Error> for Error {
	fn from(err: talent_domain::Error) -> Self {
		Self::InvalidConfig { message: err.to_string() }
	}
}

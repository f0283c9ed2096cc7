use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use talent_service::{ChatRequest, ChatResponse, Error, IndexReport};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new().route("/health", get(health)).route("/chat", post(chat)).with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/index", post(rebuild_index)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat(
	State(state): State<AppState>,
	payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
	let Json(payload) = payload.map_err(|rejection| {
		ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text(), None)
	})?;
	let response = state.service.ask(payload).await?;

	Ok(Json(response))
}

async fn rebuild_index(State(state): State<AppState>) -> Result<Json<IndexReport>, ApiError> {
	let report = state.service.index_directory().await?;

	Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::InvalidField { field, message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message, Some(vec![field])),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider call failed.");

				ApiError::new(StatusCode::BAD_GATEWAY, "provider_error", message, None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Vector store call failed.");

				ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "storage_error", message, None)
			},
			other => {
				tracing::error!(error = %other, "Request failed.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

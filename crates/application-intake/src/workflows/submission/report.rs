use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confirmation shown to the applicant once every step has succeeded.
pub const SUCCESS_MESSAGE: &str = "지원서가 성공적으로 제출되었습니다.";

/// Uniform response envelope shared by the submission and template endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SubmissionResult {
    pub fn submitted() -> Self {
        Self {
            success: true,
            message: Some(SUCCESS_MESSAGE.to_string()),
            data: None,
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// 200 for success, 500 for every failure.
    pub fn status(&self) -> StatusCode {
        if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for SubmissionResult {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Collapses a pipeline outcome into the envelope. The failing step is not part of the
/// response shape; only the error's message reaches the caller.
pub struct ResultReporter;

impl ResultReporter {
    pub fn submission<T, E: std::fmt::Display>(outcome: &Result<T, E>) -> SubmissionResult {
        match outcome {
            Ok(_) => SubmissionResult::submitted(),
            Err(err) => SubmissionResult::failure(err.to_string()),
        }
    }

    pub fn data<E: std::fmt::Display>(outcome: Result<Value, E>) -> SubmissionResult {
        match outcome {
            Ok(data) => SubmissionResult::with_data(data),
            Err(err) => SubmissionResult::failure(err.to_string()),
        }
    }
}

//! The JSON envelope every endpoint answers with.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Response envelope.
///
/// ```json
/// { "success": true, "data": { ... }, "message": null, "code": null }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    pub data: Option<T>,
    /// Human-readable note
    pub message: Option<String>,
    /// Error code on failure
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
        }
    }

    /// Successful response carrying `data` and a message.
    #[must_use]
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Failed response.
    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: Some(code.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            code: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

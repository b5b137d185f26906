//! HTTP mapping of service errors.
//!
//! Every failure answers with an empty JSON object; the detail only goes to
//! the log.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::ServiceError;

/// The `{}` body carried by every error response.
pub fn empty_body(status: StatusCode) -> Response {
    (status, Json(serde_json::json!({}))).into_response()
}

impl ServiceError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::IntegrityViolation(_)
            | Self::Storage(_)
            | Self::Signing(_)
            | Self::Provisioning(_)
            | Self::Bundle(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_internal() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        empty_body(status)
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidArgument(format!("malformed request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidArgument(format!("malformed query string: {}", rejection.body_text()))
    }
}

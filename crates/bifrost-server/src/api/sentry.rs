//! Shared-secret request gate.
//!
//! When a secret is configured every request must present it in the
//! configured header; anything else is answered with 401 `{}`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::{HeaderName, InvalidHeaderName};
use axum::middleware::Next;
use axum::response::Response;
use bifrost_crypto::constant_time_str_eq;
use tracing::warn;

use super::error::empty_body;

pub const DEFAULT_SECRET_HEADER: &str = "X-Bifrost-Secret";

#[derive(Clone)]
pub struct SecretGate {
    header: HeaderName,
    secret: Arc<str>,
}

impl SecretGate {
    pub fn new(header: &str, secret: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            header: HeaderName::try_from(header)?,
            secret: Arc::from(secret),
        })
    }

    fn admits(&self, request: &Request) -> bool {
        request
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|presented| constant_time_str_eq(presented, &self.secret))
    }
}

pub async fn require_secret(
    State(gate): State<SecretGate>,
    request: Request,
    next: Next,
) -> Response {
    if gate.admits(&request) {
        return next.run(request).await;
    }
    warn!(
        path = %request.uri().path(),
        header = %gate.header,
        "Rejected request without a valid secret"
    );
    empty_body(StatusCode::UNAUTHORIZED)
}

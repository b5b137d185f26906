//! HTTP surface of the identity service.
//!
//! Routes bind path segments and JSON bodies to the service components and
//! map their errors to status codes. Every error answers with `{}`.

pub mod certs;
pub mod error;
pub mod events;
pub mod sentry;
pub mod settings;
pub mod users;
pub mod views;
pub mod whitelist;

use std::any::Any;

use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, put};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub use sentry::{DEFAULT_SECRET_HEADER, SecretGate};

use self::error::empty_body;
use crate::error::ServiceError;
use crate::service::Services;

/// Accept an email path segment: exactly one `@` with something on both
/// sides, and no whitespace or `:` (the email is the TOTP account name).
pub fn valid_email(email: String) -> Result<String, ServiceError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(|c| c.is_whitespace() || c == '/' || c == ':')
        }
        None => false,
    };
    if well_formed {
        Ok(email)
    } else {
        Err(ServiceError::InvalidArgument(format!("malformed email {email:?}")))
    }
}

/// Accept a fingerprint path segment: non-empty, no whitespace.
pub fn valid_fingerprint(fingerprint: String) -> Result<String, ServiceError> {
    if fingerprint.is_empty() || fingerprint.chars().any(char::is_whitespace) {
        return Err(ServiceError::InvalidArgument(format!(
            "malformed fingerprint {fingerprint:?}"
        )));
    }
    Ok(fingerprint)
}

/// Paths whose item segment is missing or not allowed for the method.
async fn malformed_path(uri: Uri) -> ServiceError {
    ServiceError::InvalidArgument(format!("missing path segment in {}", uri.path()))
}

async fn unknown_route(uri: Uri) -> Response {
    warn!(path = %uri.path(), "Incoming request to unknown route");
    empty_body(StatusCode::NOT_FOUND)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");
    empty_body(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build the router. With a [`SecretGate`] every route, including the
/// fallback, requires the shared secret.
pub fn build_router(services: Services, gate: Option<SecretGate>) -> Router {
    let router = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/user/",
            get(malformed_path).put(malformed_path).delete(malformed_path),
        )
        .route(
            "/user/{email}",
            get(users::get_user)
                .put(users::put_user)
                .delete(users::delete_user),
        )
        .route("/certs", get(certs::list_all))
        .route("/certs/", get(certs::list_all).post(malformed_path))
        .route(
            "/certs/{email}",
            get(certs::list_for_user).post(certs::issue),
        )
        .route("/cert/", get(malformed_path).delete(malformed_path))
        .route(
            "/cert/{fingerprint}",
            get(certs::get_cert).delete(certs::revoke_cert),
        )
        .route(
            "/events",
            get(events::list_events).delete(events::clear_events),
        )
        .route(
            "/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .route("/whitelist", get(whitelist::list_whitelist))
        .route(
            "/whitelist/",
            put(malformed_path).delete(malformed_path),
        )
        .route(
            "/whitelist/{email}",
            get(malformed_path)
                .put(whitelist::add_whitelisted)
                .delete(whitelist::remove_whitelisted),
        )
        .fallback(unknown_route)
        .with_state(services);

    let router = match gate {
        Some(gate) => router.layer(middleware::from_fn_with_state(gate, sentry::require_secret)),
        None => router,
    };

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

//! `/settings`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::instrument;

use crate::error::ServiceError;
use crate::service::{Services, Settings};

/// `GET /settings`
pub async fn get_settings(State(services): State<Services>) -> Result<Json<Settings>, ServiceError> {
    Ok(Json(services.settings.load().await?))
}

/// `PUT /settings`: store, then answer with the reloaded snapshot.
/// `WhitelistedUsers` in the body is ignored.
#[instrument(skip(services, body))]
pub async fn put_settings(
    State(services): State<Services>,
    body: Result<Json<Settings>, JsonRejection>,
) -> Result<Json<Settings>, ServiceError> {
    let Json(settings) = body?;
    services.settings.store(&settings).await?;
    Ok(Json(services.settings.load().await?))
}

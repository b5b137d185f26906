//! `/whitelist` and `/whitelist/<email>`.
//!
//! Mutations answer with the complete list after the change.

use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use super::valid_email;
use super::views::WhitelistView;
use crate::error::ServiceError;
use crate::service::Services;

async fn current(services: &Services) -> Result<Json<WhitelistView>, ServiceError> {
    let users = services.whitelist.list().await?;
    Ok(Json(WhitelistView { users }))
}

/// `GET /whitelist`
pub async fn list_whitelist(
    State(services): State<Services>,
) -> Result<Json<WhitelistView>, ServiceError> {
    current(&services).await
}

/// `PUT /whitelist/<email>`
#[instrument(skip(services))]
pub async fn add_whitelisted(
    State(services): State<Services>,
    Path(email): Path<String>,
) -> Result<Json<WhitelistView>, ServiceError> {
    let email = valid_email(email)?;
    services.whitelist.add(&email).await?;
    current(&services).await
}

/// `DELETE /whitelist/<email>`
#[instrument(skip(services))]
pub async fn remove_whitelisted(
    State(services): State<Services>,
    Path(email): Path<String>,
) -> Result<Json<WhitelistView>, ServiceError> {
    let email = valid_email(email)?;
    services.whitelist.remove(&email).await?;
    current(&services).await
}

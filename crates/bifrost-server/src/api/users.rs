//! `/users` and `/user/<email>`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, instrument};

use super::valid_email;
use super::views::{EnrollmentView, OwnerView, RemovedUserView, UserSummaryView, UsersView};
use crate::error::ServiceError;
use crate::service::Services;

/// `GET /users`
pub async fn list_users(State(services): State<Services>) -> Result<Json<UsersView>, ServiceError> {
    let users = services
        .identities
        .list_summaries()
        .await?
        .into_iter()
        .map(UserSummaryView::from)
        .collect();
    Ok(Json(UsersView { users }))
}

/// `GET /user/<email>`
pub async fn get_user(
    State(services): State<Services>,
    Path(email): Path<String>,
) -> Result<Json<OwnerView>, ServiceError> {
    let email = valid_email(email)?;
    let detail = services.identities.describe(&email).await?;
    Ok(Json(OwnerView::new(
        detail.email,
        Some(detail.created),
        detail.certificates,
    )))
}

/// `PUT /user/<email>`: enroll, or rotate the TOTP seed of an existing
/// identity. 201 when the identity was created.
#[instrument(skip(services))]
pub async fn put_user(
    State(services): State<Services>,
    Path(email): Path<String>,
) -> Result<(StatusCode, Json<EnrollmentView>), ServiceError> {
    let email = valid_email(email)?;
    let enrollment = services.identities.enroll_or_rotate(&email).await?;

    let status = if enrollment.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let totp_url = format!("data:image/png;base64,{}", STANDARD.encode(&enrollment.qr_png));

    Ok((status, Json(EnrollmentView { email, totp_url })))
}

/// `DELETE /user/<email>`: revoke all active certificates and remove the
/// identity.
#[instrument(skip(services))]
pub async fn delete_user(
    State(services): State<Services>,
    Path(email): Path<String>,
) -> Result<Json<RemovedUserView>, ServiceError> {
    let email = valid_email(email)?;
    if !services.identities.exists(&email).await? {
        info!(email, "Request to delete unknown identity");
        return Err(ServiceError::NotFound(format!("identity {email}")));
    }

    let revoked_certs = services.identities.remove(&email).await?;
    Ok(Json(RemovedUserView { revoked_certs }))
}

//! `/certs`, `/certs/<email>` and `/cert/<fingerprint>`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::instrument;

use super::views::{CertDetailView, FleetView, IssueRequest, IssuedView, OwnerView};
use super::{valid_email, valid_fingerprint};
use crate::error::ServiceError;
use crate::service::Services;
use crate::storage::Revocation;

/// `GET /certs`: certificates of every live identity.
pub async fn list_all(State(services): State<Services>) -> Result<Json<FleetView>, ServiceError> {
    let certs = services
        .ledger
        .list_all()
        .await?
        .into_iter()
        .map(OwnerView::from)
        .collect();
    Ok(Json(FleetView { certs }))
}

/// `GET /certs/<email>`
pub async fn list_for_user(
    State(services): State<Services>,
    Path(email): Path<String>,
) -> Result<Json<OwnerView>, ServiceError> {
    let email = valid_email(email)?;
    let owner = services.ledger.list_for_user(&email).await?;
    Ok(Json(owner.into()))
}

/// `POST /certs/<email>`: issue a certificate and return its bundle.
///
/// The body must name the same email as the path.
#[instrument(skip(services, body))]
pub async fn issue(
    State(services): State<Services>,
    Path(email): Path<String>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssuedView>), ServiceError> {
    let email = valid_email(email)?;
    let Json(request) = body?;
    if request.email != email {
        return Err(ServiceError::InvalidArgument(format!(
            "body email {:?} does not match path",
            request.email
        )));
    }

    let issued = services.ledger.issue(&email, &request.description).await?;
    let ovpn_data_url = format!("data:image/ovpn;base64,{}", STANDARD.encode(issued.bundle));

    Ok((StatusCode::CREATED, Json(IssuedView { ovpn_data_url })))
}

/// `GET /cert/<fingerprint>`
pub async fn get_cert(
    State(services): State<Services>,
    Path(fingerprint): Path<String>,
) -> Result<Json<CertDetailView>, ServiceError> {
    let fingerprint = valid_fingerprint(fingerprint)?;
    let cert = services.ledger.describe(&fingerprint).await?;
    Ok(Json(cert.into()))
}

/// `DELETE /cert/<fingerprint>`: revoke. An unknown fingerprint answers
/// with empty fields rather than an error.
#[instrument(skip(services))]
pub async fn revoke_cert(
    State(services): State<Services>,
    Path(fingerprint): Path<String>,
) -> Result<Json<CertDetailView>, ServiceError> {
    let fingerprint = valid_fingerprint(fingerprint)?;
    let view = match services.ledger.revoke(&fingerprint).await? {
        Revocation::Revoked(cert) | Revocation::AlreadyRevoked(cert) => cert.into(),
        Revocation::Unknown => CertDetailView::default(),
    };
    Ok(Json(view))
}

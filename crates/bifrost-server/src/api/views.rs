//! JSON shapes of the HTTP surface.
//!
//! Field names are PascalCase and timestamps use the wire format; an unset
//! timestamp renders as an empty string.

use bifrost_core::time::format_timestamp;
use serde::{Deserialize, Serialize};

use crate::service::{CertificateSet, OwnerCertificates};
use crate::storage::{CertificateRecord, EventRecord, IdentitySummary};

fn optional_timestamp(ts: Option<i64>) -> String {
    ts.map(format_timestamp).unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertView {
    pub fingerprint: String,
    pub created: String,
    pub expires: String,
    pub revoked: String,
    pub description: String,
}

impl From<CertificateRecord> for CertView {
    fn from(cert: CertificateRecord) -> Self {
        Self {
            fingerprint: cert.fingerprint,
            created: format_timestamp(cert.created),
            expires: format_timestamp(cert.expires),
            revoked: optional_timestamp(cert.revoked),
            description: cert.description,
        }
    }
}

/// A single certificate together with its owner.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertDetailView {
    pub email: String,
    pub fingerprint: String,
    pub created: String,
    pub expires: String,
    pub revoked: String,
    pub description: String,
}

impl From<CertificateRecord> for CertDetailView {
    fn from(cert: CertificateRecord) -> Self {
        Self {
            email: cert.email,
            fingerprint: cert.fingerprint,
            created: format_timestamp(cert.created),
            expires: format_timestamp(cert.expires),
            revoked: optional_timestamp(cert.revoked),
            description: cert.description,
        }
    }
}

/// An email and its certificates, split by revocation state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnerView {
    pub email: String,
    pub created: String,
    pub active_certs: Vec<CertView>,
    pub revoked_certs: Vec<CertView>,
}

impl OwnerView {
    pub fn new(email: String, created: Option<i64>, certs: CertificateSet) -> Self {
        Self {
            email,
            created: optional_timestamp(created),
            active_certs: certs.active.into_iter().map(CertView::from).collect(),
            revoked_certs: certs.revoked.into_iter().map(CertView::from).collect(),
        }
    }
}

impl From<OwnerCertificates> for OwnerView {
    fn from(owner: OwnerCertificates) -> Self {
        Self::new(owner.email, owner.identity_created, owner.certificates)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserSummaryView {
    pub email: String,
    pub active_certs: i64,
    pub revoked_certs: i64,
}

impl From<IdentitySummary> for UserSummaryView {
    fn from(summary: IdentitySummary) -> Self {
        Self {
            email: summary.email,
            active_certs: summary.active_certs,
            revoked_certs: summary.revoked_certs,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UsersView {
    pub users: Vec<UserSummaryView>,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentView {
    #[serde(rename = "Email")]
    pub email: String,
    /// `data:image/png;base64,` QR code of the provisioning URI.
    #[serde(rename = "TOTPURL")]
    pub totp_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemovedUserView {
    pub revoked_certs: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FleetView {
    pub certs: Vec<OwnerView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssueRequest {
    pub email: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct IssuedView {
    /// `data:image/ovpn;base64,` client bundle.
    #[serde(rename = "OVPNDataURL")]
    pub ovpn_data_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventView {
    pub event: String,
    pub email: String,
    pub value: String,
    pub timestamp: String,
}

impl From<EventRecord> for EventView {
    fn from(event: EventRecord) -> Self {
        Self {
            event: event.event,
            email: event.email,
            value: event.value,
            timestamp: format_timestamp(event.ts),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventsView {
    pub events: Vec<EventView>,
}

impl From<Vec<EventRecord>> for EventsView {
    fn from(events: Vec<EventRecord>) -> Self {
        Self {
            events: events.into_iter().map(EventView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WhitelistView {
    pub users: Vec<String>,
}

//! Identity service components.
//!
//! Each component owns a cheap clone of the [`Database`] handle and reads
//! everything it needs from storage per call; nothing is cached in memory.

pub mod audit;
pub mod bundle;
pub mod identity;
pub mod ledger;
pub mod settings;
pub mod whitelist;

use std::sync::Arc;

use bifrost_crypto::{ClientCertSigner, OtpProvisioner};

pub use audit::AuditLog;
pub use bundle::{BundleError, BundleSources};
pub use identity::{Enrollment, IdentityDetail, IdentityRegistry};
pub use ledger::{CertificateLedger, CertificateSet, IssuedBundle, OwnerCertificates};
pub use settings::{Settings, SettingsStore};
pub use whitelist::WhitelistGate;

use crate::storage::Database;

/// All components, wired to one database and one pair of collaborators.
#[derive(Clone)]
pub struct Services {
    pub identities: IdentityRegistry,
    pub ledger: CertificateLedger,
    pub whitelist: WhitelistGate,
    pub settings: SettingsStore,
    pub audit: AuditLog,
}

impl Services {
    pub fn new(
        db: &Database,
        signer: Arc<dyn ClientCertSigner>,
        provisioner: Arc<dyn OtpProvisioner>,
        bundles: BundleSources,
    ) -> Self {
        Self {
            identities: IdentityRegistry::new(db.clone(), provisioner),
            ledger: CertificateLedger::new(db.clone(), signer, bundles),
            whitelist: WhitelistGate::new(db.clone()),
            settings: SettingsStore::new(db.clone()),
            audit: AuditLog::new(db.clone()),
        }
    }
}

//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use bifrost_core::tracing_init::LogOptions;
use bifrost_crypto::{Authority, CryptoError};
use clap::Parser;
use tracing::warn;

use crate::api::{DEFAULT_SECRET_HEADER, SecretGate};
use crate::service::BundleSources;

/// Organisation name of the ephemeral development CA.
const DEV_CA_NAME: &str = "Bifrost Development CA";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("No certificate authority configured; pass --ca-cert/--ca-key or --dev-ca")]
    NoAuthority,

    #[error(transparent)]
    Authority(#[from] CryptoError),

    #[error("Invalid secret header name {0:?}")]
    SecretHeader(String),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "bifrost-server")]
#[command(
    version,
    about = "Bifrost identity service - TOTP enrollment and VPN client certificates"
)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:9090", env = "BIFROST_ADDR")]
    pub addr: SocketAddr,

    /// Path to SQLite database file [default: ~/.bifrost/bifrost.db].
    #[arg(long, env = "BIFROST_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// CA certificate (PEM) used to sign client certificates.
    #[arg(long, env = "BIFROST_CA_CERT", requires = "ca_key", conflicts_with = "dev_ca")]
    pub ca_cert: Option<PathBuf>,

    /// CA private key (PKCS#8 PEM, unencrypted).
    #[arg(long, env = "BIFROST_CA_KEY", requires = "ca_cert")]
    pub ca_key: Option<PathBuf>,

    /// Sign with an ephemeral CA generated at startup (development only).
    #[arg(long)]
    pub dev_ca: bool,

    /// Shared tunnel secret embedded into every client bundle.
    #[arg(long, default_value = "./tls-auth.pem", env = "BIFROST_TLS_AUTH")]
    pub tls_auth: PathBuf,

    /// Client bundle template.
    #[arg(long, default_value = "./template.ovpn", env = "BIFROST_BUNDLE_TEMPLATE")]
    pub bundle_template: PathBuf,

    /// Header that must carry the API secret.
    #[arg(long, default_value = DEFAULT_SECRET_HEADER, env = "BIFROST_API_HEADER")]
    pub api_header: String,

    /// Shared API secret. Requests are not authenticated when unset.
    #[arg(long, env = "BIFROST_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "BIFROST_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log at debug level (unless RUST_LOG is set).
    #[arg(long, env = "BIFROST_DEBUG")]
    pub debug: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            default_filter: "bifrost_server=info,tower_http=info".into(),
            debug: self.debug,
            json: self.log_json,
            file: self.log_file.clone(),
        }
    }

    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".bifrost").join("bifrost.db"))
    }

    pub fn authority(&self) -> Result<Authority, ConfigError> {
        match (&self.ca_cert, &self.ca_key) {
            (Some(cert), Some(key)) => Ok(Authority::load(cert, key)?),
            _ if self.dev_ca => {
                warn!("Using an ephemeral development CA; bundles will not survive a restart");
                Ok(Authority::generate(DEV_CA_NAME)?)
            }
            _ => Err(ConfigError::NoAuthority),
        }
    }

    pub fn bundle_sources(&self) -> BundleSources {
        BundleSources::new(self.bundle_template.clone(), self.tls_auth.clone())
    }

    /// The request gate, or `None` when no secret is configured.
    pub fn secret_gate(&self) -> Result<Option<SecretGate>, ConfigError> {
        match self.api_secret.as_deref() {
            None | Some("") => Ok(None),
            Some(secret) => SecretGate::new(&self.api_header, secret)
                .map(Some)
                .map_err(|_| ConfigError::SecretHeader(self.api_header.clone())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("bifrost-server").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.addr.to_string(), "127.0.0.1:9090");
        assert_eq!(args.api_header, "X-Bifrost-Secret");
        assert!(!args.dev_ca);
    }

    #[test]
    fn explicit_db_path_wins() {
        let args = parse(&["--db-path", "/tmp/b.db"]);
        assert_eq!(args.db_path().unwrap(), PathBuf::from("/tmp/b.db"));
    }

    #[test]
    fn ca_files_conflict_with_dev_ca() {
        let result = Args::try_parse_from([
            "bifrost-server",
            "--dev-ca",
            "--ca-cert",
            "ca.crt",
            "--ca-key",
            "ca.key",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn dev_ca_builds_an_authority() {
        assert!(parse(&["--dev-ca"]).authority().is_ok());
    }

    #[test]
    fn empty_secret_disables_gate() {
        assert!(parse(&["--api-secret", ""]).secret_gate().unwrap().is_none());
        assert!(parse(&["--api-secret", "s3cret"]).secret_gate().unwrap().is_some());
        assert!(
            parse(&["--api-secret", "s3cret", "--api-header", "bad header"])
                .secret_gate()
                .is_err()
        );
    }
}

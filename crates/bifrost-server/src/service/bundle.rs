//! Client configuration bundle assembly.
//!
//! A bundle is the tunnel client configuration with the CA chain, the
//! client certificate and key, and the shared tunnel secret substituted into
//! a text template. Recognised placeholders are `{{.CA}}`, `{{.Cert}}`,
//! `{{.Key}}` and `{{.TLSAuth}}`; whitespace inside the braces is ignored.

use std::path::{Path, PathBuf};

use tracing::debug;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Errors while loading or rendering a bundle template.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown template placeholder: {0}")]
    UnknownPlaceholder(String),

    #[error("Unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

/// Key material substituted into a template.
#[derive(Clone, Copy)]
pub struct BundleParts<'a> {
    pub ca: &'a str,
    pub cert: &'a str,
    pub key: &'a str,
    pub tls_auth: &'a str,
}

impl BundleParts<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            ".CA" => Some(self.ca),
            ".Cert" => Some(self.cert),
            ".Key" => Some(self.key),
            ".TLSAuth" => Some(self.tls_auth),
            _ => None,
        }
    }
}

/// Substitute `parts` into `template`.
pub fn render(template: &str, parts: &BundleParts<'_>) -> Result<String, BundleError> {
    let mut out = String::with_capacity(
        template.len() + parts.ca.len() + parts.cert.len() + parts.key.len() + parts.tls_auth.len(),
    );
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or(BundleError::Unterminated(offset + start))?;

        let name = after_open[..end].trim();
        let value = parts
            .lookup(name)
            .ok_or_else(|| BundleError::UnknownPlaceholder(name.to_string()))?;
        out.push_str(value);

        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Locations of the bundle template and the shared tunnel secret.
///
/// Both files are read on every issuance so edits take effect without a
/// restart.
#[derive(Debug, Clone)]
pub struct BundleSources {
    pub template: PathBuf,
    pub tls_auth: PathBuf,
}

impl BundleSources {
    pub const fn new(template: PathBuf, tls_auth: PathBuf) -> Self {
        Self { template, tls_auth }
    }

    /// Read both files and render a bundle for the given key material.
    pub async fn assemble(&self, ca: &str, cert: &str, key: &str) -> Result<String, BundleError> {
        let template = read(&self.template).await?;
        let tls_auth = read(&self.tls_auth).await?;
        debug!(template = %self.template.display(), "Rendering client bundle");

        render(
            &template,
            &BundleParts {
                ca,
                cert,
                key,
                tls_auth: &tls_auth,
            },
        )
    }
}

async fn read(path: &Path) -> Result<String, BundleError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })
}

//! TOTP enrollment material.
//!
//! Only provisioning happens here: a fresh shared secret, its `otpauth://`
//! URI and a scannable QR image. Codes are verified by the VPN endpoint,
//! never by this service.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::CryptoError;

/// Digits per generated code.
const DIGITS: usize = 6;
/// Step length in seconds.
const STEP: u64 = 30;
/// Accepted clock skew, in steps.
const SKEW: u8 = 1;

/// A freshly generated TOTP secret and its provisioning URI.
pub struct OtpEnrollment {
    /// Base32-encoded shared secret (stored as the identity seed).
    pub secret: String,
    /// `otpauth://totp/...` provisioning URI.
    pub uri: String,
}

/// The provisioning collaborator used by the identity registry.
pub trait OtpProvisioner: Send + Sync {
    /// Generate a new secret scoped to `issuer` and `account`.
    fn generate(&self, issuer: &str, account: &str) -> Result<OtpEnrollment, CryptoError>;

    /// Render `uri` as a PNG QR code of at least `width` x `height` pixels.
    fn render_qr(&self, uri: &str, width: u32, height: u32) -> Result<Vec<u8>, CryptoError>;
}

/// RFC 6238 provisioner (SHA-1, 6 digits, 30 s steps).
#[derive(Debug, Clone, Copy, Default)]
pub struct TotpProvisioner;

impl OtpProvisioner for TotpProvisioner {
    fn generate(&self, issuer: &str, account: &str) -> Result<OtpEnrollment, CryptoError> {
        let secret = Secret::generate_secret();
        let bytes = secret
            .to_bytes()
            .map_err(|e| CryptoError::Provisioning(format!("{e:?}")))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP,
            bytes,
            Some(issuer.to_string()),
            account.to_string(),
        )
        .map_err(|e| CryptoError::Provisioning(e.to_string()))?;

        Ok(OtpEnrollment {
            secret: totp.get_secret_base32(),
            uri: totp.get_url(),
        })
    }

    fn render_qr(&self, uri: &str, width: u32, height: u32) -> Result<Vec<u8>, CryptoError> {
        let code = QrCode::new(uri.as_bytes()).map_err(|e| CryptoError::QrRender(e.to_string()))?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .min_dimensions(width, height)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CryptoError::QrRender(e.to_string()))?;
        Ok(png)
    }
}

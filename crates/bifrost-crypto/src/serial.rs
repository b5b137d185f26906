//! Certificate serial allocation.
//!
//! Serials are 128-bit random integers. Collisions are possible in theory
//! but revocation is keyed on the certificate fingerprint, never the serial,
//! so a duplicate serial cannot revoke the wrong certificate.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

/// A freshly allocated certificate serial number.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CertSerial(u128);

impl CertSerial {
    /// Draw a new serial from the OS random source.
    pub fn allocate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(u128::from_be_bytes(bytes))
    }

    /// Big-endian bytes with leading zero bytes stripped, as carried in the
    /// certificate's serial field. Zero keeps a single byte.
    pub fn to_be_bytes_minimal(self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        bytes[first..].to_vec()
    }
}

impl From<u128> for CertSerial {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for CertSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::Debug for CertSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertSerial({:x})", self.0)
    }
}

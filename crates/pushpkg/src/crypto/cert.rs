//! Certificate and private key handling for the pure Rust backend.
//!
//! This module loads signing credentials from PEM-encoded files or PKCS#12 (.p12)
//! containers without linking OpenSSL. RSA, ECDSA (P-256/P-384), and Ed25519
//! keys are supported.
//!
//! # Supported Formats
//!
//! - **PEM**: Separate certificate and PKCS#8 private key (unencrypted keys only)
//! - **PKCS#12**: Combined certificate and key in a password-protected container
//!   using the legacy `pbeWithSHAAnd3-KeyTripleDES-CBC` / RC2 encryption and a
//!   SHA-1 MAC, as exported by Keychain Access
//!
//! # Examples
//!
//! ```no_run
//! use pushpkg::crypto::PureRustCredentials;
//!
//! let p12_data = std::fs::read("cert.p12")?;
//! let intermediate = std::fs::read("AppleWWDRCA.cer")?;
//! let credentials = PureRustCredentials::from_p12(&p12_data, "password")?
//!     .with_intermediate(&intermediate)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{Error, Result};
use x509_certificate::{CapturedX509Certificate, InMemorySigningKeyPair, Sign};

/// Signing credentials: certificate, private key, and certificate chain.
///
/// # Security
///
/// The private key contained in this struct should be treated as sensitive data.
/// Avoid logging or exposing [`PureRustCredentials`] instances.
pub struct PureRustCredentials {
    /// X.509 signing certificate.
    pub certificate: CapturedX509Certificate,

    /// Private key corresponding to the certificate's public key.
    pub signing_key: InMemorySigningKeyPair,

    /// Intermediate CA certificates embedded in the signature.
    pub cert_chain: Vec<CapturedX509Certificate>,
}

impl PureRustCredentials {
    /// Load credentials from PEM-encoded certificate and PKCS#8 private key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] if either input is malformed, the key
    /// type is unsupported, or the key does not match the certificate.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let certificate = CapturedX509Certificate::from_pem(cert_pem)
            .map_err(|e| Error::Certificate(format!("Failed to parse certificate PEM: {}", e)))?;

        let key_str = std::str::from_utf8(key_pem)
            .map_err(|e| Error::Certificate(format!("Invalid UTF-8 in key PEM: {}", e)))?;

        let signing_key = InMemorySigningKeyPair::from_pkcs8_pem(key_str)
            .map_err(|e| Error::Certificate(format!("Failed to parse private key: {}", e)))?;

        Self::new(certificate, signing_key, Vec::new())
    }

    /// Load credentials from a PKCS#12 (.p12) container.
    ///
    /// The certificate whose public key matches the first key bag is the
    /// signing certificate; any others in the container start the chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPassword`] if the container MAC does not verify,
    /// and [`Error::Certificate`] if the container is malformed, lacks a
    /// certificate or key, or uses a MAC or encryption other than the legacy
    /// SHA-1 / RC2 / 3DES schemes (OpenSSL 3 exports default to AES with an
    /// HMAC-SHA256 MAC).
    ///
    /// # Security
    ///
    /// The password is used only during parsing and is not stored.
    pub fn from_p12(p12_data: &[u8], password: &str) -> Result<Self> {
        let pfx = p12::PFX::parse(p12_data)
            .map_err(|e| Error::Certificate(format!("Failed to parse PKCS#12: {:?}", e)))?;

        // verify_mac only implements HMAC-SHA1.
        if let Some(mac_data) = &pfx.mac_data {
            if mac_data.mac.digest_algorithm != p12::AlgorithmIdentifier::Sha1 {
                return Err(unsupported_p12());
            }
        }

        if !pfx.verify_mac(password) {
            return Err(Error::InvalidPassword);
        }

        // With the MAC verified, a bag that still fails to decrypt uses a
        // scheme the parser cannot handle (PBES2/AES).
        let bags = pfx.bags(password).map_err(|_| unsupported_p12())?;
        for bag in &bags {
            if let p12::SafeBagKind::Pkcs8ShroudedKeyBag(info) = &bag.bag {
                if !is_legacy_pbe(&info.encryption_algorithm) {
                    return Err(unsupported_p12());
                }
            }
        }

        let keys = pfx.key_bags(password).map_err(|e| {
            Error::Certificate(format!("Failed to extract keys from PKCS#12: {:?}", e))
        })?;

        let certs = pfx.cert_x509_bags(password).map_err(|e| {
            Error::Certificate(format!("Failed to extract certs from PKCS#12: {:?}", e))
        })?;

        if certs.is_empty() {
            return Err(Error::Certificate("No certificate in PKCS#12".into()));
        }
        if keys.is_empty() {
            return Err(Error::Certificate("No private key in PKCS#12".into()));
        }

        let signing_key = InMemorySigningKeyPair::from_pkcs8_der(&keys[0])
            .map_err(|e| Error::Certificate(format!("Failed to parse private key: {}", e)))?;

        let mut parsed = certs
            .into_iter()
            .map(|der| {
                CapturedX509Certificate::from_der(der).map_err(|e| {
                    Error::Certificate(format!("Failed to parse certificate DER: {}", e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Pick the certificate that matches the key; bags are not ordered.
        let key_public = signing_key.public_key_data();
        let index = parsed
            .iter()
            .position(|cert| cert.public_key_data() == key_public)
            .ok_or_else(|| {
                Error::Certificate("Private key does not match any certificate in PKCS#12".into())
            })?;
        let certificate = parsed.remove(index);

        Self::new(certificate, signing_key, parsed)
    }

    /// Append the certificates of an intermediate chain file (PEM bundle or DER).
    pub fn with_intermediate(mut self, data: &[u8]) -> Result<Self> {
        let mut certs = parse_certificates(data)?;
        tracing::debug!(count = certs.len(), "loaded intermediate certificates");
        self.cert_chain.append(&mut certs);
        Ok(self)
    }

    fn new(
        certificate: CapturedX509Certificate,
        signing_key: InMemorySigningKeyPair,
        cert_chain: Vec<CapturedX509Certificate>,
    ) -> Result<Self> {
        if certificate.public_key_data() != signing_key.public_key_data() {
            return Err(Error::Certificate(
                "Private key does not match certificate public key".into(),
            ));
        }

        Ok(Self {
            certificate,
            signing_key,
            cert_chain,
        })
    }
}

fn unsupported_p12() -> Error {
    Error::Certificate(
        "unsupported PKCS#12 MAC/encryption (re-export with legacy SHA-1/3DES), \
         or use --backend openssl"
            .into(),
    )
}

fn is_legacy_pbe(algorithm: &p12::AlgorithmIdentifier) -> bool {
    matches!(
        algorithm,
        p12::AlgorithmIdentifier::PbewithSHAAnd40BitRC2CBC(_)
            | p12::AlgorithmIdentifier::PbeWithSHAAnd3KeyTripleDESCBC(_)
    )
}

/// Parse one or more PEM certificates, falling back to a single DER certificate.
fn parse_certificates(data: &[u8]) -> Result<Vec<CapturedX509Certificate>> {
    if let Ok(certs) = CapturedX509Certificate::from_pem_multiple(data) {
        if !certs.is_empty() {
            return Ok(certs);
        }
    }

    CapturedX509Certificate::from_der(data.to_vec())
        .map(|cert| vec![cert])
        .map_err(|e| Error::Certificate(format!("Failed to load intermediate certificate: {}", e)))
}

//! Detached CMS signing in pure Rust.
//!
//! Uses the cryptographic-message-syntax crate for `SignedData` generation.

use super::{PureRustCredentials, Signer};
use crate::{Error, Result};
use cryptographic_message_syntax::{SignedDataBuilder, SignerBuilder};
use x509_certificate::{CapturedX509Certificate, KeyInfoSigner};

/// Generate a detached CMS signature over `data`.
///
/// The content itself is not embedded. The signing certificate and every
/// certificate in `cert_chain` are included in the `certificates` set.
///
/// # Arguments
///
/// * `data` - The bytes to sign (the manifest)
/// * `signing_key` - The private key implementing KeyInfoSigner trait
/// * `signing_cert` - The signing certificate as CapturedX509Certificate
/// * `cert_chain` - Certificate chain (intermediate CAs)
pub fn sign_detached<K: KeyInfoSigner>(
    data: &[u8],
    signing_key: &K,
    signing_cert: &CapturedX509Certificate,
    cert_chain: &[CapturedX509Certificate],
) -> Result<Vec<u8>> {
    let signer = SignerBuilder::new(signing_key, signing_cert.clone());

    let mut builder = SignedDataBuilder::default()
        .content_external(data.to_vec())
        .signer(signer)
        .certificate(signing_cert.clone());

    for cert in cert_chain {
        builder = builder.certificate(cert.clone());
    }

    let der = builder
        .build_der()
        .map_err(|e| Error::Signing(format!("Failed to build CMS signature: {}", e)))?;

    Ok(der)
}

/// [`Signer`] backed by pure Rust cryptography.
pub struct PureSigner {
    credentials: PureRustCredentials,
}

impl PureSigner {
    /// Create a signer from loaded credentials.
    pub fn new(credentials: PureRustCredentials) -> Self {
        Self { credentials }
    }
}

impl Signer for PureSigner {
    fn name(&self) -> &'static str {
        "pure"
    }

    fn sign(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        sign_detached(
            manifest,
            &self.credentials.signing_key,
            &self.credentials.certificate,
            &self.credentials.cert_chain,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cert::tests::{generate_test_cert, generate_test_key, legacy_p12};
    use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
    use openssl::stack::Stack;
    use openssl::x509::store::X509StoreBuilder;
    use openssl::x509::X509;

    fn verify_with_openssl(der: &[u8], content: &[u8]) -> bool {
        let pkcs7 = Pkcs7::from_der(der).unwrap();
        let store = X509StoreBuilder::new().unwrap().build();
        let certs: Stack<X509> = Stack::new().unwrap();
        pkcs7
            .verify(
                &certs,
                &store,
                Some(content),
                None,
                Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
            )
            .is_ok()
    }

    #[test]
    fn test_pure_signature_verifies_with_openssl() {
        let key = generate_test_key();
        let cert = generate_test_cert(&key, "Signer");
        let intermediate = generate_test_cert(&generate_test_key(), "Intermediate");

        let credentials = PureRustCredentials::from_p12(&legacy_p12(&key, &cert, "secret"), "secret")
            .unwrap()
            .with_intermediate(&intermediate.to_pem().unwrap())
            .unwrap();

        let manifest = br#"{"website.json":{"hashType":"sha512","hashValue":"ab"}}"#;
        let der = PureSigner::new(credentials).sign(manifest).unwrap();

        assert_eq!(der[0], 0x30);
        assert!(verify_with_openssl(&der, manifest));
        assert!(!verify_with_openssl(&der, b"tampered"));
    }

    #[test]
    fn test_signature_is_detached() {
        let key = generate_test_key();
        let cert = generate_test_cert(&key, "Signer");
        let credentials = PureRustCredentials::from_pem(
            &cert.to_pem().unwrap(),
            &key.private_key_to_pem_pkcs8().unwrap(),
        )
        .unwrap();

        let marker = b"UNIQUE-MANIFEST-MARKER-0123456789";
        let der = PureSigner::new(credentials).sign(marker).unwrap();

        assert!(!der.windows(marker.len()).any(|w| w == marker));
    }
}

//! Certificate and private key loading, and PKCS#7 signing with OpenSSL.

use super::{read_file, Signer};
use crate::{Error, Result};
use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

/// Signing assets: certificate, private key, and intermediate chain.
pub struct SigningAssets {
    /// X.509 signing certificate
    pub certificate: X509,
    /// Private key matching `certificate`
    pub private_key: PKey<Private>,
    /// Intermediate certificates embedded in the signature
    pub cert_chain: Vec<X509>,
}

impl SigningAssets {
    /// Load from separate certificate and private key files (PEM or DER).
    pub fn from_pem(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        key_password: Option<&SecretString>,
    ) -> Result<Self> {
        let cert_data = read_file(cert_path.as_ref())?;
        let key_data = read_file(key_path.as_ref())?;

        let certificate = X509::from_pem(&cert_data)
            .or_else(|_| X509::from_der(&cert_data))
            .map_err(|e| Error::Certificate(format!("Failed to load certificate: {}", e)))?;

        let private_key = if let Some(pass) = key_password {
            PKey::private_key_from_pem_passphrase(&key_data, pass.expose_secret().as_bytes())
        } else {
            PKey::private_key_from_pem(&key_data)
                .or_else(|_| PKey::private_key_from_der(&key_data))
        }
        .map_err(|e| Error::Certificate(format!("Failed to load private key: {}", e)))?;

        Self::validate_key_pair(&certificate, &private_key)?;

        Ok(Self {
            certificate,
            private_key,
            cert_chain: Vec::new(),
        })
    }

    /// Load from a PKCS#12 (.p12) file.
    ///
    /// A missing password is treated as the empty string. Any CA
    /// certificates bundled in the container are kept as the start of the
    /// chain.
    pub fn from_p12(p12_path: impl AsRef<Path>, password: Option<&SecretString>) -> Result<Self> {
        let p12_data = read_file(p12_path.as_ref())?;

        let pkcs12 = Pkcs12::from_der(&p12_data)
            .map_err(|e| Error::Certificate(format!("Invalid PKCS#12: {}", e)))?;

        let pass = password.map(|s| s.expose_secret().as_str()).unwrap_or("");
        let parsed = pkcs12.parse2(pass).map_err(|e| {
            tracing::debug!(error = %e, "PKCS#12 parse failed");
            Error::InvalidPassword
        })?;

        let certificate = parsed
            .cert
            .ok_or_else(|| Error::Certificate("No certificate in PKCS#12".into()))?;

        let private_key = parsed
            .pkey
            .ok_or_else(|| Error::Certificate("No private key in PKCS#12".into()))?;

        Self::validate_key_pair(&certificate, &private_key)?;

        let cert_chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();

        Ok(Self {
            certificate,
            private_key,
            cert_chain,
        })
    }

    /// Append the certificates of an intermediate chain file (PEM bundle or DER).
    pub fn with_intermediate(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let data = read_file(path.as_ref())?;
        let mut certs = parse_certificates(&data)?;
        tracing::debug!(count = certs.len(), "loaded intermediate certificates");
        self.cert_chain.append(&mut certs);
        Ok(self)
    }

    /// Validate that the private key matches the certificate's public key
    fn validate_key_pair(cert: &X509, private_key: &PKey<Private>) -> Result<()> {
        let cert_public_key = cert.public_key().map_err(|e| {
            Error::Certificate(format!(
                "Failed to extract public key from certificate: {}",
                e
            ))
        })?;

        if !private_key.public_eq(&cert_public_key) {
            return Err(Error::Certificate(
                "Private key does not match certificate public key".into(),
            ));
        }

        Ok(())
    }
}

/// Parse one or more PEM certificates, falling back to a single DER certificate.
fn parse_certificates(data: &[u8]) -> Result<Vec<X509>> {
    if let Ok(certs) = X509::stack_from_pem(data) {
        if !certs.is_empty() {
            return Ok(certs);
        }
    }

    X509::from_der(data)
        .map(|cert| vec![cert])
        .map_err(|e| Error::Certificate(format!("Failed to load intermediate certificate: {}", e)))
}

/// [`Signer`] backed by the OpenSSL library.
///
/// Produces the same structure as `openssl smime -sign -binary -outform der`:
/// a detached PKCS#7 `SignedData` with the signer certificate and the
/// intermediate chain embedded.
pub struct OpensslSigner {
    assets: SigningAssets,
}

impl OpensslSigner {
    /// Create a signer from loaded assets.
    pub fn new(assets: SigningAssets) -> Self {
        Self { assets }
    }
}

impl Signer for OpensslSigner {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn sign(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        let mut chain = Stack::new()
            .map_err(|e| Error::Signing(format!("Failed to allocate certificate stack: {}", e)))?;
        for cert in &self.assets.cert_chain {
            chain
                .push(cert.clone())
                .map_err(|e| Error::Signing(format!("Failed to add certificate: {}", e)))?;
        }

        let pkcs7 = Pkcs7::sign(
            &self.assets.certificate,
            &self.assets.private_key,
            &chain,
            manifest,
            Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY,
        )
        .map_err(|e| Error::Signing(format!("Failed to build PKCS#7 signature: {}", e)))?;

        pkcs7
            .to_der()
            .map_err(|e| Error::Signing(format!("Failed to encode signature: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::hash::MessageDigest;
    use openssl::rsa::Rsa;
    use openssl::x509::store::X509StoreBuilder;
    use openssl::x509::{X509Builder, X509NameBuilder};
    use std::fs;
    use tempfile::TempDir;

    /// Helper to generate a test RSA key pair
    fn generate_test_key() -> PKey<Private> {
        PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
    }

    /// Helper to generate a self-signed certificate for a given private key
    fn generate_test_cert(private_key: &PKey<Private>, cn: &str) -> X509 {
        let mut name_builder = X509NameBuilder::new().unwrap();
        name_builder.append_entry_by_text("CN", cn).unwrap();
        let name = name_builder.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();

        let serial = BigNum::from_u32(1).unwrap();
        builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();

        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(private_key).unwrap();

        let not_before = Asn1Time::days_from_now(0).unwrap();
        let not_after = Asn1Time::days_from_now(365).unwrap();
        builder.set_not_before(&not_before).unwrap();
        builder.set_not_after(&not_after).unwrap();

        builder.sign(private_key, MessageDigest::sha256()).unwrap();
        builder.build()
    }

    fn write_p12(dir: &Path, key: &PKey<Private>, cert: &X509, password: &str) -> std::path::PathBuf {
        let p12 = Pkcs12::builder()
            .name("Website Push ID: web.com.example")
            .pkey(key)
            .cert(cert)
            .build2(password)
            .unwrap();
        let path = dir.join("cert.p12");
        fs::write(&path, p12.to_der().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_validate_key_pair_matching() {
        let private_key = generate_test_key();
        let certificate = generate_test_cert(&private_key, "Test Certificate");

        let result = SigningAssets::validate_key_pair(&certificate, &private_key);
        assert!(result.is_ok(), "Matching key pair should validate successfully");
    }

    #[test]
    fn test_validate_key_pair_mismatched() {
        let key1 = generate_test_key();
        let key2 = generate_test_key();
        let certificate = generate_test_cert(&key1, "Test Certificate");

        let err = SigningAssets::validate_key_pair(&certificate, &key2).unwrap_err();
        assert!(
            err.to_string().contains("does not match"),
            "Error message should indicate key mismatch: {}",
            err
        );
    }

    #[test]
    fn test_from_p12_wrong_password() {
        let temp_dir = TempDir::new().unwrap();
        let key = generate_test_key();
        let cert = generate_test_cert(&key, "Signer");
        let p12 = write_p12(temp_dir.path(), &key, &cert, "correct");

        let wrong = SecretString::new("wrong".into());
        let result = SigningAssets::from_p12(&p12, Some(&wrong));
        assert!(matches!(result, Err(Error::InvalidPassword)));
    }

    #[test]
    fn test_from_p12_missing_file() {
        let result = SigningAssets::from_p12("/nonexistent/cert.p12", None);
        assert!(matches!(result, Err(Error::FileRead { .. })));
    }

    #[test]
    fn test_from_p12_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cert.p12");
        fs::write(&path, b"not valid p12 data").unwrap();

        let result = SigningAssets::from_p12(&path, None);
        assert!(matches!(result, Err(Error::Certificate(_))));
    }

    #[test]
    fn test_parse_certificates_pem_bundle_and_der() {
        let cert_a = generate_test_cert(&generate_test_key(), "Intermediate A");
        let cert_b = generate_test_cert(&generate_test_key(), "Intermediate B");

        let mut bundle = cert_a.to_pem().unwrap();
        bundle.extend(cert_b.to_pem().unwrap());
        assert_eq!(parse_certificates(&bundle).unwrap().len(), 2);

        let der = cert_a.to_der().unwrap();
        let parsed = parse_certificates(&der).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].to_der().unwrap(), der);

        assert!(parse_certificates(b"garbage").is_err());
    }

    #[test]
    fn test_sign_detached_verifies() {
        let temp_dir = TempDir::new().unwrap();
        let key = generate_test_key();
        let cert = generate_test_cert(&key, "Signer");
        let intermediate = generate_test_cert(&generate_test_key(), "Intermediate");

        let p12 = write_p12(temp_dir.path(), &key, &cert, "secret");
        let chain_path = temp_dir.path().join("intermediate.pem");
        fs::write(&chain_path, intermediate.to_pem().unwrap()).unwrap();

        let password = SecretString::new("secret".into());
        let assets = SigningAssets::from_p12(&p12, Some(&password))
            .unwrap()
            .with_intermediate(&chain_path)
            .unwrap();
        assert_eq!(assets.cert_chain.len(), 1);

        let manifest = br#"{"website.json":{"hashType":"sha512","hashValue":"00"}}"#;
        let der = OpensslSigner::new(assets).sign(manifest).unwrap();

        let pkcs7 = Pkcs7::from_der(&der).unwrap();
        let store = X509StoreBuilder::new().unwrap().build();
        let certs: Stack<X509> = Stack::new().unwrap();
        pkcs7
            .verify(
                &certs,
                &store,
                Some(manifest),
                None,
                Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
            )
            .unwrap();

        // Tampered content must not verify.
        assert!(pkcs7
            .verify(
                &certs,
                &store,
                Some(b"{}"),
                None,
                Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
            )
            .is_err());
    }
}

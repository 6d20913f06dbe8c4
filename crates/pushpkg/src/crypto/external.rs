//! Signing through the `openssl` command-line tool.
//!
//! Mirrors the classic three-command recipe:
//!
//! ```text
//! openssl pkcs12 -in cert.p12 -out sign.crt.pem -nokeys
//! openssl pkcs12 -in cert.p12 -out sign.key.pem -nocerts -nodes
//! openssl smime -sign -signer sign.crt.pem -inkey sign.key.pem \
//!     -certfile intermediate.cer -binary -outform der \
//!     -in manifest.json -out signature
//! ```
//!
//! The extracted certificate and unencrypted key are written into a private
//! temporary directory that is removed when signing returns, on success and
//! on every error path. The container password reaches the tool through the
//! child's environment, never its argument list.

use super::Signer;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable used to hand the password to `openssl -passin env:`.
const PASSWORD_ENV: &str = "PUSHPKG_PKCS12_PASSWORD";

/// [`Signer`] that invokes an external `openssl` binary.
#[derive(Clone)]
pub struct ExternalSigner {
    program: PathBuf,
    pkcs12: PathBuf,
    intermediate: PathBuf,
    password: SecretString,
}

impl ExternalSigner {
    /// Create a signer for the given PKCS#12 container and intermediate chain.
    ///
    /// Pass an empty password for unprotected containers.
    pub fn new(
        pkcs12: impl AsRef<Path>,
        intermediate: impl AsRef<Path>,
        password: SecretString,
    ) -> Self {
        Self {
            program: PathBuf::from("openssl"),
            pkcs12: pkcs12.as_ref().to_path_buf(),
            intermediate: intermediate.as_ref().to_path_buf(),
            password,
        }
    }

    /// Override the `openssl` binary (default: `openssl` from `PATH`).
    pub fn program(mut self, program: impl AsRef<Path>) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    /// Run one tool invocation, failing with its stderr on non-zero exit.
    fn run<I, S>(&self, step: &'static str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        tracing::debug!(step, program = %self.program.display(), "running external signer");

        let output = Command::new(&self.program)
            .args(args)
            .env(PASSWORD_ENV, self.password.expose_secret())
            .output()
            .map_err(|e| Error::ExternalTool {
                step,
                status: None,
                stderr: format!("failed to run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(Error::ExternalTool {
                step,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Signer for ExternalSigner {
    fn name(&self) -> &'static str {
        "external"
    }

    fn sign(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        let scratch = tempfile::Builder::new()
            .prefix("pushpkg-sign-")
            .tempdir()
            .map_err(|e| Error::Io(std::io::Error::other(format!(
                "Failed to create temp directory: {e}"
            ))))?;

        let cert_pem = scratch.path().join("sign.crt.pem");
        let key_pem = scratch.path().join("sign.key.pem");
        let manifest_path = scratch.path().join("manifest.json");
        let signature_path = scratch.path().join("signature");
        let passin = format!("env:{PASSWORD_ENV}");

        fs::write(&manifest_path, manifest).map_err(|source| Error::FileWrite {
            path: manifest_path.clone(),
            source,
        })?;

        self.run(
            "extract certificate",
            [
                OsStr::new("pkcs12"),
                OsStr::new("-in"),
                self.pkcs12.as_os_str(),
                OsStr::new("-out"),
                cert_pem.as_os_str(),
                OsStr::new("-nokeys"),
                OsStr::new("-passin"),
                OsStr::new(&passin),
            ],
        )?;

        self.run(
            "extract private key",
            [
                OsStr::new("pkcs12"),
                OsStr::new("-in"),
                self.pkcs12.as_os_str(),
                OsStr::new("-out"),
                key_pem.as_os_str(),
                OsStr::new("-nocerts"),
                OsStr::new("-nodes"),
                OsStr::new("-passin"),
                OsStr::new(&passin),
            ],
        )?;

        self.run(
            "sign manifest",
            [
                OsStr::new("smime"),
                OsStr::new("-sign"),
                OsStr::new("-signer"),
                cert_pem.as_os_str(),
                OsStr::new("-inkey"),
                key_pem.as_os_str(),
                OsStr::new("-certfile"),
                self.intermediate.as_os_str(),
                OsStr::new("-binary"),
                OsStr::new("-outform"),
                OsStr::new("der"),
                OsStr::new("-in"),
                manifest_path.as_os_str(),
                OsStr::new("-out"),
                signature_path.as_os_str(),
            ],
        )?;

        let signature = fs::read(&signature_path)?;

        scratch.close()?;

        Ok(signature)
    }
}

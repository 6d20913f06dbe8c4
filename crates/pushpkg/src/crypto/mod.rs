//! Manifest signing.
//!
//! A push package signature is a detached, DER-encoded PKCS#7/CMS
//! `SignedData` over the exact bytes of `manifest.json`, made with the
//! certificate and key from a PKCS#12 container and carrying the
//! intermediate certificate chain.
//!
//! Three [`Signer`] implementations are provided:
//!
//! | Backend | Type | Requires |
//! |---------|------|----------|
//! | `external` | [`ExternalSigner`] | `openssl` binary on `PATH` |
//! | `openssl` | [`OpensslSigner`] | feature `openssl-backend` |
//! | `pure` | [`PureSigner`] | feature `pure-rust` |

#[cfg(feature = "openssl-backend")]
pub mod assets;
#[cfg(feature = "pure-rust")]
pub mod cert;
#[cfg(feature = "pure-rust")]
pub mod cms;
pub mod external;
pub mod password;

#[cfg(feature = "openssl-backend")]
pub use assets::{OpensslSigner, SigningAssets};
#[cfg(feature = "pure-rust")]
pub use cert::PureRustCredentials;
#[cfg(feature = "pure-rust")]
pub use cms::PureSigner;
pub use external::ExternalSigner;
pub use password::{NoPassword, PasswordProvider, PromptPassword, StaticPassword};

use crate::{Error, Result};
use secrecy::SecretString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Produces a detached signature over manifest bytes.
pub trait Signer {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Sign `manifest` and return the DER-encoded signature.
    fn sign(&self, manifest: &[u8]) -> Result<Vec<u8>>;
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn sign(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(manifest)
    }
}

/// Selects a [`Signer`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Shell out to the `openssl` command-line tool.
    #[default]
    External,
    /// Sign in-process with the OpenSSL library.
    Openssl,
    /// Sign in-process with pure Rust cryptography.
    Pure,
}

impl Backend {
    /// Every backend name accepted by [`FromStr`].
    pub const NAMES: [&'static str; 3] = ["external", "openssl", "pure"];

    /// Build the signer for this backend.
    ///
    /// Library backends load and check the PKCS#12 container and the
    /// intermediate chain here, so a wrong password fails before any build
    /// product is written. The external backend defers all of that to
    /// [`Signer::sign`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the backend was not compiled in, and
    /// credential errors from the library backends.
    pub fn signer(
        self,
        pkcs12: impl AsRef<Path>,
        intermediate: impl AsRef<Path>,
        password: SecretString,
    ) -> Result<Box<dyn Signer>> {
        match self {
            Backend::External => Ok(Box::new(ExternalSigner::new(pkcs12, intermediate, password))),
            #[cfg(feature = "openssl-backend")]
            Backend::Openssl => {
                let assets = SigningAssets::from_p12(pkcs12, Some(&password))?
                    .with_intermediate(intermediate)?;
                Ok(Box::new(OpensslSigner::new(assets)))
            }
            #[cfg(feature = "pure-rust")]
            Backend::Pure => {
                use secrecy::ExposeSecret;

                let p12_data = read_file(pkcs12.as_ref())?;
                let intermediate_data = read_file(intermediate.as_ref())?;
                let credentials =
                    PureRustCredentials::from_p12(&p12_data, password.expose_secret())?
                        .with_intermediate(&intermediate_data)?;
                Ok(Box::new(PureSigner::new(credentials)))
            }
            #[allow(unreachable_patterns)]
            other => Err(Error::Config(format!(
                "Signing backend '{other}' is not available in this build"
            ))),
        }
    }
}

#[cfg_attr(
    not(any(feature = "openssl-backend", feature = "pure-rust")),
    allow(dead_code)
)]
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::External => "external",
            Backend::Openssl => "openssl",
            Backend::Pure => "pure",
        };
        f.write_str(name)
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external" => Ok(Backend::External),
            "openssl" => Ok(Backend::Openssl),
            "pure" | "pure-rust" => Ok(Backend::Pure),
            _ => Err(format!(
                "unknown backend '{s}', expected one of: {}",
                Backend::NAMES.join(", ")
            )),
        }
    }
}

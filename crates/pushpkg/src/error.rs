//! Error types for push package operations.
//!
//! This module defines the [`enum@Error`] enum covering every failure case
//! when building a push package: I/O on the bundle inputs, descriptor
//! parsing, signing credentials, the external signing tool, and archive
//! creation.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::path::PathBuf;
use thiserror::Error;

/// Error type for push package operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Match on variants to handle specific failure cases.
///
/// # Examples
///
/// ```no_run
/// use pushpkg::{Error, ExternalSigner, PushPackage};
/// use secrecy::SecretString;
///
/// let signer = ExternalSigner::new("cert.p12", "AppleWWDRCA.cer", SecretString::new(String::new()));
/// match PushPackage::new().build(&signer) {
///     Ok(report) => println!("Wrote {}", report.package_path.display()),
///     Err(Error::ExternalTool { step, stderr, .. }) => eprintln!("{step} failed: {stderr}"),
///     Err(Error::FileRead { path, .. }) => eprintln!("Cannot read {}", path.display()),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A bundle input could not be read.
    ///
    /// Raised by the manifest builder when an icon or the website descriptor
    /// is missing or unreadable. The offending path is carried so it can be
    /// matched against the validation report.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A build product could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or malformed certificate or PKCS#12 container.
    #[error("Invalid certificate: {0}")]
    Certificate(String),

    /// Incorrect password for the PKCS#12 container.
    #[error("Invalid password for PKCS#12")]
    InvalidPassword,

    /// Signature generation failed inside a library backend.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The external signing tool exited unsuccessfully or could not be run.
    ///
    /// `stderr` holds whatever the tool wrote to its error stream, or the
    /// spawn error when the process never started.
    #[error("{step} failed (exit status {}): {stderr}", status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    ExternalTool {
        /// Which signing step failed.
        step: &'static str,
        /// Process exit code, if the process ran and exited normally.
        status: Option<i32>,
        /// Captured standard error of the tool.
        stderr: String,
    },

    /// Pre-flight validation reported problems and strict mode is on.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Password could not be obtained.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid builder or command-line configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// ZIP archive operation failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

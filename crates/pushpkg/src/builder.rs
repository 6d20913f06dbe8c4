//! PushPackage builder API
//!
//! Provides a builder pattern interface for producing `pushPackage.zip`:
//! validate the inputs, hash them into `manifest.json`, sign the manifest,
//! and assemble the archive.

use crate::archive::{create_push_package, CompressionLevel, PackageSources};
use crate::bundle::{validate, ManifestBuilder, ValidationReport, SIGNATURE};
use crate::crypto::Signer;
use crate::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline position.
///
/// A run moves `Validating → ManifestBuilt → Signed → Packaged → Done`.
/// Any fatal error moves it to `Aborted` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Checking the descriptor and icons.
    Validating,
    /// `manifest.json` has been written.
    ManifestBuilt,
    /// `signature` has been written.
    Signed,
    /// `pushPackage.zip` has been written.
    Packaged,
    /// Run finished successfully.
    Done,
    /// Run stopped on an unrecoverable error.
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::ManifestBuilt => "manifest built",
            Stage::Signed => "signed",
            Stage::Packaged => "packaged",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of a successful [`PushPackage::build`].
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Validation outcome. May contain problems when not in strict mode.
    pub validation: ValidationReport,
    /// Path of the written `manifest.json`.
    pub manifest_path: PathBuf,
    /// Path of the written `signature`.
    pub signature_path: PathBuf,
    /// Path of the written `pushPackage.zip`.
    pub package_path: PathBuf,
}

/// Push package builder.
///
/// # Example
///
/// ```no_run
/// use pushpkg::{ExternalSigner, PushPackage};
/// use secrecy::SecretString;
///
/// let signer = ExternalSigner::new(
///     "website_aps_production.p12",
///     "AppleWWDRCA.cer",
///     SecretString::new("secret".into()),
/// );
///
/// let report = PushPackage::new()
///     .website_json("site/website.json")
///     .icon_set("site/icon.iconset")
///     .output_dir("dist")
///     .strict(true)
///     .build(&signer)?;
/// println!("{}", report.package_path.display());
/// # Ok::<(), pushpkg::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PushPackage {
    website_json: PathBuf,
    icon_set: PathBuf,
    work_dir: PathBuf,
    output_dir: PathBuf,
    strict: bool,
    compression_level: CompressionLevel,
}

impl PushPackage {
    /// Create a builder with the default layout: `website.json` and
    /// `icon.iconset` in the current directory, build products and the
    /// package written to the current directory, non-strict validation.
    pub fn new() -> Self {
        Self {
            website_json: PathBuf::from("website.json"),
            icon_set: PathBuf::from("icon.iconset"),
            work_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            strict: false,
            compression_level: CompressionLevel::DEFAULT,
        }
    }

    /// Set the website descriptor path.
    pub fn website_json(mut self, path: impl AsRef<Path>) -> Self {
        self.website_json = path.as_ref().to_path_buf();
        self
    }

    /// Set the icon directory.
    pub fn icon_set(mut self, path: impl AsRef<Path>) -> Self {
        self.icon_set = path.as_ref().to_path_buf();
        self
    }

    /// Set where `manifest.json` and `signature` are written.
    ///
    /// These are left in place after the run, successful or not.
    pub fn work_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.work_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the directory receiving `pushPackage.zip`.
    pub fn output_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Abort on validation problems instead of reporting and continuing.
    ///
    /// Off by default: problems are logged and the build carries on, which
    /// can produce a package the push service will reject.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set ZIP compression level (0-9).
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = CompressionLevel::new(level);
        self
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] in strict mode when validation finds problems
    /// - [`Error::FileRead`] when an input file cannot be read
    /// - Any error from the signer, e.g. [`Error::ExternalTool`]
    /// - [`Error::Zip`] / [`Error::Io`] when the archive cannot be written
    ///
    /// No archive is written unless signing succeeded.
    pub fn build<S: Signer + ?Sized>(&self, signer: &S) -> Result<BuildReport> {
        self.execute(signer).1
    }

    /// Run the pipeline and return the terminal stage alongside the result.
    fn execute<S: Signer + ?Sized>(&self, signer: &S) -> (Stage, Result<BuildReport>) {
        let mut stage = Stage::Validating;
        let result = self.run(signer, &mut stage);

        match &result {
            Ok(report) => {
                tracing::info!(
                    package = %report.package_path.display(),
                    problems = report.validation.problems().len(),
                    "push package created"
                );
                advance(&mut stage, Stage::Done);
            }
            Err(e) => {
                tracing::error!(after = %stage, error = %e, "build failed");
                advance(&mut stage, Stage::Aborted);
            }
        }

        (stage, result)
    }

    fn run<S: Signer + ?Sized>(&self, signer: &S, stage: &mut Stage) -> Result<BuildReport> {
        tracing::debug!(
            website_json = %self.website_json.display(),
            icon_set = %self.icon_set.display(),
            strict = self.strict,
            "{stage}"
        );

        let validation = validate(&self.website_json, &self.icon_set);
        if self.strict && !validation.is_ok() {
            return Err(Error::Validation(validation.messages()));
        }

        if !self.work_dir.exists() {
            fs::create_dir_all(&self.work_dir)?;
        }

        let manifest = ManifestBuilder::from_paths(&self.website_json, &self.icon_set).build()?;
        let (manifest_path, manifest_bytes) = manifest.write_to(&self.work_dir)?;
        advance(stage, Stage::ManifestBuilt);

        tracing::debug!(backend = signer.name(), "signing manifest");
        let signature = signer.sign(&manifest_bytes)?;
        let signature_path = self.work_dir.join(SIGNATURE);
        fs::write(&signature_path, &signature).map_err(|source| Error::FileWrite {
            path: signature_path.clone(),
            source,
        })?;
        advance(stage, Stage::Signed);

        let sources = PackageSources {
            icon_set: self.icon_set.clone(),
            website_json: self.website_json.clone(),
            manifest: manifest_path.clone(),
            signature: signature_path.clone(),
        };
        let package_path = create_push_package(&sources, &self.output_dir, self.compression_level)?;
        advance(stage, Stage::Packaged);

        Ok(BuildReport {
            validation,
            manifest_path,
            signature_path,
            package_path,
        })
    }
}

impl Default for PushPackage {
    fn default() -> Self {
        Self::new()
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "stage");
    *stage = next;
}

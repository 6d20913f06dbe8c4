//! Push package archive creation.
//!
//! Creates `pushPackage.zip` with the fixed layout:
//!
//! ```text
//! icon.iconset/
//! icon.iconset/icon_16x16.png
//! ...
//! manifest.json
//! website.json
//! signature
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use pushpkg::archive::{create_push_package, CompressionLevel, PackageSources};
//!
//! let sources = PackageSources {
//!     icon_set: "icon.iconset".into(),
//!     website_json: "website.json".into(),
//!     manifest: "manifest.json".into(),
//!     signature: "signature".into(),
//! };
//! create_push_package(&sources, "dist", CompressionLevel::DEFAULT)?;
//! # Ok::<(), pushpkg::Error>(())
//! ```

use crate::bundle::{ICONSET_DIR, MANIFEST_JSON, PACKAGE_FILE, SIGNATURE, WEBSITE_JSON};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// ZIP compression level for package creation.
///
/// # Examples
///
/// ```
/// use pushpkg::archive::CompressionLevel;
///
/// let fast = CompressionLevel::NONE;
/// let balanced = CompressionLevel::DEFAULT;
/// let small = CompressionLevel::MAX;
///
/// // Custom levels are clamped to 0-9
/// assert_eq!(CompressionLevel::new(3).level(), 3);
/// assert_eq!(CompressionLevel::new(42).level(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// No compression (level 0), entries are stored.
    pub const NONE: CompressionLevel = CompressionLevel(0);

    /// Default compression (level 6).
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Maximum compression (level 9).
    pub const MAX: CompressionLevel = CompressionLevel(9);

    /// Creates a compression level from 0-9.
    ///
    /// Values greater than 9 are clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    /// Returns the compression level value (0-9).
    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }

    fn file_options(self) -> SimpleFileOptions {
        if self.0 == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.0)))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for CompressionLevel {
    fn from(level: u32) -> Self {
        CompressionLevel::new(level)
    }
}

/// On-disk locations of everything that goes into the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSources {
    /// Icon directory, archived whole under `icon.iconset/`.
    pub icon_set: PathBuf,
    /// Website descriptor, archived as `website.json`.
    pub website_json: PathBuf,
    /// Manifest, archived as `manifest.json`.
    pub manifest: PathBuf,
    /// Detached signature, archived as `signature`.
    pub signature: PathBuf,
}

/// Creates `pushPackage.zip` in `output_dir`, replacing any existing file.
///
/// Every regular file under the icon directory is added (recursively, in
/// file-name order) beneath `icon.iconset/`, regardless of the directory's
/// own name. The manifest, descriptor, and signature follow at the root.
///
/// Returns the path of the written archive.
///
/// # Errors
///
/// Returns [`Error::FileRead`] if the icon directory or any source file is
/// missing, [`Error::Io`] if the output cannot be created, and
/// [`Error::Zip`] if the archive cannot be written.
pub fn create_push_package(
    sources: &PackageSources,
    output_dir: impl AsRef<Path>,
    compression_level: CompressionLevel,
) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    let icon_set = sources.icon_set.as_path();

    if !icon_set.is_dir() {
        return Err(Error::FileRead {
            path: icon_set.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "icon set is not a directory"),
        });
    }

    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }

    let output_path = output_dir.join(PACKAGE_FILE);
    let options = compression_level.file_options();

    let file = File::create(&output_path).map_err(|source| Error::FileWrite {
        path: output_path.clone(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);

    zip.add_directory(format!("{ICONSET_DIR}/"), options)?;

    for entry in WalkDir::new(icon_set).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::FileRead {
            path: e.path().unwrap_or(icon_set).to_path_buf(),
            source: e.into(),
        })?;

        let relative_path = entry.path().strip_prefix(icon_set).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Failed to compute relative path",
            ))
        })?;

        let archive_path = format!("{ICONSET_DIR}/{}", archive_name(relative_path));

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{archive_path}/"), options)?;
        } else {
            add_file(&mut zip, entry.path(), &archive_path, options)?;
        }
    }

    add_file(&mut zip, &sources.manifest, MANIFEST_JSON, options)?;
    add_file(&mut zip, &sources.website_json, WEBSITE_JSON, options)?;
    add_file(&mut zip, &sources.signature, SIGNATURE, options)?;

    zip.finish()?;

    Ok(output_path)
}

fn add_file<W: Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    archive_path: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let buffer = fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    zip.start_file(archive_path, options)?;
    zip.write_all(&buffer)?;
    Ok(())
}

/// `/`-joined relative path, independent of the host separator.
fn archive_name(relative_path: &Path) -> String {
    relative_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

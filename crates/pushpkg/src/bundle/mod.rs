//! Push package bundle inputs.
//!
//! This module provides functionality to:
//! - Describe the fixed set of files a push package is made of
//! - Validate the website descriptor and icon set before building
//! - Hash the bundle files into `manifest.json`
//!
//! # Package Layout
//!
//! | Archive path | Source |
//! |--------------|--------|
//! | `icon.iconset/<icon>` | every file of the icon directory |
//! | `website.json` | the website descriptor |
//! | `manifest.json` | SHA-512 hashes of the icons and descriptor |
//! | `signature` | detached DER signature over `manifest.json` |
//!
//! # Examples
//!
//! ```no_run
//! use pushpkg::bundle::{validate, ManifestBuilder};
//!
//! let report = validate("website.json", "icon.iconset");
//! for problem in report.problems() {
//!     eprintln!("{problem}");
//! }
//!
//! let manifest = ManifestBuilder::from_paths("website.json", "icon.iconset").build()?;
//! manifest.write_to(".")?;
//! # Ok::<(), pushpkg::Error>(())
//! ```

pub mod manifest;
pub mod validate;

pub use manifest::{hash_file, HashType, Manifest, ManifestBuilder, ManifestEntry};
pub use validate::{validate, Problem, ValidationReport};

use std::path::{Path, PathBuf};

/// Archive name of the website descriptor.
pub const WEBSITE_JSON: &str = "website.json";

/// File name of the manifest, both on disk and in the archive.
pub const MANIFEST_JSON: &str = "manifest.json";

/// File name of the detached signature, both on disk and in the archive.
pub const SIGNATURE: &str = "signature";

/// Archive folder holding the icon set.
pub const ICONSET_DIR: &str = "icon.iconset";

/// File name of the produced package.
pub const PACKAGE_FILE: &str = "pushPackage.zip";

/// Keys that must be present in `website.json`.
pub const REQUIRED_WEBSITE_FIELDS: [&str; 6] = [
    "websiteName",
    "websitePushID",
    "allowedDomains",
    "urlFormatString",
    "authenticationToken",
    "webServiceURL",
];

/// Icons that must be present in the icon set.
pub const REQUIRED_ICON_FILES: [&str; 6] = [
    "icon_16x16.png",
    "icon_16x16@2x.png",
    "icon_32x32.png",
    "icon_32x32@2x.png",
    "icon_128x128.png",
    "icon_128x128@2x.png",
];

/// A file that is hashed into the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Name inside the archive, always `/`-separated.
    pub name: String,
}

/// Returns the manifest file list: the six icons in their fixed order,
/// followed by the website descriptor.
pub fn file_list(website_json: impl AsRef<Path>, icon_set: impl AsRef<Path>) -> Vec<BundleFile> {
    let icon_set = icon_set.as_ref();

    let mut files: Vec<BundleFile> = REQUIRED_ICON_FILES
        .iter()
        .map(|name| BundleFile {
            path: icon_set.join(name),
            name: format!("{ICONSET_DIR}/{name}"),
        })
        .collect();

    files.push(BundleFile {
        path: website_json.as_ref().to_path_buf(),
        name: WEBSITE_JSON.to_string(),
    });

    files
}

//! `manifest.json` generation for push packages.
//!
//! The manifest maps each archive name to the SHA-512 hash of the file's
//! exact bytes. Keys keep the fixed file-list order so the output is
//! byte-identical across runs on unchanged inputs.

use super::{file_list, BundleFile, MANIFEST_JSON};
use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha512};
use std::fs;
use std::path::{Path, PathBuf};

/// Digest algorithm recorded in a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    /// SHA-512, hex encoded.
    Sha512,
}

/// Hash record for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Always [`HashType::Sha512`].
    pub hash_type: HashType,
    /// Lowercase hex digest, 128 characters.
    pub hash_value: String,
}

/// Ordered mapping from archive name to [`ManifestEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(String, ManifestEntry)>,
}

impl Manifest {
    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, ManifestEntry)] {
        &self.entries
    }

    /// Looks up an entry by archive name.
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON encoding, keys in insertion order.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Writes `manifest.json` into `dir`, replacing any previous file.
    ///
    /// Returns the written path and the exact bytes, which are what gets signed.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, Vec<u8>)> {
        let path = dir.as_ref().join(MANIFEST_JSON);
        let json = self.to_json()?;
        fs::write(&path, &json).map_err(|source| Error::FileWrite {
            path: path.clone(),
            source,
        })?;
        Ok((path, json))
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

/// Builder for the push package manifest.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    files: Vec<BundleFile>,
}

impl ManifestBuilder {
    /// Create a builder over an explicit file list.
    pub fn new(files: Vec<BundleFile>) -> Self {
        Self { files }
    }

    /// Create a builder over the standard push package file list.
    pub fn from_paths(website_json: impl AsRef<Path>, icon_set: impl AsRef<Path>) -> Self {
        Self::new(file_list(website_json, icon_set))
    }

    /// Hash every file and return the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileRead`] naming the first file that cannot be read.
    /// Nothing is written in that case.
    pub fn build(&self) -> Result<Manifest> {
        let mut entries = Vec::with_capacity(self.files.len());

        for file in &self.files {
            let hash_value = hash_file(&file.path)?;
            tracing::debug!(name = %file.name, hash = %hash_value, "hashed");
            entries.push((
                file.name.clone(),
                ManifestEntry {
                    hash_type: HashType::Sha512,
                    hash_value,
                },
            ));
        }

        Ok(Manifest { entries })
    }
}

/// Compute the lowercase hex SHA-512 digest of a file.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(Sha512::digest(&data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::REQUIRED_ICON_FILES;
    use tempfile::TempDir;

    /// SHA-512 of the empty string.
    const EMPTY_SHA512: &str = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
                                47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e";

    fn create_bundle(dir: &Path) -> (PathBuf, PathBuf) {
        let website_json = dir.join("website.json");
        fs::write(&website_json, br#"{"websiteName":"Test"}"#).unwrap();

        let icon_set = dir.join("icons");
        fs::create_dir_all(&icon_set).unwrap();
        for (i, name) in REQUIRED_ICON_FILES.iter().enumerate() {
            fs::write(icon_set.join(name), vec![i as u8; 64 * (i + 1)]).unwrap();
        }

        (website_json, icon_set)
    }

    #[test]
    fn test_hash_file_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        assert_eq!(hash_file(&path).unwrap(), EMPTY_SHA512);
    }

    #[test]
    fn test_hash_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.png");

        match hash_file(&path) {
            Err(Error::FileRead { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[test]
    fn test_manifest_entries() {
        let temp_dir = TempDir::new().unwrap();
        let (website_json, icon_set) = create_bundle(temp_dir.path());

        let manifest = ManifestBuilder::from_paths(&website_json, &icon_set)
            .build()
            .unwrap();

        assert_eq!(manifest.len(), 7);
        for (name, entry) in manifest.entries() {
            assert_eq!(entry.hash_type, HashType::Sha512);
            assert_eq!(entry.hash_value.len(), 128, "{name}");
            assert!(entry
                .hash_value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }

        let website = manifest.get("website.json").unwrap();
        let expected = hex::encode(Sha512::digest(fs::read(&website_json).unwrap()));
        assert_eq!(website.hash_value, expected);
        assert!(manifest.get("icon.iconset/icon_32x32@2x.png").is_some());
    }

    #[test]
    fn test_manifest_json_shape() {
        let temp_dir = TempDir::new().unwrap();
        let (website_json, icon_set) = create_bundle(temp_dir.path());

        let manifest = ManifestBuilder::from_paths(&website_json, &icon_set)
            .build()
            .unwrap();
        let json = String::from_utf8(manifest.to_json().unwrap()).unwrap();

        assert!(json.starts_with(r#"{"icon.iconset/icon_16x16.png":{"hashType":"sha512","hashValue":""#));
        assert!(!json.contains('\n'));
        assert!(!json.contains(": "));

        // Keys follow the file-list order, not alphabetical order.
        let pos_128 = json.find("icon_128x128.png").unwrap();
        let pos_32 = json.find("icon_32x32.png").unwrap();
        let pos_website = json.find("\"website.json\"").unwrap();
        assert!(pos_32 < pos_128);
        assert!(pos_128 < pos_website);
    }

    #[test]
    fn test_manifest_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let (website_json, icon_set) = create_bundle(temp_dir.path());
        let builder = ManifestBuilder::from_paths(&website_json, &icon_set);

        let out_dir = temp_dir.path().join("work");
        fs::create_dir_all(&out_dir).unwrap();

        let (path, first) = builder.build().unwrap().write_to(&out_dir).unwrap();
        let on_disk_first = fs::read(&path).unwrap();
        let (_, second) = builder.build().unwrap().write_to(&out_dir).unwrap();

        assert_eq!(first, second);
        assert_eq!(on_disk_first, fs::read(&path).unwrap());
    }

    #[test]
    fn test_write_overwrites_previous_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let (website_json, icon_set) = create_bundle(temp_dir.path());
        let stale = temp_dir.path().join(MANIFEST_JSON);
        fs::write(&stale, vec![b'x'; 4096]).unwrap();

        let (path, json) = ManifestBuilder::from_paths(&website_json, &icon_set)
            .build()
            .unwrap()
            .write_to(temp_dir.path())
            .unwrap();

        assert_eq!(path, stale);
        assert_eq!(fs::read(&path).unwrap(), json);
    }

    #[test]
    fn test_missing_file_fails_without_partial_output() {
        let temp_dir = TempDir::new().unwrap();
        let (website_json, icon_set) = create_bundle(temp_dir.path());
        let missing = icon_set.join("icon_32x32.png");
        fs::remove_file(&missing).unwrap();

        let result = ManifestBuilder::from_paths(&website_json, &icon_set).build();
        match result {
            Err(Error::FileRead { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected FileRead, got {other:?}"),
        }
        assert!(!temp_dir.path().join(MANIFEST_JSON).exists());
    }
}

//! Pre-flight checks for the website descriptor and icon set.
//!
//! Validation never fails the build on its own. It returns a
//! [`ValidationReport`] and logs one warning per problem; whether the build
//! proceeds is decided by [`crate::PushPackage::strict`].

use super::{REQUIRED_ICON_FILES, REQUIRED_WEBSITE_FIELDS};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// The descriptor could not be read or is not a JSON object.
    InvalidDescriptor,
    /// A required descriptor field is absent, of the wrong type, or empty.
    MissingField(&'static str),
    /// A required icon file does not exist.
    MissingIcon(PathBuf),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::InvalidDescriptor => write!(f, "Invalid website.json file"),
            Problem::MissingField(field) => {
                write!(f, "Field {field} of website.json is required")
            }
            Problem::MissingIcon(path) => {
                write!(f, "Icon file in path {} not found", path.display())
            }
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    problems: Vec<Problem>,
}

impl ValidationReport {
    /// True when no problems were found.
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    /// Problems in the order they were found: descriptor first, then icons.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Problems rendered as human-readable lines.
    pub fn messages(&self) -> Vec<String> {
        self.problems.iter().map(ToString::to_string).collect()
    }
}

/// Validate a website descriptor and icon directory.
///
/// Checks, in order:
/// 1. `website_json` parses as a JSON object. If not, a single
///    [`Problem::InvalidDescriptor`] is recorded and field checks are skipped.
/// 2. Every field in [`REQUIRED_WEBSITE_FIELDS`] holds a non-empty string.
///    `allowedDomains` may instead be a non-empty array of non-empty strings.
/// 3. Every file in [`REQUIRED_ICON_FILES`] exists under `icon_set`.
///
/// Each problem is logged at `warn` level as it is found.
pub fn validate(website_json: impl AsRef<Path>, icon_set: impl AsRef<Path>) -> ValidationReport {
    let mut problems = Vec::new();

    match read_descriptor(website_json.as_ref()) {
        Some(descriptor) => {
            for field in REQUIRED_WEBSITE_FIELDS {
                if !field_present(&descriptor, field) {
                    problems.push(Problem::MissingField(field));
                }
            }
        }
        None => problems.push(Problem::InvalidDescriptor),
    }

    let icon_set = icon_set.as_ref();
    for name in REQUIRED_ICON_FILES {
        let path = icon_set.join(name);
        if !path.is_file() {
            problems.push(Problem::MissingIcon(path));
        }
    }

    for problem in &problems {
        tracing::warn!("{problem}");
    }

    ValidationReport { problems }
}

fn read_descriptor(path: &Path) -> Option<serde_json::Map<String, Value>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot read descriptor");
            return None;
        }
    };

    match serde_json::from_slice::<Value>(&data) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "descriptor is not valid JSON");
            None
        }
    }
}

fn field_present(descriptor: &serde_json::Map<String, Value>, field: &str) -> bool {
    match descriptor.get(field) {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) if field == "allowedDomains" => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.as_str().is_some_and(|s| !s.is_empty()))
        }
        _ => false,
    }
}

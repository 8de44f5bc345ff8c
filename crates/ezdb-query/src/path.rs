//! Paths that may point at local files or remote object storage

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// A file location that keeps URI schemes such as `s3://` intact.
///
/// `PathBuf` normalizes `s3://bucket/key` into `s3:/bucket/key`, which the
/// engine no longer recognizes as remote. `StoragePath` keeps remote locations
/// as `scheme://rest` and local ones as ordinary paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoragePath {
    Local(PathBuf),
    Remote { scheme: String, location: String },
}

impl StoragePath {
    /// Parse a string into a local or remote path
    pub fn parse(value: &str) -> Self {
        if let Some((scheme, rest)) = value.split_once("://") {
            let valid_scheme = !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
            if valid_scheme {
                return StoragePath::Remote {
                    scheme: scheme.to_ascii_lowercase(),
                    location: rest.to_string(),
                };
            }
        }
        StoragePath::Local(PathBuf::from(value))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StoragePath::Remote { .. })
    }

    /// URI scheme for remote paths (`s3`, `gs`, `https`, ...)
    pub fn scheme(&self) -> Option<&str> {
        match self {
            StoragePath::Local(_) => None,
            StoragePath::Remote { scheme, .. } => Some(scheme),
        }
    }

    /// Append a segment, using `/` for remote paths
    pub fn join(&self, segment: &str) -> Self {
        match self {
            StoragePath::Local(path) => StoragePath::Local(path.join(segment)),
            StoragePath::Remote { scheme, location } => {
                let segment = segment.trim_start_matches('/');
                let location = if location.is_empty() || location.ends_with('/') {
                    format!("{}{}", location, segment)
                } else {
                    format!("{}/{}", location, segment)
                };
                StoragePath::Remote {
                    scheme: scheme.clone(),
                    location,
                }
            }
        }
    }

    /// Last path segment, if any
    pub fn file_name(&self) -> Option<&str> {
        match self {
            StoragePath::Local(path) => path.file_name().and_then(|n| n.to_str()),
            StoragePath::Remote { location, .. } => location
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty()),
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoragePath::Local(path) => write!(f, "{}", path.display()),
            StoragePath::Remote { scheme, location } => write!(f, "{}://{}", scheme, location),
        }
    }
}

impl From<&str> for StoragePath {
    fn from(value: &str) -> Self {
        StoragePath::parse(value)
    }
}

impl From<String> for StoragePath {
    fn from(value: String) -> Self {
        StoragePath::parse(&value)
    }
}

impl From<PathBuf> for StoragePath {
    fn from(value: PathBuf) -> Self {
        StoragePath::Local(value)
    }
}

impl From<&Path> for StoragePath {
    fn from(value: &Path) -> Self {
        StoragePath::Local(value.to_path_buf())
    }
}

impl Serialize for StoragePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StoragePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(StoragePath::parse(&value))
    }
}

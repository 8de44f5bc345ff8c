//! Session configuration

use crate::error::{QueryError, Result};
use crate::escape::quote_literal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Location string for an in-memory database
pub const IN_MEMORY: &str = ":memory:";
/// Credential profile used when none is configured
pub const DEFAULT_PROFILE: &str = "default";
/// Extensions installed when remote storage is enabled
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["httpfs", "aws"];

pub const ENV_LOCATION: &str = "EZDB_LOCATION";
pub const ENV_OPTIONS: &str = "EZDB_OPTIONS";
pub const ENV_REMOTE_STORAGE: &str = "EZDB_REMOTE_STORAGE";
pub const ENV_PROFILE: &str = "EZDB_AWS_PROFILE";

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DbLocation {
    #[default]
    InMemory,
    File(PathBuf),
}

impl DbLocation {
    /// `":memory:"` or an empty string is in-memory, anything else a file path
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == IN_MEMORY {
            DbLocation::InMemory
        } else {
            DbLocation::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for DbLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbLocation::InMemory => write!(f, "{}", IN_MEMORY),
            DbLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&str> for DbLocation {
    fn from(value: &str) -> Self {
        DbLocation::parse(value)
    }
}

impl From<PathBuf> for DbLocation {
    fn from(value: PathBuf) -> Self {
        DbLocation::File(value)
    }
}

impl From<&std::path::Path> for DbLocation {
    fn from(value: &std::path::Path) -> Self {
        DbLocation::File(value.to_path_buf())
    }
}

impl Serialize for DbLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DbLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(DbLocation::parse(&value))
    }
}

/// Remote object storage (S3 and compatible) support
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStorageConfig {
    /// Install extensions and load credentials on every connect
    #[serde(default)]
    pub enabled: bool,

    /// Credential profile passed to `load_aws_credentials`
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Extensions to install and load, in order
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for RemoteStorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            profile: default_profile(),
            extensions: default_extensions(),
        }
    }
}

impl RemoteStorageConfig {
    /// Enabled with the given credential profile
    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            enabled: true,
            profile: profile.into(),
            ..Default::default()
        }
    }

    /// Statements that install and load each extension, in order
    pub fn extension_statements(&self) -> Result<Vec<String>> {
        self.extensions
            .iter()
            .map(|ext| {
                let valid = !ext.is_empty()
                    && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if !valid {
                    return Err(QueryError::invalid_configuration(format!(
                        "invalid extension name: {:?}",
                        ext
                    )));
                }
                Ok(format!("INSTALL {ext}; LOAD {ext};", ext = ext))
            })
            .collect()
    }

    /// Statement that loads credentials for the configured profile
    pub fn credentials_statement(&self) -> String {
        format!("CALL load_aws_credentials({});", quote_literal(&self.profile))
    }
}

/// Configuration for a [`Session`](crate::Session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// SQL run on every new connection, after remote storage setup
    #[serde(default)]
    pub options: String,

    #[serde(default)]
    pub location: DbLocation,

    #[serde(default)]
    pub remote_storage: RemoteStorageConfig,
}

impl SessionConfig {
    /// In-memory database, no init SQL, remote storage disabled
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<DbLocation>) -> Self {
        self.location = location.into();
        self
    }

    /// Enable remote storage with the given credential profile
    pub fn with_remote_storage(mut self, profile: impl Into<String>) -> Self {
        self.remote_storage.enabled = true;
        self.remote_storage.profile = profile.into();
        self
    }

    pub fn without_remote_storage(mut self) -> Self {
        self.remote_storage.enabled = false;
        self
    }

    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| QueryError::invalid_configuration(format!("invalid YAML: {}", e)))
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| QueryError::invalid_configuration(format!("cannot serialize: {}", e)))
    }

    /// Read configuration from `EZDB_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(location) = lookup(ENV_LOCATION) {
            config.location = DbLocation::parse(&location);
        }
        if let Some(options) = lookup(ENV_OPTIONS) {
            config.options = options;
        }
        if let Some(enabled) = lookup(ENV_REMOTE_STORAGE) {
            config.remote_storage.enabled = parse_bool(ENV_REMOTE_STORAGE, &enabled)?;
        }
        if let Some(profile) = lookup(ENV_PROFILE) {
            if profile.trim().is_empty() {
                return Err(QueryError::invalid_configuration(format!(
                    "{} must not be empty",
                    ENV_PROFILE
                )));
            }
            config.remote_storage.profile = profile;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(QueryError::invalid_configuration(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.options, "");
        assert_eq!(config.location, DbLocation::InMemory);
        assert!(!config.remote_storage.enabled);
        assert_eq!(config.remote_storage.profile, "default");
        assert_eq!(config.remote_storage.extensions, vec!["httpfs", "aws"]);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new()
            .with_options("SET threads = 1;")
            .with_location("/tmp/test.duckdb")
            .with_remote_storage("analytics");

        assert_eq!(config.options, "SET threads = 1;");
        assert_eq!(
            config.location,
            DbLocation::File(PathBuf::from("/tmp/test.duckdb"))
        );
        assert!(config.remote_storage.enabled);
        assert_eq!(config.remote_storage.profile, "analytics");

        assert!(!config.without_remote_storage().remote_storage.enabled);
    }

    #[test]
    fn test_location_parsing() {
        assert_eq!(DbLocation::parse(":memory:"), DbLocation::InMemory);
        assert_eq!(DbLocation::parse(""), DbLocation::InMemory);
        assert_eq!(
            DbLocation::parse("data.duckdb"),
            DbLocation::File(PathBuf::from("data.duckdb"))
        );
        assert_eq!(DbLocation::InMemory.to_string(), ":memory:");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
options: "SET threads = 2;"
location: /var/lib/app.duckdb
remote_storage:
  enabled: true
  profile: analytics
"#;
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.options, "SET threads = 2;");
        assert_eq!(
            config.location,
            DbLocation::File(PathBuf::from("/var/lib/app.duckdb"))
        );
        assert!(config.remote_storage.enabled);
        assert_eq!(config.remote_storage.profile, "analytics");
        assert_eq!(config.remote_storage.extensions, vec!["httpfs", "aws"]);
    }

    #[test]
    fn test_from_yaml_empty_document_uses_defaults() {
        let config = SessionConfig::from_yaml("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_yaml_round_trip_of_in_memory_location() {
        let yaml = SessionConfig::default().to_yaml().unwrap();
        assert!(yaml.contains(":memory:"));
        assert_eq!(
            SessionConfig::from_yaml(&yaml).unwrap(),
            SessionConfig::default()
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let err = SessionConfig::from_yaml("remote_storage: [").unwrap_err();
        assert!(matches!(err, QueryError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_LOCATION, "/tmp/x.duckdb"),
            (ENV_REMOTE_STORAGE, "TRUE"),
            (ENV_PROFILE, "prod"),
        ]);
        let config =
            SessionConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.location, DbLocation::File(PathBuf::from("/tmp/x.duckdb")));
        assert!(config.remote_storage.enabled);
        assert_eq!(config.remote_storage.profile, "prod");
        assert_eq!(config.options, "");
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = SessionConfig::from_lookup(|key| {
            (key == ENV_REMOTE_STORAGE).then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidConfiguration(_)));

        let err =
            SessionConfig::from_lookup(|key| (key == ENV_PROFILE).then(|| " ".to_string()))
                .unwrap_err();
        assert!(matches!(err, QueryError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_remote_storage_statements() {
        let remote = RemoteStorageConfig::with_profile("o'neil");
        assert_eq!(
            remote.extension_statements().unwrap(),
            vec!["INSTALL httpfs; LOAD httpfs;", "INSTALL aws; LOAD aws;"]
        );
        assert_eq!(
            remote.credentials_statement(),
            "CALL load_aws_credentials('o''neil');"
        );
    }

    #[test]
    fn test_invalid_extension_name() {
        let remote = RemoteStorageConfig {
            extensions: vec!["httpfs; DROP TABLE x".to_string()],
            ..RemoteStorageConfig::with_profile("p")
        };
        assert!(matches!(
            remote.extension_statements(),
            Err(QueryError::InvalidConfiguration(_))
        ));
    }
}

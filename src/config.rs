//! Runtime options for writing workbooks, accepting uploads and talking to the remote repository.

use crate::remote::Author;
use crate::request::ValidationError;
use std::env;
use tracing::debug;

pub const DEFAULT_WORKSHEET_NAME: &str = crate::table::model::DEFAULT_WORKSHEET_NAME;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_AUTHOR_NAME: &str = "Rules Manager";
pub const DEFAULT_AUTHOR_EMAIL: &str = "rules-manager@example.com";
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const ACCEPTED_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// Options applied when serializing a document.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOptions {
    /// Worksheet name used when the document carries none
    pub worksheet_name: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            worksheet_name: DEFAULT_WORKSHEET_NAME.to_owned(),
        }
    }
}

/// Limits applied to uploaded workbooks before they are parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadPolicy {
    pub max_file_size: usize,
    pub extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            extensions: ACCEPTED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl UploadPolicy {
    /// Reads `MAX_FILE_SIZE` (bytes); unset or unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_file_size = lookup("MAX_FILE_SIZE")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);
        UploadPolicy {
            max_file_size,
            ..Default::default()
        }
    }

    pub fn check(&self, file_name: &str, bytes: &[u8]) -> Result<(), ValidationError> {
        let lower = file_name.to_ascii_lowercase();
        if !self.extensions.iter().any(|ext| lower.ends_with(&ext.to_ascii_lowercase())) {
            return Err(ValidationError::UnsupportedFile {
                name: file_name.to_owned(),
                accepted: self.extensions.join(", "),
            });
        }
        if bytes.is_empty() {
            return Err(ValidationError::EmptyUpload { name: file_name.to_owned() });
        }
        if bytes.len() > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: bytes.len(),
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

/// Remote repository defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteConfig {
    pub default_branch: String,
    pub token: Option<String>,
    pub author: Author,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            default_branch: DEFAULT_BRANCH.to_owned(),
            token: None,
            author: Author {
                name: DEFAULT_AUTHOR_NAME.to_owned(),
                email: DEFAULT_AUTHOR_EMAIL.to_owned(),
            },
        }
    }
}

impl RemoteConfig {
    /// Reads `GITHUB_TOKEN`, `DEFAULT_BRANCH`, `COMMIT_AUTHOR_NAME` and `COMMIT_AUTHOR_EMAIL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());
        let defaults = RemoteConfig::default();
        let config = RemoteConfig {
            default_branch: read("DEFAULT_BRANCH").unwrap_or(defaults.default_branch),
            token: read("GITHUB_TOKEN"),
            author: Author {
                name: read("COMMIT_AUTHOR_NAME").unwrap_or(defaults.author.name),
                email: read("COMMIT_AUTHOR_EMAIL").unwrap_or(defaults.author.email),
            },
        };
        debug!(branch = %config.default_branch, has_token = config.token.is_some(), "Loaded remote config");
        config
    }

    /// A token supplied with the request wins over the configured one.
    pub fn token_for(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .or_else(|| self.token.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn upload_policy_limits() {
        let policy = UploadPolicy { max_file_size: 4, ..Default::default() };
        assert!(policy.check("rules.XLSX", b"1234").is_ok());
        assert!(matches!(policy.check("rules.csv", b"1"), Err(ValidationError::UnsupportedFile { .. })));
        assert!(matches!(policy.check("rules.xls", b""), Err(ValidationError::EmptyUpload { .. })));
        assert!(matches!(policy.check("rules.xlsx", b"12345"), Err(ValidationError::FileTooLarge { size: 5, limit: 4 })));
    }

    #[test]
    fn upload_policy_from_env() {
        assert_eq!(UploadPolicy::from_lookup(lookup(&[("MAX_FILE_SIZE", "2048")])).max_file_size, 2048);
        assert_eq!(UploadPolicy::from_lookup(lookup(&[("MAX_FILE_SIZE", "lots")])).max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn remote_config_from_env() {
        let config = RemoteConfig::from_lookup(lookup(&[
            ("GITHUB_TOKEN", "env-token"),
            ("DEFAULT_BRANCH", " develop "),
            ("COMMIT_AUTHOR_NAME", ""),
        ]));
        assert_eq!(config.default_branch, "develop");
        assert_eq!(config.author.name, DEFAULT_AUTHOR_NAME);
        assert_eq!(config.token_for(None).as_deref(), Some("env-token"));
        assert_eq!(config.token_for(Some("request-token")).as_deref(), Some("request-token"));
        assert_eq!(RemoteConfig::default().token_for(Some("")), None);
    }
}

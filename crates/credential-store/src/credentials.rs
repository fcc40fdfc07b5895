//! Credential file parsing.
//!
//! The source is a sequence of `name = value` lines. Only the four OAuth
//! fields are accepted; anything else fails the whole load.

use crate::{ConfigError, ConfigResult};
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const CONSUMER_KEY: &str = "consumer_key";
pub const CONSUMER_SECRET: &str = "consumer_secret";
pub const ACCESS_TOKEN: &str = "access_token";
pub const ACCESS_TOKEN_SECRET: &str = "access_token_secret";

/// Recognized field names, in canonical order.
pub const FIELD_NAMES: [&str; 4] = [
    CONSUMER_KEY,
    CONSUMER_SECRET,
    ACCESS_TOKEN,
    ACCESS_TOKEN_SECRET,
];

/// Validated OAuth 1.0a credentials.
///
/// All four values are non-empty. The set is immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl CredentialSet {
    /// Build a set directly, applying the same non-empty validation as `load`.
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> ConfigResult<Self> {
        let mut fields = RawFields::default();
        fields.consumer_key = Some(consumer_key.into());
        fields.consumer_secret = Some(consumer_secret.into());
        fields.access_token = Some(access_token.into());
        fields.access_token_secret = Some(access_token_secret.into());
        fields.finish()
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn access_token_secret(&self) -> &str {
        &self.access_token_secret
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

impl FromStr for CredentialSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        load(s.as_bytes())
    }
}

#[derive(Default)]
struct RawFields {
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    access_token: Option<String>,
    access_token_secret: Option<String>,
}

impl RawFields {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            CONSUMER_KEY => Some(&mut self.consumer_key),
            CONSUMER_SECRET => Some(&mut self.consumer_secret),
            ACCESS_TOKEN => Some(&mut self.access_token),
            ACCESS_TOKEN_SECRET => Some(&mut self.access_token_secret),
            _ => None,
        }
    }

    fn finish(self) -> ConfigResult<CredentialSet> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

        let missing: Vec<&'static str> = [
            (CONSUMER_KEY, present(&self.consumer_key)),
            (CONSUMER_SECRET, present(&self.consumer_secret)),
            (ACCESS_TOKEN, present(&self.access_token)),
            (ACCESS_TOKEN_SECRET, present(&self.access_token_secret)),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect();

        match (
            self.consumer_key,
            self.consumer_secret,
            self.access_token,
            self.access_token_secret,
        ) {
            (
                Some(consumer_key),
                Some(consumer_secret),
                Some(access_token),
                Some(access_token_secret),
            ) if missing.is_empty() => {
                Ok(CredentialSet {
                    consumer_key,
                    consumer_secret,
                    access_token,
                    access_token_secret,
                })
            }
            _ => Err(ConfigError::IncompleteCredentials { missing }),
        }
    }
}

/// Parse credentials from a line-oriented source.
///
/// Blank lines and `#` comments are skipped. The value is everything after
/// the first `=`, trimmed, so secrets may themselves contain `=`.
pub fn load<R: BufRead>(source: R) -> ConfigResult<CredentialSet> {
    let mut fields = RawFields::default();

    for (index, line) in source.lines().enumerate() {
        let line = line.map_err(|source| ConfigError::Io {
            path: "<reader>".into(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (name, value) = trimmed
            .split_once('=')
            .ok_or(ConfigError::MalformedLine { line: index + 1 })?;
        let name = name.trim();

        let slot = fields
            .slot(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_string()))?;
        *slot = Some(value.trim().to_string());
    }

    fields.finish()
}

/// Read and validate a credential file.
pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<CredentialSet> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let credentials = load(std::io::BufReader::new(file)).map_err(|e| match e {
        ConfigError::Io { source, .. } => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    debug!(path = %path.display(), "Loaded credentials");
    Ok(credentials)
}

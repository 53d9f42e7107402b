//! # Configuration
//!
//! Environment-driven settings for a zpipe API.

use std::fmt;

use thiserror::Error;

/// Default location of the generated OpenAPI document.
pub const DEFAULT_DOCS_PATH: &str = "/openapi.json";

/// Settings shared by the router, the document assembler and the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `info.title` of the OpenAPI document.
    pub title: String,
    /// `info.version` of the OpenAPI document.
    pub version: String,
    /// Where the OpenAPI document is served. `None` disables it.
    pub docs_path: Option<String>,
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "zpipe API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            docs_path: Some(DEFAULT_DOCS_PATH.to_string()),
            port: 8080,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ZPIPE_TITLE` (default: `zpipe API`)
    /// - `ZPIPE_VERSION` (default: crate version)
    /// - `ZPIPE_DOCS_PATH` (default: `/openapi.json`; empty disables docs)
    /// - `PORT` (default: 8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let docs_path = match lookup("ZPIPE_DOCS_PATH") {
            None => defaults.docs_path,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) if raw.starts_with('/') => Some(raw),
            Some(raw) => return Err(ConfigError::InvalidDocsPath(raw)),
        };

        let port = match lookup("PORT") {
            None => defaults.port,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
        };

        Ok(Self {
            title: lookup("ZPIPE_TITLE").unwrap_or(defaults.title),
            version: lookup("ZPIPE_VERSION").unwrap_or(defaults.version),
            docs_path,
            port,
        })
    }

    /// Disable or relocate the OpenAPI document.
    pub fn with_docs_path(mut self, path: Option<String>) -> Self {
        self.docs_path = path;
        self
    }
}

impl fmt::Display for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on :{}", self.title, self.version, self.port)?;
        if let Some(path) = &self.docs_path {
            write!(f, " (docs at {path})")?;
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `PORT` is not a valid `u16`.
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
    /// `ZPIPE_DOCS_PATH` is non-empty but not an absolute route.
    #[error("ZPIPE_DOCS_PATH must start with '/', got {0:?}")]
    InvalidDocsPath(String),
}

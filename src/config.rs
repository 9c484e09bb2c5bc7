//! Configuration
//!
//! Explicit run configuration assembled from command-line flags and their
//! `OS_*` environment fallbacks. Validated once, before anything is fetched.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Raw run configuration, every field optional until validated
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Project (tenant) id the inventory is scoped to
    pub project: Option<String>,
    pub auth_url: Option<String>,
    pub region_name: Option<String>,
    /// Optional file mirroring the report
    pub file: Option<PathBuf>,
}

/// Validated identity parameters
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub project: String,
    pub auth_url: String,
    pub region_name: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project", &self.project)
            .field("auth_url", &self.auth_url)
            .field("region_name", &self.region_name)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("please export or provide as parameters the following: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("auth_url '{url}' is not a valid URL: {reason}")]
    InvalidAuthUrl { url: String, reason: String },
}

impl Config {
    /// Check that every required field is set and return the identity parameters.
    ///
    /// Blank values count as missing. All missing fields are reported at once.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let fields: [(&'static str, &Option<String>); 5] = [
            ("username", &self.username),
            ("password", &self.password),
            ("project", &self.project),
            ("auth_url", &self.auth_url),
            ("region_name", &self.region_name),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let take = |value: &Option<String>| value.clone().unwrap_or_default();

        let auth_url = take(&self.auth_url).trim().trim_end_matches('/').to_string();
        if let Err(e) = Url::parse(&auth_url) {
            return Err(ConfigError::InvalidAuthUrl {
                url: auth_url,
                reason: e.to_string(),
            });
        }

        Ok(Credentials {
            username: take(&self.username),
            password: take(&self.password),
            project: take(&self.project),
            auth_url,
            region_name: take(&self.region_name),
        })
    }
}

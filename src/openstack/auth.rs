//! Identity session
//!
//! Password authentication against a Keystone v2.0 endpoint. The token and
//! the service catalog returned with it are all the later calls need.

use super::http::ApiHttpClient;
use crate::config::Credentials;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// One endpoint of a catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// A service advertised in the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Service catalog returned alongside the token
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Public URL of `service_type` in `region`.
    ///
    /// Falls back to the first endpoint of the service when none is tagged
    /// with the region, which is how single-region deployments publish them.
    pub fn public_url(&self, service_type: &str, region: &str) -> Option<&str> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.service_type == service_type)?;

        entry
            .endpoints
            .iter()
            .find(|ep| ep.region.as_deref() == Some(region))
            .or_else(|| entry.endpoints.first())
            .map(|ep| ep.public_url.trim_end_matches('/'))
    }

    pub fn service_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.service_type.as_str())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: ServiceCatalog,
}

#[derive(Deserialize)]
struct Token {
    id: String,
}

/// Authenticated identity session
#[derive(Clone)]
pub struct Session {
    token: String,
    pub catalog: ServiceCatalog,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl Session {
    /// Build a session from an already-issued token
    pub fn from_parts(token: impl Into<String>, catalog: ServiceCatalog) -> Self {
        Self {
            token: token.into(),
            catalog,
        }
    }

    /// Authenticate with username/password scoped to the configured tenant
    pub async fn authenticate(http: &ApiHttpClient, creds: &Credentials) -> Result<Self> {
        let url = format!("{}/tokens", creds.auth_url);
        let body = json!({
            "auth": {
                "passwordCredentials": {
                    "username": creds.username,
                    "password": creds.password,
                },
                "tenantId": creds.project,
            }
        });

        let response = http
            .post_json(&url, &body)
            .await
            .context("Failed to authenticate against the identity service")?;

        let parsed: TokenResponse =
            serde_json::from_value(response).context("Unexpected identity service response")?;

        tracing::info!(
            "Authenticated as {} on project {} ({} catalog entries)",
            creds.username,
            creds.project,
            parsed.access.service_catalog.entries.len()
        );

        Ok(Self {
            token: parsed.access.token.id,
            catalog: parsed.access.service_catalog,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

//! OpenStack Client
//!
//! Main client for interacting with OpenStack APIs, combining the identity
//! session and HTTP functionality.

use super::auth::Session;
use super::http::ApiHttpClient;
use crate::config::Credentials;
use anyhow::{Context, Result};
use serde_json::Value;

/// Main OpenStack client
#[derive(Clone, Debug)]
pub struct OpenStackClient {
    pub session: Session,
    pub http: ApiHttpClient,
    pub project_id: String,
    pub region: String,
}

impl OpenStackClient {
    /// Authenticate and create a client scoped to the project and region
    pub async fn new(creds: &Credentials) -> Result<Self> {
        let http = ApiHttpClient::new()?;
        let session = Session::authenticate(&http, creds)
            .await
            .context("Failed to create identity session")?;

        Ok(Self::with_session(http, session, &creds.project, &creds.region_name))
    }

    /// Create a client around an existing session
    pub fn with_session(http: ApiHttpClient, session: Session, project_id: &str, region: &str) -> Self {
        Self {
            session,
            http,
            project_id: project_id.to_string(),
            region: region.to_string(),
        }
    }

    /// Make a GET request to an OpenStack API
    pub async fn get(&self, url: &str) -> Result<Value> {
        self.http.get(url, self.session.token()).await
    }

    /// Public endpoint for a service type in the client's region
    fn endpoint(&self, service_types: &[&str]) -> Result<String> {
        service_types
            .iter()
            .find_map(|t| self.session.catalog.public_url(t, &self.region))
            .map(str::to_string)
            .with_context(|| {
                format!(
                    "No endpoint for service '{}' in region '{}'",
                    service_types.join("|"),
                    self.region
                )
            })
    }

    // =========================================================================
    // Service URL helpers
    // =========================================================================

    /// Build Compute (nova) API URL
    pub fn compute_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}/{}", self.endpoint(&["compute"])?, path))
    }

    /// Build Block Storage (cinder) API URL
    pub fn volume_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}/{}", self.endpoint(&["volumev2", "volume"])?, path))
    }

    /// Build Image (glance v1) API URL
    pub fn image_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}/v1/{}", self.endpoint(&["image"])?, path))
    }

    /// Build Networking (neutron v2.0) API URL
    pub fn network_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}/v2.0/{}", self.endpoint(&["network"])?, path))
    }

    /// Build Orchestration (heat) API URL
    pub fn orchestration_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}/{}", self.endpoint(&["orchestration"])?, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openstack::auth::ServiceCatalog;
    use serde_json::json;

    fn client() -> OpenStackClient {
        let catalog: ServiceCatalog = serde_json::from_value(json!([
            {"type": "compute", "endpoints": [{"region": "fr1", "publicURL": "http://nova/v2/p1"}]},
            {"type": "volume", "endpoints": [{"region": "fr1", "publicURL": "http://cinder/v1/p1"}]},
            {"type": "volumev2", "endpoints": [{"region": "fr1", "publicURL": "http://cinder/v2/p1"}]},
            {"type": "image", "endpoints": [{"region": "fr1", "publicURL": "http://glance/"}]},
            {"type": "network", "endpoints": [{"region": "fr1", "publicURL": "http://neutron"}]}
        ]))
        .unwrap();
        OpenStackClient::with_session(
            ApiHttpClient::new().unwrap(),
            Session::from_parts("tok", catalog),
            "p1",
            "fr1",
        )
    }

    /// Test service URLs are built from catalog endpoints
    #[test]
    fn test_service_urls() {
        let client = client();
        assert_eq!(client.compute_url("servers/detail").unwrap(), "http://nova/v2/p1/servers/detail");
        assert_eq!(client.volume_url("volumes/detail").unwrap(), "http://cinder/v2/p1/volumes/detail");
        assert_eq!(client.image_url("images/detail").unwrap(), "http://glance/v1/images/detail");
        assert_eq!(client.network_url("routers").unwrap(), "http://neutron/v2.0/routers");
    }

    /// Test service absent from the catalog is an error
    #[test]
    fn test_missing_service_is_an_error() {
        let err = client().orchestration_url("stacks").unwrap_err();
        assert!(err.to_string().contains("No endpoint for service 'orchestration'"));
    }
}

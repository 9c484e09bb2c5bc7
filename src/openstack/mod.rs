//! OpenStack API interaction module
//!
//! Identity session bootstrap, HTTP plumbing and the endpoint-aware client
//! used by the resource fetchers.
//!
//! # Module Structure
//!
//! - [`auth`] - Keystone v2.0 password authentication and service catalog
//! - [`client`] - Main client, builds per-service URLs from the catalog
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use osinventory::openstack::client::OpenStackClient;
//!
//! async fn example(creds: &osinventory::config::Credentials) -> anyhow::Result<()> {
//!     let client = OpenStackClient::new(creds).await?;
//!     let servers = client.get(&client.compute_url("servers/detail")?).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

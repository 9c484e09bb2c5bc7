//! Resource retrieval layer
//!
//! Everything needed to pull the project's inventory out of the cloud and
//! hold it for reporting.
//!
//! # Architecture
//!
//! - [`model`] - Typed records for every entity the inventory reads
//! - [`fetcher`] - The [`InventorySource`] seam and its OpenStack implementation
//! - [`coordinator`] - Concurrent fan-out of one fetch task per domain
//! - [`store`] - Per-domain slots holding fetched data or the failure reason
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use osinventory::resource::Coordinator;
//!
//! async fn inventory(client: osinventory::openstack::client::OpenStackClient) {
//!     let store = Coordinator::new(Arc::new(client)).run().await;
//!     for failure in store.failures() {
//!         eprintln!("{}", failure);
//!     }
//! }
//! ```

pub mod coordinator;
pub mod fetcher;
pub mod model;
pub mod store;

pub use coordinator::{Coordinator, FetchTask};
pub use fetcher::InventorySource;
pub use store::{Domain, FetchError, Fetched, ResourceStore};

//! Inventory reporter for an OpenStack project.
//!
//! Authenticates against Keystone, fetches every resource domain of the
//! project concurrently and renders the result as text tables.

pub mod config;
pub mod openstack;
pub mod report;
pub mod resource;

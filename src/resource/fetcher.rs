//! Resource Fetcher
//!
//! List operations for every service the inventory reads. Each call is a
//! single unpaginated GET whose response holds the collection under a key.

use super::model::{
    Flavor, FloatingIp, Image, Keypair, LbMember, LbPool, Limits, Network, Router,
    SecurityGroup, Server, Stack, Subnet, Volume, VolumeCopy,
};
use crate::openstack::client::OpenStackClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Read-only list operations the inventory is built from
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn limits(&self) -> Result<Limits>;
    async fn servers(&self) -> Result<Vec<Server>>;
    async fn flavors(&self) -> Result<Vec<Flavor>>;
    async fn floating_ips(&self) -> Result<Vec<FloatingIp>>;
    async fn security_groups(&self) -> Result<Vec<SecurityGroup>>;
    async fn keypairs(&self) -> Result<Vec<Keypair>>;
    async fn images(&self) -> Result<Vec<Image>>;
    async fn volumes(&self) -> Result<Vec<Volume>>;
    async fn volume_snapshots(&self) -> Result<Vec<VolumeCopy>>;
    async fn volume_backups(&self) -> Result<Vec<VolumeCopy>>;
    async fn networks(&self) -> Result<Vec<Network>>;
    async fn subnets(&self) -> Result<Vec<Subnet>>;
    async fn routers(&self) -> Result<Vec<Router>>;
    async fn lb_pools(&self) -> Result<Vec<LbPool>>;
    async fn lb_members(&self) -> Result<Vec<LbMember>>;
    async fn stacks(&self) -> Result<Vec<Stack>>;
}

/// Extract the records stored under `key`, skipping any that do not parse
pub fn extract_items<T: DeserializeOwned>(response: &Value, key: &str) -> Vec<T> {
    let Some(items) = response.get(key).and_then(|v| v.as_array()) else {
        tracing::debug!("Response has no '{}' collection", key);
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed '{}' record: {}", key, e);
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct KeypairEntry {
    keypair: Keypair,
}

impl OpenStackClient {
    async fn list<T: DeserializeOwned>(&self, url: Result<String>, key: &str) -> Result<Vec<T>> {
        let url = url?;
        let response = self
            .get(&url)
            .await
            .with_context(|| format!("Failed to list {}", key))?;
        Ok(extract_items(&response, key))
    }
}

#[async_trait]
impl InventorySource for OpenStackClient {
    async fn limits(&self) -> Result<Limits> {
        let compute = self.get(&self.compute_url("limits")?).await?;
        let volume = self.get(&self.volume_url("limits")?).await?;
        Ok(Limits {
            compute: Limits::absolute_from(&compute),
            volume: Limits::absolute_from(&volume),
        })
    }

    async fn servers(&self) -> Result<Vec<Server>> {
        self.list(self.compute_url("servers/detail"), "servers").await
    }

    async fn flavors(&self) -> Result<Vec<Flavor>> {
        self.list(self.compute_url("flavors/detail"), "flavors").await
    }

    async fn floating_ips(&self) -> Result<Vec<FloatingIp>> {
        self.list(self.compute_url("os-floating-ips"), "floating_ips").await
    }

    async fn security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.list(self.compute_url("os-security-groups"), "security_groups")
            .await
    }

    async fn keypairs(&self) -> Result<Vec<Keypair>> {
        let entries: Vec<KeypairEntry> = self.list(self.compute_url("os-keypairs"), "keypairs").await?;
        Ok(entries.into_iter().map(|e| e.keypair).collect())
    }

    async fn images(&self) -> Result<Vec<Image>> {
        self.list(self.image_url("images/detail"), "images").await
    }

    async fn volumes(&self) -> Result<Vec<Volume>> {
        self.list(self.volume_url("volumes/detail"), "volumes").await
    }

    async fn volume_snapshots(&self) -> Result<Vec<VolumeCopy>> {
        self.list(self.volume_url("snapshots/detail"), "snapshots").await
    }

    async fn volume_backups(&self) -> Result<Vec<VolumeCopy>> {
        self.list(self.volume_url("backups/detail"), "backups").await
    }

    async fn networks(&self) -> Result<Vec<Network>> {
        self.list(self.network_url("networks"), "networks").await
    }

    async fn subnets(&self) -> Result<Vec<Subnet>> {
        self.list(self.network_url("subnets"), "subnets").await
    }

    async fn routers(&self) -> Result<Vec<Router>> {
        self.list(self.network_url("routers"), "routers").await
    }

    async fn lb_pools(&self) -> Result<Vec<LbPool>> {
        self.list(self.network_url("lb/pools"), "pools").await
    }

    async fn lb_members(&self) -> Result<Vec<LbMember>> {
        self.list(self.network_url("lb/members"), "members").await
    }

    async fn stacks(&self) -> Result<Vec<Stack>> {
        self.list(self.orchestration_url("stacks"), "stacks").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test malformed records are skipped, valid ones kept
    #[test]
    fn test_extract_items_skips_malformed_records() {
        let response = json!({
            "volumes": [
                {"id": "v1", "status": "available"},
                {"status": "orphan without id"},
                {"id": "v2", "attachments": null}
            ]
        });
        let volumes: Vec<Volume> = extract_items(&response, "volumes");
        let ids: Vec<_> = volumes.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);
    }

    /// Test response without the collection key yields nothing
    #[test]
    fn test_extract_items_missing_key_is_empty() {
        let routers: Vec<Router> = extract_items(&json!({"error": "x"}), "routers");
        assert!(routers.is_empty());
    }

    /// Test keypair entries are unwrapped from their envelope
    #[test]
    fn test_keypair_entries_unwrap() {
        let response = json!({
            "keypairs": [{"keypair": {"name": "ops", "fingerprint": "aa:bb"}}]
        });
        let entries: Vec<KeypairEntry> = extract_items(&response, "keypairs");
        assert_eq!(entries[0].keypair.name, "ops");
    }
}

//! Cross-resource joins
//!
//! Turns the raw store contents into denormalized report rows: servers with
//! their flavor and image, volumes with the server they are attached to,
//! networks with their subnets and routers, pools with their members.
//!
//! A missing cross reference never fails a row; it is replaced by a
//! placeholder.

use super::classify::{categorize, is_snapshot, ImageCategory};
use crate::resource::model::{
    Address, ComputeInventory, Flavor, FloatingIp, Image, LbMember, LbPool, Limits,
    LoadBalancerInventory, Network, NetworkInventory, Router, Server, Subnet, Volume,
};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};

/// Shown for any value that could not be resolved
pub const PLACEHOLDER: &str = "-";
pub const NOT_ATTACHED: &str = "not attached";
pub const NOT_USED: &str = "not used";
/// Router column for a router without a resolvable gateway network
pub const NO_GATEWAY: &str = "---";

// =============================================================================
// Servers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub image_name: String,
    pub flavor: String,
    pub key_name: String,
    pub networks: String,
}

/// `2VCPU|4096MB RAM|20GB Disk`
pub fn flavor_descriptor(flavor: &Flavor) -> String {
    format!(
        "{}VCPU|{}MB RAM|{}GB Disk",
        flavor.vcpus, flavor.ram, flavor.disk
    )
}

/// Flatten addresses into `first_network=addr1, addr2, ...`.
///
/// Addresses of every network are listed but only the first network name is
/// used as prefix. Networks are visited in name order.
pub fn flatten_addresses(addresses: &BTreeMap<String, Vec<Address>>) -> String {
    let Some(first) = addresses.keys().next() else {
        return String::new();
    };

    let addrs: Vec<&str> = addresses
        .values()
        .flatten()
        .map(|a| a.addr.as_str())
        .collect();

    format!("{}={}", first, addrs.join(", "))
}

pub fn server_rows(compute: &ComputeInventory, images: &[Image]) -> Vec<ServerRow> {
    let flavors: HashMap<&str, &Flavor> = compute
        .flavors
        .iter()
        .filter_map(|f| f.id.as_deref().map(|id| (id, f)))
        .collect();
    let images: HashMap<&str, &Image> = images.iter().map(|i| (i.id.as_str(), i)).collect();

    compute
        .servers
        .iter()
        .map(|server| {
            let flavor = server
                .flavor
                .as_deref()
                .and_then(|id| flavors.get(id))
                .map(|f| flavor_descriptor(f))
                .unwrap_or_else(|| PLACEHOLDER.to_string());

            let image_name = server
                .image
                .as_deref()
                .and_then(|id| images.get(id))
                .and_then(|img| img.name.clone())
                .unwrap_or_else(|| PLACEHOLDER.to_string());

            ServerRow {
                id: server.id.clone(),
                name: or_placeholder(&server.name),
                status: or_placeholder(&server.status),
                image_name,
                flavor,
                key_name: or_placeholder(&server.key_name),
                networks: flatten_addresses(&server.addresses),
            }
        })
        .collect()
}

// =============================================================================
// Images
// =============================================================================

#[derive(Debug, Clone)]
pub struct ImageRow<'a> {
    pub image: &'a Image,
    pub category: ImageCategory,
    pub snapshot: bool,
}

pub fn image_rows<'a>(images: &'a [Image], project_id: &str) -> Vec<ImageRow<'a>> {
    images
        .iter()
        .map(|image| ImageRow {
            image,
            category: categorize(image, project_id),
            snapshot: is_snapshot(image),
        })
        .collect()
}

// =============================================================================
// Volumes
// =============================================================================

/// Resolves the display name of a server from its id
pub trait ServerLookup {
    fn server_name(&self, server_id: &str) -> Result<String>;
}

/// Lookup over the servers fetched for this run
pub struct ServerIndex<'a> {
    servers: HashMap<&'a str, &'a Server>,
}

impl<'a> ServerIndex<'a> {
    pub fn new(servers: &'a [Server]) -> Self {
        Self {
            servers: servers.iter().map(|s| (s.id.as_str(), s)).collect(),
        }
    }
}

impl ServerLookup for ServerIndex<'_> {
    fn server_name(&self, server_id: &str) -> Result<String> {
        let server = self
            .servers
            .get(server_id)
            .with_context(|| format!("Unknown server {}", server_id))?;
        server
            .name
            .clone()
            .with_context(|| format!("Server {} has no name", server_id))
    }
}

#[derive(Debug, Clone)]
pub struct VolumeRow<'a> {
    pub volume: &'a Volume,
    pub attached_to: String,
}

/// Name of the server a volume is attached to, or [`NOT_ATTACHED`].
///
/// A failed lookup keeps whatever was resolved before it.
pub fn resolve_attachment(volume: &Volume, lookup: &dyn ServerLookup) -> String {
    let mut attached_to = NOT_ATTACHED.to_string();

    for attachment in &volume.attachments {
        let Some(server_id) = attachment.server_id.as_deref() else {
            continue;
        };
        match lookup.server_name(server_id) {
            Ok(name) => attached_to = name,
            Err(e) => tracing::debug!("Volume {}: attachment lookup failed: {}", volume.id, e),
        }
    }

    attached_to
}

pub fn volume_rows<'a>(volumes: &'a [Volume], lookup: &dyn ServerLookup) -> Vec<VolumeRow<'a>> {
    volumes
        .iter()
        .map(|volume| VolumeRow {
            volume,
            attached_to: resolve_attachment(volume, lookup),
        })
        .collect()
}

// =============================================================================
// Networks
// =============================================================================

#[derive(Debug, Clone)]
pub struct NetworkRow<'a> {
    pub network: &'a Network,
    pub subnets: Vec<&'a Subnet>,
    /// Routers whose external gateway is this network
    pub routers: Vec<&'a Router>,
}

/// Every router lands in exactly one bucket
#[derive(Debug, Clone, Default)]
pub struct RouterBuckets<'a> {
    pub attached: Vec<&'a Router>,
    pub unattached: Vec<&'a Router>,
}

impl RouterBuckets<'_> {
    pub fn len(&self) -> usize {
        self.attached.len() + self.unattached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkJoin<'a> {
    pub networks: Vec<NetworkRow<'a>>,
    pub routers: RouterBuckets<'a>,
}

pub fn join_networks(inventory: &NetworkInventory) -> NetworkJoin<'_> {
    let subnets: HashMap<&str, &Subnet> = inventory
        .subnets
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();

    let mut networks: Vec<NetworkRow<'_>> = inventory
        .networks
        .iter()
        .map(|network| NetworkRow {
            network,
            subnets: network
                .subnets
                .iter()
                .filter_map(|id| subnets.get(id.as_str()).copied())
                .collect(),
            routers: Vec::new(),
        })
        .collect();

    let positions: HashMap<&str, usize> = inventory
        .networks
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut buckets = RouterBuckets::default();
    for router in &inventory.routers {
        match router
            .gateway_network_id()
            .and_then(|id| positions.get(id).copied())
        {
            Some(pos) => {
                networks[pos].routers.push(router);
                buckets.attached.push(router);
            }
            None => buckets.unattached.push(router),
        }
    }

    NetworkJoin {
        networks,
        routers: buckets,
    }
}

// =============================================================================
// Load balancers
// =============================================================================

#[derive(Debug, Clone)]
pub struct PoolRow<'a> {
    pub pool: &'a LbPool,
    pub members: Vec<&'a LbMember>,
}

/// Group members under their pool. Members of unknown pools are dropped.
pub fn pool_rows(inventory: &LoadBalancerInventory) -> Vec<PoolRow<'_>> {
    inventory
        .pools
        .iter()
        .map(|pool| PoolRow {
            pool,
            members: inventory
                .members
                .iter()
                .filter(|m| m.pool_id.as_deref() == Some(pool.id.as_str()))
                .collect(),
        })
        .collect()
}

// =============================================================================
// Floating IPs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingIpRow {
    pub id: String,
    pub fixed_ip: String,
    pub ip: String,
    pub server_id: String,
}

pub fn floating_ip_rows(ips: &[FloatingIp]) -> Vec<FloatingIpRow> {
    ips.iter()
        .map(|ip| FloatingIpRow {
            id: or_placeholder(&ip.id),
            fixed_ip: or_placeholder(&ip.fixed_ip),
            ip: or_placeholder(&ip.ip),
            server_id: ip
                .instance_id
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NOT_USED.to_string()),
        })
        .collect()
}

// =============================================================================
// Quotas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRow {
    pub resource: &'static str,
    pub max: i64,
    pub used: i64,
}

enum Service {
    Compute,
    Volume,
}

const QUOTAS: &[(&str, Service, &str, &str)] = &[
    ("Servers", Service::Compute, "maxTotalInstances", "totalInstancesUsed"),
    ("Volumes", Service::Volume, "maxTotalVolumes", "totalVolumesUsed"),
    ("V_Snapshots", Service::Volume, "maxTotalSnapshots", "totalSnapshotsUsed"),
    ("V_Backups", Service::Volume, "maxTotalBackups", "totalBackupsUsed"),
    ("RAM (MB)", Service::Compute, "maxTotalRAMSize", "totalRAMUsed"),
    ("Cores", Service::Compute, "maxTotalCores", "totalCoresUsed"),
    ("VolumesGigabytes", Service::Volume, "maxTotalVolumeGigabytes", "totalGigabytesUsed"),
    ("BackupGigabytes", Service::Volume, "maxTotalBackupGigabytes", "totalBackupGigabytesUsed"),
];

/// Quota maximum and usage per resource. Empty when no limits were fetched.
pub fn quota_rows(limits: &Limits) -> Result<Vec<QuotaRow>> {
    if limits.is_empty() {
        return Ok(Vec::new());
    }

    QUOTAS
        .iter()
        .map(|(resource, service, max_key, used_key)| -> Result<QuotaRow> {
            let map = match service {
                Service::Compute => &limits.compute,
                Service::Volume => &limits.volume,
            };
            let get = |key: &str| {
                map.get(key)
                    .copied()
                    .with_context(|| format!("Limit {} not reported", key))
            };
            Ok(QuotaRow {
                resource: *resource,
                max: get(*max_key)?,
                used: get(*used_key)?,
            })
        })
        .collect()
}

fn or_placeholder(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

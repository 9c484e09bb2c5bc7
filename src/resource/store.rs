//! Resource Store
//!
//! One slot per retrieval domain. Slots are filled once by the coordinator
//! after every fetch task has finished and are only read afterwards.

use super::model::{
    ComputeInventory, FloatingIp, Image, Keypair, Limits, LoadBalancerInventory,
    NetworkInventory, SecurityGroup, Stack, Volume, VolumeCopy,
};
use std::fmt;
use thiserror::Error;

/// Retrieval domains, one fetch task each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Limits,
    Servers,
    FloatingIps,
    SecurityGroups,
    Keypairs,
    Images,
    Volumes,
    VolumeSnapshots,
    VolumeBackups,
    Networks,
    LoadBalancers,
    Stacks,
}

impl Domain {
    pub const ALL: [Domain; 12] = [
        Domain::Limits,
        Domain::Servers,
        Domain::FloatingIps,
        Domain::SecurityGroups,
        Domain::Keypairs,
        Domain::Images,
        Domain::Volumes,
        Domain::VolumeSnapshots,
        Domain::VolumeBackups,
        Domain::Networks,
        Domain::LoadBalancers,
        Domain::Stacks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limits => "limits",
            Self::Servers => "servers",
            Self::FloatingIps => "floating-ips",
            Self::SecurityGroups => "security-groups",
            Self::Keypairs => "keypairs",
            Self::Images => "images",
            Self::Volumes => "volumes",
            Self::VolumeSnapshots => "volume-snapshots",
            Self::VolumeBackups => "volume-backups",
            Self::Networks => "networks",
            Self::LoadBalancers => "load-balancers",
            Self::Stacks => "stacks",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a domain ended up empty
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{domain} fetch failed: {reason}")]
pub struct FetchError {
    pub domain: Domain,
    pub reason: String,
}

/// Outcome of one domain's retrieval
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    Ready(T),
    /// The failed domain still exposes an empty collection
    Failed { error: FetchError, empty: T },
}

impl<T: Default> Fetched<T> {
    pub fn failed(error: FetchError) -> Self {
        Self::Failed {
            error,
            empty: T::default(),
        }
    }
}

impl<T> Fetched<T> {
    /// Fetched data, or the empty collection if the fetch failed
    pub fn data(&self) -> &T {
        match self {
            Self::Ready(data) => data,
            Self::Failed { empty, .. } => empty,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Ready(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl<T: Default> Default for Fetched<T> {
    fn default() -> Self {
        Self::Ready(T::default())
    }
}

/// Payload produced by a fetch task; the variant decides the slot
#[derive(Debug, Clone)]
pub enum DomainData {
    Limits(Limits),
    Compute(ComputeInventory),
    FloatingIps(Vec<FloatingIp>),
    SecurityGroups(Vec<SecurityGroup>),
    Keypairs(Vec<Keypair>),
    Images(Vec<Image>),
    Volumes(Vec<Volume>),
    VolumeSnapshots(Vec<VolumeCopy>),
    VolumeBackups(Vec<VolumeCopy>),
    Networks(NetworkInventory),
    LoadBalancers(LoadBalancerInventory),
    Stacks(Vec<Stack>),
}

impl DomainData {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Limits(_) => Domain::Limits,
            Self::Compute(_) => Domain::Servers,
            Self::FloatingIps(_) => Domain::FloatingIps,
            Self::SecurityGroups(_) => Domain::SecurityGroups,
            Self::Keypairs(_) => Domain::Keypairs,
            Self::Images(_) => Domain::Images,
            Self::Volumes(_) => Domain::Volumes,
            Self::VolumeSnapshots(_) => Domain::VolumeSnapshots,
            Self::VolumeBackups(_) => Domain::VolumeBackups,
            Self::Networks(_) => Domain::Networks,
            Self::LoadBalancers(_) => Domain::LoadBalancers,
            Self::Stacks(_) => Domain::Stacks,
        }
    }

    /// Number of top-level entities, for logging
    pub fn len(&self) -> usize {
        match self {
            Self::Limits(l) => l.compute.len() + l.volume.len(),
            Self::Compute(c) => c.servers.len(),
            Self::FloatingIps(v) => v.len(),
            Self::SecurityGroups(v) => v.len(),
            Self::Keypairs(v) => v.len(),
            Self::Images(v) => v.len(),
            Self::Volumes(v) => v.len(),
            Self::VolumeSnapshots(v) | Self::VolumeBackups(v) => v.len(),
            Self::Networks(n) => n.networks.len(),
            Self::LoadBalancers(lb) => lb.pools.len(),
            Self::Stacks(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw fetched entities, one slot per domain
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    pub limits: Fetched<Limits>,
    pub compute: Fetched<ComputeInventory>,
    pub floating_ips: Fetched<Vec<FloatingIp>>,
    pub security_groups: Fetched<Vec<SecurityGroup>>,
    pub keypairs: Fetched<Vec<Keypair>>,
    pub images: Fetched<Vec<Image>>,
    pub volumes: Fetched<Vec<Volume>>,
    pub volume_snapshots: Fetched<Vec<VolumeCopy>>,
    pub volume_backups: Fetched<Vec<VolumeCopy>>,
    pub networks: Fetched<NetworkInventory>,
    pub load_balancers: Fetched<LoadBalancerInventory>,
    pub stacks: Fetched<Vec<Stack>>,
}

impl ResourceStore {
    /// Put a task's successful payload into its slot
    pub(crate) fn fill(&mut self, data: DomainData) {
        match data {
            DomainData::Limits(d) => self.limits = Fetched::Ready(d),
            DomainData::Compute(d) => self.compute = Fetched::Ready(d),
            DomainData::FloatingIps(d) => self.floating_ips = Fetched::Ready(d),
            DomainData::SecurityGroups(d) => self.security_groups = Fetched::Ready(d),
            DomainData::Keypairs(d) => self.keypairs = Fetched::Ready(d),
            DomainData::Images(d) => self.images = Fetched::Ready(d),
            DomainData::Volumes(d) => self.volumes = Fetched::Ready(d),
            DomainData::VolumeSnapshots(d) => self.volume_snapshots = Fetched::Ready(d),
            DomainData::VolumeBackups(d) => self.volume_backups = Fetched::Ready(d),
            DomainData::Networks(d) => self.networks = Fetched::Ready(d),
            DomainData::LoadBalancers(d) => self.load_balancers = Fetched::Ready(d),
            DomainData::Stacks(d) => self.stacks = Fetched::Ready(d),
        }
    }

    /// Mark a domain as failed; its slot becomes an empty collection
    pub fn fail(&mut self, error: FetchError) {
        match error.domain {
            Domain::Limits => self.limits = Fetched::failed(error),
            Domain::Servers => self.compute = Fetched::failed(error),
            Domain::FloatingIps => self.floating_ips = Fetched::failed(error),
            Domain::SecurityGroups => self.security_groups = Fetched::failed(error),
            Domain::Keypairs => self.keypairs = Fetched::failed(error),
            Domain::Images => self.images = Fetched::failed(error),
            Domain::Volumes => self.volumes = Fetched::failed(error),
            Domain::VolumeSnapshots => self.volume_snapshots = Fetched::failed(error),
            Domain::VolumeBackups => self.volume_backups = Fetched::failed(error),
            Domain::Networks => self.networks = Fetched::failed(error),
            Domain::LoadBalancers => self.load_balancers = Fetched::failed(error),
            Domain::Stacks => self.stacks = Fetched::failed(error),
        }
    }

    /// Errors of every failed domain, in domain order
    pub fn failures(&self) -> Vec<&FetchError> {
        [
            self.limits.error(),
            self.compute.error(),
            self.floating_ips.error(),
            self.security_groups.error(),
            self.keypairs.error(),
            self.images.error(),
            self.volumes.error(),
            self.volume_snapshots.error(),
            self.volume_backups.error(),
            self.networks.error(),
            self.load_balancers.error(),
            self.stacks.error(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

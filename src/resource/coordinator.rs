//! Fetch Coordinator
//!
//! Runs one retrieval task per [`Domain`] concurrently and waits for all of
//! them. A task that fails (or panics) leaves its domain empty and is logged
//! once; it never affects its siblings.

use super::fetcher::InventorySource;
use super::model::{ComputeInventory, LoadBalancerInventory, NetworkInventory};
use super::store::{Domain, DomainData, FetchError, ResourceStore};
use crate::openstack::http::format_api_error;
use anyhow::Result;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;

pub type FetchFuture = BoxFuture<'static, Result<DomainData>>;

/// Retrieval operation of a domain; only needs the shared source
pub type FetchOp = fn(Arc<dyn InventorySource>) -> FetchFuture;

/// A domain paired with the operation that fills its slot
#[derive(Clone, Copy)]
pub struct FetchTask {
    pub domain: Domain,
    pub op: FetchOp,
}

impl FetchTask {
    pub fn for_domain(domain: Domain) -> Self {
        let op: FetchOp = match domain {
            Domain::Limits => fetch_limits,
            Domain::Servers => fetch_compute,
            Domain::FloatingIps => fetch_floating_ips,
            Domain::SecurityGroups => fetch_security_groups,
            Domain::Keypairs => fetch_keypairs,
            Domain::Images => fetch_images,
            Domain::Volumes => fetch_volumes,
            Domain::VolumeSnapshots => fetch_volume_snapshots,
            Domain::VolumeBackups => fetch_volume_backups,
            Domain::Networks => fetch_networks,
            Domain::LoadBalancers => fetch_load_balancers,
            Domain::Stacks => fetch_stacks,
        };
        Self { domain, op }
    }
}

impl std::fmt::Debug for FetchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTask").field("domain", &self.domain).finish()
    }
}

fn fetch_limits(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.limits().await.map(DomainData::Limits) }.boxed()
}

fn fetch_compute(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move {
        let (servers, flavors) = futures::try_join!(source.servers(), source.flavors())?;
        Ok(DomainData::Compute(ComputeInventory { servers, flavors }))
    }
    .boxed()
}

fn fetch_floating_ips(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.floating_ips().await.map(DomainData::FloatingIps) }.boxed()
}

fn fetch_security_groups(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.security_groups().await.map(DomainData::SecurityGroups) }.boxed()
}

fn fetch_keypairs(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.keypairs().await.map(DomainData::Keypairs) }.boxed()
}

fn fetch_images(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.images().await.map(DomainData::Images) }.boxed()
}

fn fetch_volumes(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.volumes().await.map(DomainData::Volumes) }.boxed()
}

fn fetch_volume_snapshots(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.volume_snapshots().await.map(DomainData::VolumeSnapshots) }.boxed()
}

fn fetch_volume_backups(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.volume_backups().await.map(DomainData::VolumeBackups) }.boxed()
}

fn fetch_networks(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move {
        let (routers, networks, subnets) =
            futures::try_join!(source.routers(), source.networks(), source.subnets())?;
        Ok(DomainData::Networks(NetworkInventory {
            networks,
            subnets,
            routers,
        }))
    }
    .boxed()
}

fn fetch_load_balancers(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move {
        let (pools, members) = futures::try_join!(source.lb_pools(), source.lb_members())?;
        Ok(DomainData::LoadBalancers(LoadBalancerInventory { pools, members }))
    }
    .boxed()
}

fn fetch_stacks(source: Arc<dyn InventorySource>) -> FetchFuture {
    async move { source.stacks().await.map(DomainData::Stacks) }.boxed()
}

/// Spawn every job on the runtime and wait for all of them.
///
/// Results come back in job order, each tagged with its key. A panicking job
/// shows up as a `JoinError` without disturbing the others.
pub async fn fan_out<K, F, T>(jobs: Vec<(K, F)>) -> Vec<(K, Result<T, JoinError>)>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (keys, handles): (Vec<K>, Vec<_>) = jobs
        .into_iter()
        .map(|(key, job)| (key, tokio::spawn(job)))
        .unzip();

    keys.into_iter().zip(join_all(handles).await).collect()
}

/// Concurrent retrieval of every domain into a [`ResourceStore`]
pub struct Coordinator {
    source: Arc<dyn InventorySource>,
    tasks: Vec<FetchTask>,
}

impl Coordinator {
    pub fn new(source: Arc<dyn InventorySource>) -> Self {
        Self {
            source,
            tasks: Domain::ALL.iter().copied().map(FetchTask::for_domain).collect(),
        }
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.tasks.iter().map(|t| t.domain).collect()
    }

    /// Fetch everything. Returns once every task has finished.
    pub async fn run(self) -> ResourceStore {
        let Self { source, tasks } = self;
        let started = Instant::now();

        let jobs = tasks
            .into_iter()
            .map(|task| (task.domain, (task.op)(Arc::clone(&source))))
            .collect();

        let mut store = ResourceStore::default();

        for (domain, outcome) in fan_out(jobs).await {
            let reason = match outcome {
                Ok(Ok(data)) if data.domain() == domain => {
                    if data.is_empty() {
                        tracing::debug!("Fetched {}: nothing returned", domain);
                    } else {
                        tracing::debug!("Fetched {} ({} items)", domain, data.len());
                    }
                    store.fill(data);
                    continue;
                }
                Ok(Ok(data)) => format!("task produced {} data", data.domain()),
                Ok(Err(e)) => {
                    tracing::debug!("{} fetch error chain: {:#}", domain, e);
                    format_api_error(&e)
                }
                Err(e) if e.is_panic() => "task panicked".to_string(),
                Err(e) => format!("task did not complete: {}", e),
            };

            tracing::error!("Failed to fetch {}: {}", domain, reason);
            store.fail(FetchError { domain, reason });
        }

        tracing::info!(
            "Fetched {} domains in {:?} ({} failed)",
            Domain::ALL.len(),
            started.elapsed(),
            store.failures().len()
        );

        store
    }
}

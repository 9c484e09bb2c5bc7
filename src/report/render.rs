//! Report rendering
//!
//! Builds titled text tables from the joined rows. Each section is built
//! independently; a section that fails to build is left out and logged, the
//! rest of the report is unaffected. Sections without rows are omitted.

use super::classify::ImageCategory;
use super::join::{
    floating_ip_rows, image_rows, join_networks, pool_rows, quota_rows, server_rows,
    volume_rows, ImageRow, ServerIndex, NO_GATEWAY, PLACEHOLDER,
};
use crate::resource::model::{AllocationPool, VolumeCopy};
use crate::resource::store::ResourceStore;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use comfy_table::{presets, Table};
use std::fmt;
use std::path::Path;

/// One titled table
#[derive(Debug)]
pub struct Section {
    pub title: &'static str,
    pub table: Table,
}

impl Section {
    fn new(title: &'static str, table: Table) -> Self {
        Self { title, table }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{}\n\n{}\n", self.title, self.table)
    }
}

/// The full inventory report
#[derive(Debug, Default)]
pub struct Report {
    sections: Vec<Section>,
}

impl Report {
    /// Build every section from the fetched resources of `project_id`
    pub fn build(store: &ResourceStore, project_id: &str) -> Self {
        let mut report = Self::default();

        report.add("quotas", || quota_section(store));
        report.add("servers", || server_section(store));
        report.add("floating IPs", || floating_ip_section(store));
        report.add("keypairs", || keypair_section(store));
        report.add("security groups", || security_group_section(store));
        report.add("images", || image_sections(store, project_id));
        report.add("volumes", || volume_section(store));
        report.add("volume snapshots", || {
            Ok(volume_copy_section("List of Volumes Snapshots", store.volume_snapshots.data()))
        });
        report.add("volume backups", || {
            Ok(volume_copy_section("List of Volumes Backups", store.volume_backups.data()))
        });
        report.add("networks", || network_sections(store));
        report.add("load balancers", || load_balancer_sections(store));
        report.add("stacks", || stack_section(store));

        report
    }

    fn add<F, S>(&mut self, name: &str, build: F)
    where
        F: FnOnce() -> Result<S>,
        S: IntoIterator<Item = Section>,
    {
        match build() {
            Ok(sections) => self.sections.extend(sections),
            Err(e) => tracing::warn!("Skipping {} section: {:#}", name, e),
        }
    }

    pub fn titles(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.title).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Mirror the report into a file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_string())
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::ASCII_FULL_CONDENSED)
        .set_header(header.to_vec());
    table
}

/// Unset and empty values both show as [`PLACEHOLDER`]
fn text(value: &Option<String>) -> String {
    text_or(value, PLACEHOLDER)
}

fn text_or(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn number<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// `YYYY-MM-DD HH:MM:SS` for RFC 3339 or zone-less ISO 8601 stamps, verbatim otherwise
pub fn format_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format(DISPLAY).to_string();
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.format(DISPLAY).to_string();
    }
    raw.to_string()
}

fn timestamp(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(format_timestamp)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn allocation_pools(pools: &[AllocationPool]) -> String {
    pools
        .iter()
        .map(|p| format!("{} - {}", p.start, p.end))
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_empty(section: Section, rows: usize) -> Option<Section> {
    (rows > 0).then_some(section)
}

// =============================================================================
// Sections
// =============================================================================

fn quota_section(store: &ResourceStore) -> Result<Option<Section>> {
    let rows = quota_rows(store.limits.data())?;

    let mut t = table(&["Resource", "Max", "Used"]);
    for row in &rows {
        t.add_row(vec![
            row.resource.to_string(),
            row.max.to_string(),
            row.used.to_string(),
        ]);
    }
    Ok(non_empty(Section::new("Quotas and Usage Limits", t), rows.len()))
}

fn server_section(store: &ResourceStore) -> Result<Option<Section>> {
    let rows = server_rows(store.compute.data(), store.images.data());

    let mut t = table(&[
        "ID",
        "Name",
        "Status",
        "Image Name",
        "Flavor Details",
        "Key Name",
        "Networks",
    ]);
    for row in &rows {
        t.add_row(vec![
            row.id.clone(),
            row.name.clone(),
            row.status.clone(),
            row.image_name.clone(),
            row.flavor.clone(),
            row.key_name.clone(),
            row.networks.clone(),
        ]);
    }
    Ok(non_empty(Section::new("List of Servers", t), rows.len()))
}

fn floating_ip_section(store: &ResourceStore) -> Result<Option<Section>> {
    let rows = floating_ip_rows(store.floating_ips.data());

    let mut t = table(&["ID", "Fixed IP", "IP", "Server ID"]);
    for row in &rows {
        t.add_row(vec![
            row.id.clone(),
            row.fixed_ip.clone(),
            row.ip.clone(),
            row.server_id.clone(),
        ]);
    }
    Ok(non_empty(Section::new("List of Floating IPs", t), rows.len()))
}

fn keypair_section(store: &ResourceStore) -> Result<Option<Section>> {
    let keypairs = store.keypairs.data();

    let mut t = table(&["Name", "Fingerprint"]);
    for key in keypairs {
        t.add_row(vec![key.name.clone(), text(&key.fingerprint)]);
    }
    Ok(non_empty(Section::new("List of Keys", t), keypairs.len()))
}

fn security_group_section(store: &ResourceStore) -> Result<Option<Section>> {
    let groups = store.security_groups.data();

    let mut t = table(&["Name", "Description", "Protocol", "From Port", "To Port", "IP Range"]);
    for group in groups {
        t.add_row(vec![
            text(&group.name),
            text(&group.description),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
        for rule in group.rules.iter().flatten() {
            t.add_row(vec![
                String::new(),
                String::new(),
                text(&rule.ip_protocol),
                number(rule.from_port),
                number(rule.to_port),
                text(&rule.ip_range.cidr),
            ]);
        }
    }
    Ok(non_empty(Section::new("List of Security Groups", t), groups.len()))
}

const IMAGE_HEADER: &[&str] = &["ID", "Name", "Status", "Size", "Disk format", "Created at"];

fn image_cells(row: &ImageRow<'_>) -> Vec<String> {
    let image = row.image;
    vec![
        image.id.clone(),
        text(&image.name),
        text(&image.status),
        number(image.size),
        text(&image.disk_format),
        timestamp(&image.created_at),
    ]
}

fn image_subset<'a, P>(title: &'static str, rows: &[ImageRow<'a>], keep: P) -> Option<Section>
where
    P: Fn(&ImageRow<'a>) -> bool,
{
    let mut t = table(IMAGE_HEADER);
    let mut count = 0;
    for row in rows {
        if !keep(row) {
            continue;
        }
        t.add_row(image_cells(row));
        count += 1;
    }
    non_empty(Section::new(title, t), count)
}

fn image_sections(store: &ResourceStore, project_id: &str) -> Result<Vec<Section>> {
    let rows = image_rows(store.images.data(), project_id);

    let mut header = IMAGE_HEADER.to_vec();
    header.push("Category");
    let mut all = table(&header);
    for row in &rows {
        let mut cells = image_cells(row);
        cells.push(row.category.to_string());
        all.add_row(cells);
    }

    Ok([
        image_subset("List of Owned Images", &rows, |r| r.category == ImageCategory::Project),
        image_subset("List of Shared Images", &rows, |r| r.category == ImageCategory::Shared),
        image_subset("List of Cloudwatt Images", &rows, |r| {
            r.category == ImageCategory::Cloudwatt
        }),
        image_subset("List of Snapshots", &rows, |r| r.snapshot),
        non_empty(Section::new("ALL Available Images", all), rows.len()),
    ]
    .into_iter()
    .flatten()
    .collect())
}

fn volume_section(store: &ResourceStore) -> Result<Option<Section>> {
    let index = ServerIndex::new(&store.compute.data().servers);
    let rows = volume_rows(store.volumes.data(), &index);

    let mut t = table(&[
        "ID",
        "Status",
        "Name",
        "Size",
        "Volume Type",
        "Bootable",
        "Attached to",
        "Snapshot ID",
        "Created at",
    ]);
    for row in &rows {
        let volume = row.volume;
        t.add_row(vec![
            volume.id.clone(),
            text(&volume.status),
            text(&volume.name),
            number(volume.size),
            text(&volume.volume_type),
            text(&volume.bootable),
            row.attached_to.clone(),
            text(&volume.snapshot_id),
            timestamp(&volume.created_at),
        ]);
    }
    Ok(non_empty(Section::new("List of Volumes", t), rows.len()))
}

fn volume_copy_section(title: &'static str, copies: &[VolumeCopy]) -> Option<Section> {
    let mut t = table(&[
        "ID",
        "Status",
        "Name",
        "Description",
        "Size",
        "Volume ID",
        "Created at",
    ]);
    for copy in copies {
        t.add_row(vec![
            copy.id.clone(),
            text(&copy.status),
            text(&copy.name),
            text(&copy.description),
            number(copy.size),
            text(&copy.volume_id),
            timestamp(&copy.created_at),
        ]);
    }
    non_empty(Section::new(title, t), copies.len())
}

/// Subnet column for a subnet created without a name
const UNNAMED_SUBNET: &str = "---";

fn network_sections(store: &ResourceStore) -> Result<Vec<Section>> {
    let joined = join_networks(store.networks.data());

    let mut networks = table(&[
        "Name",
        "Status",
        "Routers",
        "Subnet",
        "Subnet ID",
        "Subnet Allocation Pool",
        "Gateway IP",
        "CIDR",
    ]);
    for row in &joined.networks {
        let routers = row
            .routers
            .iter()
            .map(|r| text_or(&r.name, &r.id))
            .collect::<Vec<_>>()
            .join(", ");
        networks.add_row(vec![
            text(&row.network.name),
            text(&row.network.status),
            routers,
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
        for subnet in &row.subnets {
            networks.add_row(vec![
                String::new(),
                String::new(),
                String::new(),
                text_or(&subnet.name, UNNAMED_SUBNET),
                subnet.id.clone(),
                allocation_pools(&subnet.allocation_pools),
                text(&subnet.gateway_ip),
                text(&subnet.cidr),
            ]);
        }
    }

    let mut routers = table(&["ID", "Name", "Status", "Network ID"]);
    for router in &joined.routers.attached {
        routers.add_row(vec![
            router.id.clone(),
            text(&router.name),
            text(&router.status),
            router
                .gateway_network_id()
                .unwrap_or(NO_GATEWAY)
                .to_string(),
        ]);
    }
    for router in &joined.routers.unattached {
        routers.add_row(vec![
            router.id.clone(),
            text(&router.name),
            text(&router.status),
            NO_GATEWAY.to_string(),
        ]);
    }

    Ok([
        non_empty(Section::new("List of Networks", networks), joined.networks.len()),
        non_empty(Section::new("List of Routers", routers), joined.routers.len()),
    ]
    .into_iter()
    .flatten()
    .collect())
}

fn load_balancer_sections(store: &ResourceStore) -> Result<Vec<Section>> {
    let inventory = store.load_balancers.data();
    let rows = pool_rows(inventory);

    let mut pools = table(&[
        "ID",
        "Name",
        "Status",
        "Provider",
        "lb_method",
        "admin_state_up",
        "Protocol",
    ]);
    let mut members = table(&[
        "Name",
        "Member ID",
        "Member Status",
        "Member Address",
        "Member Protocol Port",
    ]);

    for row in &rows {
        let pool = row.pool;
        pools.add_row(vec![
            pool.id.clone(),
            text(&pool.name),
            text(&pool.status),
            text(&pool.provider),
            text(&pool.lb_method),
            number(pool.admin_state_up),
            text(&pool.protocol),
        ]);

        members.add_row(vec![
            text(&pool.name),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
        for member in &row.members {
            members.add_row(vec![
                String::new(),
                member.id.clone(),
                text(&member.status),
                text(&member.address),
                number(member.protocol_port),
            ]);
        }
    }

    let member_rows = if inventory.members.is_empty() { 0 } else { rows.len() };
    Ok([
        non_empty(Section::new("List of LBaaS Pools", pools), rows.len()),
        non_empty(Section::new("LBaaS Members", members), member_rows),
    ]
    .into_iter()
    .flatten()
    .collect())
}

fn stack_section(store: &ResourceStore) -> Result<Option<Section>> {
    let stacks = store.stacks.data();

    let mut t = table(&["Stack Name", "Creation Time", "Stack Status", "Stack Status Reason"]);
    for stack in stacks {
        t.add_row(vec![
            text(&stack.stack_name),
            timestamp(&stack.creation_time),
            text(&stack.stack_status),
            text(&stack.stack_status_reason),
        ]);
    }
    Ok(non_empty(Section::new("List of Stacks", t), stacks.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::model::*;
    use crate::resource::store::{Domain, FetchError, Fetched};
    use std::collections::BTreeMap;

    const PROJECT: &str = "p-42";

    fn populated() -> ResourceStore {
        let mut addresses = BTreeMap::new();
        addresses.insert(
            "priv".to_string(),
            vec![Address {
                addr: "10.0.0.5".to_string(),
            }],
        );

        let mut limits = Limits::default();
        limits.compute.insert("maxTotalInstances".to_string(), 10);

        ResourceStore {
            limits: Fetched::Ready(limits),
            compute: Fetched::Ready(ComputeInventory {
                servers: vec![Server {
                    id: "s1".to_string(),
                    name: Some("web".to_string()),
                    status: Some("ACTIVE".to_string()),
                    flavor: Some("f1".to_string()),
                    image: Some("i1".to_string()),
                    key_name: Some("ops".to_string()),
                    addresses,
                }],
                flavors: vec![Flavor {
                    id: Some("f1".to_string()),
                    vcpus: 2,
                    ram: 4096,
                    disk: 20,
                    ..Default::default()
                }],
            }),
            images: Fetched::Ready(vec![
                Image {
                    id: "i1".to_string(),
                    name: Some("base".to_string()),
                    owner: Some(PROJECT.to_string()),
                    ..Default::default()
                },
                Image {
                    id: "i2".to_string(),
                    name: Some("snap".to_string()),
                    owner: Some("someone".to_string()),
                    properties: [("image_type".to_string(), "snapshot".to_string())]
                        .into_iter()
                        .collect(),
                    ..Default::default()
                },
            ]),
            volumes: Fetched::Ready(vec![Volume {
                id: "v1".to_string(),
                attachments: vec![VolumeAttachment {
                    server_id: Some("s1".to_string()),
                }],
                ..Default::default()
            }]),
            networks: Fetched::Ready(NetworkInventory {
                networks: vec![Network {
                    id: "n1".to_string(),
                    name: Some("ext".to_string()),
                    ..Default::default()
                }],
                subnets: vec![],
                routers: vec![Router {
                    id: "r1".to_string(),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        }
    }

    fn failed(domain: Domain) -> FetchError {
        FetchError {
            domain,
            reason: "API request failed: 500".to_string(),
        }
    }

    /// Test server row shows networks and flavor details
    #[test]
    fn test_server_row_rendering() {
        let report = Report::build(&populated(), PROJECT);
        let rendered = report.to_string();

        assert!(rendered.contains("List of Servers"));
        assert!(rendered.contains("priv=10.0.0.5"));
        assert!(rendered.contains("2VCPU|4096MB RAM|20GB Disk"));
        assert!(rendered.contains("| base "));
    }

    /// Test sections without rows are left out
    #[test]
    fn test_sections_without_rows_are_omitted() {
        let report = Report::build(&populated(), PROJECT);
        let titles = report.titles();

        assert!(titles.contains(&"List of Owned Images"));
        assert!(titles.contains(&"List of Shared Images"));
        assert!(titles.contains(&"List of Snapshots"));
        assert!(titles.contains(&"List of Routers"));
        assert!(!titles.contains(&"List of Cloudwatt Images"));
        assert!(!titles.contains(&"List of Stacks"));
        assert!(!titles.contains(&"LBaaS Members"));

        assert!(Report::build(&ResourceStore::default(), PROJECT).is_empty());
    }

    /// Test incomplete limits drop only the quota section
    #[test]
    fn test_broken_quota_section_is_skipped_alone() {
        // maxTotalInstances only: every other limit is missing
        let report = Report::build(&populated(), PROJECT);
        let titles = report.titles();
        assert!(!titles.contains(&"Quotas and Usage Limits"));
        assert_eq!(titles[0], "List of Servers");
    }

    /// Test a failed domain renders exactly like an empty one
    #[test]
    fn test_failed_domain_renders_like_empty_domain() {
        for domain in Domain::ALL {
            let mut failing = populated();
            failing.fail(failed(domain));

            let mut empty = populated();
            match domain {
                Domain::Limits => empty.limits = Fetched::Ready(Default::default()),
                Domain::Servers => empty.compute = Fetched::Ready(Default::default()),
                Domain::FloatingIps => empty.floating_ips = Fetched::Ready(Default::default()),
                Domain::SecurityGroups => {
                    empty.security_groups = Fetched::Ready(Default::default())
                }
                Domain::Keypairs => empty.keypairs = Fetched::Ready(Default::default()),
                Domain::Images => empty.images = Fetched::Ready(Default::default()),
                Domain::Volumes => empty.volumes = Fetched::Ready(Default::default()),
                Domain::VolumeSnapshots => {
                    empty.volume_snapshots = Fetched::Ready(Default::default())
                }
                Domain::VolumeBackups => empty.volume_backups = Fetched::Ready(Default::default()),
                Domain::Networks => empty.networks = Fetched::Ready(Default::default()),
                Domain::LoadBalancers => {
                    empty.load_balancers = Fetched::Ready(Default::default())
                }
                Domain::Stacks => empty.stacks = Fetched::Ready(Default::default()),
            }

            assert_eq!(
                Report::build(&failing, PROJECT).to_string(),
                Report::build(&empty, PROJECT).to_string(),
                "{} failure leaked into the report",
                domain
            );
        }
    }

    /// Test volume shows the name of its server when servers were fetched
    #[test]
    fn test_volume_attached_to_known_server() {
        let volumes = |store: &ResourceStore| {
            Report::build(store, PROJECT)
                .sections
                .into_iter()
                .find(|s| s.title == "List of Volumes")
                .map(|s| s.table.to_string())
                .unwrap_or_default()
        };

        let rendered = volumes(&populated());
        assert!(rendered.contains("| web "));

        let mut store = populated();
        store.fail(failed(Domain::Servers));
        let rendered = volumes(&store);
        assert!(rendered.contains("not attached"));
        assert!(!rendered.contains("| web "));
    }

    /// Test file output is identical to the printed report
    #[test]
    fn test_file_mirror_matches_stdout_text() {
        let report = Report::build(&populated(), PROJECT);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.txt");

        report.write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), report.to_string());
        assert!(report.to_string().contains("List of Networks"));
    }

    fn cells(report: &Report, title: &str) -> Vec<Vec<String>> {
        report
            .sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| {
                s.table
                    .row_iter()
                    .map(|row| row.cell_iter().map(|c| c.content()).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Test empty names from the API render like missing ones
    #[test]
    fn test_unnamed_resources_get_placeholders() {
        let mut store = populated();
        store.networks = Fetched::Ready(NetworkInventory {
            networks: vec![Network {
                id: "n1".to_string(),
                name: Some(String::new()),
                subnets: vec!["sub1".to_string()],
                ..Default::default()
            }],
            subnets: vec![Subnet {
                id: "sub1".to_string(),
                name: Some(String::new()),
                ..Default::default()
            }],
            routers: vec![Router {
                id: "r1".to_string(),
                name: Some(String::new()),
                external_gateway_info: Some(GatewayInfo {
                    network_id: Some("n1".to_string()),
                }),
                ..Default::default()
            }],
        });
        store.volumes = Fetched::Ready(vec![Volume {
            id: "v1".to_string(),
            name: Some(String::new()),
            ..Default::default()
        }]);

        let report = Report::build(&store, PROJECT);

        let networks = cells(&report, "List of Networks");
        assert_eq!(networks[0][0], PLACEHOLDER);
        assert_eq!(networks[0][2], "r1");
        assert_eq!(networks[1][3], "---");
        assert_eq!(networks[1][4], "sub1");

        let routers = cells(&report, "List of Routers");
        assert_eq!(routers[0], vec!["r1", PLACEHOLDER, PLACEHOLDER, "n1"]);

        let volumes = cells(&report, "List of Volumes");
        assert_eq!(volumes[0][2], PLACEHOLDER);
    }

    /// Test volume snapshots and backups show the volume they were taken from
    #[test]
    fn test_volume_copies_show_source_volume() {
        let mut store = populated();
        store.volume_backups = Fetched::Ready(vec![VolumeCopy {
            id: "b1".to_string(),
            volume_id: Some("v1".to_string()),
            ..Default::default()
        }]);

        let report = Report::build(&store, PROJECT);
        let backups = cells(&report, "List of Volumes Backups");
        assert_eq!(backups[0][0], "b1");
        assert_eq!(backups[0][5], "v1");
        assert!(cells(&report, "List of Volumes Snapshots").is_empty());
    }

    /// Test timestamps are shortened when they parse and kept otherwise
    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2016-03-01T10:20:30Z"), "2016-03-01 10:20:30");
        assert_eq!(format_timestamp("2016-03-01T10:20:30.000000"), "2016-03-01 10:20:30");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}

//! Resource records
//!
//! Typed views of the entities returned by each service. Fields the APIs may
//! omit (or send as `null`) are optional or defaulted, so one odd record never
//! poisons a whole listing.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Treat `null` as the type's default (empty list, empty map, ...)
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept strings, numbers and booleans; anything else is `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(&Value::deserialize(deserializer)?))
}

/// Resource references come as `{"id": ".."}`, a bare id, or `""` when unset
fn lenient_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let id = match &value {
        Value::Object(map) => map.get("id").and_then(value_to_string),
        other => value_to_string(other),
    };
    Ok(id.filter(|s| !s.is_empty()))
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Compute
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Flavor id
    #[serde(default, deserialize_with = "lenient_ref")]
    pub flavor: Option<String>,
    /// Image id; unset for volume-booted servers
    #[serde(default, deserialize_with = "lenient_ref")]
    pub image: Option<String>,
    #[serde(default)]
    pub key_name: Option<String>,
    /// Network name -> addresses. Ordered by network name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: BTreeMap<String, Vec<Address>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Flavor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub vcpus: u32,
    /// MB
    #[serde(default)]
    pub ram: u64,
    /// GB
    #[serde(default)]
    pub disk: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FloatingIp {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub fixed_ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityGroup {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Nova returns `null` entries for rules it cannot express
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<Option<SecurityRule>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityRule {
    #[serde(default)]
    pub ip_protocol: Option<String>,
    #[serde(default)]
    pub from_port: Option<i64>,
    #[serde(default)]
    pub to_port: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_range: IpRange,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpRange {
    #[serde(default)]
    pub cidr: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keypair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

/// Servers and the flavors needed to describe them
#[derive(Debug, Clone, Default)]
pub struct ComputeInventory {
    pub servers: Vec<Server>,
    pub flavors: Vec<Flavor>,
}

// =============================================================================
// Limits
// =============================================================================

/// Absolute limits (quota maximum and usage) per service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limits {
    pub compute: BTreeMap<String, i64>,
    pub volume: BTreeMap<String, i64>,
}

impl Limits {
    pub fn is_empty(&self) -> bool {
        self.compute.is_empty() && self.volume.is_empty()
    }

    /// Pull the integer entries of a `limits.absolute` document
    pub fn absolute_from(response: &Value) -> BTreeMap<String, i64> {
        response
            .get("limits")
            .and_then(|v| v.get("absolute"))
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_i64().map(|n| (k.clone(), n)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Images
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Image record, read from either the v1 or the v2 listing shape
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub struct Image {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub size: Option<u64>,
    pub disk_format: Option<String>,
    pub created_at: Option<String>,
    pub visibility: Visibility,
    pub owner: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Core v2 attributes that are not user properties
const IMAGE_CORE_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "size",
    "disk_format",
    "container_format",
    "created_at",
    "updated_at",
    "visibility",
    "owner",
    "checksum",
    "min_disk",
    "min_ram",
    "protected",
    "tags",
    "self",
    "file",
    "schema",
    "virtual_size",
];

impl From<Value> for Image {
    fn from(value: Value) -> Self {
        let text = |key: &str| value.get(key).and_then(value_to_string);

        let is_public = value
            .get("is_public")
            .and_then(|v| v.as_bool())
            .unwrap_or_else(|| value.get("visibility").and_then(|v| v.as_str()) == Some("public"));

        // v1 nests properties; v2 flattens them onto the record
        let properties = match value.get("properties").and_then(|v| v.as_object()) {
            Some(props) => props
                .iter()
                .filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s)))
                .collect(),
            None => value
                .as_object()
                .map(|map| {
                    map.iter()
                        .filter(|(k, _)| !IMAGE_CORE_FIELDS.contains(&k.as_str()))
                        .filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s)))
                        .collect()
                })
                .unwrap_or_default(),
        };

        Self {
            id: text("id").unwrap_or_default(),
            name: text("name"),
            status: text("status"),
            size: value.get("size").and_then(|v| v.as_u64()),
            disk_format: text("disk_format"),
            created_at: text("created_at"),
            visibility: if is_public {
                Visibility::Public
            } else {
                Visibility::Private
            },
            owner: text("owner"),
            properties,
        }
    }
}

impl Image {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

// =============================================================================
// Block storage
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// GB
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bootable: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<VolumeAttachment>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeAttachment {
    #[serde(default)]
    pub server_id: Option<String>,
}

/// Snapshot or backup of a volume; both listings share this shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeCopy {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// =============================================================================
// Networking
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Subnet ids
    #[serde(default, deserialize_with = "null_as_default")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allocation_pools: Vec<AllocationPool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationPool {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Router {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub external_gateway_info: Option<GatewayInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayInfo {
    #[serde(default)]
    pub network_id: Option<String>,
}

impl Router {
    pub fn gateway_network_id(&self) -> Option<&str> {
        self.external_gateway_info
            .as_ref()
            .and_then(|g| g.network_id.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkInventory {
    pub networks: Vec<Network>,
    pub subnets: Vec<Subnet>,
    pub routers: Vec<Router>,
}

// =============================================================================
// Load balancing
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LbPool {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub lb_method: Option<String>,
    #[serde(default)]
    pub admin_state_up: Option<bool>,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LbMember {
    pub id: String,
    #[serde(default)]
    pub pool_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub protocol_port: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadBalancerInventory {
    pub pools: Vec<LbPool>,
    pub members: Vec<LbMember>,
}

// =============================================================================
// Orchestration
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stack {
    #[serde(default)]
    pub stack_name: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub stack_status: Option<String>,
    #[serde(default)]
    pub stack_status_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test flavor and image references accept objects and empty strings
    #[test]
    fn test_server_references_are_lenient() {
        let server: Server = serde_json::from_value(json!({
            "id": "s1",
            "status": "ACTIVE",
            "flavor": {"id": "f1", "links": []},
            "image": "",
            "addresses": null
        }))
        .unwrap();
        assert_eq!(server.flavor.as_deref(), Some("f1"));
        assert_eq!(server.image, None);
        assert!(server.addresses.is_empty());
    }

    /// Test v1 image listing with nested properties
    #[test]
    fn test_image_v1_shape() {
        let image: Image = serde_json::from_value(json!({
            "id": "i1",
            "name": "debian",
            "is_public": true,
            "owner": "cw",
            "size": 1024,
            "properties": {"cw_origin": "Cloudwatt", "min_cores": 2}
        }))
        .unwrap();
        assert!(image.is_public());
        assert_eq!(image.property("cw_origin"), Some("Cloudwatt"));
        assert_eq!(image.property("min_cores"), Some("2"));
        assert_eq!(image.size, Some(1024));
    }

    /// Test v2 image listing with flattened properties
    #[test]
    fn test_image_v2_shape() {
        let image: Image = serde_json::from_value(json!({
            "id": "i2",
            "visibility": "private",
            "owner": "p1",
            "image_type": "snapshot",
            "tags": ["a"]
        }))
        .unwrap();
        assert!(!image.is_public());
        assert_eq!(image.property("image_type"), Some("snapshot"));
        assert_eq!(image.property("owner"), None);
    }

    /// Test null security group rules are kept as empty entries
    #[test]
    fn test_security_group_null_rules() {
        let group: SecurityGroup = serde_json::from_value(json!({
            "id": 7,
            "name": "default",
            "description": "default group",
            "rules": [null, {"ip_protocol": "tcp", "from_port": 22, "to_port": 22, "ip_range": {"cidr": "0.0.0.0/0"}}]
        }))
        .unwrap();
        assert_eq!(group.id.as_deref(), Some("7"));
        assert_eq!(group.rules.iter().flatten().count(), 1);
    }

    /// Test absolute limits keep integer entries only
    #[test]
    fn test_limits_absolute_keeps_integers() {
        let absolute = Limits::absolute_from(&json!({
            "limits": {"absolute": {"maxTotalInstances": 10, "totalInstancesUsed": 3, "note": "x"}, "rate": []}
        }));
        assert_eq!(absolute.len(), 2);
        assert_eq!(absolute["maxTotalInstances"], 10);
    }

    /// Test router without gateway info has no gateway network
    #[test]
    fn test_router_gateway() {
        let router: Router = serde_json::from_value(json!({
            "id": "r1",
            "external_gateway_info": null
        }))
        .unwrap();
        assert_eq!(router.gateway_network_id(), None);
    }
}

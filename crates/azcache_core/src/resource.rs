//! Azure Cache for Redis resource documents.
//!
//! The host receives the JSON returned by Azure Resource Manager for a cache
//! (`GET .../Microsoft.Cache/Redis/{name}`) and for its keys (`listKeys`).
//! These types validate those documents into values the rest of the crate
//! can rely on.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::CacheError;

/// Provisioning state of a cache that accepts connections.
pub const PROVISIONED: &str = "Succeeded";

const UNKNOWN: &str = "Unknown";

static RESOURCE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Cache/[^/]+/([^/]+)",
    )
    .ok()
});

/// Components of a cache resource id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub resource_id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl ResourceId {
    pub fn parse(resource_id: &str) -> Result<Self, CacheError> {
        let captures = RESOURCE_ID
            .as_ref()
            .and_then(|regex| regex.captures(resource_id))
            .ok_or_else(|| {
                CacheError::configuration(format!("Invalid resource ID: {}", resource_id))
            })?;

        Ok(Self {
            resource_id: resource_id.to_string(),
            subscription_id: captures[1].to_string(),
            resource_group: captures[2].to_string(),
            name: captures[3].to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmResource {
    id: Option<String>,
    name: Option<String>,
    location: Option<String>,
    sku: Option<ArmSku>,
    #[serde(default)]
    properties: ArmProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmSku {
    name: String,
    family: String,
    capacity: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmProperties {
    host_name: Option<String>,
    enable_non_ssl_port: Option<bool>,
    port: Option<u16>,
    ssl_port: Option<u16>,
    redis_version: Option<String>,
    provisioning_state: Option<String>,
    shard_count: Option<u32>,
    #[serde(default)]
    linked_servers: Vec<ArmLinkedServer>,
}

#[derive(Debug, Deserialize)]
struct ArmLinkedServer {
    id: Option<String>,
}

/// A validated cache resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisResource {
    pub id: ResourceId,
    pub host_name: String,
    pub enable_non_ssl_port: bool,
    /// Non-TLS port. Reported even when the port is disabled.
    pub port: u16,
    pub ssl_port: u16,
    pub sku: String,
    pub location: String,
    pub redis_version: String,
    pub provisioning_state: String,
    pub cluster: bool,
    /// `0` for non-clustered caches.
    pub shard_count: u32,
    pub linked_servers: Vec<String>,
}

impl RedisResource {
    /// Validate an ARM resource document.
    pub fn from_arm(document: &serde_json::Value) -> Result<Self, CacheError> {
        let raw: ArmResource = serde_json::from_value(document.clone())
            .map_err(|e| CacheError::configuration(format!("Invalid resource document: {}", e)))?;

        let resource_id = raw
            .id
            .ok_or_else(|| CacheError::configuration("Resource is missing its ID"))?;

        let properties = raw.properties;

        let host_name = properties
            .host_name
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CacheError::configuration("Resource is missing its host name"))?;

        if raw.name.as_deref().is_none_or(str::is_empty) {
            return Err(CacheError::configuration("Resource is missing its name"));
        }

        let (Some(enable_non_ssl_port), Some(port), Some(ssl_port)) = (
            properties.enable_non_ssl_port,
            properties.port.filter(|p| *p != 0),
            properties.ssl_port.filter(|p| *p != 0),
        ) else {
            return Err(CacheError::configuration(
                "Resource is missing port information",
            ));
        };

        let id = ResourceId::parse(&resource_id)?;

        let shard_count = properties.shard_count.unwrap_or(0);
        let sku = raw
            .sku
            .map(|sku| format!("{} {}{}", sku.name, sku.family, sku.capacity))
            .unwrap_or_else(|| UNKNOWN.to_string());

        Ok(Self {
            id,
            host_name,
            enable_non_ssl_port,
            port,
            ssl_port,
            sku,
            location: raw.location.unwrap_or_default(),
            redis_version: properties
                .redis_version
                .unwrap_or_else(|| UNKNOWN.to_string()),
            provisioning_state: properties
                .provisioning_state
                .unwrap_or_else(|| UNKNOWN.to_string()),
            cluster: shard_count > 0,
            shard_count,
            linked_servers: properties
                .linked_servers
                .into_iter()
                .filter_map(|server| server.id)
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioning_state == PROVISIONED
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmAccessKeys {
    primary_key: Option<String>,
    secondary_key: Option<String>,
}

/// Access keys of a cache, as returned by `listKeys`.
#[derive(Debug, Default)]
pub struct AccessKeys {
    pub primary_key: Option<SecretString>,
    pub secondary_key: Option<SecretString>,
}

impl AccessKeys {
    pub fn from_json(document: &str) -> Result<Self, CacheError> {
        let raw: ArmAccessKeys = serde_json::from_str(document).map_err(|e| {
            CacheError::configuration(format!("Invalid access keys document: {}", e))
        })?;

        Ok(Self {
            primary_key: raw.primary_key.map(SecretString::from),
            secondary_key: raw.secondary_key.map(SecretString::from),
        })
    }

    /// A single key supplied outside a `listKeys` document.
    pub fn primary_only(key: SecretString) -> Self {
        Self {
            primary_key: Some(key),
            secondary_key: None,
        }
    }

    /// Primary key, falling back to the secondary one.
    pub fn preferred(&self) -> Option<&SecretString> {
        self.primary_key
            .as_ref()
            .filter(|key| !key.expose_secret().is_empty())
            .or(self.secondary_key.as_ref())
    }
}

/// StackExchange.Redis style connection string, as shown to users.
pub fn connection_string(resource: &RedisResource, access_key: &SecretString) -> String {
    format!(
        "{}:{},password={},ssl=True,abortConnect=False",
        resource.host_name,
        resource.ssl_port,
        access_key.expose_secret()
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    pub primary_connection_string: Option<String>,
    pub secondary_connection_string: Option<String>,
}

impl ConnectionStrings {
    pub fn new(resource: &RedisResource, keys: &AccessKeys) -> Self {
        Self {
            primary_connection_string: keys
                .primary_key
                .as_ref()
                .map(|key| connection_string(resource, key)),
            secondary_connection_string: keys
                .secondary_key
                .as_ref()
                .map(|key| connection_string(resource, key)),
        }
    }
}

/// Access key and connection strings shown next to the cache properties.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAccess {
    pub access_key: Option<String>,
    #[serde(flatten)]
    pub connection_strings: ConnectionStrings,
}

impl CacheAccess {
    pub fn new(resource: &RedisResource, keys: &AccessKeys) -> Self {
        Self {
            access_key: keys.preferred().map(|key| key.expose_secret().to_string()),
            connection_strings: ConnectionStrings::new(resource, keys),
        }
    }
}

impl std::fmt::Debug for CacheAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAccess")
            .field("access_key", &self.access_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Cache metadata for the properties view. Carries no secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheProperties {
    pub resource_id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
    pub host_name: String,
    pub enable_non_ssl_port: bool,
    pub port: u16,
    pub ssl_port: u16,
    pub sku: String,
    pub location: String,
    pub redis_version: String,
    pub provisioning_state: String,
    pub cluster: bool,
    pub shard_count: u32,
    pub linked_servers: Vec<String>,
}

impl From<&RedisResource> for CacheProperties {
    fn from(resource: &RedisResource) -> Self {
        Self {
            resource_id: resource.id.resource_id.clone(),
            subscription_id: resource.id.subscription_id.clone(),
            resource_group: resource.id.resource_group.clone(),
            name: resource.id.name.clone(),
            host_name: resource.host_name.clone(),
            enable_non_ssl_port: resource.enable_non_ssl_port,
            port: resource.port,
            ssl_port: resource.ssl_port,
            sku: resource.sku.clone(),
            location: resource.location.clone(),
            redis_version: resource.redis_version.clone(),
            provisioning_state: resource.provisioning_state.clone(),
            cluster: resource.cluster,
            shard_count: resource.shard_count,
            linked_servers: resource.linked_servers.clone(),
        }
    }
}

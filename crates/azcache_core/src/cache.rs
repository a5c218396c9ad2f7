use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::executor::CommandExecutor;
use crate::{CacheError, RedisResource, Target};

static KEYSPACE_DB: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^db([0-9]+):").ok());

/// Top-level grouping of keys: a logical database of a non-clustered cache
/// or a primary shard of a clustered one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum KeyContainer {
    Database {
        index: u32,
    },
    #[serde(rename_all = "camelCase")]
    Shard {
        node_id: String,
        port: u16,
    },
}

impl KeyContainer {
    pub fn target(&self) -> Target {
        match self {
            Self::Database { index } => Target::Database(*index),
            Self::Shard { node_id, .. } => Target::Node(node_id.clone()),
        }
    }

    /// Shard number derived from the node port.
    ///
    /// Azure assigns two consecutive ports per shard starting at 13000
    /// (13000 and 13001 are shard 0, 13002 and 13003 shard 1, ...).
    pub fn shard_number(&self) -> Option<u16> {
        match self {
            Self::Shard { port, .. } if *port >= 10000 => Some((port % 100) / 2),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Database { index } => format!("DB {}", index),
            Self::Shard { .. } => match self.shard_number() {
                Some(shard) => format!("Shard {}", shard),
                None => "Unknown shard".to_string(),
            },
        }
    }
}

impl fmt::Display for KeyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Databases listed in an `INFO keyspace` body, in reply order.
pub fn parse_keyspace_databases(info: &str) -> Vec<u32> {
    let Some(regex) = KEYSPACE_DB.as_ref() else {
        return Vec::new();
    };

    regex
        .captures_iter(info)
        .filter_map(|captures| captures[1].parse().ok())
        .collect()
}

/// List what can be browsed in a cache.
///
/// Non-clustered caches only report databases that hold keys, so an empty
/// cache yields an empty list. Shards are ordered by port.
pub async fn list_containers(
    executor: &dyn CommandExecutor,
    resource: &RedisResource,
) -> Result<Vec<KeyContainer>, CacheError> {
    if resource.cluster {
        let mut nodes = executor.cluster_nodes().await?;
        nodes.sort_by_key(|node| node.port);

        return Ok(nodes
            .into_iter()
            .map(|node| KeyContainer::Shard {
                node_id: node.id,
                port: node.port,
            })
            .collect());
    }

    let info = executor.info_keyspace().await?;
    let databases = parse_keyspace_databases(&info);

    if databases.is_empty() {
        log::info!("Cache {} has no keys", resource.name());
    }

    Ok(databases
        .into_iter()
        .map(|index| KeyContainer::Database { index })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(port: u16) -> KeyContainer {
        KeyContainer::Shard {
            node_id: format!("node-{}", port),
            port,
        }
    }

    #[test]
    fn shard_labels_follow_port_pairs() {
        let labels: Vec<String> = (13000..13004).map(|port| shard(port).label()).collect();
        assert_eq!(labels, vec!["Shard 0", "Shard 0", "Shard 1", "Shard 1"]);
    }

    #[test]
    fn low_ports_have_unknown_shard() {
        assert_eq!(shard(6379).label(), "Unknown shard");
        assert_eq!(shard(6379).shard_number(), None);
    }

    #[test]
    fn database_label_and_target() {
        let container = KeyContainer::Database { index: 3 };
        assert_eq!(container.label(), "DB 3");
        assert_eq!(container.target(), Target::Database(3));
    }

    #[test]
    fn parses_keyspace_info() {
        let info = "# Keyspace\r\ndb0:keys=2,expires=0,avg_ttl=0\r\ndb12:keys=1,expires=0,avg_ttl=0\r\n";
        assert_eq!(parse_keyspace_databases(info), vec![0, 12]);
        assert!(parse_keyspace_databases("# Keyspace\r\n").is_empty());
    }

    #[test]
    fn container_json_shape() {
        let json = serde_json::to_value(shard(13002)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "shard", "nodeId": "node-13002", "port": 13002})
        );
    }
}

use azcache_core::{AccessKeys, ClusterNode, RedisResource};
use serde_json::{Value, json};

pub const SAMPLE_RESOURCE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/res-group/providers/Microsoft.Cache/Redis/my-cache";

/// ARM document of a non-clustered Premium cache.
pub fn resource_document() -> Value {
    json!({
        "id": SAMPLE_RESOURCE_ID,
        "name": "my-cache",
        "location": "East US",
        "sku": { "name": "Premium", "family": "P", "capacity": 1 },
        "properties": {
            "hostName": "my-cache.redis.cache.windows.net",
            "enableNonSslPort": false,
            "port": 6379,
            "sslPort": 6380,
            "redisVersion": "6.0.14",
            "provisioningState": "Succeeded"
        }
    })
}

/// Same cache with `shard_count` shards.
pub fn clustered_resource_document(shard_count: u32) -> Value {
    let mut document = resource_document();
    document["properties"]["shardCount"] = json!(shard_count);
    document
}

pub fn sample_resource() -> RedisResource {
    resource_from(&resource_document())
}

pub fn clustered_resource(shard_count: u32) -> RedisResource {
    resource_from(&clustered_resource_document(shard_count))
}

fn resource_from(document: &Value) -> RedisResource {
    match RedisResource::from_arm(document) {
        Ok(resource) => resource,
        Err(e) => panic!("fixture resource document is invalid: {}", e),
    }
}

pub fn access_keys_document() -> String {
    json!({ "primaryKey": "key1", "secondaryKey": "key2" }).to_string()
}

pub fn sample_access_keys() -> AccessKeys {
    match AccessKeys::from_json(&access_keys_document()) {
        Ok(keys) => keys,
        Err(e) => panic!("fixture access keys are invalid: {}", e),
    }
}

pub fn cluster_node(id: &str, port: u16) -> ClusterNode {
    ClusterNode {
        id: id.to_string(),
        port,
    }
}

/// `count` values named `{prefix}{i}`.
pub fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

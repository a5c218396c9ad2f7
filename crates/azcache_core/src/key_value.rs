use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CacheError;

/// Data type of a Redis key, as reported by `TYPE`.
///
/// Bitmaps and HyperLogLogs report themselves as `string`. Serializes as the
/// raw type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyType {
    String,
    List,
    Hash,
    Set,
    ZSet,
    /// Streams, module types and anything else this browser cannot open.
    Other(String),
}

impl KeyType {
    pub fn parse(type_name: &str) -> Self {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "list" => Self::List,
            "hash" => Self::Hash,
            "set" => Self::Set,
            "zset" => Self::ZSet,
            _ => Self::Other(type_name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::List => "list",
            Self::Hash => "hash",
            Self::Set => "set",
            Self::ZSet => "zset",
            Self::Other(raw) => raw,
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            Self::List => Some(CollectionKind::List),
            Self::Hash => Some(CollectionKind::Hash),
            Self::Set => Some(CollectionKind::Set),
            Self::ZSet => Some(CollectionKind::ZSet),
            Self::String | Self::Other(_) => None,
        }
    }
}

impl From<String> for KeyType {
    fn from(type_name: String) -> Self {
        Self::parse(&type_name)
    }
}

impl From<KeyType> for String {
    fn from(key_type: KeyType) -> Self {
        key_type.as_str().to_string()
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key types that hold more than one element and are browsed page by page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Hash,
    Set,
    List,
    ZSet,
}

impl CollectionKind {
    pub fn key_type(self) -> KeyType {
        match self {
            Self::Hash => KeyType::Hash,
            Self::Set => KeyType::Set,
            Self::List => KeyType::List,
            Self::ZSet => KeyType::ZSet,
        }
    }

    /// Hashes and sets are walked with a cursor; lists and sorted sets by offset.
    pub fn is_cursor_scanned(self) -> bool {
        matches!(self, Self::Hash | Self::Set)
    }

    /// Only cursor-scanned collections accept a MATCH pattern.
    pub fn supports_filter(self) -> bool {
        self.is_cursor_scanned()
    }
}

/// Where a command runs: a logical database of a non-clustered cache, or a
/// primary node of a clustered cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Database(u32),
    Node(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(db) => write!(f, "db{}", db),
            Self::Node(id) => write!(f, "node {}", id),
        }
    }
}

/// One entry of a browsed collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionElement {
    /// Hash field name or sorted-set score. Absent for lists and sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
}

impl CollectionElement {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            value: value.into(),
        }
    }
}

/// A key found while scanning a keyspace, with its classification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<KeyType>,
    /// Set when `TYPE` failed for this key only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeyEntry {
    pub fn classified(key: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            key: key.into(),
            key_type: Some(key_type),
            error: None,
        }
    }

    pub fn failed(key: impl Into<String>, error: &CacheError) -> Self {
        Self {
            key: key.into(),
            key_type: None,
            error: Some(error.to_string()),
        }
    }
}

/// Re-pair an `HSCAN` reply (`[field, value, field, value, ...]`).
pub fn pair_hash_fields(
    command: &str,
    items: Vec<String>,
) -> Result<Vec<CollectionElement>, CacheError> {
    let pairs = into_pairs(command, items)?;

    Ok(pairs
        .into_iter()
        .map(|(field, value)| CollectionElement::with_id(field, value))
        .collect())
}

/// Re-pair a `ZRANGE ... WITHSCORES` reply (`[member, score, member, score, ...]`).
///
/// The score becomes the element id.
pub fn pair_scored_members(
    command: &str,
    items: Vec<String>,
) -> Result<Vec<CollectionElement>, CacheError> {
    let pairs = into_pairs(command, items)?;

    Ok(pairs
        .into_iter()
        .map(|(member, score)| CollectionElement::with_id(score, member))
        .collect())
}

fn into_pairs(command: &str, items: Vec<String>) -> Result<Vec<(String, String)>, CacheError> {
    if items.len() % 2 != 0 {
        return Err(CacheError::protocol(format!(
            "{} reply has odd length {}",
            command,
            items.len()
        )));
    }

    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();

    while let (Some(first), Some(second)) = (iter.next(), iter.next()) {
        pairs.push((first, second));
    }

    Ok(pairs)
}

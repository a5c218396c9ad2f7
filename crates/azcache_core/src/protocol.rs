//! Messages exchanged between a panel and the UI that renders it.
//!
//! Every message serializes as `{"command": <Variant>, "value": <payload>}`.
//! Payload field names are camelCase.

use serde::{Deserialize, Serialize};

use crate::browser::MATCH_ALL;
use crate::{CacheError, CollectionElement, KeyEntry, KeyType};

/// Which view the UI should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WebviewView {
    CollectionKey,
    StringKey,
    Keyspace,
}

/// Key types the UI knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedKeyType {
    String,
    List,
    Hash,
    Set,
    Zset,
}

impl SupportedKeyType {
    pub fn from_key_type(key_type: &KeyType) -> Option<Self> {
        match key_type {
            KeyType::String => Some(Self::String),
            KeyType::List => Some(Self::List),
            KeyType::Hash => Some(Self::Hash),
            KeyType::Set => Some(Self::Set),
            KeyType::ZSet => Some(Self::Zset),
            KeyType::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPayload {
    pub data: Vec<CollectionElement>,
    pub clear_cache: bool,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyspacePayload {
    pub data: Vec<KeyEntry>,
    pub clear_cache: bool,
    pub has_more: bool,
}

/// How the UI should present a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Retrying, e.g. with a manual refresh, may succeed.
    Transient,
    Internal,
    Configuration,
    Unsupported,
}

impl From<&CacheError> for ErrorKind {
    fn from(error: &CacheError) -> Self {
        match error {
            CacheError::ConnectionFailed(_) | CacheError::IoError(_) => Self::Transient,
            CacheError::Protocol(_) => Self::Internal,
            CacheError::Configuration(_) => Self::Configuration,
            CacheError::NotSupported(_) => Self::Unsupported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub kind: ErrorKind,
}

impl From<&CacheError> for ErrorPayload {
    fn from(error: &CacheError) -> Self {
        Self {
            message: error.to_string(),
            kind: ErrorKind::from(error),
        }
    }
}

/// Host to UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value")]
pub enum HostMessage {
    View(WebviewView),
    KeyType(SupportedKeyType),
    KeyName(String),
    CollectionSize(u64),
    CollectionData(CollectionPayload),
    StringData(String),
    KeyspaceData(KeyspacePayload),
    Filter(String),
    Error(ErrorPayload),
}

impl HostMessage {
    pub fn error(error: &CacheError) -> Self {
        Self::Error(ErrorPayload::from(error))
    }
}

/// UI to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value")]
pub enum PanelMessage {
    LoadMore,
    FilterChange(String),
    Refresh,
}

/// An empty filter means "match everything".
pub fn normalize_filter(filter: &str) -> &str {
    if filter.is_empty() { MATCH_ALL } else { filter }
}

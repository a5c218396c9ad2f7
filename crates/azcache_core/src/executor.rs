use async_trait::async_trait;

use crate::{CacheError, Target};

/// Sentinel cursor that starts a scan and, when returned, ends it.
pub const SCAN_START: &str = "0";

/// Arguments shared by the SCAN family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanArgs<'a> {
    pub cursor: &'a str,
    pub pattern: &'a str,
    /// Optional `COUNT` hint.
    pub count: Option<u32>,
}

impl<'a> ScanArgs<'a> {
    pub fn new(cursor: &'a str, pattern: &'a str) -> Self {
        Self {
            cursor,
            pattern,
            count: None,
        }
    }

    pub fn with_count(mut self, count: Option<u32>) -> Self {
        self.count = count;
        self
    }
}

/// Raw reply of a SCAN-family command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReply {
    pub cursor: String,
    /// Flat reply items. For `HSCAN` these alternate field and value.
    pub items: Vec<String>,
}

impl ScanReply {
    pub fn new(cursor: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            cursor: cursor.into(),
            items,
        }
    }
}

/// Primary node of a clustered cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterNode {
    pub id: String,
    pub port: u16,
}

/// Executes read-only Redis commands against one cache.
///
/// Implementations own connection management, database selection and
/// timeouts. Every method either returns the reply or fails with the error
/// unchanged; callers never see a retried command.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn scan(&self, target: &Target, args: ScanArgs<'_>) -> Result<ScanReply, CacheError>;

    async fn hscan(
        &self,
        target: &Target,
        key: &str,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError>;

    async fn sscan(
        &self,
        target: &Target,
        key: &str,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError>;

    /// Raw type name as reported by `TYPE`.
    async fn key_type(&self, target: &Target, key: &str) -> Result<String, CacheError>;

    async fn llen(&self, target: &Target, key: &str) -> Result<u64, CacheError>;

    async fn hlen(&self, target: &Target, key: &str) -> Result<u64, CacheError>;

    async fn scard(&self, target: &Target, key: &str) -> Result<u64, CacheError>;

    async fn zcard(&self, target: &Target, key: &str) -> Result<u64, CacheError>;

    /// `LRANGE key start stop`, both bounds inclusive.
    async fn lrange(
        &self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, CacheError>;

    /// `ZRANGE key start stop WITHSCORES`, returning `[member, score, ...]`.
    async fn zrange_with_scores(
        &self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, CacheError>;

    async fn get(&self, target: &Target, key: &str) -> Result<Option<String>, CacheError>;

    /// Body of `INFO keyspace` from the primary connection.
    async fn info_keyspace(&self) -> Result<String, CacheError>;

    /// Primary nodes of a clustered cache. Empty for non-clustered caches.
    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

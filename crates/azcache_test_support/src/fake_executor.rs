use async_trait::async_trait;
use azcache_core::{CacheError, ClusterNode, CommandExecutor, ScanArgs, ScanReply, Target};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A command as the fake sees it: name, target and positional arguments.
///
/// Scan commands are keyed by `[key,] cursor, pattern`; the `COUNT` hint is
/// recorded but not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FakeCommand {
    pub name: String,
    pub target: Option<Target>,
    pub args: Vec<String>,
}

impl FakeCommand {
    pub fn new(name: impl Into<String>, target: Option<&Target>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            target: target.cloned(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FakeReply {
    Scan(ScanReply),
    Strings(Vec<String>),
    Integer(u64),
    Text(Option<String>),
    Nodes(Vec<ClusterNode>),
    Error(String),
}

impl FakeReply {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Strings(_) => "strings",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Nodes(_) => "nodes",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Default)]
struct FakeExecutorState {
    replies: RwLock<HashMap<FakeCommand, FakeReply>>,
    lists: RwLock<HashMap<(Target, String), Vec<String>>>,
    zsets: RwLock<HashMap<(Target, String), Vec<(String, String)>>>,
    executed: Mutex<Vec<FakeCommand>>,
    scan_counts: Mutex<Vec<Option<u32>>>,
}

/// In-memory [`CommandExecutor`] with canned replies and a call log.
///
/// Commands without a canned reply fail with `ConnectionFailed`, so a test
/// notices any call it did not expect.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<FakeExecutorState>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, command: FakeCommand, reply: FakeReply) -> Self {
        self.set_reply(command, reply);
        self
    }

    pub fn with_error(self, command: FakeCommand, message: impl Into<String>) -> Self {
        self.set_reply(command, FakeReply::Error(message.into()));
        self
    }

    pub fn with_scan(
        self,
        target: &Target,
        cursor: &str,
        pattern: &str,
        next: &str,
        items: &[&str],
    ) -> Self {
        self.with_reply(
            FakeCommand::new("SCAN", Some(target), &[cursor, pattern]),
            scan_reply(next, items),
        )
    }

    pub fn with_hscan(
        self,
        target: &Target,
        key: &str,
        cursor: &str,
        pattern: &str,
        next: &str,
        items: &[&str],
    ) -> Self {
        self.with_reply(
            FakeCommand::new("HSCAN", Some(target), &[key, cursor, pattern]),
            scan_reply(next, items),
        )
    }

    pub fn with_sscan(
        self,
        target: &Target,
        key: &str,
        cursor: &str,
        pattern: &str,
        next: &str,
        items: &[&str],
    ) -> Self {
        self.with_reply(
            FakeCommand::new("SSCAN", Some(target), &[key, cursor, pattern]),
            scan_reply(next, items),
        )
    }

    pub fn with_type(self, target: &Target, key: &str, type_name: &str) -> Self {
        self.with_reply(
            FakeCommand::new("TYPE", Some(target), &[key]),
            FakeReply::Text(Some(type_name.to_string())),
        )
    }

    /// Canned reply for `LLEN`, `HLEN`, `SCARD` or `ZCARD`.
    pub fn with_cardinality(self, command: &str, target: &Target, key: &str, size: u64) -> Self {
        self.with_reply(
            FakeCommand::new(command, Some(target), &[key]),
            FakeReply::Integer(size),
        )
    }

    pub fn with_lrange(
        self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
        items: &[&str],
    ) -> Self {
        self.with_reply(
            range_command("LRANGE", target, key, start, stop),
            FakeReply::Strings(strings(items)),
        )
    }

    /// Canned `ZRANGE ... WITHSCORES` reply, flat `[member, score, ...]`.
    pub fn with_zrange(
        self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
        items: &[&str],
    ) -> Self {
        self.with_reply(
            range_command("ZRANGE", target, key, start, stop),
            FakeReply::Strings(strings(items)),
        )
    }

    /// Serve `LLEN` and any `LRANGE` window from `values`.
    pub fn with_list(self, target: &Target, key: &str, values: Vec<String>) -> Self {
        rwlock_write(&self.state.lists).insert((target.clone(), key.to_string()), values);
        self
    }

    /// Serve `ZCARD` and any `ZRANGE` window from `(member, score)` pairs.
    pub fn with_zset(self, target: &Target, key: &str, members: Vec<(String, String)>) -> Self {
        rwlock_write(&self.state.zsets).insert((target.clone(), key.to_string()), members);
        self
    }

    pub fn with_string(self, target: &Target, key: &str, value: Option<&str>) -> Self {
        self.with_reply(
            FakeCommand::new("GET", Some(target), &[key]),
            FakeReply::Text(value.map(str::to_string)),
        )
    }

    pub fn with_info_keyspace(self, body: &str) -> Self {
        self.with_reply(
            FakeCommand::new("INFO", None, &["keyspace"]),
            FakeReply::Text(Some(body.to_string())),
        )
    }

    pub fn with_cluster_nodes(self, nodes: Vec<ClusterNode>) -> Self {
        self.with_reply(
            FakeCommand::new("CLUSTER", None, &["NODES"]),
            FakeReply::Nodes(nodes),
        )
    }

    pub fn set_reply(&self, command: FakeCommand, reply: FakeReply) {
        rwlock_write(&self.state.replies).insert(command, reply);
    }

    pub fn executed(&self) -> Vec<FakeCommand> {
        mutex_lock(&self.state.executed).clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        mutex_lock(&self.state.executed)
            .iter()
            .filter(|command| command.name == name)
            .count()
    }

    /// `COUNT` hints of every scan-family call, in order.
    pub fn scan_counts(&self) -> Vec<Option<u32>> {
        mutex_lock(&self.state.scan_counts).clone()
    }

    pub fn clear_log(&self) {
        mutex_lock(&self.state.executed).clear();
        mutex_lock(&self.state.scan_counts).clear();
    }

    pub fn as_executor_arc(self) -> Arc<dyn CommandExecutor> {
        Arc::new(self)
    }

    fn dispatch(&self, command: FakeCommand) -> Result<FakeReply, CacheError> {
        mutex_lock(&self.state.executed).push(command.clone());

        let reply = rwlock_read(&self.state.replies).get(&command).cloned();

        match reply {
            Some(FakeReply::Error(message)) => Err(CacheError::connection_failed(message)),
            Some(reply) => Ok(reply),
            None => self.collection_reply(&command).ok_or_else(|| {
                CacheError::connection_failed(format!("no fake reply for {:?}", command))
            }),
        }
    }

    fn collection_reply(&self, command: &FakeCommand) -> Option<FakeReply> {
        let target = command.target.clone()?;
        let key = command.args.first()?.clone();
        let entry = (target, key);

        match command.name.as_str() {
            "LLEN" => {
                let lists = rwlock_read(&self.state.lists);
                Some(FakeReply::Integer(lists.get(&entry)?.len() as u64))
            }
            "ZCARD" => {
                let zsets = rwlock_read(&self.state.zsets);
                Some(FakeReply::Integer(zsets.get(&entry)?.len() as u64))
            }
            "LRANGE" => {
                let lists = rwlock_read(&self.state.lists);
                let window = slice_window(lists.get(&entry)?, &command.args)?;
                Some(FakeReply::Strings(window.to_vec()))
            }
            "ZRANGE" => {
                let zsets = rwlock_read(&self.state.zsets);
                let window = slice_window(zsets.get(&entry)?, &command.args)?;
                Some(FakeReply::Strings(
                    window
                        .iter()
                        .flat_map(|(member, score)| [member.clone(), score.clone()])
                        .collect(),
                ))
            }
            _ => None,
        }
    }

    fn scan_call(&self, command: FakeCommand, count: Option<u32>) -> Result<ScanReply, CacheError> {
        mutex_lock(&self.state.scan_counts).push(count);

        match self.dispatch(command)? {
            FakeReply::Scan(reply) => Ok(reply),
            other => Err(unexpected(&other, "scan")),
        }
    }

    fn integer_call(&self, command: FakeCommand) -> Result<u64, CacheError> {
        match self.dispatch(command)? {
            FakeReply::Integer(value) => Ok(value),
            other => Err(unexpected(&other, "integer")),
        }
    }

    fn strings_call(&self, command: FakeCommand) -> Result<Vec<String>, CacheError> {
        match self.dispatch(command)? {
            FakeReply::Strings(values) => Ok(values),
            other => Err(unexpected(&other, "strings")),
        }
    }

    fn text_call(&self, command: FakeCommand) -> Result<Option<String>, CacheError> {
        match self.dispatch(command)? {
            FakeReply::Text(value) => Ok(value),
            other => Err(unexpected(&other, "text")),
        }
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn scan(&self, target: &Target, args: ScanArgs<'_>) -> Result<ScanReply, CacheError> {
        self.scan_call(
            FakeCommand::new("SCAN", Some(target), &[args.cursor, args.pattern]),
            args.count,
        )
    }

    async fn hscan(
        &self,
        target: &Target,
        key: &str,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError> {
        self.scan_call(
            FakeCommand::new("HSCAN", Some(target), &[key, args.cursor, args.pattern]),
            args.count,
        )
    }

    async fn sscan(
        &self,
        target: &Target,
        key: &str,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError> {
        self.scan_call(
            FakeCommand::new("SSCAN", Some(target), &[key, args.cursor, args.pattern]),
            args.count,
        )
    }

    async fn key_type(&self, target: &Target, key: &str) -> Result<String, CacheError> {
        self.text_call(FakeCommand::new("TYPE", Some(target), &[key]))
            .map(|value| value.unwrap_or_else(|| "none".to_string()))
    }

    async fn llen(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.integer_call(FakeCommand::new("LLEN", Some(target), &[key]))
    }

    async fn hlen(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.integer_call(FakeCommand::new("HLEN", Some(target), &[key]))
    }

    async fn scard(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.integer_call(FakeCommand::new("SCARD", Some(target), &[key]))
    }

    async fn zcard(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.integer_call(FakeCommand::new("ZCARD", Some(target), &[key]))
    }

    async fn lrange(
        &self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, CacheError> {
        self.strings_call(range_command("LRANGE", target, key, start, stop))
    }

    async fn zrange_with_scores(
        &self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, CacheError> {
        self.strings_call(range_command("ZRANGE", target, key, start, stop))
    }

    async fn get(&self, target: &Target, key: &str) -> Result<Option<String>, CacheError> {
        self.text_call(FakeCommand::new("GET", Some(target), &[key]))
    }

    async fn info_keyspace(&self) -> Result<String, CacheError> {
        self.text_call(FakeCommand::new("INFO", None, &["keyspace"]))
            .map(Option::unwrap_or_default)
    }

    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, CacheError> {
        match self.dispatch(FakeCommand::new("CLUSTER", None, &["NODES"]))? {
            FakeReply::Nodes(nodes) => Ok(nodes),
            other => Err(unexpected(&other, "nodes")),
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let command = FakeCommand::new("PING", None, &[]);
        mutex_lock(&self.state.executed).push(command.clone());

        match rwlock_read(&self.state.replies).get(&command) {
            Some(FakeReply::Error(message)) => Err(CacheError::connection_failed(message.clone())),
            _ => Ok(()),
        }
    }
}

pub fn scan_reply(next: &str, items: &[&str]) -> FakeReply {
    FakeReply::Scan(ScanReply::new(next, strings(items)))
}

pub fn range_command(name: &str, target: &Target, key: &str, start: u64, stop: u64) -> FakeCommand {
    let start = start.to_string();
    let stop = stop.to_string();
    FakeCommand::new(name, Some(target), &[key, start.as_str(), stop.as_str()])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn slice_window<'a, T>(values: &'a [T], args: &[String]) -> Option<&'a [T]> {
    let start: usize = args.get(1)?.parse().ok()?;
    let stop: usize = args.get(2)?.parse().ok()?;

    if start >= values.len() {
        return Some(&[]);
    }

    let end = (stop + 1).min(values.len());
    Some(&values[start..end])
}

fn unexpected(reply: &FakeReply, expected: &str) -> CacheError {
    CacheError::protocol(format!(
        "fake reply is {} but the command expects {}",
        reply.kind(),
        expected
    ))
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

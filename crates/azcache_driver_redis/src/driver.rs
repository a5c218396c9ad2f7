use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use azcache_core::{
    CacheError, ClusterNode, CommandErrorFormatter, CommandExecutor, ConnectionSettings,
    FormattedError, RedisResource, ScanArgs, ScanReply, Target,
};
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;

use crate::cluster::parse_cluster_nodes;

/// Where and how to reach one Redis server.
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub password: Option<SecretString>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            password: None,
        }
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    fn at_port(&self, port: u16) -> Self {
        Self {
            host: self.host.clone(),
            port,
            tls: self.tls,
            password: self
                .password
                .as_ref()
                .map(|p| SecretString::from(p.expose_secret())),
        }
    }

    fn url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };

        match &self.password {
            Some(password) => format!(
                "{}://:{}@{}:{}/",
                scheme,
                urlencoding::encode(password.expose_secret()),
                self.host,
                self.port
            ),
            None => format!("{}://{}:{}/", scheme, self.host, self.port),
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

/// [`CommandExecutor`] backed by multiplexed async connections.
///
/// Database targets run `SELECT` and the command inside one `MULTI`/`EXEC`
/// block, so commands for different databases can share a connection.
/// Node targets use a dedicated connection per primary.
pub struct RedisExecutor {
    primary: MultiplexedConnection,
    nodes: HashMap<String, MultiplexedConnection>,
    keepalive: Option<JoinHandle<()>>,
}

impl RedisExecutor {
    /// Connect to an Azure cache.
    ///
    /// Non-clustered caches are reached over TLS on the SSL port. Clustered
    /// caches are reached on the non-TLS port, then one connection is opened
    /// per primary shard on the port it advertises.
    pub async fn connect(
        resource: &RedisResource,
        access_key: Option<&SecretString>,
        settings: &ConnectionSettings,
    ) -> Result<Self, CacheError> {
        let access_key = access_key.ok_or_else(|| {
            CacheError::configuration(format!(
                "No access key for {}. Read access to the cache keys is required.",
                resource.name()
            ))
        })?;

        if !resource.is_provisioned() {
            log::warn!(
                "Cache {} provisioning state is {}",
                resource.name(),
                resource.provisioning_state
            );
        }

        let endpoint = if resource.cluster {
            Endpoint::new(&resource.host_name, resource.port)
        } else {
            Endpoint::new(&resource.host_name, resource.ssl_port).with_tls(true)
        };
        let endpoint = endpoint.with_password(SecretString::from(access_key.expose_secret()));

        Self::connect_endpoint(&endpoint, resource.cluster, settings).await
    }

    pub async fn connect_endpoint(
        endpoint: &Endpoint,
        cluster: bool,
        settings: &ConnectionSettings,
    ) -> Result<Self, CacheError> {
        let timeout = Duration::from_secs(settings.connect_timeout_secs.max(1));
        let mut primary = open_connection(endpoint, timeout).await?;

        redis::cmd("PING")
            .query_async::<String>(&mut primary)
            .await
            .map_err(|e| format_redis_error(&e, &endpoint.host, endpoint.port))?;

        log::info!(
            "Connected to {}:{} (tls: {})",
            endpoint.host,
            endpoint.port,
            endpoint.tls
        );

        let mut nodes = HashMap::new();
        if cluster {
            for node in fetch_cluster_nodes(&mut primary).await? {
                let node_endpoint = endpoint.at_port(node.port);
                let connection = open_connection(&node_endpoint, timeout).await?;
                log::info!("Connected to shard node {} on port {}", node.id, node.port);
                nodes.insert(node.id, connection);
            }
        }

        let keepalive = (settings.keepalive_secs > 0).then(|| {
            spawn_keepalive(
                primary.clone(),
                Duration::from_secs(settings.keepalive_secs),
            )
        });

        Ok(Self {
            primary,
            nodes,
            keepalive,
        })
    }

    async fn run<T: FromRedisValue>(&self, target: &Target, command: Cmd) -> Result<T, CacheError> {
        match target {
            Target::Database(db) => {
                let mut connection = self.primary.clone();
                let (reply,): (T,) = redis::pipe()
                    .atomic()
                    .cmd("SELECT")
                    .arg(*db)
                    .ignore()
                    .add_command(command)
                    .query_async(&mut connection)
                    .await
                    .map_err(|e| format_redis_command_error(&e))?;
                Ok(reply)
            }
            Target::Node(id) => {
                let mut connection = self
                    .nodes
                    .get(id)
                    .cloned()
                    .ok_or_else(|| {
                        CacheError::connection_failed(format!("Not connected to shard node {}", id))
                    })?;

                command
                    .query_async(&mut connection)
                    .await
                    .map_err(|e| format_redis_command_error(&e))
            }
        }
    }

    async fn scan_command(
        &self,
        target: &Target,
        mut command: Cmd,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError> {
        command.arg(args.cursor).arg("MATCH").arg(args.pattern);
        if let Some(count) = args.count {
            command.arg("COUNT").arg(count);
        }

        let (cursor, items): (String, Vec<String>) = self.run(target, command).await?;
        Ok(ScanReply::new(cursor, items))
    }
}

impl Drop for RedisExecutor {
    fn drop(&mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.abort();
        }
    }
}

#[async_trait]
impl CommandExecutor for RedisExecutor {
    async fn scan(&self, target: &Target, args: ScanArgs<'_>) -> Result<ScanReply, CacheError> {
        self.scan_command(target, redis::cmd("SCAN"), args).await
    }

    async fn hscan(
        &self,
        target: &Target,
        key: &str,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError> {
        let mut command = redis::cmd("HSCAN");
        command.arg(key);
        self.scan_command(target, command, args).await
    }

    async fn sscan(
        &self,
        target: &Target,
        key: &str,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError> {
        let mut command = redis::cmd("SSCAN");
        command.arg(key);
        self.scan_command(target, command, args).await
    }

    async fn key_type(&self, target: &Target, key: &str) -> Result<String, CacheError> {
        let mut command = redis::cmd("TYPE");
        command.arg(key);
        self.run(target, command).await
    }

    async fn llen(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.run(target, key_command("LLEN", key)).await
    }

    async fn hlen(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.run(target, key_command("HLEN", key)).await
    }

    async fn scard(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.run(target, key_command("SCARD", key)).await
    }

    async fn zcard(&self, target: &Target, key: &str) -> Result<u64, CacheError> {
        self.run(target, key_command("ZCARD", key)).await
    }

    async fn lrange(
        &self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, CacheError> {
        let mut command = key_command("LRANGE", key);
        command.arg(start).arg(stop);
        self.run(target, command).await
    }

    async fn zrange_with_scores(
        &self,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, CacheError> {
        let mut command = key_command("ZRANGE", key);
        command.arg(start).arg(stop).arg("WITHSCORES");
        self.run(target, command).await
    }

    async fn get(&self, target: &Target, key: &str) -> Result<Option<String>, CacheError> {
        self.run(target, key_command("GET", key)).await
    }

    async fn info_keyspace(&self) -> Result<String, CacheError> {
        let mut connection = self.primary.clone();
        redis::cmd("INFO")
            .arg("keyspace")
            .query_async(&mut connection)
            .await
            .map_err(|e| format_redis_command_error(&e))
    }

    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, CacheError> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut connection = self.primary.clone();
        let nodes = fetch_cluster_nodes(&mut connection).await?;

        Ok(nodes
            .into_iter()
            .filter(|node| self.nodes.contains_key(&node.id))
            .collect())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut connection = self.primary.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut connection)
            .await
            .map(|_| ())
            .map_err(|e| format_redis_command_error(&e))
    }
}

fn key_command(name: &str, key: &str) -> Cmd {
    let mut command = redis::cmd(name);
    command.arg(key);
    command
}

async fn open_connection(
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<MultiplexedConnection, CacheError> {
    let client = redis::Client::open(endpoint.url())
        .map_err(|e| format_redis_error(&e, &endpoint.host, endpoint.port))?;

    log::debug!("Connecting to {}:{}", endpoint.host, endpoint.port);

    match tokio::time::timeout(timeout, client.get_multiplexed_async_connection()).await {
        Ok(connection) => {
            connection.map_err(|e| format_redis_error(&e, &endpoint.host, endpoint.port))
        }
        Err(_) => Err(CacheError::connection_failed(format!(
            "Connection to {}:{} timed out after {}s",
            endpoint.host,
            endpoint.port,
            timeout.as_secs()
        ))),
    }
}

async fn fetch_cluster_nodes(
    connection: &mut MultiplexedConnection,
) -> Result<Vec<ClusterNode>, CacheError> {
    let reply: String = redis::cmd("CLUSTER")
        .arg("NODES")
        .query_async(connection)
        .await
        .map_err(|e| format_redis_command_error(&e))?;

    parse_cluster_nodes(&reply)
}

fn spawn_keepalive(connection: MultiplexedConnection, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut connection = connection;
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if let Err(e) = redis::cmd("PING")
                .query_async::<String>(&mut connection)
                .await
            {
                log::warn!("Keep-alive ping failed: {}", e);
            }
        }
    })
}

struct RedisErrorFormatter;

impl RedisErrorFormatter {
    fn format_message(source: &str) -> Option<FormattedError> {
        let lower = source.to_ascii_lowercase();

        let auth_code = if lower.contains("wrongpass") {
            Some("WRONGPASS")
        } else if lower.contains("noauth") {
            Some("NOAUTH")
        } else {
            None
        };

        if auth_code.is_some() || lower.contains("invalid password") {
            let mut formatted = FormattedError::new("Authentication failed. Check access key.")
                .with_hint("Keys may have been regenerated; refresh the cache node");
            if let Some(code) = auth_code {
                formatted = formatted.with_code(code);
            }
            Some(formatted)
        } else if lower.contains("timed out") {
            Some(FormattedError::new("Connection timed out"))
        } else {
            None
        }
    }
}

impl CommandErrorFormatter for RedisErrorFormatter {
    fn format_command_error(&self, error: &(dyn std::error::Error + 'static)) -> FormattedError {
        let source = error.to_string();
        Self::format_message(&source).unwrap_or_else(|| FormattedError::new(source))
    }

    fn format_connection_error(
        &self,
        error: &(dyn std::error::Error + 'static),
        host: &str,
        port: u16,
    ) -> FormattedError {
        let source = error.to_string();

        if source.to_ascii_lowercase().contains("connection refused") {
            return FormattedError::new(format!("Connection refused by {}:{}", host, port));
        }

        Self::format_message(&source).unwrap_or_else(|| FormattedError::new(source))
    }
}

static REDIS_ERROR_FORMATTER: RedisErrorFormatter = RedisErrorFormatter;

fn format_redis_error(error: &redis::RedisError, host: &str, port: u16) -> CacheError {
    REDIS_ERROR_FORMATTER
        .format_connection_error(error, host, port)
        .into_connection_error()
}

fn format_redis_command_error(error: &redis::RedisError) -> CacheError {
    let formatted = REDIS_ERROR_FORMATTER.format_command_error(error);

    if error.kind() == redis::ErrorKind::TypeError {
        formatted.into_protocol_error()
    } else {
        formatted.into_connection_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_encodes_the_password() {
        let endpoint = Endpoint::new("cache.net", 6380)
            .with_tls(true)
            .with_password(SecretString::from("a/b+c="));

        assert_eq!(endpoint.url(), "rediss://:a%2Fb%2Bc%3D@cache.net:6380/");
        assert_eq!(Endpoint::new("localhost", 6379).url(), "redis://localhost:6379/");
    }

    #[test]
    fn debug_output_hides_the_password() {
        let endpoint =
            Endpoint::new("cache.net", 6380).with_password(SecretString::from("hunter2"));
        assert!(!format!("{:?}", endpoint).contains("hunter2"));
    }

    #[test]
    fn auth_errors_get_a_readable_message() {
        let error = redis::RedisError::from((
            redis::ErrorKind::AuthenticationFailed,
            "WRONGPASS invalid username-password pair",
        ));

        let cache_error = format_redis_command_error(&error);
        assert!(matches!(
            cache_error,
            CacheError::ConnectionFailed(ref m)
                if m.starts_with("Authentication failed. Check access key.")
                    && m.ends_with("Code: WRONGPASS")
        ));
    }

    #[test]
    fn auth_errors_carry_the_server_code() {
        let noauth = std::io::Error::other("NOAUTH Authentication required.");
        let formatted = REDIS_ERROR_FORMATTER.format_command_error(&noauth);
        assert_eq!(formatted.code.as_deref(), Some("NOAUTH"));
        assert!(formatted.hint.is_some());

        let invalid = std::io::Error::other("ERR invalid password");
        let formatted = REDIS_ERROR_FORMATTER.format_command_error(&invalid);
        assert_eq!(formatted.message, "Authentication failed. Check access key.");
        assert_eq!(formatted.code, None);

        let other = std::io::Error::other("ERR unknown command");
        assert_eq!(REDIS_ERROR_FORMATTER.format_command_error(&other).code, None);
    }

    #[test]
    fn type_errors_are_protocol_errors() {
        let error = redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "Response was of incompatible type",
        ));
        assert!(matches!(format_redis_command_error(&error), CacheError::Protocol(_)));
    }

    #[test]
    fn refused_connections_name_the_endpoint() {
        let io = std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection refused (os error 111)",
        );
        let error = redis::RedisError::from(io);

        let cache_error = format_redis_error(&error, "cache.net", 6380);
        assert!(matches!(
            cache_error,
            CacheError::ConnectionFailed(ref m) if m == "Connection refused by cache.net:6380"
        ));
    }
}

mod session;

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use azcache_core::{AccessKeys, AppConfig, AppConfigStore, CacheError, RedisResource};
use azcache_driver_redis::RedisExecutor;
use azcache_ipc::{HostErrorCode, HostRequest, HostResponse, framing};
use secrecy::SecretString;
use session::Session;
use tokio::io::BufReader;

const ACCESS_KEY_ENV: &str = "AZCACHE_ACCESS_KEY";

fn main() {
    // stderr only; stdout carries the protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();

    let resource = load_resource(&args.resource).unwrap_or_else(|e| {
        fatal(&format!(
            "Failed to load resource '{}': {e}",
            args.resource.display()
        ))
    });

    let keys = load_access_keys(args.keys.as_deref())
        .unwrap_or_else(|e| fatal(&format!("Failed to load access keys: {e}")));

    let store = match args.config {
        Some(path) => AppConfigStore::at(path),
        None => AppConfigStore::new()
            .unwrap_or_else(|e| fatal(&format!("Failed to locate config: {e}"))),
    };
    let config = store.load().unwrap_or_else(|e| {
        fatal(&format!(
            "Failed to load config '{}': {e}",
            store.path().display()
        ))
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fatal(&format!("Failed to start runtime: {e}")));

    log::info!("Host started: cache={}", resource.name());

    runtime.block_on(serve(resource, keys, config));

    log::info!("Host shutting down");
}

async fn serve(resource: RedisResource, keys: AccessKeys, config: AppConfig) {
    let connected = RedisExecutor::connect(&resource, keys.preferred(), &config.connection).await;
    let executor = match connected {
        Ok(executor) => executor,
        Err(e) => fatal(&format!("Failed to connect to {}: {e}", resource.name())),
    };

    let mut session = Session::new(Arc::new(executor), resource, keys, config.browser);
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();

    loop {
        let response = match framing::recv_msg::<_, HostRequest>(&mut reader).await {
            Ok(Some(request)) => session.handle(request).await,
            Ok(None) => {
                log::debug!("Client closed input");
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                log::warn!("Invalid request: {e}");
                HostResponse::error(
                    0,
                    HostErrorCode::InvalidRequest,
                    format!("Invalid request: {e}"),
                )
            }
            Err(e) => {
                log::warn!("Failed to read request: {e}");
                break;
            }
        };

        if let Err(e) = framing::send_msg(&mut writer, &response).await {
            log::warn!("Failed to send response: {e}");
            break;
        }
    }

    session.close_all();
}

fn load_resource(path: &Path) -> Result<RedisResource, CacheError> {
    let contents = std::fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| CacheError::configuration(format!("Invalid resource JSON: {e}")))?;

    RedisResource::from_arm(&document)
}

/// Keys from `--keys`, falling back to a single key in the environment.
fn load_access_keys(keys: Option<&Path>) -> Result<AccessKeys, CacheError> {
    if let Some(path) = keys {
        return AccessKeys::from_json(&std::fs::read_to_string(path)?);
    }

    Ok(std::env::var(ACCESS_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
        .map(|key| AccessKeys::primary_only(SecretString::from(key)))
        .unwrap_or_default())
}

struct Args {
    resource: PathBuf,
    keys: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut resource = None;
    let mut keys = None;
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--resource" => resource = args.next().map(PathBuf::from),
            "--keys" => keys = args.next().map(PathBuf::from),
            "--config" => config = args.next().map(PathBuf::from),
            "--help" | "-h" => {
                eprintln!("Usage: azcache-host --resource <file> [--keys <file>] [--config <file>]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --resource <file>  ARM resource document of the cache");
                eprintln!("  --keys <file>      listKeys document (default: ${ACCESS_KEY_ENV})");
                eprintln!("  --config <file>    Config file (default: <config dir>/azcache/config.json)");
                process::exit(0);
            }
            other => fatal(&format!("Unknown argument: {other}")),
        }
    }

    Args {
        resource: resource.unwrap_or_else(|| fatal("--resource is required")),
        keys,
        config,
    }
}

fn fatal(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1)
}

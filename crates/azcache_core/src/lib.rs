mod app_config;
mod browser;
mod cache;
mod classifier;
mod error;
mod error_formatter;
mod executor;
mod key_value;
mod keyspace;
mod panel;
mod protocol;
mod range;
mod resource;
mod scan;

pub use app_config::{AppConfig, AppConfigStore, BrowserSettings, ConnectionSettings};
pub use browser::{BrowserState, CollectionBrowser, MATCH_ALL, Page};
pub use cache::{KeyContainer, list_containers, parse_keyspace_databases};
pub use classifier::{classify, classify_all};
pub use error::CacheError;
pub use error_formatter::{CommandErrorFormatter, FormattedError};
pub use executor::{ClusterNode, CommandExecutor, SCAN_START, ScanArgs, ScanReply};
pub use key_value::{
    CollectionElement, CollectionKind, KeyEntry, KeyType, Target, pair_hash_fields,
    pair_scored_members,
};
pub use keyspace::{KeyspaceBrowser, KeyspacePage};
pub use panel::{CollectionPanel, KeyspacePanel, MessageSink, Panel, StringPanel};
pub use protocol::{
    CollectionPayload, ErrorKind, ErrorPayload, HostMessage, KeyspacePayload, PanelMessage,
    SupportedKeyType, WebviewView, normalize_filter,
};
pub use range::{RangeCursor, RangeKind, RangePage, range_page};
pub use resource::{
    AccessKeys, CacheAccess, CacheProperties, ConnectionStrings, PROVISIONED, RedisResource,
    ResourceId, connection_string,
};
pub use scan::{ScanCursor, ScanPage, ScanScope, scan_page};

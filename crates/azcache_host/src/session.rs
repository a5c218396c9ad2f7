use std::collections::HashMap;
use std::sync::Arc;

use azcache_core::{
    AccessKeys, BrowserSettings, CacheAccess, CacheError, CacheProperties, CommandExecutor,
    HostMessage, Panel, PanelMessage, RedisResource, list_containers,
};
use azcache_ipc::{
    HOST_PROTOCOL_VERSION, HelloRequest, HelloResponse, HostErrorCode, HostRequest,
    HostRequestBody, HostResponse, HostResponseBody,
};
use uuid::Uuid;

/// Open panels, each with its own browser.
pub struct PanelManager {
    panels: HashMap<Uuid, Panel>,
}

impl PanelManager {
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: Uuid, panel: Panel) {
        self.panels.insert(id, panel);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Panel> {
        self.panels.remove(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Panel> {
        self.panels.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn close_all(&mut self) {
        let count = self.panels.len();
        self.panels.clear();

        if count > 0 {
            log::info!("Closed {} open panel(s)", count);
        }
    }
}

/// State of one client connection.
pub struct Session {
    executor: Arc<dyn CommandExecutor>,
    resource: RedisResource,
    keys: AccessKeys,
    settings: BrowserSettings,
    panels: PanelManager,
    hello_done: bool,
}

impl Session {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        resource: RedisResource,
        keys: AccessKeys,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            executor,
            resource,
            keys,
            settings,
            panels: PanelManager::new(),
            hello_done: false,
        }
    }

    pub fn open_panels(&self) -> usize {
        self.panels.len()
    }

    pub async fn handle(&mut self, request: HostRequest) -> HostResponse {
        let request_id = request.request_id;

        if !request.protocol_version.is_compatible_with(HOST_PROTOCOL_VERSION) {
            return HostResponse::error(
                request_id,
                HostErrorCode::VersionMismatch,
                format!(
                    "Unsupported protocol version {}.{}",
                    request.protocol_version.major, request.protocol_version.minor
                ),
            );
        }

        if !self.hello_done && !matches!(request.body, HostRequestBody::Hello(_)) {
            return HostResponse::error(
                request_id,
                HostErrorCode::InvalidRequest,
                "Hello handshake required first",
            );
        }

        match request.body {
            HostRequestBody::Hello(hello) => self.hello(request_id, hello),

            HostRequestBody::CacheProperties => HostResponse::ok(
                request_id,
                HostResponseBody::CacheProperties {
                    properties: CacheProperties::from(&self.resource),
                    access: CacheAccess::new(&self.resource, &self.keys),
                },
            ),

            HostRequestBody::ListContainers => {
                match list_containers(self.executor.as_ref(), &self.resource).await {
                    Ok(containers) => {
                        HostResponse::ok(request_id, HostResponseBody::Containers { containers })
                    }
                    Err(e) => {
                        log::error!("Failed to list containers: {}", e);
                        HostResponse::cache_error(request_id, &e)
                    }
                }
            }

            HostRequestBody::OpenKeyspace { container } => {
                let mut messages = Vec::new();
                let opened = Panel::open_keyspace(
                    self.executor.clone(),
                    container.target(),
                    self.settings.clone(),
                    &mut messages,
                )
                .await;

                self.register(request_id, opened, messages)
            }

            HostRequestBody::OpenKey { container, key } => {
                let mut messages = Vec::new();
                let opened = Panel::open_key(
                    self.executor.clone(),
                    container.target(),
                    &key,
                    self.settings.clone(),
                    &mut messages,
                )
                .await;

                self.register(request_id, opened, messages)
            }

            HostRequestBody::Panel { panel_id, message } => {
                self.dispatch(request_id, panel_id, message).await
            }

            HostRequestBody::ClosePanel { panel_id } => match self.panels.remove(&panel_id) {
                Some(_) => {
                    log::debug!("Closed panel {}", panel_id);
                    HostResponse::ok(request_id, HostResponseBody::PanelClosed)
                }
                None => panel_not_found(request_id, panel_id),
            },
        }
    }

    pub fn close_all(&mut self) {
        self.panels.close_all();
    }

    fn hello(&mut self, request_id: u64, hello: HelloRequest) -> HostResponse {
        let compatible = hello
            .supported_versions
            .iter()
            .any(|v| v.is_compatible_with(HOST_PROTOCOL_VERSION));

        if !compatible {
            return HostResponse::error(
                request_id,
                HostErrorCode::VersionMismatch,
                format!(
                    "No compatible protocol version. Server: {}.{}",
                    HOST_PROTOCOL_VERSION.major, HOST_PROTOCOL_VERSION.minor
                ),
            );
        }

        log::info!(
            "Client {} {} connected",
            hello.client_name,
            hello.client_version
        );
        self.hello_done = true;

        HostResponse::ok(
            request_id,
            HostResponseBody::Hello(HelloResponse {
                server_name: "azcache-host".to_string(),
                server_version: env!("CARGO_PKG_VERSION").to_string(),
                selected_version: HOST_PROTOCOL_VERSION,
                cache_name: self.resource.name().to_string(),
            }),
        )
    }

    fn register(
        &mut self,
        request_id: u64,
        opened: Result<Panel, CacheError>,
        messages: Vec<HostMessage>,
    ) -> HostResponse {
        match opened {
            Ok(panel) => {
                let panel_id = Uuid::new_v4();
                self.panels.insert(panel_id, panel);
                log::debug!("Opened panel {}", panel_id);

                HostResponse::panel_update(request_id, Some(panel_id), messages, None)
            }
            Err(e) => HostResponse::panel_update(request_id, None, messages, Some(&e)),
        }
    }

    async fn dispatch(
        &mut self,
        request_id: u64,
        panel_id: Uuid,
        message: PanelMessage,
    ) -> HostResponse {
        let Some(panel) = self.panels.get_mut(&panel_id) else {
            return panel_not_found(request_id, panel_id);
        };

        let mut messages = Vec::new();
        let result = panel.handle(message, &mut messages).await;

        HostResponse::panel_update(request_id, Some(panel_id), messages, result.err().as_ref())
    }
}

fn panel_not_found(request_id: u64, panel_id: Uuid) -> HostResponse {
    HostResponse::error(
        request_id,
        HostErrorCode::PanelNotFound,
        format!("Panel {} not found", panel_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use azcache_core::{
        CollectionElement, CollectionPayload, ErrorKind, KeyContainer, Target, WebviewView,
    };
    use azcache_ipc::ProtocolVersion;
    use azcache_test_support::{FakeExecutor, fixtures};

    const DB: Target = Target::Database(0);

    fn session(fake: &FakeExecutor) -> Session {
        Session::new(
            fake.clone().as_executor_arc(),
            fixtures::sample_resource(),
            fixtures::sample_access_keys(),
            BrowserSettings::default(),
        )
    }

    fn hello() -> HostRequest {
        HostRequest::new(
            1,
            HostRequestBody::Hello(HelloRequest {
                client_name: "test".into(),
                client_version: "0.0.0".into(),
                supported_versions: vec![HOST_PROTOCOL_VERSION],
            }),
        )
    }

    fn error_code(response: &HostResponse) -> Option<HostErrorCode> {
        match &response.body {
            HostResponseBody::Error(error) => Some(error.code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn requests_before_hello_are_rejected() {
        let fake = FakeExecutor::new();
        let mut session = session(&fake);

        let response = session
            .handle(HostRequest::new(1, HostRequestBody::CacheProperties))
            .await;

        assert_eq!(error_code(&response), Some(HostErrorCode::InvalidRequest));
    }

    #[tokio::test]
    async fn incompatible_hello_is_rejected() {
        let fake = FakeExecutor::new();
        let mut session = session(&fake);

        let response = session
            .handle(HostRequest::new(
                1,
                HostRequestBody::Hello(HelloRequest {
                    client_name: "test".into(),
                    client_version: "0.0.0".into(),
                    supported_versions: vec![ProtocolVersion::new(2, 0)],
                }),
            ))
            .await;

        assert_eq!(error_code(&response), Some(HostErrorCode::VersionMismatch));
    }

    #[tokio::test]
    async fn hello_reports_the_cache_name() {
        let fake = FakeExecutor::new();
        let mut session = session(&fake);

        let response = session.handle(hello()).await;
        let HostResponseBody::Hello(hello) = response.body else {
            panic!("expected hello, got {:?}", response.body);
        };

        assert_eq!(hello.cache_name, fixtures::sample_resource().name());
        assert_eq!(hello.selected_version, HOST_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn cache_properties_include_access_key_and_connection_strings() {
        let fake = FakeExecutor::new();
        let mut session = session(&fake);
        session.handle(hello()).await;

        let response = session
            .handle(HostRequest::new(2, HostRequestBody::CacheProperties))
            .await;

        let HostResponseBody::CacheProperties { properties, access } = &response.body else {
            panic!("expected cache properties, got {:?}", response.body);
        };
        assert_eq!(properties.name, fixtures::sample_resource().name());
        assert_eq!(access.access_key.as_deref(), Some("key1"));
        assert_eq!(
            access.connection_strings.primary_connection_string.as_deref(),
            Some("my-cache.redis.cache.windows.net:6380,password=key1,ssl=True,abortConnect=False")
        );
        assert_eq!(
            access.connection_strings.secondary_connection_string.as_deref(),
            Some("my-cache.redis.cache.windows.net:6380,password=key2,ssl=True,abortConnect=False")
        );
    }

    #[tokio::test]
    async fn containers_are_listed() {
        let fake = FakeExecutor::new()
            .with_info_keyspace("# Keyspace\r\ndb0:keys=1,expires=0,avg_ttl=0\r\n");
        let mut session = session(&fake);
        session.handle(hello()).await;

        let response = session
            .handle(HostRequest::new(2, HostRequestBody::ListContainers))
            .await;

        assert_eq!(response.request_id, 2);
        assert_eq!(
            response.body,
            HostResponseBody::Containers {
                containers: vec![KeyContainer::Database { index: 0 }],
            }
        );
    }

    #[tokio::test]
    async fn panels_live_until_closed() {
        let fake = FakeExecutor::new()
            .with_type(&DB, "h", "hash")
            .with_cardinality("HLEN", &DB, "h", 2)
            .with_hscan(&DB, "h", "0", "*", "7", &["f1", "1"])
            .with_hscan(&DB, "h", "7", "*", "0", &["f2", "2"]);
        let mut session = session(&fake);
        session.handle(hello()).await;

        let response = session
            .handle(HostRequest::new(
                2,
                HostRequestBody::OpenKey {
                    container: KeyContainer::Database { index: 0 },
                    key: "h".into(),
                },
            ))
            .await;

        let HostResponseBody::PanelUpdate {
            panel_id: Some(panel_id),
            messages,
            error: None,
        } = response.body
        else {
            panic!("expected an opened panel, got {:?}", response.body);
        };
        assert_eq!(messages[0], HostMessage::View(WebviewView::CollectionKey));
        assert_eq!(session.open_panels(), 1);

        let response = session
            .handle(HostRequest::new(
                3,
                HostRequestBody::Panel {
                    panel_id,
                    message: PanelMessage::LoadMore,
                },
            ))
            .await;
        assert_eq!(
            response.body,
            HostResponseBody::PanelUpdate {
                panel_id: Some(panel_id),
                messages: vec![HostMessage::CollectionData(CollectionPayload {
                    data: vec![CollectionElement::with_id("f2", "2")],
                    clear_cache: false,
                    has_more: false,
                })],
                error: None,
            }
        );

        let response = session
            .handle(HostRequest::new(4, HostRequestBody::ClosePanel { panel_id }))
            .await;
        assert_eq!(response.body, HostResponseBody::PanelClosed);

        let response = session
            .handle(HostRequest::new(
                5,
                HostRequestBody::Panel {
                    panel_id,
                    message: PanelMessage::Refresh,
                },
            ))
            .await;
        assert_eq!(error_code(&response), Some(HostErrorCode::PanelNotFound));
    }

    #[tokio::test]
    async fn failed_open_reports_without_a_panel() {
        let fake = FakeExecutor::new().with_type(&DB, "events", "stream");
        let mut session = session(&fake);
        session.handle(hello()).await;

        let response = session
            .handle(HostRequest::new(
                2,
                HostRequestBody::OpenKey {
                    container: KeyContainer::Database { index: 0 },
                    key: "events".into(),
                },
            ))
            .await;

        let HostResponseBody::PanelUpdate {
            panel_id,
            messages,
            error: Some(error),
        } = response.body
        else {
            panic!("expected a failed open, got {:?}", response.body);
        };
        assert_eq!(panel_id, None);
        assert_eq!(error.kind, ErrorKind::Unsupported);
        assert!(matches!(messages.last(), Some(HostMessage::Error(_))));
        assert_eq!(session.open_panels(), 0);
    }

    #[tokio::test]
    async fn close_all_drops_every_panel() {
        let fake = FakeExecutor::new().with_scan(&DB, "0", "*", "0", &[]);
        let mut session = session(&fake);
        session.handle(hello()).await;

        session
            .handle(HostRequest::new(
                2,
                HostRequestBody::OpenKeyspace {
                    container: KeyContainer::Database { index: 0 },
                },
            ))
            .await;
        assert_eq!(session.open_panels(), 1);

        session.close_all();
        assert_eq!(session.open_panels(), 0);
    }
}

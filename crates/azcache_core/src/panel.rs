//! Panels tie a browser to one open UI view.
//!
//! A panel turns [`PanelMessage`]s into browser calls and reports what the
//! UI must render as [`HostMessage`]s. Messages emitted before a failure are
//! kept; the failure itself is reported as an `Error` message and returned.

use std::sync::Arc;

use crate::browser::CollectionBrowser;
use crate::classifier::classify;
use crate::executor::CommandExecutor;
use crate::keyspace::KeyspaceBrowser;
use crate::protocol::{
    CollectionPayload, HostMessage, KeyspacePayload, PanelMessage, SupportedKeyType, WebviewView,
    normalize_filter,
};
use crate::{BrowserSettings, CacheError, KeyType, Target};

/// Destination of outbound panel messages.
pub trait MessageSink {
    fn send(&mut self, message: HostMessage);
}

impl MessageSink for Vec<HostMessage> {
    fn send(&mut self, message: HostMessage) {
        self.push(message);
    }
}

/// Pages of a hash, set, list or sorted set.
pub struct CollectionPanel {
    browser: CollectionBrowser,
}

impl CollectionPanel {
    pub fn new(browser: CollectionBrowser) -> Self {
        Self { browser }
    }

    pub fn browser(&self) -> &CollectionBrowser {
        &self.browser
    }

    pub async fn open(&mut self, sink: &mut dyn MessageSink) -> Result<(), CacheError> {
        let key_type = self.browser.kind().key_type();

        sink.send(HostMessage::View(WebviewView::CollectionKey));
        if let Some(supported) = SupportedKeyType::from_key_type(&key_type) {
            sink.send(HostMessage::KeyType(supported));
        }
        sink.send(HostMessage::KeyName(self.browser.key().to_string()));

        self.send_header(sink).await?;
        self.load_and_send(true, sink).await
    }

    pub async fn handle(
        &mut self,
        message: PanelMessage,
        sink: &mut dyn MessageSink,
    ) -> Result<(), CacheError> {
        match message {
            PanelMessage::LoadMore => self.load_and_send(false, sink).await,
            PanelMessage::FilterChange(filter) => {
                if !self.browser.kind().supports_filter() {
                    log::debug!("{} does not take a filter", self.browser.key());
                    return Ok(());
                }

                self.browser.update_filter(normalize_filter(&filter));
                sink.send(HostMessage::Filter(self.browser.filter().to_string()));
                self.load_and_send(true, sink).await
            }
            PanelMessage::Refresh => {
                self.browser.reset();
                self.send_header(sink).await?;
                self.load_and_send(true, sink).await
            }
        }
    }

    async fn send_header(&self, sink: &mut dyn MessageSink) -> Result<(), CacheError> {
        if self.browser.kind().supports_filter() {
            sink.send(HostMessage::Filter(self.browser.filter().to_string()));
        }

        let size = self.browser.size().await?;
        sink.send(HostMessage::CollectionSize(size));
        Ok(())
    }

    async fn load_and_send(
        &mut self,
        reset: bool,
        sink: &mut dyn MessageSink,
    ) -> Result<(), CacheError> {
        let page = self.browser.load_next_page(reset).await?;

        sink.send(HostMessage::CollectionData(CollectionPayload {
            data: page.elements,
            clear_cache: page.is_reset,
            has_more: page.has_more,
        }));
        Ok(())
    }
}

/// Read-only view of a string key.
pub struct StringPanel {
    executor: Arc<dyn CommandExecutor>,
    target: Target,
    key: String,
}

impl StringPanel {
    pub fn new(executor: Arc<dyn CommandExecutor>, target: Target, key: impl Into<String>) -> Self {
        Self {
            executor,
            target,
            key: key.into(),
        }
    }

    pub async fn open(&mut self, sink: &mut dyn MessageSink) -> Result<(), CacheError> {
        sink.send(HostMessage::View(WebviewView::StringKey));
        sink.send(HostMessage::KeyType(SupportedKeyType::String));
        sink.send(HostMessage::KeyName(self.key.clone()));
        self.load_and_send(sink).await
    }

    pub async fn handle(
        &mut self,
        message: PanelMessage,
        sink: &mut dyn MessageSink,
    ) -> Result<(), CacheError> {
        match message {
            PanelMessage::Refresh => self.load_and_send(sink).await,
            PanelMessage::LoadMore | PanelMessage::FilterChange(_) => {
                log::debug!("Ignoring {:?} for string key {}", message, self.key);
                Ok(())
            }
        }
    }

    async fn load_and_send(&self, sink: &mut dyn MessageSink) -> Result<(), CacheError> {
        let value = self
            .executor
            .get(&self.target, &self.key)
            .await?
            .ok_or_else(|| CacheError::connection_failed(format!("key not found: {}", self.key)))?;

        sink.send(HostMessage::StringData(value));
        Ok(())
    }
}

/// Keys of one database or shard.
pub struct KeyspacePanel {
    browser: KeyspaceBrowser,
}

impl KeyspacePanel {
    pub fn new(browser: KeyspaceBrowser) -> Self {
        Self { browser }
    }

    pub fn browser(&self) -> &KeyspaceBrowser {
        &self.browser
    }

    pub async fn open(&mut self, sink: &mut dyn MessageSink) -> Result<(), CacheError> {
        sink.send(HostMessage::View(WebviewView::Keyspace));
        sink.send(HostMessage::Filter(self.browser.filter().to_string()));
        self.load_and_send(true, sink).await
    }

    pub async fn handle(
        &mut self,
        message: PanelMessage,
        sink: &mut dyn MessageSink,
    ) -> Result<(), CacheError> {
        match message {
            PanelMessage::LoadMore => self.load_and_send(false, sink).await,
            PanelMessage::FilterChange(filter) => {
                self.browser.update_filter(normalize_filter(&filter));
                sink.send(HostMessage::Filter(self.browser.filter().to_string()));
                self.load_and_send(true, sink).await
            }
            PanelMessage::Refresh => {
                self.browser.reset();
                sink.send(HostMessage::Filter(self.browser.filter().to_string()));
                self.load_and_send(true, sink).await
            }
        }
    }

    async fn load_and_send(
        &mut self,
        reset: bool,
        sink: &mut dyn MessageSink,
    ) -> Result<(), CacheError> {
        let page = self.browser.load_next_page(reset).await?;

        sink.send(HostMessage::KeyspaceData(KeyspacePayload {
            data: page.entries,
            clear_cache: page.is_reset,
            has_more: page.has_more,
        }));
        Ok(())
    }
}

/// Any open panel.
pub enum Panel {
    Collection(CollectionPanel),
    String(StringPanel),
    Keyspace(KeyspacePanel),
}

impl Panel {
    /// Classify `key` and open the matching panel.
    pub async fn open_key(
        executor: Arc<dyn CommandExecutor>,
        target: Target,
        key: &str,
        settings: BrowserSettings,
        sink: &mut dyn MessageSink,
    ) -> Result<Self, CacheError> {
        let key_type = report(classify(executor.as_ref(), &target, key).await, sink)?;

        let mut panel = match key_type {
            KeyType::String => Self::String(StringPanel::new(executor, target, key)),
            KeyType::List | KeyType::Hash | KeyType::Set | KeyType::ZSet => {
                let browser =
                    CollectionBrowser::for_key(executor, target, key, &key_type, settings);
                Self::Collection(CollectionPanel::new(report(browser, sink)?))
            }
            KeyType::Other(raw) => {
                let error = CacheError::not_supported(format!("{} keys cannot be displayed", raw));
                return report(Err(error), sink);
            }
        };

        panel.open(sink).await?;
        Ok(panel)
    }

    pub async fn open_keyspace(
        executor: Arc<dyn CommandExecutor>,
        target: Target,
        settings: BrowserSettings,
        sink: &mut dyn MessageSink,
    ) -> Result<Self, CacheError> {
        let mut panel = Self::Keyspace(KeyspacePanel::new(KeyspaceBrowser::new(
            executor, target, settings,
        )));

        panel.open(sink).await?;
        Ok(panel)
    }

    async fn open(&mut self, sink: &mut dyn MessageSink) -> Result<(), CacheError> {
        let result = match self {
            Self::Collection(panel) => panel.open(sink).await,
            Self::String(panel) => panel.open(sink).await,
            Self::Keyspace(panel) => panel.open(sink).await,
        };

        report(result, sink)
    }

    pub async fn handle(
        &mut self,
        message: PanelMessage,
        sink: &mut dyn MessageSink,
    ) -> Result<(), CacheError> {
        let result = match self {
            Self::Collection(panel) => panel.handle(message, sink).await,
            Self::String(panel) => panel.handle(message, sink).await,
            Self::Keyspace(panel) => panel.handle(message, sink).await,
        };

        report(result, sink)
    }
}

fn report<T>(result: Result<T, CacheError>, sink: &mut dyn MessageSink) -> Result<T, CacheError> {
    if let Err(ref e) = result {
        log::error!("Panel request failed: {}", e);
        sink.send(HostMessage::error(e));
    }

    result
}

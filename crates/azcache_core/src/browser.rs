use std::sync::Arc;

use crate::executor::CommandExecutor;
use crate::range::{RangeCursor, RangeKind, range_page};
use crate::scan::{ScanCursor, ScanScope, scan_page};
use crate::{BrowserSettings, CacheError, CollectionElement, CollectionKind, KeyType, Target};

/// Glob that matches every element.
pub const MATCH_ALL: &str = "*";

/// Lifecycle of a browser's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserState {
    /// No page loaded since creation, reset or filter change.
    Fresh,
    /// At least one page loaded and more remain.
    Paging,
    /// The last page has been delivered.
    Exhausted,
}

/// One page handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub elements: Vec<CollectionElement>,
    pub has_more: bool,
    /// The UI must drop what it has before appending this page.
    pub is_reset: bool,
}

/// Collection types walked by server cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanKind {
    Hash,
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    Scan(ScanKind, ScanCursor),
    Range(RangeKind, RangeCursor),
}

impl Position {
    fn fresh(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Hash => Self::Scan(ScanKind::Hash, ScanCursor::Start),
            CollectionKind::Set => Self::Scan(ScanKind::Set, ScanCursor::Start),
            CollectionKind::List => Self::Range(RangeKind::List, RangeCursor::new()),
            CollectionKind::ZSet => Self::Range(RangeKind::ZSet, RangeCursor::new()),
        }
    }

    fn state(&self) -> BrowserState {
        match self {
            Self::Scan(_, ScanCursor::Start) => BrowserState::Fresh,
            Self::Scan(_, ScanCursor::Next(_)) => BrowserState::Paging,
            Self::Scan(_, ScanCursor::Exhausted) => BrowserState::Exhausted,
            Self::Range(_, cursor) if cursor.size().is_none() => BrowserState::Fresh,
            Self::Range(_, cursor) if cursor.has_more() => BrowserState::Paging,
            Self::Range(..) => BrowserState::Exhausted,
        }
    }

    fn has_more(&self) -> bool {
        match self {
            Self::Scan(_, cursor) => cursor.has_more(),
            Self::Range(_, cursor) => cursor.has_more(),
        }
    }
}

/// Pages through one hash, set, list or sorted-set key.
///
/// Hashes and sets follow a server cursor and honor a MATCH filter; lists
/// and sorted sets follow an offset against the cardinality captured at the
/// last reset. The position only moves once a page has fully loaded, so a
/// failed load can be retried from where it stopped.
pub struct CollectionBrowser {
    executor: Arc<dyn CommandExecutor>,
    target: Target,
    key: String,
    kind: CollectionKind,
    filter: String,
    position: Position,
    settings: BrowserSettings,
}

impl CollectionBrowser {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        target: Target,
        key: impl Into<String>,
        kind: CollectionKind,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            executor,
            target,
            key: key.into(),
            kind,
            filter: MATCH_ALL.to_string(),
            position: Position::fresh(kind),
            settings,
        }
    }

    /// Browser for a classified key; fails for types without a paged view.
    pub fn for_key(
        executor: Arc<dyn CommandExecutor>,
        target: Target,
        key: impl Into<String>,
        key_type: &KeyType,
        settings: BrowserSettings,
    ) -> Result<Self, CacheError> {
        let Some(kind) = key_type.collection_kind() else {
            return Err(CacheError::not_supported(format!(
                "{} keys cannot be browsed as a collection",
                key_type
            )));
        };

        Ok(Self::new(executor, target, key, kind, settings))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn state(&self) -> BrowserState {
        self.position.state()
    }

    pub fn has_next_page(&self) -> bool {
        self.position.has_more()
    }

    /// Current cardinality of the key. Always asks the server.
    pub async fn size(&self) -> Result<u64, CacheError> {
        let executor = self.executor.as_ref();

        match self.kind {
            CollectionKind::Hash => executor.hlen(&self.target, &self.key).await,
            CollectionKind::Set => executor.scard(&self.target, &self.key).await,
            CollectionKind::List => executor.llen(&self.target, &self.key).await,
            CollectionKind::ZSet => executor.zcard(&self.target, &self.key).await,
        }
    }

    /// Load the next page, or the first one when `reset` is set or nothing
    /// has been loaded yet.
    pub async fn load_next_page(&mut self, reset: bool) -> Result<Page, CacheError> {
        let reset = reset || self.state() == BrowserState::Fresh;
        let executor = self.executor.as_ref();

        let (elements, position) = match &self.position {
            Position::Scan(scan_kind, current) => {
                let cursor = if reset {
                    ScanCursor::Start
                } else {
                    current.clone()
                };

                let scope = match scan_kind {
                    ScanKind::Hash => ScanScope::Hash {
                        target: &self.target,
                        key: &self.key,
                    },
                    ScanKind::Set => ScanScope::Set {
                        target: &self.target,
                        key: &self.key,
                    },
                };

                let page =
                    scan_page(executor, scope, &cursor, &self.filter, &self.settings).await?;
                (page.elements, Position::Scan(*scan_kind, page.next_cursor))
            }
            Position::Range(range_kind, current) => {
                let range_kind = *range_kind;
                let page = range_page(
                    executor,
                    range_kind,
                    &self.target,
                    &self.key,
                    current,
                    self.settings.page_size,
                    reset,
                )
                .await?;
                (page.elements, Position::Range(range_kind, page.cursor))
            }
        };

        self.position = position;

        log::debug!(
            "Loaded {} elements of {} ({:?}, reset: {}, more: {})",
            elements.len(),
            self.key,
            self.kind,
            reset,
            self.has_next_page()
        );

        Ok(Page {
            elements,
            has_more: self.has_next_page(),
            is_reset: reset,
        })
    }

    /// Store a new MATCH filter. Returns whether the position was invalidated.
    ///
    /// Lists and sorted sets have no filter; the call leaves them untouched.
    pub fn update_filter(&mut self, filter: impl Into<String>) -> bool {
        let filter = filter.into();

        if !self.kind.supports_filter() {
            log::debug!("Ignoring filter {} for {:?} key {}", filter, self.kind, self.key);
            return false;
        }

        if filter == self.filter {
            return false;
        }

        self.filter = filter;
        self.position = Position::fresh(self.kind);
        true
    }

    /// Forget the position and restore the match-all filter.
    pub fn reset(&mut self) {
        self.filter = MATCH_ALL.to_string();
        self.position = Position::fresh(self.kind);
    }
}

impl std::fmt::Debug for CollectionBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionBrowser")
            .field("target", &self.target)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("filter", &self.filter)
            .field("position", &self.position)
            .finish()
    }
}

use std::sync::Arc;

use crate::browser::MATCH_ALL;
use crate::classifier::classify_all;
use crate::executor::CommandExecutor;
use crate::scan::{ScanCursor, ScanScope, scan_page};
use crate::{BrowserSettings, CacheError, KeyEntry, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspacePage {
    pub entries: Vec<KeyEntry>,
    pub has_more: bool,
    pub is_reset: bool,
}

/// Pages through the keys of one database or cluster node, classifying each.
pub struct KeyspaceBrowser {
    executor: Arc<dyn CommandExecutor>,
    target: Target,
    filter: String,
    cursor: ScanCursor,
    settings: BrowserSettings,
}

impl KeyspaceBrowser {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        target: Target,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            executor,
            target,
            filter: MATCH_ALL.to_string(),
            cursor: ScanCursor::Start,
            settings,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn has_next_page(&self) -> bool {
        self.cursor.has_more()
    }

    pub async fn load_next_page(&mut self, reset: bool) -> Result<KeyspacePage, CacheError> {
        let reset = reset || self.cursor.is_start();
        let cursor = if reset {
            ScanCursor::Start
        } else {
            self.cursor.clone()
        };

        let executor = self.executor.as_ref();
        let page = scan_page(
            executor,
            ScanScope::Keyspace(&self.target),
            &cursor,
            &self.filter,
            &self.settings,
        )
        .await?;

        let keys = page.elements.into_iter().map(|e| e.value).collect();
        let entries = classify_all(executor, &self.target, keys).await;

        self.cursor = page.next_cursor;

        Ok(KeyspacePage {
            entries,
            has_more: self.cursor.has_more(),
            is_reset: reset,
        })
    }

    pub fn update_filter(&mut self, filter: impl Into<String>) -> bool {
        let filter = filter.into();
        if filter == self.filter {
            return false;
        }

        self.filter = filter;
        self.cursor = ScanCursor::Start;
        true
    }

    pub fn reset(&mut self) {
        self.filter = MATCH_ALL.to_string();
        self.cursor = ScanCursor::Start;
    }
}

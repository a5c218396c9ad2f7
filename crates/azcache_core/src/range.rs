//! Offset-based pagination for lists and sorted sets.

use crate::executor::CommandExecutor;
use crate::{CacheError, CollectionElement, Target, pair_scored_members};

/// Collection types walked by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    List,
    ZSet,
}

impl RangeKind {
    async fn cardinality(
        self,
        executor: &dyn CommandExecutor,
        target: &Target,
        key: &str,
    ) -> Result<u64, CacheError> {
        match self {
            Self::List => executor.llen(target, key).await,
            Self::ZSet => executor.zcard(target, key).await,
        }
    }

    async fn fetch(
        self,
        executor: &dyn CommandExecutor,
        target: &Target,
        key: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<CollectionElement>, CacheError> {
        match self {
            Self::List => {
                let items = executor.lrange(target, key, start, stop).await?;
                Ok(items.into_iter().map(CollectionElement::new).collect())
            }
            Self::ZSet => {
                let items = executor.zrange_with_scores(target, key, start, stop).await?;
                pair_scored_members("ZRANGE", items)
            }
        }
    }
}

/// Offset position against a cardinality captured at the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeCursor {
    size: Option<u64>,
    shown: u64,
}

impl RangeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached cardinality, `None` before the first page.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn shown(&self) -> u64 {
        self.shown
    }

    pub fn has_more(&self) -> bool {
        match self.size {
            Some(size) => self.shown != size,
            None => true,
        }
    }

    /// Inclusive `[start, stop]` of the next window, or `None` when exhausted.
    fn window(&self, page_size: u64) -> Option<(u64, u64)> {
        let size = self.size?;
        if self.shown >= size {
            return None;
        }

        let end = (self.shown + page_size).min(size);
        Some((self.shown, end - 1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePage {
    pub elements: Vec<CollectionElement>,
    pub cursor: RangeCursor,
}

/// Fetch the next window of a list or sorted set.
///
/// With `reset` (or before any size is known) the cardinality is read once
/// and the offset goes back to zero. An empty window issues no range command.
pub async fn range_page(
    executor: &dyn CommandExecutor,
    kind: RangeKind,
    target: &Target,
    key: &str,
    cursor: &RangeCursor,
    page_size: u32,
    reset: bool,
) -> Result<RangePage, CacheError> {
    let mut next = *cursor;

    if reset || next.size.is_none() {
        let size = kind.cardinality(executor, target, key).await?;
        log::debug!("{:?} {} has {} elements", kind, key, size);
        next = RangeCursor {
            size: Some(size),
            shown: 0,
        };
    }

    let Some((start, stop)) = next.window(u64::from(page_size.max(1))) else {
        return Ok(RangePage {
            elements: Vec::new(),
            cursor: next,
        });
    };

    let elements = kind.fetch(executor, target, key, start, stop).await?;
    next.shown = stop + 1;

    Ok(RangePage {
        elements,
        cursor: next,
    })
}

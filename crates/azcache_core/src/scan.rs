//! Cursor-based pagination over the SCAN family.

use crate::executor::{CommandExecutor, SCAN_START, ScanArgs, ScanReply};
use crate::{BrowserSettings, CacheError, CollectionElement, Target, pair_hash_fields};

/// Position of a cursor scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanCursor {
    /// Nothing requested yet; the next call sends `0`.
    #[default]
    Start,
    /// Cursor returned by the server, resumed on the next page.
    Next(String),
    /// The server returned `0`; no further pages exist.
    Exhausted,
}

impl ScanCursor {
    pub fn has_more(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    fn from_reply(cursor: String) -> Self {
        if cursor == SCAN_START {
            Self::Exhausted
        } else {
            Self::Next(cursor)
        }
    }
}

/// What a scan walks over.
#[derive(Debug, Clone, Copy)]
pub enum ScanScope<'a> {
    /// Keys of a database or cluster node (`SCAN`).
    Keyspace(&'a Target),
    /// Fields of a hash key (`HSCAN`).
    Hash { target: &'a Target, key: &'a str },
    /// Members of a set key (`SSCAN`).
    Set { target: &'a Target, key: &'a str },
}

impl ScanScope<'_> {
    fn command(&self) -> &'static str {
        match self {
            Self::Keyspace(_) => "SCAN",
            Self::Hash { .. } => "HSCAN",
            Self::Set { .. } => "SSCAN",
        }
    }

    async fn issue(
        &self,
        executor: &dyn CommandExecutor,
        args: ScanArgs<'_>,
    ) -> Result<ScanReply, CacheError> {
        match *self {
            Self::Keyspace(target) => executor.scan(target, args).await,
            Self::Hash { target, key } => executor.hscan(target, key, args).await,
            Self::Set { target, key } => executor.sscan(target, key, args).await,
        }
    }

    fn normalize(&self, items: Vec<String>) -> Result<Vec<CollectionElement>, CacheError> {
        match self {
            Self::Hash { .. } => pair_hash_fields(self.command(), items),
            Self::Keyspace(_) | Self::Set { .. } => {
                Ok(items.into_iter().map(CollectionElement::new).collect())
            }
        }
    }
}

/// Result of one [`scan_page`] call. Nothing is committed until the caller
/// stores `next_cursor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    pub elements: Vec<CollectionElement>,
    pub next_cursor: ScanCursor,
}

/// Fetch the next page of a cursor scan.
///
/// Calls are issued strictly in sequence, each resuming from the cursor the
/// previous one returned, until the page holds `scan_min_elements` entries
/// or the server returns cursor `0`. With `max_scan_iterations` set the loop
/// also stops after that many calls and returns whatever it gathered, with
/// the cursor still open.
///
/// Any executor error aborts the whole page; the caller's cursor is untouched.
pub async fn scan_page(
    executor: &dyn CommandExecutor,
    scope: ScanScope<'_>,
    cursor: &ScanCursor,
    filter: &str,
    settings: &BrowserSettings,
) -> Result<ScanPage, CacheError> {
    let mut wire = match cursor {
        ScanCursor::Start => SCAN_START.to_string(),
        ScanCursor::Next(cursor) => cursor.clone(),
        ScanCursor::Exhausted => {
            return Ok(ScanPage {
                elements: Vec::new(),
                next_cursor: ScanCursor::Exhausted,
            });
        }
    };

    let min_elements = settings.scan_min_elements.max(1);
    let mut elements = Vec::new();
    let mut iterations = 0u32;

    loop {
        let args = ScanArgs::new(&wire, filter).with_count(settings.scan_count);
        let reply = scope.issue(executor, args).await?;
        iterations += 1;

        log::debug!(
            "{} {} MATCH {} -> cursor {}, {} items",
            scope.command(),
            wire,
            filter,
            reply.cursor,
            reply.items.len()
        );

        elements.extend(scope.normalize(reply.items)?);

        let next = ScanCursor::from_reply(reply.cursor);

        let ScanCursor::Next(next_wire) = next else {
            return Ok(ScanPage {
                elements,
                next_cursor: ScanCursor::Exhausted,
            });
        };

        if elements.len() >= min_elements {
            return Ok(ScanPage {
                elements,
                next_cursor: ScanCursor::Next(next_wire),
            });
        }

        if let Some(max) = settings.max_scan_iterations
            && iterations >= max
        {
            log::warn!(
                "{} stopped after {} calls with {} entries, cursor {} left open",
                scope.command(),
                iterations,
                elements.len(),
                next_wire
            );

            return Ok(ScanPage {
                elements,
                next_cursor: ScanCursor::Next(next_wire),
            });
        }

        wire = next_wire;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_reply_exhausts_the_cursor() {
        assert_eq!(ScanCursor::from_reply("0".into()), ScanCursor::Exhausted);
        assert_eq!(
            ScanCursor::from_reply("17".into()),
            ScanCursor::Next("17".into())
        );
    }

    #[test]
    fn only_exhausted_has_no_more() {
        assert!(ScanCursor::Start.has_more());
        assert!(ScanCursor::Next("5".into()).has_more());
        assert!(!ScanCursor::Exhausted.has_more());
    }

    #[test]
    fn set_members_have_no_id() {
        let target = Target::Database(0);
        let scope = ScanScope::Set {
            target: &target,
            key: "s",
        };

        let elements = scope.normalize(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(
            elements,
            vec![CollectionElement::new("a"), CollectionElement::new("b")]
        );
    }

    #[test]
    fn odd_hash_batch_is_rejected() {
        let target = Target::Database(0);
        let scope = ScanScope::Hash {
            target: &target,
            key: "h",
        };

        let err = scope.normalize(vec!["f1".into()]).unwrap_err();
        assert!(matches!(err, CacheError::Protocol(ref m) if m.starts_with("HSCAN")));
    }
}

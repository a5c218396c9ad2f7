use futures::future::join_all;

use crate::executor::CommandExecutor;
use crate::{CacheError, KeyEntry, KeyType, Target};

/// Resolve the data type of one key with `TYPE`.
pub async fn classify(
    executor: &dyn CommandExecutor,
    target: &Target,
    key: &str,
) -> Result<KeyType, CacheError> {
    let raw = executor.key_type(target, key).await?;
    Ok(KeyType::parse(&raw))
}

/// Classify a batch of keys concurrently, keeping their order.
///
/// A failure is recorded on the affected entry only.
pub async fn classify_all(
    executor: &dyn CommandExecutor,
    target: &Target,
    keys: Vec<String>,
) -> Vec<KeyEntry> {
    let lookups = keys.iter().map(|key| classify(executor, target, key));
    let outcomes = join_all(lookups).await;

    keys.into_iter()
        .zip(outcomes)
        .map(|(key, outcome)| match outcome {
            Ok(key_type) => KeyEntry::classified(key, key_type),
            Err(e) => {
                log::warn!("TYPE {} on {} failed: {}", key, target, e);
                KeyEntry::failed(key, &e)
            }
        })
        .collect()
}

//! Seen-message cache backing bulk fetches
//!
//! The Bot API cannot look up arbitrary messages by ID, so every media message the
//! bot receives is remembered here for a while. Batch fetches are answered from this
//! cache; IDs that were never seen come back as "no media".

use super::client::MediaItem;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Recently seen media messages keyed by `(chat_id, message_id)`
#[derive(Clone)]
pub struct MessageCache {
    cache: Cache<(i64, i32), MediaItem>,
    misses: Arc<AtomicU64>,
}

impl MessageCache {
    /// Creates a cache holding at most `max_capacity` messages for `ttl_secs` each
    ///
    /// # Examples
    ///
    /// ```
    /// use stream_link_bot::bot::MessageCache;
    ///
    /// let cache = MessageCache::new(86_400, 100_000);
    /// assert_eq!(cache.entry_count(), 0);
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Remember a media message
    pub async fn record(&self, item: MediaItem) {
        self.cache.insert((item.chat_id, item.message_id), item).await;
    }

    /// Look up a run of message IDs; the result is aligned with `ids`
    pub async fn lookup(&self, chat_id: i64, ids: &[i32]) -> Vec<Option<MediaItem>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let item = self.cache.get(&(chat_id, *id)).await;
            if item.is_none() {
                let count = self.misses.fetch_add(1, Ordering::Relaxed) + 1;
                if count.is_multiple_of(100) {
                    debug!(count, chat_id, "Seen-message cache misses");
                }
            }
            found.push(item);
        }
        found
    }

    /// Current number of cached messages
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Total lookups that found nothing
    #[must_use]
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

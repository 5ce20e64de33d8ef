//! Atomically published feed snapshots.
//!
//! The cache holds an `Arc<CacheSnapshot>` inside a `tokio::sync::watch`
//! channel. The refresher is the only writer; request handlers clone the
//! current `Arc` and keep reading it even if a newer snapshot is published
//! in the meantime.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use super::{CacheSnapshot, Item};
use crate::Error;

/// Result of offering freshly fetched items to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The items replaced the previous snapshot.
    Accepted { len: usize },
    /// Fewer items than currently cached; the previous snapshot stays.
    Shrunk { offered: usize, cached: usize },
}

/// Holder of the current [`CacheSnapshot`].
#[derive(Debug)]
pub struct FeedCache {
    tx: watch::Sender<Arc<CacheSnapshot>>,
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedCache {
    /// Create an empty cache (no successful refresh yet).
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(CacheSnapshot::default()));
        Self { tx }
    }

    /// Latest committed snapshot. Never blocks on the refresher.
    pub fn current(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Item at `position` in the current snapshot.
    pub fn item_at(&self, position: usize) -> Result<Item, Error> {
        self.current().item_at(position).cloned()
    }

    /// Offer a fetched timeline, applying the anti-regression guard.
    ///
    /// The length check and the swap happen under the channel's write guard,
    /// so readers see either the old snapshot or the new one.
    pub fn offer(&self, items: Vec<Item>) -> Offer {
        let offered = items.len();
        let mut outcome = Offer::Accepted { len: offered };

        self.tx.send_if_modified(|snapshot| {
            if offered < snapshot.len() {
                outcome = Offer::Shrunk { offered, cached: snapshot.len() };
                return false;
            }
            *snapshot = Arc::new(CacheSnapshot::new(items, Utc::now()));
            true
        });

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| Item::new(i.to_string(), format!("post {i}"), "Author"))
            .collect()
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = FeedCache::new();
        assert!(cache.current().is_empty());
        assert!(matches!(cache.item_at(0), Err(Error::NotAvailable { position: 0, len: 0 })));
    }

    #[test]
    fn test_offer_accepts_first_fetch() {
        let cache = FeedCache::new();
        assert_eq!(cache.offer(items(5)), Offer::Accepted { len: 5 });
        assert_eq!(cache.current().len(), 5);
        assert!(cache.current().refreshed_at().is_some());
        assert_eq!(cache.item_at(4).unwrap().text, "post 4");
        assert!(cache.item_at(5).is_err());
    }

    #[test]
    fn test_offer_accepts_equal_length() {
        let cache = FeedCache::new();
        cache.offer(items(3));
        let mut newer = items(3);
        newer[0].text = "edited".into();

        assert_eq!(cache.offer(newer), Offer::Accepted { len: 3 });
        assert_eq!(cache.item_at(0).unwrap().text, "edited");
    }

    #[test]
    fn test_offer_rejects_shrink_repeatedly() {
        let cache = FeedCache::new();
        cache.offer(items(10));
        let before = cache.current();

        for n in [0, 3, 9] {
            assert_eq!(cache.offer(items(n)), Offer::Shrunk { offered: n, cached: 10 });
        }

        assert!(Arc::ptr_eq(&before, &cache.current()));
    }

    #[test]
    fn test_reader_keeps_old_snapshot() {
        let cache = FeedCache::new();
        cache.offer(items(2));
        let held = cache.current();

        cache.offer(items(4));

        assert_eq!(held.len(), 2);
        assert_eq!(cache.current().len(), 4);
    }

    #[test]
    fn test_successive_snapshots_never_shrink() {
        let cache = FeedCache::new();
        let mut last = 0;
        for n in [3, 1, 5, 5, 2, 8, 0, 8] {
            cache.offer(items(n));
            let len = cache.current().len();
            assert!(len >= last);
            last = len;
        }
        assert_eq!(last, 8);
    }
}

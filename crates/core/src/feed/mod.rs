//! In-memory mirror of the upstream timeline.
//!
//! This module provides:
//!
//! - [`Item`] and [`CacheSnapshot`], the immutable cached view
//! - [`FeedCache`], the atomically swapped snapshot holder
//! - [`Refresher`], the background loop that keeps the cache current
//! - [`TimelineSource`], the seam to the upstream API client

pub mod cache;
pub mod refresh;

pub use cache::{FeedCache, Offer};
pub use refresh::{RefreshPolicy, Refresher, Step};

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Error;

/// One fetched feed entry.
///
/// Its position is implicit: the index within the snapshot that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Upstream identifier, kept for logging.
    pub id: String,
    /// Display text.
    pub text: String,
    /// Author display name.
    pub author: String,
}

impl Item {
    pub fn new(id: impl Into<String>, text: impl Into<String>, author: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), author: author.into() }
    }
}

/// Ordered items (newest first) plus the time of the refresh that produced them.
///
/// Snapshots are never mutated. A refresh publishes a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    items: Vec<Item>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    pub fn new(items: Vec<Item>, refreshed_at: DateTime<Utc>) -> Self {
        Self { items, refreshed_at: Some(refreshed_at) }
    }

    /// Item at `position`, or `NotAvailable` when out of range.
    pub fn item_at(&self, position: usize) -> Result<&Item, Error> {
        self.items
            .get(position)
            .ok_or(Error::NotAvailable { position, len: self.items.len() })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Wall-clock time of the refresh, `None` before the first success.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}

/// Which upstream account to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    UserId(u64),
    ScreenName(String),
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::UserId(id) => write!(f, "user_id={id}"),
            AccountRef::ScreenName(name) => write!(f, "@{name}"),
        }
    }
}

/// Parameters for one upstream timeline fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub account: AccountRef,
    pub max_count: u32,
    pub exclude_replies: bool,
}

impl FetchRequest {
    pub fn new(account: AccountRef) -> Self {
        Self { account, max_count: 100, exclude_replies: true }
    }
}

/// Upstream feed collaborator.
///
/// Returns the most recent items newest-first, or `Error::FetchFailed`.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    async fn fetch_recent(&self, request: &FetchRequest) -> Result<Vec<Item>, Error>;
}

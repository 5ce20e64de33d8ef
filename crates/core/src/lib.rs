//! Core types and shared functionality for gemfeed.
//!
//! This crate provides:
//! - The feed cache and its background refresh loop
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod feed;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use feed::{AccountRef, CacheSnapshot, FeedCache, FetchRequest, Item, RefreshPolicy, Refresher, TimelineSource};

//! Upstream client code for gemfeed.
//!
//! This crate provides the Twitter timeline client that feeds the cache
//! refresher through the `TimelineSource` trait.

pub mod twitter;

pub use twitter::{ClientConfig, OAuthCredentials, TwitterClient, TwitterError};

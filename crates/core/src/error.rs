//! Unified error types for gemfeed.
//!
//! Fetch failures are recovered inside the refresh loop. Everything else
//! maps onto a specific Gemini response in the server crate.

/// Unified error types for the feed cache and request routing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Requested position is beyond the cached snapshot (or the cache is empty).
    #[error("NOT_AVAILABLE: position {position} (cached items: {len})")]
    NotAvailable { position: usize, len: usize },

    /// Client supplied an offset that is not a non-negative integer.
    #[error("INVALID_OFFSET: {0}")]
    InvalidOffset(String),

    /// No route matches the requested path.
    #[error("ROUTE_NOT_FOUND: {0}")]
    RouteNotFound(String),

    /// Upstream timeline fetch failed (network, auth, rate limit, parse).
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),
}

//! Gemini request handler.
//!
//! This module maps request paths onto the three feed pages and renders
//! them from the cache. Routing is total: every request produces one of
//! the four `Response` shapes.
use std::sync::Arc;

use gemfeed_core::{Error, FeedCache};

use crate::gemini::{Request, Response};
use crate::render::PageLayout;

const OFFSET_PROMPT: &str = "Get tweet offset. f.e. 5";
const OFFSET_PARSE_ERROR: &str = "Failed to parse input. Please use numbers.";
const UNKNOWN_LOCATION: &str = "Unknown location";

/// A matched route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/`: the newest item.
    Latest,
    /// `/timeline`: the first ten items.
    Timeline,
    /// `/select_tweet` without input: ask for an offset.
    SelectPrompt,
    /// `/select_tweet?N`: the item at offset N.
    Select(usize),
}

impl Route {
    /// Match a request against the routing table.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidOffset` when `/select_tweet` input is not a non-negative integer
    /// - `Error::RouteNotFound` for any other path
    pub fn resolve(request: &Request) -> Result<Self, Error> {
        match request.path() {
            "/" => Ok(Route::Latest),
            "/timeline" => Ok(Route::Timeline),
            "/select_tweet" => match request.first_query_key() {
                None => Ok(Route::SelectPrompt),
                Some(key) => key
                    .parse::<usize>()
                    .map(Route::Select)
                    .map_err(|_| Error::InvalidOffset(key)),
            },
            other => Err(Error::RouteNotFound(other.to_string())),
        }
    }
}

/// Renders feed pages from the shared cache.
#[derive(Debug, Clone)]
pub struct FeedRouter {
    cache: Arc<FeedCache>,
    layout: PageLayout,
}

impl FeedRouter {
    pub fn new(cache: Arc<FeedCache>, layout: PageLayout) -> Self {
        Self { cache, layout }
    }

    /// Produce the response for `request`. Never fails.
    pub fn handle(&self, request: &Request) -> Response {
        let route = Route::resolve(request);
        tracing::debug!(path = request.path(), ?route, "routing request");

        match route {
            Ok(Route::Latest) => self.show_item(0),
            Ok(Route::Timeline) => self.show_timeline(),
            Ok(Route::SelectPrompt) => Response::Input { prompt: OFFSET_PROMPT.to_string() },
            Ok(Route::Select(offset)) => self.show_item(offset),
            Err(Error::InvalidOffset(_)) => Response::ClientError { message: OFFSET_PARSE_ERROR.to_string() },
            Err(_) => Response::NotFound { message: UNKNOWN_LOCATION.to_string() },
        }
    }

    /// Single-item page. An unavailable position renders empty content.
    fn show_item(&self, position: usize) -> Response {
        let snapshot = self.cache.current();
        let content = match snapshot.item_at(position) {
            Ok(item) => PageLayout::item(item),
            Err(err) => {
                tracing::debug!(error = %err, "rendering empty item page");
                String::new()
            }
        };
        Response::page(self.layout.wrap(&content))
    }

    fn show_timeline(&self) -> Response {
        let snapshot = self.cache.current();
        Response::page(self.layout.wrap(&self.layout.timeline(&snapshot)))
    }
}

//! Background refresh loop for the feed cache.
//!
//! ### Protocol
//!
//! - The first iteration always fetches (no previous refresh).
//! - A fetch is due once `interval` (default 15 min) has elapsed since the
//!   last *accepted* refresh. Until then the loop sleeps.
//! - Fetch error: sleep `cooldown` (default 5 min), keep the stale snapshot.
//! - Fewer items than cached: discard, sleep `retry_delay`, fetch again.
//! - Otherwise: publish the new snapshot and restart the interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use super::{FeedCache, FetchRequest, Offer, TimelineSource};

/// Timing knobs for the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Minimum time between accepted refreshes.
    pub interval: Duration,
    /// Pause after a failed fetch.
    pub cooldown: Duration,
    /// Pause after a fetch that would have shrunk the cache.
    pub retry_delay: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            cooldown: Duration::from_secs(5 * 60),
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Outcome of a single loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Not due yet; sleep for the remaining time.
    Wait(Duration),
    /// New snapshot published.
    Refreshed { items: usize, next: Duration },
    /// Upstream failed; cached snapshot kept.
    Cooldown(Duration),
    /// Upstream returned a short page; cached snapshot kept.
    Retry(Duration),
}

impl Step {
    /// How long the loop sleeps after this step.
    pub fn pause(&self) -> Duration {
        match *self {
            Step::Wait(d) | Step::Cooldown(d) | Step::Retry(d) => d,
            Step::Refreshed { next, .. } => next,
        }
    }
}

/// Single writer of a [`FeedCache`].
pub struct Refresher<S> {
    cache: Arc<FeedCache>,
    source: S,
    request: FetchRequest,
    policy: RefreshPolicy,
    last_refresh: Option<Instant>,
}

impl<S: TimelineSource> Refresher<S> {
    pub fn new(cache: Arc<FeedCache>, source: S, request: FetchRequest, policy: RefreshPolicy) -> Self {
        Self { cache, source, request, policy, last_refresh: None }
    }

    /// Time left before the next fetch is due, `None` when due now.
    fn remaining(&self) -> Option<Duration> {
        let elapsed = self.last_refresh?.elapsed();
        (elapsed < self.policy.interval).then(|| self.policy.interval - elapsed)
    }

    /// Run one iteration of the refresh protocol.
    pub async fn tick(&mut self) -> Step {
        if let Some(remaining) = self.remaining() {
            return Step::Wait(remaining);
        }

        let items = match self.source.fetch_recent(&self.request).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(
                    account = %self.request.account,
                    error = %err,
                    cooldown_secs = self.policy.cooldown.as_secs(),
                    "timeline fetch failed, serving cached snapshot"
                );
                return Step::Cooldown(self.policy.cooldown);
            }
        };

        match self.cache.offer(items) {
            Offer::Accepted { len } => {
                self.last_refresh = Some(Instant::now());
                tracing::info!(account = %self.request.account, items = len, "feed cache refreshed");
                Step::Refreshed { items: len, next: self.policy.interval }
            }
            Offer::Shrunk { offered, cached } => {
                tracing::debug!(offered, cached, "discarding short timeline page");
                Step::Retry(self.policy.retry_delay)
            }
        }
    }

    /// Loop until `shutdown` resolves.
    ///
    /// Both the fetch and the sleep between iterations are raced against
    /// `shutdown`, so cancellation never waits out a 15 minute pause.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(account = %self.request.account, "starting feed refresher");

        loop {
            let step = tokio::select! {
                _ = &mut shutdown => break,
                step = self.tick() => step,
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(step.pause()) => {}
            }
        }

        tracing::info!("feed refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::feed::{AccountRef, Item};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::advance;

    /// Replays canned fetch results and records when each fetch happened.
    #[derive(Clone, Default)]
    struct ScriptedSource {
        script: Arc<Mutex<VecDeque<Result<Vec<Item>, Error>>>>,
        calls: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<Item>, Error>>) -> Self {
            Self { script: Arc::new(Mutex::new(script.into())), calls: Arc::default() }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TimelineSource for ScriptedSource {
        async fn fetch_recent(&self, _request: &FetchRequest) -> Result<Vec<Item>, Error> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::FetchFailed("script exhausted".into())))
        }
    }

    fn items(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| Item::new(i.to_string(), format!("post {i}"), "Author"))
            .collect()
    }

    fn refresher(source: &ScriptedSource) -> (Arc<FeedCache>, Refresher<ScriptedSource>) {
        let cache = Arc::new(FeedCache::new());
        let request = FetchRequest::new(AccountRef::ScreenName("someone".into()));
        let refresher = Refresher::new(Arc::clone(&cache), source.clone(), request, RefreshPolicy::default());
        (cache, refresher)
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_fetches_immediately() {
        let source = ScriptedSource::new(vec![Ok(items(3))]);
        let (cache, mut refresher) = refresher(&source);

        let step = refresher.tick().await;

        assert_eq!(step, Step::Refreshed { items: 3, next: 15 * MINUTE });
        assert_eq!(cache.current().len(), 3);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_waits_for_interval() {
        let source = ScriptedSource::new(vec![Ok(items(3)), Ok(items(4))]);
        let (cache, mut refresher) = refresher(&source);
        refresher.tick().await;

        assert_eq!(refresher.tick().await, Step::Wait(15 * MINUTE));
        advance(10 * MINUTE).await;
        assert_eq!(refresher.tick().await, Step::Wait(5 * MINUTE));
        assert_eq!(source.calls().len(), 1);

        advance(5 * MINUTE).await;
        assert_eq!(refresher.tick().await, Step::Refreshed { items: 4, next: 15 * MINUTE });
        assert_eq!(cache.current().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_keeps_snapshot() {
        let source = ScriptedSource::new(vec![Ok(items(3)), Err(Error::FetchFailed("503".into()))]);
        let (cache, mut refresher) = refresher(&source);
        refresher.tick().await;
        advance(15 * MINUTE).await;

        let before = cache.current();
        let step = refresher.tick().await;
        let after = cache.current();

        assert_eq!(step, Step::Cooldown(5 * MINUTE));
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_on_empty_cache() {
        let source = ScriptedSource::new(vec![Err(Error::FetchFailed("401".into()))]);
        let (cache, mut refresher) = refresher(&source);

        assert_eq!(refresher.tick().await, Step::Cooldown(5 * MINUTE));
        assert!(cache.current().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_page_is_retried_without_cooldown() {
        let source = ScriptedSource::new(vec![Ok(items(5)), Ok(items(2)), Ok(items(2)), Ok(items(6))]);
        let (cache, mut refresher) = refresher(&source);
        refresher.tick().await;
        advance(15 * MINUTE).await;

        assert_eq!(refresher.tick().await, Step::Retry(MINUTE));
        assert_eq!(cache.current().len(), 5);

        // last_refresh was not advanced, so the next tick fetches again.
        assert_eq!(refresher.tick().await, Step::Retry(MINUTE));
        assert_eq!(refresher.tick().await, Step::Refreshed { items: 6, next: 15 * MINUTE });
        assert_eq!(cache.current().len(), 6);
        assert_eq!(source.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_cooldown_after_error() {
        let source = ScriptedSource::new(vec![Err(Error::FetchFailed("timeout".into())), Ok(items(2))]);
        let (cache, refresher) = refresher(&source);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(refresher.run(async move {
            let _ = stop_rx.await;
        }));

        sleep(6 * MINUTE).await;

        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= 5 * MINUTE);
        assert_eq!(cache.current().len(), 2);

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let source = ScriptedSource::new(vec![Ok(items(1))]);
        let (cache, refresher) = refresher(&source);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(refresher.run(async move {
            let _ = stop_rx.await;
        }));

        sleep(MINUTE).await;
        stop_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(cache.current().len(), 1);
        assert_eq!(source.calls().len(), 1);
    }

    #[test]
    fn test_step_pause() {
        assert_eq!(Step::Wait(MINUTE).pause(), MINUTE);
        assert_eq!(Step::Refreshed { items: 1, next: 15 * MINUTE }.pause(), 15 * MINUTE);
        assert_eq!(Step::Cooldown(5 * MINUTE).pause(), 5 * MINUTE);
    }
}

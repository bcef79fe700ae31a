//! Keeps a departure board populated for one route + direction at a time.
//!
//! Every fetch takes a new ticket and aborts its predecessor, and a result is
//! only applied while its ticket is still the current one. A slow response for
//! an old selection can therefore never overwrite newer state.
//!
//! Failed fetches fall back to the last cached payload when there is one.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::client::cache::{CacheStore, DepartureCache, build_cache_key};
use crate::client::source::DeparturesSource;
use crate::models::DeparturesEnvelope;
use crate::routes::{DirectionKey, RouteKey};

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const FALLBACK_NOTICE: &str = "Live-data utilgjengelig. Viser sist lagrede avganger.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing to show yet
    Idle,
    /// Showing a cached payload while a fetch is pending or after it failed
    Fallback,
    /// Showing live data
    Fresh,
    /// Fetch failed and there was nothing cached
    Error,
}

/// What the board should display right now
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub route: RouteKey,
    pub direction: DirectionKey,
    pub phase: Phase,
    pub data: Option<DeparturesEnvelope>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_fallback: bool,
}

impl Snapshot {
    fn idle(route: RouteKey, direction: DirectionKey) -> Self {
        Self {
            route,
            direction,
            phase: Phase::Idle,
            data: None,
            error: None,
            is_loading: false,
            is_fetching: false,
            is_fallback: false,
        }
    }
}

struct Selection {
    route: RouteKey,
    direction: DirectionKey,
    ticket: u64,
    in_flight: Option<AbortHandle>,
}

impl Selection {
    /// Abort the outstanding fetch and invalidate its ticket
    fn cancel(&mut self) -> u64 {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.ticket += 1;
        self.ticket
    }
}

struct Inner {
    source: Arc<dyn DeparturesSource>,
    cache: DepartureCache,
    limit: usize,
    selection: Mutex<Selection>,
    auto_refresh: Mutex<Option<AbortHandle>>,
    state: watch::Sender<Snapshot>,
}

impl Inner {
    fn selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.selection().ticket == ticket
    }

    /// Apply `update` only if `ticket` has not been superseded
    fn apply(&self, ticket: u64, update: impl FnOnce(&mut Snapshot)) -> bool {
        let selection = self.selection();
        if selection.ticket != ticket {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    async fn run_fetch(self: Arc<Self>, ticket: u64, route: RouteKey, direction: DirectionKey) {
        let key = build_cache_key(route, direction);
        let result = self.source.fetch_departures(route, direction, self.limit).await;

        if !self.is_current(ticket) {
            debug!(route = %route, direction = %direction, "Discarding superseded fetch result");
            return;
        }

        match result {
            Ok(payload) => {
                if let Err(e) = self.cache.save(&key, &payload, Utc::now()).await {
                    warn!(key = %key, error = %e, "Failed to save departures to cache");
                }

                let count = payload.departures.len();
                let applied = self.apply(ticket, |s| {
                    s.route = route;
                    s.direction = direction;
                    s.phase = Phase::Fresh;
                    s.data = Some(payload);
                    s.error = None;
                    s.is_fallback = false;
                    s.is_loading = false;
                    s.is_fetching = false;
                });
                if applied {
                    info!(route = %route, direction = %direction, departures = count, "Showing live departures");
                }
            }
            Err(e) => {
                let cached = self.cache.load(&key, Utc::now()).await;
                let has_cache = cached.is_some();

                self.apply(ticket, |s| {
                    s.route = route;
                    s.direction = direction;
                    match cached {
                        Some(cached) => {
                            s.phase = Phase::Fallback;
                            s.data = Some(cached.into_fallback());
                            s.is_fallback = true;
                            s.error = Some(FALLBACK_NOTICE.to_string());
                        }
                        None => {
                            s.phase = Phase::Error;
                            s.error = Some(e.to_string());
                        }
                    }
                    s.is_loading = false;
                    s.is_fetching = false;
                });

                warn!(
                    route = %route,
                    direction = %direction,
                    error = %e,
                    fallback = has_cache,
                    "Failed to fetch departures"
                );
            }
        }
    }
}

/// Cloneable handle to one departure board's fetch/cache state machine
#[derive(Clone)]
pub struct RefreshController {
    inner: Arc<Inner>,
}

impl RefreshController {
    pub fn new(
        source: Arc<dyn DeparturesSource>,
        store: Arc<dyn CacheStore>,
        route: RouteKey,
        direction: DirectionKey,
        limit: usize,
    ) -> Self {
        let (state, _) = watch::channel(Snapshot::idle(route, direction));

        Self {
            inner: Arc::new(Inner {
                source,
                cache: DepartureCache::new(store),
                limit,
                selection: Mutex::new(Selection {
                    route,
                    direction,
                    ticket: 0,
                    in_flight: None,
                }),
                auto_refresh: Mutex::new(None),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.borrow().clone()
    }

    /// Show a route + direction: cached data first if there is any, then fetch.
    ///
    /// Any fetch still running for the previous selection is cancelled. The
    /// board switches to the new selection before the cache is read.
    pub async fn select(&self, route: RouteKey, direction: DirectionKey) {
        let ticket = {
            let mut selection = self.inner.selection();
            selection.route = route;
            selection.direction = direction;
            let ticket = selection.cancel();

            let mut loading = Snapshot::idle(route, direction);
            loading.is_loading = true;
            self.inner.state.send_replace(loading);
            ticket
        };

        let key = build_cache_key(route, direction);
        let cached = self.inner.cache.load(&key, Utc::now()).await;

        let mut selection = self.inner.selection();
        if selection.ticket != ticket {
            // a newer selection or fetch took over while the cache was read
            return;
        }

        let background = cached.is_some();
        if let Some(cached) = cached {
            self.inner.state.send_modify(|s| {
                s.phase = Phase::Fallback;
                s.data = Some(cached.into_fallback());
                s.is_fallback = true;
                s.is_loading = false;
            });
        }

        info!(route = %route, direction = %direction, cached = background, "Selected departure board");
        self.start_fetch(&mut selection, background);
    }

    fn start_fetch(&self, selection: &mut Selection, background: bool) -> JoinHandle<()> {
        let ticket = selection.cancel();
        let (route, direction) = (selection.route, selection.direction);

        self.inner.state.send_modify(|s| {
            s.is_fetching = true;
            if !background {
                s.is_loading = true;
            }
        });

        let handle = tokio::spawn(self.inner.clone().run_fetch(ticket, route, direction));
        selection.in_flight = Some(handle.abort_handle());
        handle
    }

    /// Start a fetch for the current selection, superseding any running one
    pub fn fetch(&self, background: bool) -> JoinHandle<()> {
        let mut selection = self.inner.selection();
        self.start_fetch(&mut selection, background)
    }

    /// Foreground fetch that resolves once applied, or once superseded
    pub async fn refetch(&self) {
        if let Err(e) = self.fetch(false).await {
            if !e.is_cancelled() {
                warn!(error = %e, "Refetch task failed");
            }
        }
    }

    /// The board became visible again
    pub fn notify_visible(&self) {
        debug!("Board visible again, refreshing");
        self.fetch(true);
    }

    /// Refresh in the background every [`REFRESH_INTERVAL`] until [`shutdown`](Self::shutdown)
    pub fn spawn_auto_refresh(&self) -> JoinHandle<()> {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(REFRESH_INTERVAL);
            // Skip the first tick which fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                controller.fetch(true);
            }
        });

        let mut slot = self
            .inner
            .auto_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle.abort_handle()) {
            previous.abort();
        }
        handle
    }

    /// Cancel the outstanding fetch and stop automatic refreshing
    pub fn shutdown(&self) {
        self.inner.selection().cancel();
        if let Some(handle) = self
            .inner
            .auto_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.inner.state.send_modify(|s| {
            s.is_loading = false;
            s.is_fetching = false;
        });
    }
}

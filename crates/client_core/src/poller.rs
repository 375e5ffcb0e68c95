//! View lifecycle: trigger refreshes while active, commit only the newest result.
//!
//! Every tick takes a new generation number. A finished tick writes its
//! result only if the view is still active and no newer tick has started;
//! `stop()` bumps the generation so anything still in flight is dropped.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use shared::protocol::Product;
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    aggregator::OrderAggregator,
    error::{DashboardError, TickError},
    menu::MenuLister,
    types::{OrderView, ViewEvent, ViewSnapshot, ViewStats},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
const VIEW_EVENT_CAPACITY: usize = 64;

/// Something a view can rebuild its model from.
#[async_trait]
pub trait Refresh: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    async fn refresh(&self) -> Result<Vec<Self::Item>, DashboardError>;
}

#[async_trait]
impl Refresh for OrderAggregator {
    type Item = OrderView;

    async fn refresh(&self) -> Result<Vec<OrderView>, DashboardError> {
        self.aggregate().await
    }
}

#[async_trait]
impl Refresh for MenuLister {
    type Item = Product;

    async fn refresh(&self) -> Result<Vec<Product>, DashboardError> {
        self.list().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// One refresh per activation.
    Once,
    /// Refresh on activation and then every period until stopped.
    Every(Duration),
}

struct Slot<T> {
    active: bool,
    latest_generation: u64,
    snapshot: Option<ViewSnapshot<Vec<T>>>,
}

struct ViewState<T> {
    view: &'static str,
    slot: Mutex<Slot<T>>,
    ticks_started: AtomicU64,
    commits: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
    events: broadcast::Sender<ViewEvent>,
}

impl<T: Clone> ViewState<T> {
    fn new(view: &'static str) -> Self {
        let (events, _) = broadcast::channel(VIEW_EVENT_CAPACITY);
        Self {
            view,
            slot: Mutex::new(Slot {
                active: false,
                latest_generation: 0,
                snapshot: None,
            }),
            ticks_started: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            events,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the next generation, or `None` once the view is inactive.
    fn begin_tick(&self) -> Option<u64> {
        let mut slot = self.slot();
        if !slot.active {
            return None;
        }
        slot.latest_generation += 1;
        self.ticks_started.fetch_add(1, Ordering::SeqCst);
        Some(slot.latest_generation)
    }

    fn commit(&self, generation: u64, entries: Vec<T>) {
        let count = entries.len();
        {
            let mut slot = self.slot();
            if !slot.active || slot.latest_generation != generation {
                drop(slot);
                self.discarded.fetch_add(1, Ordering::SeqCst);
                debug!(
                    view = self.view,
                    generation, "poller: discarding result of superseded tick"
                );
                let _ = self.events.send(ViewEvent::Discarded { generation });
                return;
            }
            slot.snapshot = Some(ViewSnapshot {
                generation,
                committed_at: Utc::now(),
                data: entries,
            });
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        info!(
            view = self.view,
            generation,
            entries = count,
            "poller: view model updated"
        );
        let _ = self.events.send(ViewEvent::Committed {
            generation,
            entries: count,
        });
    }

    fn fail(&self, err: TickError) {
        let generation = err.generation();
        {
            let slot = self.slot();
            if !slot.active || slot.latest_generation != generation {
                drop(slot);
                self.discarded.fetch_add(1, Ordering::SeqCst);
                debug!(
                    view = self.view,
                    generation, "poller: dropping failure of superseded tick: {err}"
                );
                let _ = self.events.send(ViewEvent::Discarded { generation });
                return;
            }
        }

        self.failures.fetch_add(1, Ordering::SeqCst);
        error!(
            view = self.view,
            generation,
            "poller: {err}; keeping previous view model"
        );
        let _ = self.events.send(ViewEvent::Failed(err));
    }
}

async fn run_tick<R: Refresh>(refresher: Arc<R>, state: Arc<ViewState<R::Item>>, generation: u64) {
    debug!(view = state.view, generation, "poller: tick started");
    match refresher.refresh().await {
        Ok(entries) => state.commit(generation, entries),
        Err(source) => state.fail(TickError::AggregationFailed { generation, source }),
    }
}

/// An activatable view over one [`Refresh`] source.
///
/// Owns the trigger task and the current view model. The model is cleared
/// on `stop()`; dropping the view stops it.
pub struct PollingView<R: Refresh> {
    refresher: Arc<R>,
    cadence: Cadence,
    state: Arc<ViewState<R::Item>>,
    trigger: Option<JoinHandle<()>>,
}

impl<R: Refresh> PollingView<R> {
    pub fn new(view: &'static str, refresher: R, cadence: Cadence) -> Self {
        Self {
            refresher: Arc::new(refresher),
            cadence,
            state: Arc::new(ViewState::new(view)),
            trigger: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.state.view
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn refresher(&self) -> &R {
        &self.refresher
    }

    /// Must be called from within a tokio runtime. A view with a zero
    /// period refuses to activate.
    pub fn start(&mut self) {
        if self.cadence == Cadence::Every(Duration::ZERO) {
            error!(view = self.state.view, "poller: poll period must be non-zero");
            return;
        }
        {
            let mut slot = self.state.slot();
            if slot.active {
                warn!(view = self.state.view, "poller: view already active");
                return;
            }
            slot.active = true;
        }
        info!(view = self.state.view, cadence = ?self.cadence, "poller: view activated");

        match self.cadence {
            Cadence::Once => {
                if let Some(generation) = self.state.begin_tick() {
                    tokio::spawn(run_tick(
                        Arc::clone(&self.refresher),
                        Arc::clone(&self.state),
                        generation,
                    ));
                }
            }
            Cadence::Every(period) => {
                let refresher = Arc::clone(&self.refresher);
                let state = Arc::clone(&self.state);
                self.trigger = Some(tokio::spawn(async move {
                    let mut ticker = interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        let Some(generation) = state.begin_tick() else {
                            break;
                        };
                        tokio::spawn(run_tick(
                            Arc::clone(&refresher),
                            Arc::clone(&state),
                            generation,
                        ));
                    }
                }));
            }
        }
    }

    /// Cancels the trigger and drops the view model. Ticks already in
    /// flight keep running but can no longer commit.
    pub fn stop(&mut self) {
        {
            let mut slot = self.state.slot();
            if !slot.active {
                return;
            }
            slot.active = false;
            slot.latest_generation += 1;
            slot.snapshot = None;
        }
        if let Some(trigger) = self.trigger.take() {
            trigger.abort();
        }
        info!(view = self.state.view, "poller: view deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.state.slot().active
    }

    pub fn snapshot(&self) -> Option<ViewSnapshot<Vec<R::Item>>> {
        self.state.slot().snapshot.clone()
    }

    /// Entries of the current view model; empty until the first commit.
    pub fn entries(&self) -> Vec<R::Item> {
        self.state
            .slot()
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.data.clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.state.events.subscribe()
    }

    pub fn stats(&self) -> ViewStats {
        ViewStats {
            ticks_started: self.state.ticks_started.load(Ordering::SeqCst),
            commits: self.state.commits.load(Ordering::SeqCst),
            failures: self.state.failures.load(Ordering::SeqCst),
            discarded: self.state.discarded.load(Ordering::SeqCst),
        }
    }
}

impl<R: Refresh> Drop for PollingView<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;

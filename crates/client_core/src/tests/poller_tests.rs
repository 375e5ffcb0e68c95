use super::*;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU32, Ordering as AtomicOrdering},
};

use tokio::{sync::Notify, time::sleep};

use crate::error::FetchError;

enum Step {
    Entries(Vec<u32>),
    Fail,
    Gated(Arc<Notify>, Vec<u32>),
    GatedFail(Arc<Notify>),
}

struct ScriptedRefresh {
    calls: Arc<AtomicU32>,
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedRefresh {
    fn new(steps: Vec<Step>) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                steps: Mutex::new(steps.into()),
            },
            calls,
        )
    }
}

#[async_trait]
impl Refresh for ScriptedRefresh {
    type Item = u32;

    async fn refresh(&self) -> Result<Vec<u32>, DashboardError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let step = self.steps.lock().expect("steps").pop_front();
        match step {
            None => Ok(Vec::new()),
            Some(Step::Entries(entries)) => Ok(entries),
            Some(Step::Fail) => Err(DashboardError::CatalogFetchFailed {
                source: FetchError::Timeout {
                    url: "fake://products".to_string(),
                },
            }),
            Some(Step::Gated(gate, entries)) => {
                gate.notified().await;
                Ok(entries)
            }
            Some(Step::GatedFail(gate)) => {
                gate.notified().await;
                Err(DashboardError::CatalogFetchFailed {
                    source: FetchError::Status {
                        url: "fake://products".to_string(),
                        status: 503,
                    },
                })
            }
        }
    }
}

const PERIOD: Duration = Duration::from_secs(15);

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn polling(steps: Vec<Step>) -> (PollingView<ScriptedRefresh>, Arc<AtomicU32>) {
    let (refresher, calls) = ScriptedRefresh::new(steps);
    (
        PollingView::new("test", refresher, Cadence::Every(PERIOD)),
        calls,
    )
}

#[tokio::test(start_paused = true)]
async fn refreshes_immediately_and_on_every_interval() {
    let (mut view, calls) = polling(Vec::new());

    view.start();
    settle().await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

    sleep(PERIOD).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);

    sleep(PERIOD).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);

    view.stop();
    sleep(PERIOD * 4).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
    assert_eq!(view.stats().ticks_started, 3);
    assert!(!view.is_active());
}

#[tokio::test(start_paused = true)]
async fn each_commit_replaces_the_view_model() {
    let (mut view, _calls) = polling(vec![
        Step::Entries(vec![1, 2]),
        Step::Entries(vec![3]),
    ]);
    assert!(view.snapshot().is_none());

    view.start();
    settle().await;
    let first = view.snapshot().expect("first commit");
    assert_eq!(first.generation, 1);
    assert_eq!(first.data, vec![1, 2]);

    sleep(PERIOD).await;
    let second = view.snapshot().expect("second commit");
    assert_eq!(second.generation, 2);
    assert_eq!(second.data, vec![3]);
    assert_eq!(view.entries(), vec![3]);
    assert_eq!(view.stats().commits, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_tick_keeps_previous_view_model() {
    let (mut view, _calls) = polling(vec![Step::Entries(vec![1, 2]), Step::Fail]);
    let mut events = view.subscribe();

    view.start();
    settle().await;
    let before = view.snapshot().expect("committed");

    sleep(PERIOD).await;
    assert_eq!(view.snapshot(), Some(before));
    assert_eq!(view.stats().failures, 1);

    assert!(matches!(
        events.try_recv().expect("commit event"),
        ViewEvent::Committed {
            generation: 1,
            entries: 2
        }
    ));
    match events.try_recv().expect("failure event") {
        ViewEvent::Failed(err) => {
            assert_eq!(err.generation(), 2);
            assert!(matches!(
                err.cause(),
                DashboardError::CatalogFetchFailed { .. }
            ));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn keeps_polling_after_failures() {
    let (mut view, calls) = polling(vec![
        Step::Fail,
        Step::Fail,
        Step::Entries(vec![7]),
    ]);

    view.start();
    settle().await;
    assert!(view.snapshot().is_none());
    assert!(view.entries().is_empty());

    sleep(PERIOD * 2).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
    assert_eq!(view.entries(), vec![7]);
    assert_eq!(view.stats().failures, 2);
}

#[tokio::test(start_paused = true)]
async fn result_arriving_after_stop_is_discarded() {
    let gate = Arc::new(Notify::new());
    let (mut view, calls) = polling(vec![Step::Gated(Arc::clone(&gate), vec![9])]);

    view.start();
    settle().await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

    view.stop();
    gate.notify_one();
    settle().await;

    assert!(view.snapshot().is_none());
    let stats = view.stats();
    assert_eq!(stats.commits, 0);
    assert_eq!(stats.discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn failure_arriving_after_stop_is_discarded() {
    let gate = Arc::new(Notify::new());
    let (mut view, _calls) = polling(vec![Step::GatedFail(Arc::clone(&gate))]);
    let mut events = view.subscribe();

    view.start();
    settle().await;
    view.stop();
    gate.notify_one();
    settle().await;

    let stats = view.stats();
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.discarded, 1);
    assert!(matches!(
        events.try_recv(),
        Ok(ViewEvent::Discarded { generation: 1 })
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_failure_does_not_count_against_newer_tick() {
    let gate = Arc::new(Notify::new());
    let (mut view, _calls) = polling(vec![
        Step::GatedFail(Arc::clone(&gate)),
        Step::Entries(vec![2]),
    ]);

    view.start();
    settle().await;
    sleep(PERIOD).await;
    assert_eq!(view.entries(), vec![2]);

    gate.notify_one();
    settle().await;

    assert_eq!(view.entries(), vec![2]);
    let stats = view.stats();
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn zero_period_view_refuses_to_activate() {
    let (refresher, calls) = ScriptedRefresh::new(Vec::new());
    let mut view = PollingView::new("zero", refresher, Cadence::Every(Duration::ZERO));

    view.start();
    settle().await;

    assert!(!view.is_active());
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    assert_eq!(view.stats().ticks_started, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_tick_cannot_overwrite_newer_tick() {
    let gate = Arc::new(Notify::new());
    let (mut view, _calls) = polling(vec![
        Step::Gated(Arc::clone(&gate), vec![1]),
        Step::Entries(vec![2]),
    ]);

    view.start();
    settle().await;
    assert!(view.snapshot().is_none());

    sleep(PERIOD).await;
    let newer = view.snapshot().expect("newer tick committed");
    assert_eq!(newer.generation, 2);

    gate.notify_one();
    settle().await;

    let current = view.snapshot().expect("still committed");
    assert_eq!(current.generation, 2);
    assert_eq!(current.data, vec![2]);
    assert_eq!(view.stats().discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_drops_view_model_and_restart_fetches_again() {
    let (mut view, calls) = polling(vec![Step::Entries(vec![1]), Step::Entries(vec![2])]);

    view.start();
    settle().await;
    assert_eq!(view.entries(), vec![1]);

    view.stop();
    assert!(view.snapshot().is_none());

    view.start();
    settle().await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    assert_eq!(view.entries(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn starting_an_active_view_does_not_add_a_trigger() {
    let (mut view, calls) = polling(Vec::new());

    view.start();
    view.start();
    settle().await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

    sleep(PERIOD).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_view_stops_polling() {
    let (mut view, calls) = polling(Vec::new());

    view.start();
    settle().await;
    drop(view);

    sleep(PERIOD * 3).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn once_cadence_fetches_once_per_activation() {
    let (refresher, calls) = ScriptedRefresh::new(vec![Step::Entries(vec![4, 5])]);
    let mut view = PollingView::new("once", refresher, Cadence::Once);

    view.start();
    sleep(PERIOD * 4).await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    assert_eq!(view.entries(), vec![4, 5]);

    view.stop();
    view.start();
    settle().await;
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
}

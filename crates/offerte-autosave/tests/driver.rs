//! Timing tests for the tokio driver.
//!
//! All tests run on a paused clock, so sleeping advances virtual time
//! instantly and debounce windows are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::{self, Instant};

use offerte_autosave::{
    AutoSave, AutoSaveConfig, AutoSaveError, Persister, SaveState, persist_fn,
};

#[derive(Debug, Error)]
#[error("quote rejected by server")]
struct QuoteRejected;

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(Instant, Value)>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl Recorder {
    fn start(&self, data: Value) {
        self.calls.lock().unwrap().push((Instant::now(), data));
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> Vec<(Instant, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn values(&self) -> Vec<Value> {
        self.calls().into_iter().map(|(_, value)| value).collect()
    }
}

fn persister(recorder: &Recorder, latency: Duration, fail: bool) -> impl Persister<Value> {
    let recorder = recorder.clone();
    persist_fn(move |data: Value| {
        let recorder = recorder.clone();
        async move {
            recorder.start(data);
            time::sleep(latency).await;
            recorder.finish();
            if fail { Err(QuoteRejected) } else { Ok(()) }
        }
    })
}

fn assert_near(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn total(value: i64) -> Value {
    json!({ "total": value })
}

#[tokio::test(start_paused = true)]
async fn coalesces_rapid_changes_into_one_save() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();
    let start = Instant::now();

    autosave.update(total(101)).unwrap();
    time::sleep(Duration::from_millis(500)).await;
    autosave.update(total(102)).unwrap();
    time::sleep(Duration::from_millis(200)).await;
    autosave.update(total(103)).unwrap();
    time::sleep(Duration::from_millis(10)).await;
    assert!(autosave.status().is_dirty);

    time::sleep(Duration::from_millis(1980)).await;
    assert!(recorder.calls().is_empty(), "still inside the quiet period");

    let mut status = autosave.subscribe();
    status
        .wait_for(|status| !status.is_dirty && status.last_saved.is_some())
        .await
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, total(103));
    assert_near(calls[0].0 - start, 2700);
    assert!(matches!(autosave.status().state(), SaveState::Saved { .. }));
}

#[tokio::test(start_paused = true)]
async fn mount_does_not_save_or_mark_dirty() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    assert!(!autosave.status().is_dirty);
    time::sleep(Duration::from_secs(10)).await;
    assert!(recorder.calls().is_empty());
    assert_eq!(autosave.status().state(), SaveState::Idle);
}

#[tokio::test(start_paused = true)]
async fn equal_data_never_schedules_a_save() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    for _ in 0..5 {
        autosave.update(json!({ "total": 100 })).unwrap();
        time::sleep(Duration::from_millis(300)).await;
        assert!(!autosave.status().is_dirty);
    }
    time::sleep(Duration::from_secs(5)).await;
    assert!(recorder.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_data_dirty_and_exposes_the_error() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, true),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    let mut status = autosave.subscribe();
    status
        .wait_for(|status| status.error.is_some())
        .await
        .unwrap();

    let status = autosave.status();
    assert!(status.is_dirty);
    assert!(!status.is_saving);
    let error = status.error.unwrap();
    assert!(error.downcast_ref::<QuoteRejected>().is_some());

    // No automatic retry
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(recorder.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn save_now_skips_the_quiet_period() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();
    let start = Instant::now();

    autosave.update(total(101)).unwrap();
    autosave.save_now().await.unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0 - start < Duration::from_millis(2000));
    assert!(!autosave.status().is_dirty);

    // The cancelled debounce timer never produces a duplicate
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn save_now_on_unchanged_data_still_persists() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.save_now().await.unwrap();

    assert_eq!(recorder.values(), vec![total(100)]);
    let status = autosave.sync_status().await.unwrap();
    assert!(!status.is_dirty);
    assert!(status.last_saved.is_some());

    // Nothing left to do for the debounce timer
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn save_now_reports_failures() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, true),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    let error = autosave.save_now().await.unwrap_err();
    assert!(matches!(error, AutoSaveError::Persist(_)));
    assert!(
        error
            .failure()
            .and_then(|failure| failure.downcast_ref::<QuoteRejected>())
            .is_some()
    );
}

#[tokio::test(start_paused = true)]
async fn slow_saves_never_overlap() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::from_secs(5), false),
        AutoSaveConfig::default(),
    )
    .unwrap();
    let start = Instant::now();

    autosave.update(total(101)).unwrap();
    // First save starts at 2s and runs until 7s
    time::sleep(Duration::from_millis(2500)).await;
    assert!(autosave.status().is_saving);
    autosave.update(total(102)).unwrap();
    // Debounce for 102 expires at 4.5s, while 101 is still in flight
    time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(recorder.calls().len(), 1);

    let mut status = autosave.subscribe();
    status
        .wait_for(|status| !status.is_dirty && !status.is_saving)
        .await
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(recorder.values(), vec![total(101), total(102)]);
    assert_near(calls[0].0 - start, 2000);
    assert_near(calls[1].0 - start, 7000);
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_save_waits_for_in_flight_save() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::from_secs(3), false),
        AutoSaveConfig::default(),
    )
    .unwrap();
    let start = Instant::now();

    autosave.update(total(101)).unwrap();
    let (first, second) = tokio::join!(autosave.save_now(), async {
        time::sleep(Duration::from_secs(1)).await;
        autosave.update(total(102)).unwrap();
        let result = autosave.save_now().await;
        (result, Instant::now())
    });

    first.unwrap();
    let (second, resolved_at) = second;
    second.unwrap();

    assert_eq!(recorder.values(), vec![total(101), total(102)]);
    assert_near(recorder.calls()[1].0 - start, 3000);
    assert_near(resolved_at - start, 6000);
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
    assert!(!autosave.status().is_dirty);
}

#[tokio::test(start_paused = true)]
async fn disabled_session_only_saves_on_request() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    time::sleep(Duration::from_millis(500)).await;
    autosave.set_enabled(false).unwrap();
    time::sleep(Duration::from_secs(10)).await;
    assert!(recorder.calls().is_empty());
    assert!(autosave.status().is_dirty);

    autosave.save_now().await.unwrap();
    assert_eq!(recorder.values(), vec![total(101)]);

    autosave.set_enabled(true).unwrap();
    autosave.update(total(102)).unwrap();
    time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(recorder.values(), vec![total(101), total(102)]);
}

#[tokio::test(start_paused = true)]
async fn dispose_during_save_freezes_status() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::from_secs(5), false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    time::sleep(Duration::from_millis(2500)).await;

    let mut status = autosave.subscribe();
    let before = status.borrow_and_update().clone();
    assert!(before.is_saving);

    autosave.dispose().await;
    time::sleep(Duration::from_secs(10)).await;

    // The persist itself ran to completion ...
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 1);
    // ... but nothing was published after teardown.
    assert!(status.changed().await.is_err());
    assert_eq!(*status.borrow(), before);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels_pending_timer() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    drop(autosave);
    time::sleep(Duration::from_secs(10)).await;
    assert!(recorder.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn panicking_persister_is_a_failure() {
    let autosave = AutoSave::spawn(
        total(100),
        persist_fn(|_: Value| async move {
            if true {
                panic!("persister bug");
            }
            Ok::<(), QuoteRejected>(())
        }),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    let error = autosave.save_now().await.unwrap_err();
    assert!(matches!(error, AutoSaveError::Persist(_)));
    assert!(autosave.status().is_dirty);
}

#[tokio::test(start_paused = true)]
async fn sync_status_sees_the_update_just_sent() {
    let recorder = Recorder::default();
    let autosave = AutoSave::spawn(
        total(100),
        persister(&recorder, Duration::ZERO, false),
        AutoSaveConfig::default(),
    )
    .unwrap();

    autosave.update(total(101)).unwrap();
    let status = autosave.sync_status().await.unwrap();
    assert!(status.is_dirty);
    assert_eq!(status.state(), SaveState::Dirty);

    autosave.update(total(100)).unwrap();
    assert!(!autosave.sync_status().await.unwrap().is_dirty);
}

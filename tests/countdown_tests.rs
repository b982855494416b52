//! Countdown behavior with the real tokio ticker and alarm.
//!
//! Tokio time is paused, and the clock below reads tokio's virtual time, so
//! ticks, alarms and remaining time all move together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use countdown::alarm::TokioAlarm;
use countdown::daemon::{CountdownTimer, RestoreOutcome, TimerSettings, TokioTicker, Wakeup};
use countdown::notification::MockNotifier;
use countdown::store::{FileTriggerStore, MemoryTriggerStore, TriggerStore};
use countdown::time::{format_remaining, to_millis, Clock};
use countdown::types::{CountdownDuration, TimerPhase};

const EPOCH: i64 = 1_700_000_000_000;

/// Wall clock that follows tokio's (pausable) clock.
struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> i64 {
        EPOCH + self.origin.elapsed().as_millis() as i64
    }
}

fn create_timer<S: TriggerStore>(
    store: S,
) -> (
    CountdownTimer<S, TokioAlarm, MockNotifier>,
    mpsc::UnboundedReceiver<Wakeup>,
) {
    create_timer_with_clock(Arc::new(TokioClock::new()), store)
}

fn create_timer_with_clock<S: TriggerStore>(
    clock: Arc<dyn Clock>,
    store: S,
) -> (
    CountdownTimer<S, TokioAlarm, MockNotifier>,
    mpsc::UnboundedReceiver<Wakeup>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let timer = CountdownTimer::new(
        Arc::clone(&clock),
        Box::new(TokioTicker::new(tx.clone())),
        store,
        TokioAlarm::new(clock, tx),
        MockNotifier::new(),
        TimerSettings::default(),
    );
    (timer, rx)
}

/// Feeds wake-ups to the timer until it completes or `limit` passes.
async fn drive<S: TriggerStore>(
    timer: &mut CountdownTimer<S, TokioAlarm, MockNotifier>,
    rx: &mut mpsc::UnboundedReceiver<Wakeup>,
    limit: Duration,
) -> usize {
    let deadline = Instant::now() + limit;
    let mut completions = 0;

    while let Ok(Some(wakeup)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if timer.on_wakeup(wakeup).await {
            completions += 1;
        }
    }
    completions
}

#[test]
fn test_every_selection_formats_as_itself() {
    for minutes in 0..=60 {
        for seconds in 0..=59 {
            let text = format_remaining(to_millis(minutes, seconds));
            assert_eq!(text, format!("{:02} : {:02}", minutes, seconds));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_five_seconds_complete_exactly_once() {
    let (mut timer, mut rx) = create_timer(MemoryTriggerStore::new());
    timer
        .set_duration(CountdownDuration::new(0, 5).unwrap())
        .unwrap();
    timer.start().await.unwrap();

    let completions = drive(&mut timer, &mut rx, Duration::from_secs(8)).await;

    assert_eq!(completions, 1);
    assert_eq!(timer.snapshot().phase, TimerPhase::Completed);
    assert_eq!(timer.notifier().notification_count(), 1);
    assert_eq!(timer.store().value(), None);
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_each_second() {
    let (mut timer, mut rx) = create_timer(MemoryTriggerStore::new());
    let mut snapshots = timer.subscribe();
    timer
        .set_duration(CountdownDuration::new(0, 3).unwrap())
        .unwrap();
    timer.start().await.unwrap();
    snapshots.borrow_and_update();

    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while let Ok(Some(wakeup)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        timer.on_wakeup(wakeup).await;
        if snapshots.has_changed().unwrap() {
            seen.push(snapshots.borrow_and_update().display());
        }
    }

    assert_eq!(seen.first().map(String::as_str), Some("00 : 02"));
    assert_eq!(seen.last().map(String::as_str), Some("00 : 00"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_silences_ticks_and_alarm() {
    let (mut timer, mut rx) = create_timer(MemoryTriggerStore::new());
    timer
        .set_duration(CountdownDuration::new(0, 3).unwrap())
        .unwrap();
    timer.start().await.unwrap();
    timer.stop().await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    // Anything queued before the stop is stale
    let mut completions = 0;
    while let Ok(wakeup) = rx.try_recv() {
        if timer.on_wakeup(wakeup).await {
            completions += 1;
        }
    }
    assert_eq!(completions, 0);
    assert_eq!(timer.snapshot().phase, TimerPhase::Idle);
    assert_eq!(timer.notifier().notification_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resumes_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trigger.json");

    let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());

    let (mut first, _rx) = create_timer_with_clock(Arc::clone(&clock), FileTriggerStore::new(&path));
    first
        .set_duration(CountdownDuration::new(0, 4).unwrap())
        .unwrap();
    first.start().await.unwrap();
    drop(first);

    tokio::time::advance(Duration::from_secs(1)).await;

    let (mut second, mut rx) = create_timer_with_clock(clock, FileTriggerStore::new(&path));
    let outcome = second.restore().await;
    assert_eq!(outcome, RestoreOutcome::Resumed { remaining_millis: 3_000 });

    let completions = drive(&mut second, &mut rx, Duration::from_secs(5)).await;
    assert_eq!(completions, 1);
    assert!(!path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_second_start_leaves_one_tick_stream() {
    let (mut timer, mut rx) = create_timer(MemoryTriggerStore::new());
    timer
        .set_duration(CountdownDuration::new(0, 10).unwrap())
        .unwrap();

    let first = timer.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = timer.start().await.unwrap();
    assert_ne!(first, second);

    let deadline = Instant::now() + Duration::from_millis(3_200);
    let mut ticks = Vec::new();
    while let Ok(Some(wakeup)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        ticks.push(wakeup);
        timer.on_wakeup(wakeup).await;
    }

    assert_eq!(
        ticks,
        vec![
            Wakeup::Tick(second),
            Wakeup::Tick(second),
            Wakeup::Tick(second)
        ]
    );
    assert_eq!(timer.session(), Some(second));
    assert_eq!(timer.snapshot().phase, TimerPhase::Running);
}

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use assert_matches::assert_matches;
use poisson_behavior::{DriverError, FixedSequence, OnTick, StopHandle, TickError};

use crate::types::tokio_behavior;

/// Fails or panics on a given tick.
#[derive(Debug, Clone)]
pub struct FaultyTick {
    fail_on: Option<u64>,
    panic_on: Option<u64>,
    ended: Arc<AtomicBool>,
}

impl FaultyTick {
    fn new() -> Self {
        Self {
            fail_on: None,
            panic_on: None,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_failure_on(mut self, tick: u64) -> Self {
        self.fail_on = Some(tick);
        self
    }

    fn with_panic_on(mut self, tick: u64) -> Self {
        self.panic_on = Some(tick);
        self
    }
}

impl OnTick for FaultyTick {
    type Error = String;

    fn on_tick(&mut self, tick_count: u64) -> Result<(), String> {
        if self.panic_on == Some(tick_count) {
            panic!("Tick panic on tick {}", tick_count);
        }
        if self.fail_on == Some(tick_count) {
            return Err(format!("Tick failure on tick {}", tick_count));
        }
        Ok(())
    }

    fn on_end(&mut self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

/// Given a callback that fails on the second tick
/// When it runs on the driver
/// Then the driver should finish with the callback's error, after calling `on_end`
#[tokio::test]
async fn callback_error_ends_driver() {
    tokio::time::pause();

    let on_tick = FaultyTick::new().with_failure_on(2);
    let ended = Arc::clone(&on_tick.ended);
    let behavior = tokio_behavior(
        "callback_error_ends_driver",
        Duration::from_millis(100),
        on_tick,
        FixedSequence::constant(0.5),
    );

    let result = behavior.spawn().join().await;

    assert_matches!(
        result,
        Err(DriverError::Tick(TickError::Callback(msg))) if msg == "Tick failure on tick 2"
    );
    assert!(ended.load(Ordering::SeqCst), "on_end should be called");
}

/// Given a callback that panics
/// When it runs on the driver
/// Then the driver should finish with a panic error
#[tokio::test]
async fn callback_panic_ends_driver() {
    tokio::time::pause();

    let behavior = tokio_behavior(
        "callback_panic_ends_driver",
        Duration::from_millis(100),
        FaultyTick::new().with_panic_on(1),
        FixedSequence::constant(0.5),
    );

    let result = behavior.spawn().join().await;

    assert_matches!(result, Err(DriverError::Panic));
}

#[tokio::test]
async fn degenerate_random_source_ends_driver() {
    let behavior = tokio_behavior(
        "degenerate_random_source_ends_driver",
        Duration::from_millis(100),
        FaultyTick::new(),
        FixedSequence::constant(0.0),
    );

    let result = behavior.spawn().join().await;

    assert_matches!(
        result,
        Err(DriverError::Tick(TickError::DegenerateSample { .. }))
    );
}

/// Given a callback that stops its own behavior on the second tick
/// When it runs on the driver
/// Then the driver should finish cleanly after that tick
#[tokio::test]
async fn callback_can_stop_the_driver() {
    tokio::time::pause();

    let handle = Arc::new(std::sync::OnceLock::<StopHandle>::new());
    let on_tick = {
        let handle = Arc::clone(&handle);
        move |tick: u64| -> Result<(), String> {
            if tick == 2 {
                if let Some(handle) = handle.get() {
                    handle.stop();
                }
            }
            Ok(())
        }
    };
    let behavior = tokio_behavior(
        "callback_can_stop_the_driver",
        Duration::from_millis(100),
        on_tick,
        FixedSequence::constant(0.5),
    );
    handle.set(behavior.stop_handle()).unwrap();

    let behavior = tokio::time::timeout(Duration::from_secs(60), behavior.spawn().join())
        .await
        .expect("driver should finish once stopped")
        .unwrap();

    assert!(behavior.is_done());
    assert_eq!(behavior.tick_count(), 2);
}

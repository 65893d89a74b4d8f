use std::time::Duration;

use poisson_behavior::FixedSequence;

use crate::types::{tokio_behavior, CountingTick};

#[tokio::test]
async fn abort_when_handle_dropped() {
    tokio::time::pause();

    let on_tick = CountingTick::default();
    let behavior = tokio_behavior(
        "abort_when_handle_dropped",
        Duration::from_millis(1000),
        on_tick.clone(),
        FixedSequence::constant(0.5),
    );

    let handle = behavior.spawn();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(on_tick.ticks(), 1);

    drop(handle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(on_tick.ticks(), 1, "no more ticks after the handle is dropped");
    assert!(!on_tick.ended(), "an aborted behavior is never ended");
}

#[tokio::test]
async fn shut_down_when_stop_called() {
    tokio::time::pause();

    let on_tick = CountingTick::default();
    let behavior = tokio_behavior(
        "shut_down_when_stop_called",
        Duration::from_millis(1000),
        on_tick.clone(),
        FixedSequence::constant(0.5),
    );

    let handle = behavior.spawn();
    assert!(!handle.is_finished());
    let stop = handle.stop_handle();

    let mut joined = tokio_test::task::spawn(handle.join());
    tokio_test::assert_pending!(joined.poll());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    tokio_test::assert_pending!(joined.poll(), "still running until stopped");

    stop.stop();
    stop.stop();

    let behavior = tokio::time::timeout(Duration::from_secs(1), joined)
        .await
        .expect("Driver should shut down")
        .unwrap();

    assert!(behavior.is_done());
    assert_eq!(behavior.tick_count(), 2);
    assert!(on_tick.ended());
}

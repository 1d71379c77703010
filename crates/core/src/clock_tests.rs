use super::*;

#[test]
fn fake_clock_advances_epoch_and_instant_together() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.now() - start, Duration::from_secs(30));
}

#[test]
fn fake_clock_epoch_ms_is_settable() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    clock.advance(Duration::from_millis(500));
    assert_eq!(clock.epoch_ms(), 1_500);
}

#[tokio::test]
async fn fake_clock_sleep_completes_without_cancellation() {
    let clock = FakeClock::new();
    let cancel = CancellationToken::new();
    let completed = clock.sleep(Duration::from_secs(369), &cancel).await;
    assert!(completed);
}

#[tokio::test]
async fn fake_clock_sleep_is_preempted_by_cancellation() {
    let clock = FakeClock::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let completed = clock.sleep(Duration::from_secs(369), &cancel).await;
    assert!(!completed);
}

#[tokio::test]
async fn system_clock_sleep_is_preempted_by_cancellation() {
    let clock = SystemClock;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let completed = clock.sleep(Duration::from_secs(60), &cancel).await;
    assert!(!completed);
}

use crate::follower::Backoff;
use std::time::Duration;

#[test]
fn consecutive_failures_double_from_one_second() {
    let mut backoff = Backoff::new(Duration::from_millis(1_000), Duration::from_millis(30_000));

    let delays: Vec<u128> = (0..3).map(|_| backoff.next_delay().as_millis()).collect();

    assert_eq!(delays, vec![1_000, 2_000, 4_000]);
    assert_eq!(backoff.current(), Duration::from_millis(8_000));
}

#[test]
fn delay_is_capped() {
    let mut backoff = Backoff::new(Duration::from_millis(1_000), Duration::from_millis(30_000));

    let delays: Vec<u128> = (0..8).map(|_| backoff.next_delay().as_millis()).collect();

    assert_eq!(
        delays,
        vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000]
    );
}

#[test]
fn initial_delay_above_cap_is_clamped() {
    let mut backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(5));

    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
}

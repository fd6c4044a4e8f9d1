use elimination_stack::{PolicyConfig, RangePolicy};
use rand::{rngs::ThreadRng, Rng};

#[test]
fn test_range_stays_in_bounds() {
    let mut rand = ThreadRng::default();
    for limit in [0, 1, 2, 16, 100] {
        let mut policy = RangePolicy::new(limit);
        assert_eq!(policy.limit(), limit);
        for _ in 0..100_000 {
            match rand.gen_range(0..3) {
                0 => assert!(policy.range() <= limit),
                1 => policy.record_elimination_success(),
                _ => policy.record_elimination_timeout(),
            }
            assert!(policy.current_range() <= limit);
        }
    }
}

#[test]
fn test_grows_without_outcomes() {
    let mut policy = RangePolicy::new(10);
    // The first eleven requests sit inside the success slack.
    for _ in 0..11 {
        assert_eq!(policy.range(), 0);
    }
    for expected in 1..=9 {
        assert_eq!(policy.range(), expected);
    }
    for _ in 0..10 {
        policy.range();
    }
    assert_eq!(policy.current_range(), 10);
}

#[test]
fn test_shrinks_under_timeouts() {
    let mut policy = RangePolicy::new(10);
    for _ in 0..30 {
        policy.range();
    }
    assert_eq!(policy.current_range(), 10);

    let mut previous = policy.current_range();
    let mut shrank = false;
    for _ in 0..70 {
        let range = policy.range();
        policy.record_elimination_timeout();
        shrank |= range < previous;
        previous = range;
    }
    assert!(shrank);
    assert_eq!(policy.current_range(), 0);
}

#[test]
fn test_holds_while_eliminating() {
    let mut policy = RangePolicy::new(10);
    for _ in 0..20 {
        policy.range();
    }
    assert_eq!(policy.current_range(), 9);
    for _ in 0..10 {
        policy.record_elimination_success();
    }
    // successes + 5 >= requests / 2 for as long as every request succeeds.
    for _ in 0..50 {
        assert_eq!(policy.range(), 9);
        policy.record_elimination_success();
    }
}

#[test]
fn test_window_reset_keeps_range() {
    let config = PolicyConfig {
        window: 20,
        success_slack: 0,
        timeout_slack: 0,
    };
    let mut policy = RangePolicy::with_config(4, &config);
    for _ in 0..20 {
        policy.range();
    }
    assert_eq!(policy.current_range(), 4);

    // Counters reset here; with a clean window the next request holds
    // (0 successes >= 1 / 2) instead of reacting to 20 stale requests.
    policy.record_elimination_timeout();
    assert_eq!(policy.current_range(), 4);
    assert_eq!(policy.range(), 4);
}

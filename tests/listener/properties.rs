//! Pipeline-wide guarantees

use super::support::{addr, binding, listener, pio, prefix_ra, ra_frame, rio};
use ra_listener::dataplane::{Decision, FrameOutcome, OptionOutcome};
use ra_listener::protocol::icmpv6::RouterAdvertisementBuilder;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_only_fd_prefixes_reach_mutator() {
    let (mut listener, mutator) = listener();
    let t0 = Instant::now();
    let prefixes = [
        ("2001:db8:1::", 64),
        ("fc00:1::", 64),
        ("fe80::", 64),
        ("fd00:1::", 64),
        ("fdff:2::", 48),
    ];

    for (i, (prefix, len)) in prefixes.iter().enumerate() {
        let source = format!("fe80::{:x}", i + 1);
        let builder = RouterAdvertisementBuilder::new(64, 1800)
            .prefix(&pio(prefix, *len))
            .route(&rio(prefix, *len));
        listener
            .handle_frame(&ra_frame(&source, builder), t0)
            .await;
    }

    let calls = mutator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|b| b.prefix.octets()[0] == 0xfd));
}

#[tokio::test]
async fn test_identical_options_in_one_ra() {
    let (mut listener, mutator) = listener();
    let frame = prefix_ra("fe80::1", &[("fd00:1::", 64), ("fd00:1::", 64), ("fd00:1::", 64)]);

    let FrameOutcome::Processed(report) = listener.handle_frame(&frame, Instant::now()).await
    else {
        panic!("expected a processed RA");
    };

    assert_eq!(
        report.decisions(),
        vec![Decision::New, Decision::Unchanged, Decision::Unchanged]
    );
    assert_eq!(mutator.calls().len(), 1);
}

#[tokio::test]
async fn test_same_binding_applied_once() {
    let (mut listener, mutator) = listener();
    let t0 = Instant::now();
    let frame = prefix_ra("fe80::1", &[("fd00:1::", 64)]);

    for i in 0..5 {
        listener
            .handle_frame(&frame, t0 + Duration::from_secs(i * 10))
            .await;
    }

    assert_eq!(mutator.calls(), vec![binding("fd00:1::", 64, "fe80::1")]);
    assert_eq!(listener.stats().routes_unchanged.get(), 4);
}

#[tokio::test]
async fn test_router_change_applies_twice() {
    let (mut listener, mutator) = listener();
    let t0 = Instant::now();

    listener
        .handle_frame(&prefix_ra("fe80::1", &[("fd00:1::", 64)]), t0)
        .await;
    listener
        .handle_frame(&prefix_ra("fe80::2", &[("fd00:1::", 64)]), t0)
        .await;

    assert_eq!(mutator.calls().len(), 2);
    assert_eq!(listener.stats().routes_new.get(), 1);
    assert_eq!(listener.stats().routes_router_changed.get(), 1);
}

#[tokio::test]
async fn test_duplicate_window_discards_before_decoding() {
    let (mut listener, mutator) = listener();
    let t0 = Instant::now();

    listener
        .handle_frame(&prefix_ra("fe80::1", &[("fd00:1::", 64)]), t0)
        .await;
    let outcome = listener
        .handle_frame(
            &prefix_ra("fe80::1", &[("fd00:2::", 64), ("fd00:3::", 64)]),
            t0 + Duration::from_millis(900),
        )
        .await;

    assert!(matches!(
        outcome,
        FrameOutcome::Suppressed { source } if source == addr("fe80::1")
    ));
    assert_eq!(mutator.calls().len(), 1);
}

#[tokio::test]
async fn test_malformed_option_skipped_rest_processed() {
    let (mut listener, mutator) = listener();
    // Prefix Information with a truncated body (Length 2 instead of 4)
    let mut bad_pio = vec![0u8; 16];
    bad_pio[0] = 3;
    bad_pio[1] = 2;
    let builder = RouterAdvertisementBuilder::new(64, 1800)
        .raw_option(&bad_pio)
        .prefix(&pio("fd00:1::", 64))
        .route(&rio("fd00:2::", 64));

    let FrameOutcome::Processed(report) = listener
        .handle_frame(&ra_frame("fe80::1", builder), Instant::now())
        .await
    else {
        panic!("expected a processed RA");
    };

    assert_eq!(report.malformed, 1);
    assert_eq!(mutator.calls().len(), 2);
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| matches!(o, OptionOutcome::Applied { result: Ok(_), .. }))
    );
    assert_eq!(listener.stats().options_malformed.get(), 1);
}

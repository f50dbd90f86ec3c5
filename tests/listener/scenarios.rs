//! Reference scenarios: non-ULA, new, repeated and re-homed prefixes

use super::support::{binding, listener, prefix_ra};
use ra_listener::dataplane::{Decision, FrameOutcome, ProcessReport};
use std::time::{Duration, Instant};

fn processed(outcome: FrameOutcome) -> ProcessReport {
    match outcome {
        FrameOutcome::Processed(report) => report,
        other => panic!("expected a processed RA, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_ula_prefix_is_filtered() {
    let (mut listener, mutator) = listener();
    let frame = prefix_ra("2001:db8::1", &[("2001:db8:1::", 64)]);

    let report = processed(listener.handle_frame(&frame, Instant::now()).await);

    assert!(report.decisions().is_empty());
    assert!(mutator.calls().is_empty());
    assert!(listener.tracker().is_empty());
    assert_eq!(listener.stats().non_ula_ignored.get(), 1);
}

#[tokio::test]
async fn test_new_ula_prefix_is_applied() {
    let (mut listener, mutator) = listener();
    let frame = prefix_ra("fe80::1", &[("fd00:abcd::", 64)]);

    let report = processed(listener.handle_frame(&frame, Instant::now()).await);

    assert_eq!(report.decisions(), vec![Decision::New]);
    assert_eq!(mutator.calls(), vec![binding("fd00:abcd::", 64, "fe80::1")]);
}

#[tokio::test]
async fn test_repeat_after_two_seconds_is_unchanged() {
    let (mut listener, mutator) = listener();
    let frame = prefix_ra("fe80::1", &[("fd00:abcd::", 64)]);
    let t0 = Instant::now();

    listener.handle_frame(&frame, t0).await;
    let report = processed(
        listener
            .handle_frame(&frame, t0 + Duration::from_secs(2))
            .await,
    );

    assert_eq!(report.decisions(), vec![Decision::Unchanged]);
    assert_eq!(mutator.calls().len(), 1);
}

#[tokio::test]
async fn test_new_router_for_known_prefix() {
    let (mut listener, mutator) = listener();
    let t0 = Instant::now();

    listener
        .handle_frame(&prefix_ra("fe80::1", &[("fd00:abcd::", 64)]), t0)
        .await;
    listener
        .handle_frame(
            &prefix_ra("fe80::1", &[("fd00:abcd::", 64)]),
            t0 + Duration::from_secs(2),
        )
        .await;
    let report = processed(
        listener
            .handle_frame(
                &prefix_ra("fe80::2", &[("fd00:abcd::", 64)]),
                t0 + Duration::from_secs(3),
            )
            .await,
    );

    assert_eq!(
        report.decisions(),
        vec![Decision::RouterChanged {
            previous: "fe80::1".parse().unwrap()
        }]
    );
    assert_eq!(
        mutator.calls(),
        vec![
            binding("fd00:abcd::", 64, "fe80::1"),
            binding("fd00:abcd::", 64, "fe80::2"),
        ]
    );
    assert_eq!(listener.tracker().len(), 1);
}

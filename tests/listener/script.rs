//! The listener driving a real route script

use super::support::{INTERFACE, prefix_ra};
use ra_listener::dataplane::{
    FrameOutcome, ListenerSettings, OptionOutcome, RaListener, ScriptMutator,
};
use ra_listener::telemetry::ListenerStats;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A script that appends its environment to `log` and fails for fd00:bad::
fn install_script(dir: &Path, log: &Path) -> PathBuf {
    let path = dir.join("configure-route.sh");
    let body = format!(
        "#!/bin/sh\n\
         if [ \"$PREFIX\" = \"fd00:bad::\" ]; then echo 'no route to host' >&2; exit 1; fi\n\
         echo \"$PREFIX $PREFIX_LEN $ROUTER $IFACE\" >> {}\n\
         echo ok\n",
        log.display()
    );
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_script_invoked_once_per_binding() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("routes.log");
    let script = install_script(dir.path(), &log);

    let mut listener = RaListener::new(
        ListenerSettings::new(INTERFACE),
        ScriptMutator::new(script),
        Arc::new(ListenerStats::new()),
    );
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
    listener
        .handle_frame(&prefix_ra("fe80::2", &[("fd00:abcd::", 64)]), t0 + Duration::from_secs(3))
        .await;

    let written = std::fs::read_to_string(&log).unwrap();
    assert_eq!(
        written.lines().collect::<Vec<_>>(),
        vec![
            "fd00:abcd:: 64 fe80::1 wpan0",
            "fd00:abcd:: 64 fe80::2 wpan0",
        ]
    );
}

#[tokio::test]
async fn test_script_failure_is_reported_and_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("routes.log");
    let script = install_script(dir.path(), &log);

    let mut listener = RaListener::new(
        ListenerSettings::new(INTERFACE),
        ScriptMutator::new(script),
        Arc::new(ListenerStats::new()),
    );
    let t0 = Instant::now();
    let frame = prefix_ra("fe80::1", &[("fd00:bad::", 64), ("fd00:1::", 64)]);

    let FrameOutcome::Processed(report) = listener.handle_frame(&frame, t0).await else {
        panic!("expected a processed RA");
    };
    match &report.outcomes[0] {
        OptionOutcome::Applied { result: Err(e), .. } => {
            assert!(e.to_string().contains("no route to host"));
        }
        other => panic!("expected a failed application, got {:?}", other),
    }
    assert!(matches!(
        report.outcomes[1],
        OptionOutcome::Applied { result: Ok(_), .. }
    ));

    listener
        .handle_frame(&frame, t0 + Duration::from_secs(5))
        .await;
    assert_eq!(listener.stats().apply_failed.get(), 1);
    assert_eq!(listener.stats().apply_succeeded.get(), 1);
}

//! Heartbeat watchdog scenarios, driven on a paused clock

use std::sync::Arc;
use std::time::Duration;

use market_sentinel::monitors::heartbeat::{
    EntityState, HeartbeatError, HeartbeatWatchdog, WatchdogSettings,
};
use tokio::time::sleep;

use crate::helpers::RecordingNotifier;

fn watchdog(warn_count: u32) -> (Arc<HeartbeatWatchdog>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let watchdog = HeartbeatWatchdog::new(
        WatchdogSettings {
            interval: Duration::from_secs(10),
            warn_count,
            rearm_after_escalation: false,
        },
        notifier.clone(),
    );
    (watchdog, notifier)
}

#[tokio::test(start_paused = true)]
async fn test_silent_service_gets_three_spaced_alerts() {
    let (watchdog, notifier) = watchdog(3);

    watchdog.record_heartbeat("svc-A").await.unwrap();
    sleep(Duration::from_secs(120)).await;

    let times = notifier.times().await;
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(10));
    }
    for message in notifier.messages().await {
        assert!(message.starts_with("⚠️ Health check timeout for svc-A, last heartbeat at "));
    }

    let view = watchdog.status("svc-A").await.unwrap();
    assert_ne!(view.state, EntityState::Escalating);
}

#[tokio::test(start_paused = true)]
async fn test_steady_heartbeats_never_alert() {
    let (watchdog, notifier) = watchdog(3);

    for _ in 0..20 {
        watchdog.record_heartbeat("svc-A").await.unwrap();
        sleep(Duration::from_secs(9)).await;
    }

    assert_eq!(notifier.count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_mid_burst_stops_alerts_for_that_burst() {
    let (watchdog, notifier) = watchdog(5);

    watchdog.record_heartbeat("svc-A").await.unwrap();
    // alerts at 10s and 20s
    sleep(Duration::from_secs(25)).await;
    assert_eq!(notifier.count().await, 2);

    for _ in 0..5 {
        watchdog.record_heartbeat("svc-A").await.unwrap();
        sleep(Duration::from_secs(5)).await;
    }

    assert_eq!(notifier.count().await, 2);
    assert_eq!(
        watchdog.status("svc-A").await.unwrap().state,
        EntityState::Healthy
    );
}

#[tokio::test(start_paused = true)]
async fn test_names_are_trimmed() {
    let (watchdog, _) = watchdog(3);

    watchdog.record_heartbeat("  svc-A ").await.unwrap();

    assert!(watchdog.status("svc-A").await.is_some());
    assert_eq!(
        watchdog.record_heartbeat("").await,
        Err(HeartbeatError::EmptyName)
    );
}

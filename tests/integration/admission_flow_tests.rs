//! Integration tests for admission control

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use evalbot_admission::{AdmissionConfig, AdmissionController, Decision, FileListStore};

use crate::common::{memory_controller, setup_test_logging};

#[tokio::test]
async fn test_escalation_path_warn_warn_ban_silence() {
    setup_test_logging();
    let admission = memory_controller();
    let start = Instant::now();

    // A first handled command establishes the reference point.
    admission.record_handled("spammer", Some("!py 0"), start).await;

    let step = Duration::from_millis(400);
    let first = admission
        .evaluate("spammer", "!py 1", true, start + step)
        .await;
    let second = admission
        .evaluate("spammer", "!py 2", true, start + step * 2)
        .await;
    let third = admission
        .evaluate("spammer", "!py 3", true, start + step * 3)
        .await;
    let fourth = admission
        .evaluate("spammer", "!py 4", true, start + step * 4)
        .await;

    assert_matches!(first, Decision::Warn(msg) if msg == "slow down with your commands.");
    assert_matches!(second, Decision::Warn(msg) if msg == "really, slow down with your commands.");
    assert_matches!(third, Decision::Warn(msg) if msg == "no more.");
    assert_eq!(fourth, Decision::Ignore);
}

#[tokio::test]
async fn test_delay_scales_linearly_with_in_flight_count() {
    let admission = memory_controller();

    for expected in 2..=5u32 {
        for _ in 0..(expected - admission.in_flight().await) {
            admission.increase().await;
        }
        assert_eq!(
            admission.response_delay(true).await,
            Duration::from_secs(2) * expected,
            "at k = {}",
            expected
        );
    }

    while admission.in_flight().await > 0 {
        admission.decrease().await;
    }
    assert_eq!(
        admission.response_delay(true).await,
        Duration::from_millis(250)
    );
}

#[tokio::test]
async fn test_single_request_uses_baseline_delay() {
    let admission = memory_controller();
    admission.increase().await;
    assert_eq!(
        admission.response_delay(true).await,
        Duration::from_millis(250)
    );
    admission.decrease().await;
}

#[tokio::test]
async fn test_ban_list_survives_controller_restart() {
    setup_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let admin_path = dir.path().join("admins.lst");
    let ban_path = dir.path().join("banned.lst");

    {
        let store = Arc::new(FileListStore::new(&admin_path, &ban_path));
        let admission = AdmissionController::new(AdmissionConfig::default(), store);
        admission.ban(&["mallory".to_string()]).await;
    }

    let store = Arc::new(FileListStore::new(&admin_path, &ban_path));
    let admission = AdmissionController::new(AdmissionConfig::default(), store);
    let decision = admission
        .evaluate("mallory", "!py 1", true, Instant::now())
        .await;
    assert_eq!(decision, Decision::Ignore);
}

#[tokio::test]
async fn test_default_admins_used_when_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileListStore::new(
        dir.path().join("admins.lst"),
        dir.path().join("banned.lst"),
    ));
    let admission = AdmissionController::new(
        AdmissionConfig {
            default_admins: vec!["root".to_string()],
            ..Default::default()
        },
        store,
    );
    assert!(admission.is_admin("root").await);
    assert!(!admission.is_admin("alice").await);
}

#[tokio::test]
async fn test_load_shedding_above_ceiling() {
    let admission = memory_controller();
    // Default ceiling reuses the ban limit (3).
    for _ in 0..3 {
        admission.increase().await;
    }
    assert!(admission.admit_load("alice").await);
    admission.increase().await;
    assert!(!admission.admit_load("alice").await);
}

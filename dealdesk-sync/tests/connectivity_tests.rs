use dealdesk_sync::ConnectivityMonitor;

#[test]
fn unknown_platform_status_starts_online() {
    let monitor = ConnectivityMonitor::new(None);
    assert!(monitor.is_online());
    assert!(monitor.last_online_at().is_some());
}

#[test]
fn reported_offline_start_has_no_online_timestamp() {
    let monitor = ConnectivityMonitor::new(Some(false));
    assert!(!monitor.is_online());
    assert!(monitor.last_online_at().is_none());
}

#[test]
fn going_online_stamps_the_transition() {
    let monitor = ConnectivityMonitor::new(Some(false));
    monitor.set_online(true);

    let state = monitor.state();
    assert!(state.online);
    assert!(state.last_online_at.is_some());
}

#[test]
fn going_offline_keeps_last_online_timestamp() {
    let monitor = ConnectivityMonitor::new(Some(true));
    let stamp = monitor.last_online_at();
    monitor.set_online(false);

    assert!(!monitor.is_online());
    assert_eq!(monitor.last_online_at(), stamp);
}

#[tokio::test]
async fn subscribers_see_only_real_transitions() {
    let monitor = ConnectivityMonitor::new(Some(true));
    let mut rx = monitor.subscribe();

    monitor.set_online(true);
    assert!(!rx.has_changed().unwrap());

    monitor.set_online(false);
    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().online);
}

#[test]
fn clones_share_state() {
    let monitor = ConnectivityMonitor::default();
    let other = monitor.clone();
    other.set_online(false);
    assert!(!monitor.is_online());
}

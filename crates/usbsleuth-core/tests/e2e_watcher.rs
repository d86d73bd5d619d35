/// End-to-end watcher tests.
///
/// These run the real `DriveWatcher` thread against the simulated platform:
/// raw notifications go in through the `Simulator`, normalized `DriveEvent`s
/// come out of the bounded channel exactly as the GUI would receive them.
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use usbsleuth_core::error::SubscriptionError;
use usbsleuth_core::model::DriveEvent;
use usbsleuth_core::platform::simulated::{SimulatedPlatform, Simulator};
use usbsleuth_core::platform::{DriveType, RawVolumeEvent};
use usbsleuth_core::watcher::{
    event_channel, DriveWatcher, StopOutcome, WatcherConfig, WatcherState,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn watcher_with(config: WatcherConfig) -> (DriveWatcher, Receiver<DriveEvent>, Simulator) {
    let (platform, sim) = SimulatedPlatform::new();
    let (tx, rx) = event_channel(config.channel_capacity);
    (DriveWatcher::new(Arc::new(platform), tx, config), rx, sim)
}

fn fast_config() -> WatcherConfig {
    WatcherConfig {
        wait_timeout: Duration::from_millis(50),
        ..WatcherConfig::default()
    }
}

/// Wait until the watcher thread holds its subscription.
fn wait_subscribed(sim: &Simulator) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while sim.live_subscriptions() == 0 {
        assert!(Instant::now() < deadline, "watcher never subscribed");
        thread::sleep(Duration::from_millis(5));
    }
}

fn recv(rx: &Receiver<DriveEvent>) -> DriveEvent {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("expected a drive event within 5 seconds")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn removable_insert_and_removal_are_forwarded_in_order() {
    let (mut watcher, rx, sim) = watcher_with(fast_config());
    watcher.start();
    wait_subscribed(&sim);

    sim.insert_volume("G:", DriveType::Removable, "/mnt/g");
    sim.insert_volume("H:", DriveType::Removable, "/mnt/h");

    // Arrivals are re-queried, so G: must still be attached when its
    // arrival is processed.
    assert_eq!(recv(&rx), DriveEvent::inserted("G:"));
    assert_eq!(recv(&rx), DriveEvent::inserted("H:"));

    sim.remove_volume("G:");
    sim.remove_volume("H:");
    assert_eq!(recv(&rx), DriveEvent::removed("G:"));
    assert_eq!(recv(&rx), DriveEvent::removed("H:"));

    assert_eq!(watcher.stop(), StopOutcome::Confirmed);
}

#[test]
fn non_removable_arrivals_are_filtered_but_removals_are_not() {
    let (mut watcher, rx, sim) = watcher_with(fast_config());
    watcher.start();
    wait_subscribed(&sim);

    sim.insert_volume("E:", DriveType::CdRom, "/mnt/e");
    sim.insert_volume("Z:", DriveType::Network, "/mnt/z");
    sim.remove_volume("E:");

    // The removal is the first thing through; both arrivals were dropped.
    assert_eq!(recv(&rx), DriveEvent::removed("E:"));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn malformed_and_unrelated_notifications_are_discarded() {
    let (mut watcher, rx, sim) = watcher_with(fast_config());
    watcher.start();
    wait_subscribed(&sim);

    sim.emit(RawVolumeEvent {
        event_type: 2,
        drive_name: None,
    });
    sim.emit(RawVolumeEvent {
        event_type: 2,
        drive_name: Some("G".into()),
    });
    sim.emit(RawVolumeEvent {
        event_type: 1,
        drive_name: Some("G:\\".into()),
    });
    sim.emit(RawVolumeEvent {
        event_type: 3,
        drive_name: Some("K:\\".into()),
    });

    assert_eq!(recv(&rx), DriveEvent::removed("K:"));
    assert!(watcher.is_running());
}

#[test]
fn stop_interrupts_a_blocked_wait_and_restart_works() {
    // A long wait timeout: only the interrupter can make stop fast.
    let config = WatcherConfig {
        wait_timeout: Duration::from_secs(30),
        ..WatcherConfig::default()
    };
    let (mut watcher, rx, sim) = watcher_with(config);

    watcher.start();
    wait_subscribed(&sim);
    assert_eq!(watcher.state(), WatcherState::Running);

    let started = Instant::now();
    assert_eq!(
        watcher.stop_with_timeout(Duration::from_secs(1)),
        StopOutcome::Confirmed
    );
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(watcher.state(), WatcherState::Idle);
    assert_eq!(sim.live_subscriptions(), 0);

    watcher.start();
    wait_subscribed(&sim);
    assert_eq!(sim.subscriptions_opened(), 2);

    sim.insert_volume("G:", DriveType::Removable, "/mnt/g");
    assert_eq!(recv(&rx), DriveEvent::inserted("G:"));
}

#[test]
fn stop_returns_by_its_deadline_when_the_wait_stalls() {
    let (mut watcher, _rx, sim) = watcher_with(fast_config());
    sim.set_wait_stall(Some(Duration::from_millis(800)));

    watcher.start();
    wait_subscribed(&sim);

    let started = Instant::now();
    assert_eq!(
        watcher.stop_with_timeout(Duration::from_millis(100)),
        StopOutcome::TimedOut
    );
    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(watcher.state(), WatcherState::Idle);

    // The detached thread still sees its cancel flag after the stall.
    let deadline = Instant::now() + Duration::from_secs(5);
    while sim.live_subscriptions() != 0 {
        assert!(Instant::now() < deadline, "detached watcher never exited");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn start_is_a_no_op_while_running() {
    let (mut watcher, _rx, sim) = watcher_with(fast_config());
    watcher.start();
    wait_subscribed(&sim);
    watcher.start();
    watcher.start();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(sim.subscriptions_opened(), 1);
    assert_eq!(watcher.stop(), StopOutcome::Confirmed);
    assert_eq!(watcher.stop(), StopOutcome::NotRunning);
}

#[test]
fn subscription_failure_ends_the_run_without_events() {
    let (mut watcher, rx, sim) = watcher_with(fast_config());
    sim.fail_subscriptions(Some("notification service unavailable"));

    watcher.start();
    let deadline = Instant::now() + Duration::from_secs(5);
    while watcher.is_running() {
        assert!(Instant::now() < deadline, "failed run never ended");
        thread::sleep(Duration::from_millis(5));
    }

    assert!(matches!(
        watcher.last_failure(),
        Some(SubscriptionError::Connect(_))
    ));
    assert!(rx.try_recv().is_err());

    // A later start clears the failure once the service is back.
    sim.fail_subscriptions(None);
    watcher.start();
    wait_subscribed(&sim);
    assert!(watcher.is_running());
    assert!(watcher.last_failure().is_none());
}

#[test]
fn dropping_the_watcher_releases_the_subscription() {
    let (mut watcher, _rx, sim) = watcher_with(fast_config());
    watcher.start();
    wait_subscribed(&sim);

    drop(watcher);
    assert_eq!(sim.live_subscriptions(), 0);
}

/// End-to-end tests for `AppState` — the GUI application state machine.
///
/// These tests drive `AppState` against the simulated platform without
/// spinning up an egui window. Drive letters map onto `tempfile`
/// directories, so file operations hit a real filesystem and hot-plug
/// events travel through the real watcher thread.
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use usbsleuth_core::model::{DriveAction, PnpEntity};
use usbsleuth_core::platform::simulated::{SimulatedPlatform, Simulator};
use usbsleuth_core::platform::DriveType;
use usbsleuth_core::refresh::RefreshConfig;
use usbsleuth_core::watcher::{StopOutcome, WatcherConfig};
use usbsleuth_gui::state::{AppState, LogLevel, Notice, MAX_LOG_LINES, NOTICE_LIFETIME};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fast_watcher() -> WatcherConfig {
    WatcherConfig {
        wait_timeout: Duration::from_millis(50),
        ..WatcherConfig::default()
    }
}

fn fast_refresh() -> RefreshConfig {
    RefreshConfig {
        debounce: Duration::from_millis(20),
        ready_timeout: Duration::from_secs(2),
        ready_poll_interval: Duration::from_millis(10),
    }
}

fn storage_entity() -> PnpEntity {
    PnpEntity {
        name: Some("USB Mass Storage Device".into()),
        manufacturer: Some("Compatible USB storage device".into()),
        device_id: Some(r"USB\VID_1234&PID_5678\ABCDEF0001".into()),
        service: Some("USBSTOR".into()),
    }
}

/// A state whose simulator already has `G:` mounted at `stick`.
fn state_with_stick(stick: &Path) -> (AppState, Simulator) {
    let (platform, sim) = SimulatedPlatform::new();
    sim.insert_volume("G:", DriveType::Removable, stick);
    sim.add_usb_entity(storage_entity());
    let state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());
    (state, sim)
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Run the frame loop until `cond` holds.
fn pump_until(state: &mut AppState, what: &str, mut cond: impl FnMut(&AppState) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond(state) {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        state.process_watcher_messages(Instant::now());
        state.process_copy_messages();
        thread::sleep(Duration::from_millis(10));
    }
}

fn has_log(state: &AppState, level: LogLevel, needle: &str) -> bool {
    state
        .log
        .iter()
        .any(|l| l.level == level && l.message.contains(needle))
}

// ── Initial snapshot ──────────────────────────────────────────────────────────

#[test]
fn initial_refresh_selects_first_removable_volume() {
    let stick = TempDir::new().unwrap();
    let fixed = TempDir::new().unwrap();
    let (platform, sim) = SimulatedPlatform::new();
    sim.insert_volume("C:", DriveType::Fixed, fixed.path());
    sim.insert_volume("G:", DriveType::Removable, stick.path());
    sim.add_usb_entity(storage_entity());

    let state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    assert_eq!(state.volumes, ["G:"]);
    assert_eq!(state.selected_volume.as_deref(), Some("G:"));
    assert_eq!(state.selected_root.as_deref(), Some(stick.path()));
    assert_eq!(state.refresh_count, 1);
    assert!(state.last_refresh.is_some());
    assert_eq!(state.usb_devices.len(), 1);
    assert_eq!(state.usb_devices[0].vendor_id, Some(0x1234));
    assert!(state.only_storage);
    assert!(state.error_dialog.is_none());
}

#[test]
fn no_removable_volumes_leaves_nothing_selected() {
    let (platform, _sim) = SimulatedPlatform::new();
    let state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    assert!(state.volumes.is_empty());
    assert!(state.selected_volume.is_none());
    assert!(state.selected_root.is_none());
    assert!(state.entries.is_empty());
}

#[test]
fn offline_inventory_logs_on_background_refresh_but_dialogs_on_user_refresh() {
    let (platform, sim) = SimulatedPlatform::new();
    sim.set_inventory_offline(true);
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    assert!(state.error_dialog.is_none());
    assert!(has_log(&state, LogLevel::Error, "Drive refresh failed"));

    state.refresh_usb_devices();
    assert!(state
        .error_dialog
        .as_deref()
        .is_some_and(|m| m.contains("USB device refresh")));
}

// ── File operations ───────────────────────────────────────────────────────────

#[test]
fn write_text_file_creates_folders_and_relists() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.write_path = "notes/hello.txt".into();
    state.write_text = "hi".into();
    state.write_text_file();

    assert!(state.error_dialog.is_none());
    assert_eq!(
        fs::read_to_string(stick.path().join("notes").join("hello.txt")).unwrap(),
        "hi"
    );
    assert!(state.entries.iter().any(|e| e.name == "notes" && e.is_dir));
    assert!(has_log(&state, LogLevel::Info, "Write complete"));
}

#[test]
fn empty_write_text_uses_default_message() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.write_text.clear();
    state.write_text_file();

    let written = fs::read_to_string(stick.path().join(&state.write_path)).unwrap();
    assert_eq!(written, usbsleuth_gui::state::DEFAULT_WRITE_TEXT);
}

#[test]
fn write_without_selection_raises_error_dialog() {
    let (platform, _sim) = SimulatedPlatform::new();
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    state.write_text_file();

    assert!(state.error_dialog.is_some());
    assert_eq!(state.log.back().map(|l| l.level), Some(LogLevel::Error));
}

#[test]
fn write_to_vanished_mount_raises_error_dialog() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());
    let root = stick.path().to_path_buf();
    drop(stick);
    assert!(!root.exists());

    state.write_text_file();
    assert!(state.error_dialog.is_some());
}

#[test]
fn delete_waits_for_confirmation() {
    let stick = TempDir::new().unwrap();
    fs::write(stick.path().join("old.txt"), "bye").unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.delete_path = "old.txt".into();
    state.request_delete();
    assert_eq!(state.pending_delete.as_deref(), Some("old.txt"));
    assert!(stick.path().join("old.txt").exists());

    state.confirm_delete();
    assert!(state.pending_delete.is_none());
    assert!(!stick.path().join("old.txt").exists());
    assert!(state.entries.iter().all(|e| e.name != "old.txt"));
}

#[test]
fn cancelled_delete_keeps_the_file() {
    let stick = TempDir::new().unwrap();
    fs::create_dir(stick.path().join("keep")).unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.delete_path = "keep".into();
    state.request_delete();
    state.cancel_delete();
    state.confirm_delete();

    assert!(stick.path().join("keep").is_dir());
}

#[test]
fn delete_cannot_reach_above_the_drive() {
    let outer = TempDir::new().unwrap();
    let stick = outer.path().join("stick");
    fs::create_dir(&stick).unwrap();
    fs::write(outer.path().join("precious.txt"), "keep").unwrap();
    let (mut state, _sim) = state_with_stick(&stick);

    state.delete_path = "../precious.txt".into();
    state.request_delete();
    state.confirm_delete();

    assert!(outer.path().join("precious.txt").exists());
    assert!(state
        .error_dialog
        .as_deref()
        .is_some_and(|m| m.contains("invalid relative path")));
}

#[test]
fn blank_delete_path_is_rejected_without_confirmation() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.delete_path = "   ".into();
    state.request_delete();

    assert!(state.pending_delete.is_none());
    assert!(state.error_dialog.is_some());
}

#[test]
fn copy_runs_in_background_and_relists() {
    let stick = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    let src = source_dir.path().join("video.bin");
    let len = 2 * 1024 * 1024 + 5;
    fs::write(&src, vec![7u8; len]).unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.copy_source = src.display().to_string();
    state.start_copy();
    assert!(state.copy_handle.is_some());

    pump_until(&mut state, "copy completion", |s| s.copy_handle.is_none());

    assert!(state.error_dialog.is_none());
    assert_eq!(
        fs::metadata(stick.path().join("video.bin")).unwrap().len(),
        len as u64
    );
    let progress = state.copy_progress.expect("progress reported");
    assert_eq!(progress.bytes_copied, progress.total_bytes);
    assert!(state.entries.iter().any(|e| e.name == "video.bin"));
    assert!(has_log(&state, LogLevel::Info, "Copy complete"));
}

#[test]
fn copy_of_missing_source_raises_error_dialog() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.copy_source = stick.path().join("nope.bin").display().to_string();
    state.start_copy();

    assert!(state.copy_handle.is_none());
    assert!(state.error_dialog.is_some());
}

#[test]
fn picked_file_is_copied_and_dismissed_picker_does_nothing() {
    let stick = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    let src = source_dir.path().join("photo.jpg");
    fs::write(&src, vec![1u8; 4096]).unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.copy_picked(None);
    assert!(state.copy_handle.is_none());
    assert!(state.error_dialog.is_none());
    assert!(state.copy_source.is_empty());

    state.copy_picked(Some(src.clone()));
    assert_eq!(state.copy_source, src.display().to_string());
    pump_until(&mut state, "copy completion", |s| s.copy_handle.is_none());

    assert!(state.error_dialog.is_none());
    assert_eq!(fs::read(stick.path().join("photo.jpg")).unwrap().len(), 4096);
}

#[test]
fn open_without_selection_raises_error_dialog() {
    let (platform, _sim) = SimulatedPlatform::new();
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    state.open_mount_dir();

    assert!(state
        .error_dialog
        .as_deref()
        .is_some_and(|m| m.starts_with("Open failed")));
    assert_eq!(state.log.back().map(|l| l.level), Some(LogLevel::Error));
}

#[test]
fn open_on_vanished_mount_raises_error_dialog() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());
    drop(stick);

    state.open_mount_dir();

    assert!(state
        .error_dialog
        .as_deref()
        .is_some_and(|m| m.contains("mount unavailable")));
    assert!(!has_log(&state, LogLevel::Info, "Opened"));
}

#[test]
fn hidden_entries_follow_the_toggle() {
    let stick = TempDir::new().unwrap();
    fs::write(stick.path().join(".secret"), "x").unwrap();
    fs::write(stick.path().join("visible.txt"), "x").unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    #[cfg(not(windows))]
    {
        assert!(state.entries.iter().all(|e| e.name != ".secret"));
        state.include_hidden = true;
        state.reload_listing();
        assert!(state.entries.iter().any(|e| e.name == ".secret"));
    }
    #[cfg(windows)]
    {
        state.include_hidden = true;
        state.reload_listing();
    }
    assert!(state.entries.iter().any(|e| e.name == "visible.txt"));
}

// ── Export ────────────────────────────────────────────────────────────────────

#[test]
fn export_writes_json_by_extension() {
    let stick = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    let path = out.path().join("devices.json");
    state.export_path = path.display().to_string();
    state.export_usb_devices();

    assert!(state.error_dialog.is_none());
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.trim_start().starts_with('['));
    assert!(text.contains("0x1234"));
    assert!(has_log(&state, LogLevel::Info, "as JSON"));
}

#[test]
fn export_to_unwritable_path_raises_error_dialog() {
    let stick = TempDir::new().unwrap();
    let (mut state, _sim) = state_with_stick(stick.path());

    state.export_path = stick
        .path()
        .join("missing-dir")
        .join("devices.csv")
        .display()
        .to_string();
    state.export_usb_devices();

    assert!(state.error_dialog.is_some());
}

// ── Hot-plug ──────────────────────────────────────────────────────────────────

#[test]
fn insertion_and_removal_update_drives_and_notices() {
    let mounts = TempDir::new().unwrap();
    let g_root = mounts.path().join("g");
    fs::create_dir(&g_root).unwrap();

    let (platform, sim) = SimulatedPlatform::new();
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());
    wait_for("subscription", || sim.live_subscriptions() == 1);
    let refreshes = state.refresh_count;

    sim.insert_volume("G:", DriveType::Removable, &g_root);
    pump_until(&mut state, "drive to appear", |s| !s.volumes.is_empty());

    assert_eq!(state.volumes, ["G:"]);
    assert_eq!(state.selected_volume.as_deref(), Some("G:"));
    assert!(state
        .notices
        .iter()
        .any(|n| n.action == DriveAction::Inserted && n.drive_letter == "G:"));
    assert!(has_log(&state, LogLevel::Info, "USB drive detected: G:\\"));
    assert_eq!(state.refresh_count, refreshes + 1);

    sim.remove_volume("G:");
    pump_until(&mut state, "drive to disappear", |s| s.volumes.is_empty());

    assert!(state.selected_volume.is_none());
    assert!(state
        .notices
        .iter()
        .any(|n| n.action == DriveAction::Removed && n.drive_letter == "G:"));
    assert!(has_log(&state, LogLevel::Warn, "USB drive removed: G:\\"));
}

#[test]
fn selection_falls_back_when_selected_drive_disappears() {
    let mounts = TempDir::new().unwrap();
    let g_root = mounts.path().join("g");
    let h_root = mounts.path().join("h");
    fs::create_dir(&g_root).unwrap();
    fs::create_dir(&h_root).unwrap();

    let (platform, sim) = SimulatedPlatform::new();
    sim.insert_volume("G:", DriveType::Removable, &g_root);
    sim.insert_volume("H:", DriveType::Removable, &h_root);
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    state.select_volume("H:");
    assert_eq!(state.selected_root.as_deref(), Some(h_root.as_path()));

    sim.remove_volume("H:");
    state.refresh_volumes();

    assert_eq!(state.volumes, ["G:"]);
    assert_eq!(state.selected_volume.as_deref(), Some("G:"));
    assert_eq!(state.selected_root.as_deref(), Some(g_root.as_path()));
}

#[test]
fn notices_expire_and_can_be_dismissed() {
    let (platform, _sim) = SimulatedPlatform::new();
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());
    let now = Instant::now();

    for letter in ["G:", "H:"] {
        state.notices.push(Notice {
            action: DriveAction::Inserted,
            drive_letter: letter.into(),
            shown_at: now,
        });
    }
    assert!(state.next_wakeup(now).is_some_and(|d| d <= NOTICE_LIFETIME));

    state.dismiss_notice(0);
    assert_eq!(state.notices.len(), 1);
    assert_eq!(state.notices[0].drive_letter, "H:");
    state.dismiss_notice(5);
    assert_eq!(state.notices.len(), 1);

    assert!(state.process_watcher_messages(now + NOTICE_LIFETIME));
    assert!(state.notices.is_empty());
}

// ── Watcher lifecycle ─────────────────────────────────────────────────────────

#[test]
fn failed_subscription_is_reported_and_restartable() {
    let (platform, sim) = SimulatedPlatform::new();
    sim.fail_subscriptions(Some("service unavailable"));
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    wait_for("watcher to give up", || !state.watcher_running());
    assert!(state
        .watcher_failure()
        .is_some_and(|m| m.contains("service unavailable")));

    sim.fail_subscriptions(None);
    state.restart_watcher();
    wait_for("resubscription", || sim.live_subscriptions() == 1);
    assert!(state.watcher_running());
    assert!(state.watcher_failure().is_none());
    assert!(has_log(&state, LogLevel::Info, "Drive watcher restarted"));
}

#[test]
fn stop_watcher_releases_the_subscription() {
    let (platform, sim) = SimulatedPlatform::new();
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());
    wait_for("subscription", || sim.live_subscriptions() == 1);

    assert_eq!(state.stop_watcher(), StopOutcome::Confirmed);
    assert_eq!(sim.live_subscriptions(), 0);
    assert!(!state.watcher_running());
    assert_eq!(state.stop_watcher(), StopOutcome::NotRunning);
}

#[test]
fn unconfirmed_stop_is_reported_in_the_log() {
    let (platform, sim) = SimulatedPlatform::new();
    let config = WatcherConfig {
        wait_timeout: Duration::from_millis(50),
        stop_timeout: Duration::from_millis(100),
        ..WatcherConfig::default()
    };
    let mut state = AppState::with_config(platform.platform(), config, fast_refresh());
    wait_for("subscription", || sim.live_subscriptions() == 1);
    sim.set_wait_stall(Some(Duration::from_millis(800)));
    // Let the watcher enter a stalled wait.
    thread::sleep(Duration::from_millis(100));

    assert_eq!(state.stop_watcher(), StopOutcome::TimedOut);
    assert!(has_log(&state, LogLevel::Warn, "teardown unconfirmed"));

    sim.set_wait_stall(None);
    wait_for("stalled watcher to exit", || sim.live_subscriptions() == 0);
}

#[test]
fn dropping_state_stops_the_watcher() {
    let (platform, sim) = SimulatedPlatform::new();
    let state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());
    wait_for("subscription", || sim.live_subscriptions() == 1);

    drop(state);
    assert_eq!(sim.live_subscriptions(), 0);
}

// ── Activity log ──────────────────────────────────────────────────────────────

#[test]
fn activity_log_is_capped() {
    let (platform, _sim) = SimulatedPlatform::new();
    let mut state = AppState::with_config(platform.platform(), fast_watcher(), fast_refresh());

    for i in 0..MAX_LOG_LINES + 10 {
        state.push_log(LogLevel::Info, format!("line {i}"));
    }

    assert_eq!(state.log.len(), MAX_LOG_LINES);
    assert_eq!(state.log.front().map(|l| l.message.as_str()), Some("line 10"));
}

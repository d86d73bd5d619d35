/// End-to-end workflow tests: enumerate, select a volume, operate on its
/// files, and follow hot-plug events through the watcher and the refresh
/// coordinator into a fresh snapshot.
///
/// The simulated platform maps drive letters onto `tempfile` directories,
/// so every file operation below touches a real filesystem.
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use usbsleuth_core::enumerator::Enumerator;
use usbsleuth_core::fileops::{self, CopyMessage};
use usbsleuth_core::model::{DriveEvent, PnpEntity};
use usbsleuth_core::platform::simulated::SimulatedPlatform;
use usbsleuth_core::platform::DriveType;
use usbsleuth_core::refresh::{
    run_refresh, CoordinatorNotice, ListingRefresh, RefreshConfig, RefreshCoordinator,
    RefreshRequest,
};
use usbsleuth_core::watcher::{event_channel, DriveWatcher, StopOutcome, WatcherConfig};

#[test]
fn write_then_list_on_selected_volume() {
    let stick = tempfile::tempdir().unwrap();
    let (platform, sim) = SimulatedPlatform::new();
    sim.insert_volume("G:", DriveType::Removable, stick.path());
    let enumerator = Enumerator::new(Arc::new(platform));

    let volumes = enumerator.list_removable_volumes().unwrap();
    assert_eq!(volumes, ["G:"]);

    let root = enumerator.mount_root(&volumes[0]);
    fileops::require_mount(&root).unwrap();
    let written = fileops::write_text(&root, "hello.txt", "hi").unwrap();
    assert_eq!(written, root.join("hello.txt"));

    let listing = fileops::list_dir(&root, false).unwrap();
    let hello = listing
        .iter()
        .find(|e| e.name == "hello.txt")
        .expect("hello.txt listed");
    assert_eq!(hello.size, 2);
    assert!(!hello.is_dir);
}

#[test]
fn copy_onto_volume_and_delete_again() {
    let stick = tempfile::tempdir().unwrap();
    let source_dir = tempfile::tempdir().unwrap();
    let src = source_dir.path().join("photo.raw");
    fs::write(&src, vec![42u8; 3 * 1024 * 1024 + 17]).unwrap();

    let dst = fileops::copy_destination(stick.path(), &src).unwrap();
    let handle = fileops::spawn_copy(src.clone(), dst.clone());

    let mut last: Option<fileops::CopyProgress> = None;
    loop {
        match handle.progress_rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            CopyMessage::Progress(p) => {
                if let Some(prev) = last {
                    assert!(p.bytes_copied >= prev.bytes_copied);
                }
                last = Some(p);
            }
            CopyMessage::Complete { .. } => break,
            other => panic!("unexpected {other:?}"),
        }
    }
    let last = last.expect("at least one progress report");
    assert_eq!(last.bytes_copied, last.total_bytes);
    assert_eq!(last.total_bytes, 3 * 1024 * 1024 + 17);

    let removed = fileops::delete_path(stick.path(), "photo.raw").unwrap();
    assert!(removed.is_absolute());
    assert!(fileops::list_dir(stick.path(), true).unwrap().is_empty());
}

#[test]
fn hot_plug_events_drive_a_single_refresh() {
    let mounts = tempfile::tempdir().unwrap();
    let g_root = mounts.path().join("g");
    fs::create_dir(&g_root).unwrap();

    let (platform, sim) = SimulatedPlatform::new();
    sim.add_usb_entity(PnpEntity {
        name: Some("USB Mass Storage Device".into()),
        manufacturer: Some("Compatible USB storage device".into()),
        device_id: Some(r"USB\VID_1234&PID_5678\ABCDEF0001".into()),
        service: Some("USBSTOR".into()),
    });
    let platform = Arc::new(platform);
    let enumerator = Enumerator::new(platform.clone());

    let watcher_config = WatcherConfig {
        wait_timeout: Duration::from_millis(50),
        ..WatcherConfig::default()
    };
    let (tx, rx) = event_channel(watcher_config.channel_capacity);
    let mut watcher = DriveWatcher::new(platform.clone(), tx, watcher_config);
    let mut coordinator = RefreshCoordinator::new(rx, platform.clone(), RefreshConfig::default());

    watcher.start();
    let deadline = Instant::now() + Duration::from_secs(5);
    while sim.live_subscriptions() == 0 {
        assert!(Instant::now() < deadline, "watcher never subscribed");
        thread::sleep(Duration::from_millis(5));
    }

    sim.insert_volume("G:", DriveType::Removable, &g_root);

    // Emulate the UI frame loop until the debounced refresh fires.
    let mut seen = Vec::new();
    let mut refreshes = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while refreshes == 0 {
        assert!(Instant::now() < deadline, "refresh never fired");
        let now = Instant::now();
        seen.extend(coordinator.pump(now));
        if coordinator.poll_refresh(now) {
            refreshes += 1;
        }
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(seen[0], CoordinatorNotice::Event(DriveEvent::inserted("G:")));
    assert!(seen
        .iter()
        .any(|n| matches!(n, CoordinatorNotice::MountReady(r) if r.accessible)));

    let outcome = run_refresh(
        &enumerator,
        &RefreshRequest {
            only_storage_class: true,
            selected: Some(("G:".into(), g_root.clone())),
            include_hidden: false,
        },
    );
    assert_eq!(outcome.volumes.unwrap(), ["G:"]);
    let usb = outcome.usb_devices.unwrap();
    assert_eq!(usb.len(), 1);
    assert_eq!(usb[0].vendor_id, Some(0x1234));
    assert!(matches!(outcome.listing, ListingRefresh::Listed(Ok(_))));

    // Nothing further is pending after the one refresh.
    thread::sleep(Duration::from_millis(300));
    assert!(!coordinator.poll_refresh(Instant::now()));
    assert!(coordinator.is_idle());

    assert_eq!(watcher.stop(), StopOutcome::Confirmed);
}

/// Debounced refresh coordinator — turns a stream of [`DriveEvent`]s into
/// at most one refresh per quiescent period.
///
/// The coordinator is polled from the UI frame loop: `pump` drains the
/// watcher channel and any mount-readiness notices, and `poll_refresh` says
/// when the debounce deadline has passed. All timing takes an explicit `now`
/// so the debounce logic is deterministic under test.
///
/// Insertions are not refreshed straight away. A short-lived thread polls
/// until the new volume's mount root exists (or a deadline expires) and only
/// then requests the refresh, so the listing never races the filesystem
/// mount.
use crate::enumerator::Enumerator;
use crate::error::{EnumerationError, FileOpError};
use crate::fileops;
use crate::model::{DriveAction, DriveEvent, FileEntry, UsbDeviceInfo};
use crate::platform::DeviceInventory;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Quiet period after the last request before a refresh fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// How long an insertion waits for its mount root to appear.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(2);

pub const DEFAULT_READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on events handled per `pump`; the remainder waits for the
/// next frame.
const MAX_EVENTS_PER_PUMP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    pub debounce: Duration,
    pub ready_timeout: Duration,
    pub ready_poll_interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            ready_poll_interval: DEFAULT_READY_POLL_INTERVAL,
        }
    }
}

/// Posted by a mount-wait thread when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountReady {
    pub drive_letter: String,
    /// `false` if the deadline expired before the root became a directory.
    pub accessible: bool,
}

/// Something the UI may want to surface, returned from `pump`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorNotice {
    Event(DriveEvent),
    MountReady(MountReady),
}

pub struct RefreshCoordinator {
    events: Receiver<DriveEvent>,
    inventory: Arc<dyn DeviceInventory>,
    config: RefreshConfig,
    ready_tx: Sender<MountReady>,
    ready_rx: Receiver<MountReady>,
    /// The single debounce deadline; a new request replaces it.
    pending: Option<Instant>,
    waiting_for_mount: usize,
}

impl RefreshCoordinator {
    pub fn new(
        events: Receiver<DriveEvent>,
        inventory: Arc<dyn DeviceInventory>,
        config: RefreshConfig,
    ) -> Self {
        let (ready_tx, ready_rx) = bounded(16);
        Self {
            events,
            inventory,
            config,
            ready_tx,
            ready_rx,
            pending: None,
            waiting_for_mount: 0,
        }
    }

    /// Drain pending watcher events and readiness notices, in arrival order
    /// per source.
    pub fn pump(&mut self, now: Instant) -> Vec<CoordinatorNotice> {
        let mut notices = Vec::new();

        let drained: Vec<DriveEvent> = self.events.try_iter().take(MAX_EVENTS_PER_PUMP).collect();
        for event in drained {
            self.on_event(&event, now);
            notices.push(CoordinatorNotice::Event(event));
        }

        while let Ok(ready) = self.ready_rx.try_recv() {
            self.waiting_for_mount = self.waiting_for_mount.saturating_sub(1);
            if ready.accessible {
                debug!("Refresh: {} is accessible", ready.drive_letter);
            } else {
                warn!(
                    "Refresh: {} not accessible after {:?}, refreshing anyway",
                    ready.drive_letter, self.config.ready_timeout
                );
            }
            self.request_refresh(now);
            notices.push(CoordinatorNotice::MountReady(ready));
        }

        notices
    }

    /// React to one event: removals request a refresh at once, insertions
    /// first wait for the mount on a helper thread.
    pub fn on_event(&mut self, event: &DriveEvent, now: Instant) {
        match event.action {
            DriveAction::Removed => self.request_refresh(now),
            DriveAction::Inserted => self.spawn_mount_wait(&event.drive_letter),
        }
    }

    fn spawn_mount_wait(&mut self, drive_letter: &str) {
        let root = self.inventory.mount_root(drive_letter);
        let drive_letter = drive_letter.to_owned();
        let tx = self.ready_tx.clone();
        let RefreshConfig {
            ready_timeout,
            ready_poll_interval,
            ..
        } = self.config;

        let spawned = thread::Builder::new()
            .name("usbsleuth-mount-wait".into())
            .spawn(move || {
                let accessible = wait_for_mount(&root, ready_timeout, ready_poll_interval);
                let _ = tx.send(MountReady {
                    drive_letter,
                    accessible,
                });
            });

        match spawned {
            Ok(_) => self.waiting_for_mount += 1,
            Err(e) => {
                warn!("Refresh: could not spawn mount wait: {}", e);
                self.request_refresh(Instant::now());
            }
        }
    }

    /// (Re)start the debounce timer.
    pub fn request_refresh(&mut self, now: Instant) {
        if self.pending.is_some() {
            debug!("Refresh: debounce restarted");
        }
        self.pending = Some(now + self.config.debounce);
    }

    /// `true` exactly once per quiescent period, when the debounce deadline
    /// has passed.
    pub fn poll_refresh(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// When the UI should next wake up to call `poll_refresh`.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
    }

    pub fn waiting_for_mount(&self) -> usize {
        self.waiting_for_mount
    }

    /// No refresh pending and no mount wait outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.waiting_for_mount == 0
    }
}

/// Poll until `root` is a directory or `timeout` elapses.
pub fn wait_for_mount(root: &Path, timeout: Duration, poll_interval: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if root.is_dir() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(poll_interval.min(deadline - now));
    }
}

// ── Refresh action ─────────────────────────────────────────────────

/// Inputs for one refresh, taken from the UI's current settings.
#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub only_storage_class: bool,
    /// Currently selected volume and its mount root.
    pub selected: Option<(String, PathBuf)>,
    pub include_hidden: bool,
}

#[derive(Debug)]
pub enum ListingRefresh {
    NotSelected,
    /// The selected volume is no longer present.
    SelectionLost,
    Listed(Result<Vec<FileEntry>, FileOpError>),
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub volumes: Result<Vec<String>, EnumerationError>,
    pub usb_devices: Result<Vec<UsbDeviceInfo>, EnumerationError>,
    pub listing: ListingRefresh,
}

/// Re-enumerate volumes, then USB devices, then re-list the selected mount
/// if it is still present. Each step's failure is returned, not raised.
pub fn run_refresh(enumerator: &Enumerator, request: &RefreshRequest) -> RefreshOutcome {
    let volumes = enumerator.list_removable_volumes();
    let usb_devices = enumerator.list_usb_devices(request.only_storage_class);

    let listing = match (&request.selected, &volumes) {
        (None, _) => ListingRefresh::NotSelected,
        (Some((letter, _)), Ok(present))
            if !present.iter().any(|v| v.eq_ignore_ascii_case(letter)) =>
        {
            ListingRefresh::SelectionLost
        }
        (Some((_, root)), _) => {
            ListingRefresh::Listed(fileops::list_dir(root, request.include_hidden))
        }
    };

    info!(
        "Refresh complete: {} volume(s), {} USB device(s)",
        volumes.as_ref().map_or(0, Vec::len),
        usb_devices.as_ref().map_or(0, Vec::len)
    );

    RefreshOutcome {
        volumes,
        usb_devices,
        listing,
    }
}

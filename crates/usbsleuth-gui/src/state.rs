/// Application state management.
///
/// Centralises all mutable state that the UI reads and writes. Background
/// work (the drive watcher, mount-readiness waits, copy jobs) communicates
/// through channels; state updates happen in the `process_*` methods, which
/// run once per frame on the UI thread.
///
/// The state owns the `DriveWatcher` for the whole session. Dropping the
/// state stops the watcher.
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use usbsleuth_core::enumerator::Enumerator;
use usbsleuth_core::error::FileOpError;
use usbsleuth_core::export;
use usbsleuth_core::fileops::{self, CopyHandle, CopyMessage, CopyProgress};
use usbsleuth_core::model::{DriveAction, FileEntry, UsbDeviceInfo};
use usbsleuth_core::platform::Platform;
use usbsleuth_core::refresh::{
    run_refresh, CoordinatorNotice, ListingRefresh, RefreshConfig, RefreshCoordinator,
    RefreshRequest,
};
use usbsleuth_core::watcher::{event_channel, DriveWatcher, StopOutcome, WatcherConfig};

/// Maximum lines kept in the activity log; the oldest are evicted first.
pub const MAX_LOG_LINES: usize = 500;

/// Maximum copy messages drained from the channel per frame.
///
/// A fast copy of a large file queues one message per MiB; the cap keeps a
/// backlog (e.g. after the window was minimised) from stalling a frame.
const MAX_COPY_MESSAGES_PER_FRAME: usize = 200;

/// How long an insertion/removal notice stays on screen.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(6);

/// Text written by the "Write" action when the text box is left empty.
pub const DEFAULT_WRITE_TEXT: &str = "Hello USB!\nThis text was written to the drive by UsbSleuth.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of the in-app activity log.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// A transient insertion/removal popup.
#[derive(Debug, Clone)]
pub struct Notice {
    pub action: DriveAction,
    pub drive_letter: String,
    pub shown_at: Instant,
}

/// All application state.
pub struct AppState {
    // ── Services ───────────────────────────────────────
    enumerator: Enumerator,
    watcher: DriveWatcher,
    coordinator: RefreshCoordinator,

    // ── Volumes ────────────────────────────────────────
    /// Removable volumes from the last refresh, e.g. `["G:", "H:"]`.
    pub volumes: Vec<String>,
    pub selected_volume: Option<String>,
    /// Mount root of `selected_volume`.
    pub selected_root: Option<PathBuf>,

    // ── USB devices ────────────────────────────────────
    pub usb_devices: Vec<UsbDeviceInfo>,
    /// Restrict the USB table to the mass-storage class.
    pub only_storage: bool,

    // ── Listing ────────────────────────────────────────
    pub entries: Vec<FileEntry>,
    pub include_hidden: bool,

    // ── Forms ──────────────────────────────────────────
    pub write_path: String,
    pub write_text: String,
    pub copy_source: String,
    pub delete_path: String,
    pub export_path: String,
    /// Relative path awaiting delete confirmation.
    pub pending_delete: Option<String>,

    // ── Copy ───────────────────────────────────────────
    pub copy_handle: Option<CopyHandle>,
    pub copy_progress: Option<CopyProgress>,

    // ── Feedback ───────────────────────────────────────
    pub log: VecDeque<LogLine>,
    pub notices: Vec<Notice>,
    /// Message for the modal error dialog (user-initiated failures only).
    pub error_dialog: Option<String>,
    pub refresh_count: u64,
    pub last_refresh: Option<DateTime<Local>>,
    pub user_name: String,

    // ── Theme ──────────────────────────────────────────
    /// `true` = dark mode (default), `false` = light mode.
    pub dark_mode: bool,
    pub show_about: bool,
}

impl AppState {
    /// Create the state with default timings and start the watcher.
    pub fn new(platform: Platform) -> Self {
        Self::with_config(platform, WatcherConfig::default(), RefreshConfig::default())
    }

    pub fn with_config(
        platform: Platform,
        watcher_config: WatcherConfig,
        refresh_config: RefreshConfig,
    ) -> Self {
        let enumerator = Enumerator::new(platform.inventory.clone());
        let (events_tx, events_rx) = event_channel(watcher_config.channel_capacity);
        let mut watcher = DriveWatcher::new(platform.notifier.clone(), events_tx, watcher_config);
        let coordinator =
            RefreshCoordinator::new(events_rx, platform.inventory.clone(), refresh_config);
        watcher.start();

        let mut state = Self {
            enumerator,
            watcher,
            coordinator,
            volumes: Vec::new(),
            selected_volume: None,
            selected_root: None,
            usb_devices: Vec::new(),
            only_storage: true,
            entries: Vec::new(),
            include_hidden: false,
            write_path: "usbsleuth_test.txt".to_owned(),
            write_text: String::new(),
            copy_source: String::new(),
            delete_path: String::new(),
            export_path: "usb_devices.csv".to_owned(),
            pending_delete: None,
            copy_handle: None,
            copy_progress: None,
            log: VecDeque::new(),
            notices: Vec::new(),
            error_dialog: None,
            refresh_count: 0,
            last_refresh: None,
            user_name: current_user(),
            dark_mode: true,
            show_about: false,
        };
        state.push_log(LogLevel::Info, "Drive watcher started");
        state.refresh_now();
        state
    }

    // ── Activity log ───────────────────────────────────

    pub fn push_log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(LogLine {
            at: Local::now(),
            level,
            message: message.into(),
        });
    }

    /// Log a user-initiated failure and raise the error dialog.
    fn report_error(&mut self, what: &str, err: anyhow::Error) {
        let message = format!("{what} failed: {err:#}");
        tracing::warn!("{}", message);
        self.push_log(LogLevel::Error, message.clone());
        self.error_dialog = Some(message);
    }

    // ── Watcher ────────────────────────────────────────

    pub fn watcher_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// The error that ended the watcher's last run, for the status bar.
    pub fn watcher_failure(&self) -> Option<String> {
        self.watcher.last_failure().map(|e| e.to_string())
    }

    /// Restart the watcher after a failure.
    pub fn restart_watcher(&mut self) {
        if self.watcher.is_running() {
            return;
        }
        self.watcher.start();
        self.push_log(LogLevel::Info, "Drive watcher restarted");
    }

    /// Stop the watcher; used on shutdown.
    pub fn stop_watcher(&mut self) -> StopOutcome {
        let outcome = self.watcher.stop();
        match outcome {
            StopOutcome::TimedOut => {
                self.push_log(LogLevel::Warn, "Drive watcher teardown unconfirmed")
            }
            StopOutcome::Confirmed => self.push_log(LogLevel::Info, "Drive watcher stopped"),
            StopOutcome::NotRunning => {}
        }
        outcome
    }

    /// Drain watcher events and mount-readiness notices, then run the
    /// debounced refresh if it is due. Called once per frame.
    ///
    /// Returns `true` if the UI should repaint.
    pub fn process_watcher_messages(&mut self, now: Instant) -> bool {
        let mut repaint = false;

        for notice in self.coordinator.pump(now) {
            repaint = true;
            match notice {
                CoordinatorNotice::Event(event) => {
                    let mount = format!("{}\\", event.drive_letter);
                    let (level, text) = match event.action {
                        DriveAction::Inserted => {
                            (LogLevel::Info, format!("[Inserted] USB drive detected: {mount}"))
                        }
                        DriveAction::Removed => {
                            (LogLevel::Warn, format!("[Removed] USB drive removed: {mount}"))
                        }
                    };
                    self.push_log(level, text);
                    self.notices.push(Notice {
                        action: event.action,
                        drive_letter: event.drive_letter,
                        shown_at: now,
                    });
                }
                CoordinatorNotice::MountReady(ready) if !ready.accessible => {
                    self.push_log(
                        LogLevel::Warn,
                        format!("{} did not become accessible in time", ready.drive_letter),
                    );
                }
                CoordinatorNotice::MountReady(_) => {}
            }
        }

        let before = self.notices.len();
        self.notices
            .retain(|n| now.saturating_duration_since(n.shown_at) < NOTICE_LIFETIME);
        repaint |= self.notices.len() != before;

        if self.coordinator.poll_refresh(now) {
            self.refresh_now();
            repaint = true;
        }
        repaint
    }

    /// How soon the frame loop must run again for pending timers.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        let refresh = self
            .coordinator
            .next_deadline()
            .map(|d| d.saturating_duration_since(now));
        let notice = self
            .notices
            .iter()
            .map(|n| (n.shown_at + NOTICE_LIFETIME).saturating_duration_since(now))
            .min();
        let waiting = (self.coordinator.waiting_for_mount() > 0 || self.copy_handle.is_some())
            .then_some(Duration::from_millis(100));
        [refresh, notice, waiting].into_iter().flatten().min()
    }

    pub fn dismiss_notice(&mut self, index: usize) {
        if index < self.notices.len() {
            self.notices.remove(index);
        }
    }

    // ── Refresh ────────────────────────────────────────

    fn refresh_request(&self) -> RefreshRequest {
        RefreshRequest {
            only_storage_class: self.only_storage,
            selected: self
                .selected_volume
                .clone()
                .zip(self.selected_root.clone()),
            include_hidden: self.include_hidden,
        }
    }

    /// Background refresh: volumes, then USB devices, then the listing.
    /// Failures go to the log only.
    pub fn refresh_now(&mut self) {
        let outcome = run_refresh(&self.enumerator, &self.refresh_request());
        self.refresh_count += 1;
        self.last_refresh = Some(Local::now());

        match outcome.volumes {
            Ok(volumes) => {
                let count = volumes.len();
                self.apply_volumes(volumes);
                self.push_log(
                    LogLevel::Info,
                    format!("Removable drives refreshed: {count}"),
                );
            }
            Err(e) => self.push_log(LogLevel::Error, format!("Drive refresh failed: {e}")),
        }

        match outcome.usb_devices {
            Ok(devices) => {
                let count = devices.len();
                self.usb_devices = devices;
                self.push_log(LogLevel::Info, format!("USB devices refreshed: {count}"));
            }
            Err(e) => self.push_log(LogLevel::Error, format!("USB device refresh failed: {e}")),
        }

        match outcome.listing {
            ListingRefresh::Listed(Ok(entries)) => self.entries = entries,
            ListingRefresh::Listed(Err(e)) => {
                self.entries.clear();
                self.push_log(LogLevel::Warn, format!("Listing failed: {e}"));
            }
            // apply_volumes already moved the selection.
            ListingRefresh::SelectionLost | ListingRefresh::NotSelected => {}
        }
    }

    /// Replace the volume list, keeping the selection if it survived and
    /// otherwise falling back to the first volume.
    fn apply_volumes(&mut self, volumes: Vec<String>) {
        self.volumes = volumes;
        let still_present = self
            .selected_volume
            .as_ref()
            .is_some_and(|sel| self.volumes.iter().any(|v| v.eq_ignore_ascii_case(sel)));
        if still_present {
            return;
        }
        match self.volumes.first().cloned() {
            Some(first) => self.select_volume(&first),
            None => {
                self.selected_volume = None;
                self.selected_root = None;
                self.entries.clear();
            }
        }
    }

    /// User-initiated refresh of the USB table; failures raise the dialog.
    pub fn refresh_usb_devices(&mut self) {
        match self.enumerator.list_usb_devices(self.only_storage) {
            Ok(devices) => {
                self.push_log(
                    LogLevel::Info,
                    format!("USB devices refreshed: {}", devices.len()),
                );
                self.usb_devices = devices;
            }
            Err(e) => self.report_error("USB device refresh", e.into()),
        }
    }

    /// User-initiated refresh of the drive list.
    pub fn refresh_volumes(&mut self) {
        match self.enumerator.list_removable_volumes() {
            Ok(volumes) => {
                let count = volumes.len();
                self.apply_volumes(volumes);
                self.push_log(
                    LogLevel::Info,
                    format!("Removable drives refreshed: {count}"),
                );
            }
            Err(e) => self.report_error("Drive refresh", e.into()),
        }
    }

    // ── Selection & listing ────────────────────────────

    pub fn select_volume(&mut self, letter: &str) {
        let root = self.enumerator.mount_root(letter);
        self.selected_volume = Some(letter.to_owned());
        self.selected_root = Some(root);
        self.reload_listing();
    }

    /// Re-list the selected mount. A vanished mount empties the listing.
    pub fn reload_listing(&mut self) {
        let Some(root) = self.selected_root.clone() else {
            self.entries.clear();
            return;
        };
        match fileops::list_dir(&root, self.include_hidden) {
            Ok(entries) => self.entries = entries,
            Err(e) => {
                self.entries.clear();
                self.push_log(LogLevel::Warn, format!("Listing failed: {e}"));
            }
        }
    }

    /// The selected mount root, checked to still be a directory.
    pub fn require_mount(&self) -> anyhow::Result<PathBuf> {
        let root = self
            .selected_root
            .clone()
            .ok_or_else(|| anyhow!("No drive selected; insert a USB drive and select it first"))?;
        fileops::require_mount(&root)?;
        Ok(root)
    }

    // ── File operations ────────────────────────────────

    /// Open the selected drive's root in the system file manager.
    pub fn open_mount_dir(&mut self) {
        let result = self.require_mount().and_then(|root| {
            file_manager_command(&root)
                .spawn()
                .with_context(|| format!("launching the file manager for {}", root.display()))?;
            Ok(root)
        });
        match result {
            Ok(root) => self.push_log(LogLevel::Info, format!("Opened {}", root.display())),
            Err(e) => self.report_error("Open", e),
        }
    }


    /// Write the text box (or the default text) to `write_path`.
    pub fn write_text_file(&mut self) {
        let result = (|| -> anyhow::Result<PathBuf> {
            let root = self.require_mount()?;
            let text = if self.write_text.is_empty() {
                DEFAULT_WRITE_TEXT
            } else {
                self.write_text.as_str()
            };
            Ok(fileops::write_text(&root, &self.write_path, text)?)
        })();

        match result {
            Ok(target) => {
                self.push_log(LogLevel::Info, format!("Write complete: {}", target.display()));
                self.reload_listing();
            }
            Err(e) => self.report_error("Write", e),
        }
    }

    /// Start copying `copy_source` into the root of the selected drive.
    pub fn start_copy(&mut self) {
        let result = (|| -> anyhow::Result<(PathBuf, PathBuf)> {
            if self.copy_handle.is_some() {
                bail!("A copy is already running");
            }
            let root = self.require_mount()?;
            let src = PathBuf::from(self.copy_source.trim());
            if !src.is_file() {
                bail!("Source is not a file: {}", src.display());
            }
            let dst = fileops::copy_destination(&root, &src)?;
            Ok((src, dst))
        })();

        match result {
            Ok((src, dst)) => {
                self.push_log(
                    LogLevel::Info,
                    format!("Copy started: {} -> {}", src.display(), dst.display()),
                );
                self.copy_progress = None;
                self.copy_handle = Some(fileops::spawn_copy(src, dst));
            }
            Err(e) => self.report_error("Copy", e),
        }
    }

    /// Copy a file chosen in the file picker; `None` means the picker was
    /// dismissed.
    pub fn copy_picked(&mut self, picked: Option<PathBuf>) {
        let Some(src) = picked else {
            return;
        };
        self.copy_source = src.display().to_string();
        self.start_copy();
    }

    pub fn cancel_copy(&mut self) {
        if let Some(ref handle) = self.copy_handle {
            handle.cancel();
        }
    }

    /// Drain copy progress. Called once per frame; returns `true` if the UI
    /// should repaint.
    pub fn process_copy_messages(&mut self) -> bool {
        let Some(handle) = self.copy_handle.as_ref() else {
            return false;
        };

        let mut repaint = false;
        let mut finished = None;
        for msg in handle.progress_rx.try_iter().take(MAX_COPY_MESSAGES_PER_FRAME) {
            repaint = true;
            match msg {
                CopyMessage::Progress(p) => self.copy_progress = Some(p),
                other => {
                    finished = Some(other);
                    break;
                }
            }
        }

        match finished {
            Some(CopyMessage::Complete { src, dst }) => {
                self.copy_handle = None;
                self.push_log(
                    LogLevel::Info,
                    format!("Copy complete: {} -> {}", src.display(), dst.display()),
                );
                self.reload_listing();
            }
            Some(CopyMessage::Failed(e)) => {
                self.copy_handle = None;
                self.copy_progress = None;
                self.report_error("Copy", e.into());
            }
            Some(CopyMessage::Cancelled) => {
                self.copy_handle = None;
                self.copy_progress = None;
                self.push_log(LogLevel::Warn, "Copy cancelled");
            }
            Some(CopyMessage::Progress(_)) | None => {}
        }
        repaint
    }

    /// Ask for confirmation before deleting `delete_path`.
    pub fn request_delete(&mut self) {
        let rel = self.delete_path.trim().to_owned();
        if rel.is_empty() {
            self.report_error("Delete", FileOpError::InvalidPath(rel).into());
            return;
        }
        self.pending_delete = Some(rel);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Perform the confirmed delete.
    pub fn confirm_delete(&mut self) {
        let Some(rel) = self.pending_delete.take() else {
            return;
        };
        let result = self
            .require_mount()
            .and_then(|root| Ok(fileops::delete_path(&root, &rel)?));
        match result {
            Ok(target) => {
                self.push_log(LogLevel::Info, format!("Delete complete: {}", target.display()));
                self.reload_listing();
            }
            Err(e) => self.report_error("Delete", e),
        }
    }

    // ── Export ─────────────────────────────────────────

    /// Export the USB table to `export_path` (CSV or JSON by extension).
    pub fn export_usb_devices(&mut self) {
        let path = PathBuf::from(self.export_path.trim());
        let result = export::export_to_file(&self.usb_devices, &path)
            .with_context(|| format!("writing {}", path.display()));
        match result {
            Ok(format) => self.push_log(
                LogLevel::Info,
                format!(
                    "Exported {} USB device(s) as {} to {}",
                    self.usb_devices.len(),
                    format.label(),
                    path.display()
                ),
            ),
            Err(e) => self.report_error("Export", e),
        }
    }
}

#[cfg(windows)]
fn file_manager_command(dir: &Path) -> Command {
    let mut cmd = Command::new("explorer.exe");
    cmd.arg(dir);
    cmd
}

#[cfg(target_os = "macos")]
fn file_manager_command(dir: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(dir);
    cmd
}

#[cfg(not(any(windows, target_os = "macos")))]
fn file_manager_command(dir: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(dir);
    cmd
}

fn current_user() -> String {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "unknown".to_owned())
}

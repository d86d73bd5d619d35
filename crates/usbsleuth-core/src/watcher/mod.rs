/// Drive watcher — background subscription to volume arrival/removal
/// notifications.
///
/// The OS subscription is created, waited on and released entirely on a
/// dedicated thread. Only start/stop requests and normalized [`DriveEvent`]s
/// cross the thread boundary; events travel over a bounded channel that the
/// UI drains on its own schedule.
///
/// # Usage
///
/// ```ignore
/// let config = WatcherConfig::default();
/// let (tx, rx) = event_channel(config.channel_capacity);
/// let mut watcher = DriveWatcher::new(platform.notifier.clone(), tx, config);
/// watcher.start();
/// // drain rx from the UI loop
/// watcher.stop();
/// ```
///
/// # Cancellation
///
/// `stop` sets the run's cancel flag, then fires the subscription's optional
/// interrupter. The background thread checks the flag at least once per
/// `wait_timeout` even if the interrupter is missing or ineffective, and
/// `stop` never waits longer than its own timeout for the thread to exit.
use crate::error::SubscriptionError;
use crate::model::{DriveAction, DriveEvent};
use crate::platform::{
    DriveType, RawVolumeEvent, VolumeNotifier, VolumeSubscription, WaitInterrupter, WaitOutcome,
    VOLUME_EVENT_ARRIVAL, VOLUME_EVENT_REMOVAL,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Upper bound on one blocking wait, and so on stop-signal latency.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(1000);

/// How long `stop` waits for the background thread before giving up.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Capacity of the watcher → UI event channel.
///
/// Hot-plug traffic is a handful of events per second at most; the UI drains
/// the channel every frame, so a full channel means the UI is stalled and the
/// event is dropped with a warning rather than blocking the watcher.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Create the bounded channel connecting a watcher to its consumer.
pub fn event_channel(capacity: usize) -> (Sender<DriveEvent>, Receiver<DriveEvent>) {
    bounded(capacity.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub wait_timeout: Duration,
    pub stop_timeout: Duration,
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Lifecycle of a [`DriveWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopping,
}

/// How a `stop` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The background thread exited and released its subscription.
    Confirmed,
    /// The thread did not exit before the deadline; teardown is unconfirmed.
    TimedOut,
    /// Nothing was running.
    NotRunning,
}

type InterrupterSlot = Arc<Mutex<Option<Box<dyn WaitInterrupter>>>>;

/// Per-run resources. A fresh set is created by every `start`, so a run that
/// outlives a timed-out `stop` keeps its own (already set) cancel flag.
struct RunHandle {
    cancel: Arc<AtomicBool>,
    interrupter: InterrupterSlot,
    /// Disconnects when the background thread has exited.
    exited: Receiver<()>,
    thread: JoinHandle<()>,
}

/// Handle owning the watcher thread for the lifetime of the application.
pub struct DriveWatcher {
    notifier: Arc<dyn VolumeNotifier>,
    events: Sender<DriveEvent>,
    config: WatcherConfig,
    state: WatcherState,
    run: Option<RunHandle>,
    failure: Arc<Mutex<Option<SubscriptionError>>>,
}

impl DriveWatcher {
    pub fn new(
        notifier: Arc<dyn VolumeNotifier>,
        events: Sender<DriveEvent>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            notifier,
            events,
            config,
            state: WatcherState::Idle,
            run: None,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Current lifecycle state. A run whose thread ended on its own (for
    /// example after a subscription failure) reports `Idle`.
    pub fn state(&self) -> WatcherState {
        match (self.state, &self.run) {
            (WatcherState::Running, Some(run)) if run.thread.is_finished() => WatcherState::Idle,
            (WatcherState::Running, None) => WatcherState::Idle,
            (state, _) => state,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == WatcherState::Running
    }

    /// The error that ended the most recent run, if any.
    pub fn last_failure(&self) -> Option<SubscriptionError> {
        self.failure.lock().clone()
    }

    /// Launch the background thread. Returns immediately; a no-op while a
    /// run is already active.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Watcher: start ignored, already running");
            return;
        }

        // Reap a run that ended by itself; its thread has already finished.
        if let Some(run) = self.run.take() {
            let _ = run.thread.join();
        }
        *self.failure.lock() = None;

        let cancel = Arc::new(AtomicBool::new(false));
        let interrupter: InterrupterSlot = Arc::new(Mutex::new(None));
        let (exit_guard, exited) = bounded::<()>(0);

        let ctx = RunContext {
            notifier: Arc::clone(&self.notifier),
            events: self.events.clone(),
            cancel: Arc::clone(&cancel),
            interrupter: Arc::clone(&interrupter),
            failure: Arc::clone(&self.failure),
            wait_timeout: self.config.wait_timeout,
        };

        let spawned = std::thread::Builder::new()
            .name("usbsleuth-watcher".to_owned())
            .spawn(move || {
                let _exit_guard = exit_guard;
                ctx.run();
            });

        match spawned {
            Ok(thread) => {
                self.run = Some(RunHandle {
                    cancel,
                    interrupter,
                    exited,
                    thread,
                });
                self.state = WatcherState::Running;
                info!("Watcher: started");
            }
            Err(e) => {
                error!("Watcher: failed to spawn thread: {}", e);
                *self.failure.lock() = Some(SubscriptionError::Connect(format!(
                    "failed to spawn watcher thread: {e}"
                )));
                self.state = WatcherState::Idle;
            }
        }
    }

    /// Stop with the configured timeout.
    pub fn stop(&mut self) -> StopOutcome {
        self.stop_with_timeout(self.config.stop_timeout)
    }

    /// Signal the background thread to exit and wait up to `timeout` for it.
    ///
    /// Always returns by the deadline. On `TimedOut` the thread is detached
    /// and may still hold its subscription for up to one wait interval.
    pub fn stop_with_timeout(&mut self, timeout: Duration) -> StopOutcome {
        let Some(run) = self.run.take() else {
            self.state = WatcherState::Idle;
            return StopOutcome::NotRunning;
        };
        self.state = WatcherState::Stopping;

        run.cancel.store(true, Ordering::SeqCst);
        if let Some(interrupter) = run.interrupter.lock().take() {
            interrupter.interrupt();
        }

        let outcome = match run.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = run.thread.join();
                info!("Watcher: stopped");
                StopOutcome::Confirmed
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Watcher: thread did not exit within {:?}; teardown unconfirmed",
                    timeout
                );
                StopOutcome::TimedOut
            }
        };

        self.state = WatcherState::Idle;
        outcome
    }
}

impl Drop for DriveWatcher {
    fn drop(&mut self) {
        if self.run.is_some() {
            self.stop();
        }
    }
}

/// Everything the background thread needs, moved into it at spawn.
struct RunContext {
    notifier: Arc<dyn VolumeNotifier>,
    events: Sender<DriveEvent>,
    cancel: Arc<AtomicBool>,
    interrupter: InterrupterSlot,
    failure: Arc<Mutex<Option<SubscriptionError>>>,
    wait_timeout: Duration,
}

impl RunContext {
    fn run(self) {
        let mut subscription = match self.notifier.subscribe() {
            Ok(s) => s,
            Err(e) => {
                error!("Watcher: {}", e);
                *self.failure.lock() = Some(e);
                return;
            }
        };
        *self.interrupter.lock() = subscription.interrupter();
        debug!("Watcher: subscribed");

        while !self.cancel.load(Ordering::SeqCst) {
            match subscription.next_event(self.wait_timeout) {
                Ok(WaitOutcome::Timeout) | Ok(WaitOutcome::Interrupted) => continue,
                Ok(WaitOutcome::Event(raw)) => {
                    let Some(event) = normalize(&raw, subscription.as_mut()) else {
                        continue;
                    };
                    if !self.deliver(event) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Watcher: notification channel failed: {}", e);
                    *self.failure.lock() = Some(e);
                    break;
                }
            }
        }

        self.interrupter.lock().take();
        drop(subscription);
        debug!("Watcher: subscription released");
    }

    /// Hand one event to the consumer. Returns `false` once the consumer
    /// is gone.
    fn deliver(&self, event: DriveEvent) -> bool {
        debug!("Watcher: {} {}", event.action, event.drive_letter);
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Watcher: event channel full, dropping {} {}",
                    event.action, event.drive_letter
                );
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Watcher: consumer disconnected");
                false
            }
        }
    }
}

/// Decode a raw notification into a [`DriveEvent`].
///
/// Returns `None` for an absent or too-short drive name and for event types
/// other than arrival and removal.
pub fn decode(raw: &RawVolumeEvent) -> Option<DriveEvent> {
    let name = raw.drive_name.as_deref()?;
    let drive_letter: String = name.chars().take(2).collect();
    if drive_letter.chars().count() < 2 {
        return None;
    }

    let action = match raw.event_type {
        VOLUME_EVENT_ARRIVAL => DriveAction::Inserted,
        VOLUME_EVENT_REMOVAL => DriveAction::Removed,
        _ => return None,
    };

    Some(DriveEvent {
        action,
        drive_letter,
    })
}

/// Decode and apply the removable-storage filter.
///
/// Insertions are confirmed against the live drive type so optical and
/// network volumes reported on the same channel are dropped. Removals pass
/// unchecked: the volume may already be gone from the inventory.
fn normalize(raw: &RawVolumeEvent, subscription: &mut dyn VolumeSubscription) -> Option<DriveEvent> {
    let event = decode(raw)?;
    if event.action == DriveAction::Removed {
        return Some(event);
    }

    match subscription.drive_type(&event.drive_letter) {
        Ok(DriveType::Removable) => Some(event),
        Ok(other) => {
            debug!(
                "Watcher: ignoring arrival of {} ({})",
                event.drive_letter,
                other.label()
            );
            None
        }
        Err(e) => {
            debug!("Watcher: drive type query for {} failed: {}", event.drive_letter, e);
            None
        }
    }
}

/// In-memory platform — a device inventory and volume notifier driven by a
/// [`Simulator`] controller instead of real hardware.
///
/// Used by the test suites and as the backend on hosts without a native
/// implementation.
///
/// ```ignore
/// let (platform, sim) = SimulatedPlatform::new();
/// sim.insert_volume("G:", DriveType::Removable, "/tmp/g");
/// ```
use super::{
    DeviceInventory, DriveType, Platform, RawVolumeEvent, VolumeNotifier, VolumeSubscription,
    WaitInterrupter, WaitOutcome, VOLUME_EVENT_ARRIVAL, VOLUME_EVENT_REMOVAL,
};
use crate::error::{EnumerationError, SubscriptionError};
use crate::model::{default_mount_root, PnpEntity};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct SimVolume {
    letter: String,
    drive_type: DriveType,
    mount: PathBuf,
}

#[derive(Default)]
struct SimState {
    volumes: Vec<SimVolume>,
    usb: Vec<PnpEntity>,
    inventory_offline: bool,
    subscribe_error: Option<String>,
    /// Makes every wait sleep this long, ignoring timeout and interrupts.
    wait_stall: Option<Duration>,
}

struct Shared {
    state: Mutex<SimState>,
    events_tx: Sender<RawVolumeEvent>,
    events_rx: Receiver<RawVolumeEvent>,
    live_subscriptions: AtomicUsize,
    subscriptions_opened: AtomicUsize,
}

impl Shared {
    fn lookup_drive_type(&self, drive_letter: &str) -> Result<DriveType, EnumerationError> {
        let state = self.state.lock();
        if state.inventory_offline {
            return Err(EnumerationError::Unavailable(
                "simulated inventory offline".into(),
            ));
        }
        Ok(state
            .volumes
            .iter()
            .find(|v| v.letter.eq_ignore_ascii_case(drive_letter))
            .map(|v| v.drive_type)
            .unwrap_or(DriveType::Unknown))
    }
}

/// Simulated device inventory and notification source.
#[derive(Clone)]
pub struct SimulatedPlatform {
    shared: Arc<Shared>,
}

/// Controller handle used to script hardware changes.
#[derive(Clone)]
pub struct Simulator {
    shared: Arc<Shared>,
}

impl SimulatedPlatform {
    pub fn new() -> (Self, Simulator) {
        let (events_tx, events_rx) = unbounded();
        let shared = Arc::new(Shared {
            state: Mutex::new(SimState::default()),
            events_tx,
            events_rx,
            live_subscriptions: AtomicUsize::new(0),
            subscriptions_opened: AtomicUsize::new(0),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Simulator { shared },
        )
    }

    /// Wrap this simulator as an application [`Platform`].
    pub fn platform(self) -> Platform {
        let this = Arc::new(self);
        Platform::new(this.clone(), this)
    }
}

impl Simulator {
    /// Attach a volume and emit an arrival notification for it.
    pub fn insert_volume(&self, letter: &str, drive_type: DriveType, mount: impl AsRef<Path>) {
        {
            let mut state = self.shared.state.lock();
            state.volumes.retain(|v| !v.letter.eq_ignore_ascii_case(letter));
            state.volumes.push(SimVolume {
                letter: letter.to_owned(),
                drive_type,
                mount: mount.as_ref().to_path_buf(),
            });
        }
        self.emit(RawVolumeEvent {
            event_type: VOLUME_EVENT_ARRIVAL,
            drive_name: Some(format!("{letter}\\")),
        });
    }

    /// Detach a volume and emit a removal notification for it.
    pub fn remove_volume(&self, letter: &str) {
        self.shared
            .state
            .lock()
            .volumes
            .retain(|v| !v.letter.eq_ignore_ascii_case(letter));
        self.emit(RawVolumeEvent {
            event_type: VOLUME_EVENT_REMOVAL,
            drive_name: Some(format!("{letter}\\")),
        });
    }

    /// Inject a raw notification without touching the inventory.
    pub fn emit(&self, event: RawVolumeEvent) {
        let _ = self.shared.events_tx.send(event);
    }

    pub fn add_usb_entity(&self, entity: PnpEntity) {
        self.shared.state.lock().usb.push(entity);
    }

    /// Make every inventory query fail with [`EnumerationError::Unavailable`].
    pub fn set_inventory_offline(&self, offline: bool) {
        self.shared.state.lock().inventory_offline = offline;
    }

    /// Make subsequent `subscribe` calls fail with the given message.
    pub fn fail_subscriptions(&self, message: Option<&str>) {
        self.shared.state.lock().subscribe_error = message.map(str::to_owned);
    }

    /// Make every wait block for `stall`, ignoring its timeout and interrupts.
    pub fn set_wait_stall(&self, stall: Option<Duration>) {
        self.shared.state.lock().wait_stall = stall;
    }

    /// Subscriptions currently open (created and not yet dropped).
    pub fn live_subscriptions(&self) -> usize {
        self.shared.live_subscriptions.load(Ordering::SeqCst)
    }

    /// Subscriptions opened since the platform was created.
    pub fn subscriptions_opened(&self) -> usize {
        self.shared.subscriptions_opened.load(Ordering::SeqCst)
    }
}

impl DeviceInventory for SimulatedPlatform {
    fn removable_volumes(&self) -> Result<Vec<String>, EnumerationError> {
        let state = self.shared.state.lock();
        if state.inventory_offline {
            return Err(EnumerationError::Unavailable(
                "simulated inventory offline".into(),
            ));
        }
        let mut letters: Vec<String> = state
            .volumes
            .iter()
            .filter(|v| v.drive_type == DriveType::Removable)
            .map(|v| v.letter.clone())
            .collect();
        letters.sort();
        Ok(letters)
    }

    fn drive_type(&self, drive_letter: &str) -> Result<DriveType, EnumerationError> {
        self.shared.lookup_drive_type(drive_letter)
    }

    fn usb_entities(&self) -> Result<Vec<PnpEntity>, EnumerationError> {
        let state = self.shared.state.lock();
        if state.inventory_offline {
            return Err(EnumerationError::Unavailable(
                "simulated inventory offline".into(),
            ));
        }
        Ok(state.usb.clone())
    }

    fn mount_root(&self, drive_letter: &str) -> PathBuf {
        self.shared
            .state
            .lock()
            .volumes
            .iter()
            .find(|v| v.letter.eq_ignore_ascii_case(drive_letter))
            .map(|v| v.mount.clone())
            .unwrap_or_else(|| default_mount_root(drive_letter))
    }
}

impl VolumeNotifier for SimulatedPlatform {
    fn subscribe(&self) -> Result<Box<dyn VolumeSubscription>, SubscriptionError> {
        if let Some(msg) = self.shared.state.lock().subscribe_error.clone() {
            return Err(SubscriptionError::Connect(msg));
        }
        let (interrupt_tx, interrupt_rx) = bounded(1);
        self.shared.live_subscriptions.fetch_add(1, Ordering::SeqCst);
        self.shared.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimSubscription {
            shared: Arc::clone(&self.shared),
            events: self.shared.events_rx.clone(),
            interrupt_tx,
            interrupt_rx,
        }))
    }
}

struct SimSubscription {
    shared: Arc<Shared>,
    events: Receiver<RawVolumeEvent>,
    interrupt_tx: Sender<()>,
    interrupt_rx: Receiver<()>,
}

impl VolumeSubscription for SimSubscription {
    fn next_event(&mut self, timeout: Duration) -> Result<WaitOutcome, SubscriptionError> {
        let stall = self.shared.state.lock().wait_stall;
        if let Some(stall) = stall {
            std::thread::sleep(stall);
            return Ok(WaitOutcome::Timeout);
        }

        select! {
            recv(self.events) -> msg => match msg {
                Ok(event) => Ok(WaitOutcome::Event(event)),
                Err(_) => Err(SubscriptionError::Closed),
            },
            recv(self.interrupt_rx) -> _ => Ok(WaitOutcome::Interrupted),
            default(timeout) => Ok(WaitOutcome::Timeout),
        }
    }

    fn drive_type(&mut self, drive_letter: &str) -> Result<DriveType, EnumerationError> {
        self.shared.lookup_drive_type(drive_letter)
    }

    fn interrupter(&self) -> Option<Box<dyn WaitInterrupter>> {
        Some(Box::new(SimInterrupter(self.interrupt_tx.clone())))
    }
}

impl Drop for SimSubscription {
    fn drop(&mut self) {
        self.shared.live_subscriptions.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SimInterrupter(Sender<()>);

impl WaitInterrupter for SimInterrupter {
    fn interrupt(&self) {
        let _ = self.0.try_send(());
    }
}

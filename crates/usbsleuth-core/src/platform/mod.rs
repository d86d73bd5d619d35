/// Platform seams — device inventory queries and volume-change subscriptions.
///
/// The enumerator and watcher only talk to the OS through the traits in this
/// module. `win32` provides the real implementation; `simulated` is an
/// in-memory stand-in used by tests and on non-Windows hosts.
pub mod simulated;
#[cfg(windows)]
pub mod win32;

use crate::error::{EnumerationError, SubscriptionError};
use crate::model::{default_mount_root, PnpEntity};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Windows `Win32_VolumeChangeEvent` event-type codes.
pub const VOLUME_EVENT_CONFIG_CHANGED: u16 = 1;
pub const VOLUME_EVENT_ARRIVAL: u16 = 2;
pub const VOLUME_EVENT_REMOVAL: u16 = 3;
pub const VOLUME_EVENT_DOCKING: u16 = 4;

/// Drive type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveType {
    Fixed,
    Removable,
    Network,
    CdRom,
    RamDisk,
    Unknown,
}

impl DriveType {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fixed => "Fixed",
            Self::Removable => "Removable",
            Self::Network => "Network",
            Self::CdRom => "CD-ROM",
            Self::RamDisk => "RAM disk",
            Self::Unknown => "Unknown",
        }
    }
}

/// A volume-change notification exactly as the OS delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVolumeEvent {
    pub event_type: u16,
    /// Root of the affected volume, e.g. `G:\`. May be absent or garbage.
    pub drive_name: Option<String>,
}

/// Result of one bounded wait on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Event(RawVolumeEvent),
    Timeout,
    /// The wait was cut short by a [`WaitInterrupter`].
    Interrupted,
}

/// Read-only, synchronous snapshot queries against the device inventory.
pub trait DeviceInventory: Send + Sync {
    /// Drive letters (`"G:"`) of every volume currently classed as removable.
    fn removable_volumes(&self) -> Result<Vec<String>, EnumerationError>;

    /// Type of a single drive letter.
    fn drive_type(&self, drive_letter: &str) -> Result<DriveType, EnumerationError>;

    /// Every USB-attached PnP entity, unfiltered by class.
    fn usb_entities(&self) -> Result<Vec<PnpEntity>, EnumerationError>;

    /// Filesystem path at which a volume's contents are accessible.
    fn mount_root(&self, drive_letter: &str) -> PathBuf {
        default_mount_root(drive_letter)
    }
}

/// Factory for volume-change subscriptions.
///
/// `subscribe` is always called on the watcher thread, and the returned
/// subscription is dropped on that same thread.
pub trait VolumeNotifier: Send + Sync {
    fn subscribe(&self) -> Result<Box<dyn VolumeSubscription>, SubscriptionError>;
}

/// A live, thread-affine notification channel. Dropping it releases the
/// OS subscription and its service connection.
pub trait VolumeSubscription {
    /// Block for at most `timeout` waiting for the next notification.
    ///
    /// `Err` means the channel is unusable and the watcher must exit.
    fn next_event(&mut self, timeout: Duration) -> Result<WaitOutcome, SubscriptionError>;

    /// Re-query the type of one drive through this subscription's connection.
    fn drive_type(&mut self, drive_letter: &str) -> Result<DriveType, EnumerationError>;

    /// Optional handle that can cut a blocked `next_event` short from
    /// another thread.
    fn interrupter(&self) -> Option<Box<dyn WaitInterrupter>> {
        None
    }
}

/// Best-effort cancellation of an in-flight wait.
pub trait WaitInterrupter: Send + Sync {
    fn interrupt(&self);
}

/// The pair of platform services the application is composed from.
#[derive(Clone)]
pub struct Platform {
    pub inventory: Arc<dyn DeviceInventory>,
    pub notifier: Arc<dyn VolumeNotifier>,
}

impl Platform {
    pub fn new(inventory: Arc<dyn DeviceInventory>, notifier: Arc<dyn VolumeNotifier>) -> Self {
        Self {
            inventory,
            notifier,
        }
    }
}

/// The platform backing this host: the Windows backend on Windows, an
/// empty simulated platform elsewhere.
pub fn native() -> Platform {
    #[cfg(windows)]
    {
        win32::platform()
    }
    #[cfg(not(windows))]
    {
        tracing::info!("No native device backend on this OS; using the simulated platform");
        simulated::SimulatedPlatform::new().0.platform()
    }
}

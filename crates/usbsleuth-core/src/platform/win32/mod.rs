/// Windows backend.
///
/// - [`drives`] — volume and drive-type queries via `GetLogicalDriveStringsW`
///   and `GetDriveTypeW`.
/// - [`usb`] — USB PnP inventory through WMI.
/// - [`notify`] — `WM_DEVICECHANGE` volume notifications on a hidden window
///   owned by the watcher thread.
pub mod drives;
pub mod notify;
pub mod usb;

use super::{DeviceInventory, DriveType, Platform};
use crate::error::EnumerationError;
use crate::model::PnpEntity;
use std::sync::Arc;

/// Device inventory backed by the Win32 API and WMI.
pub struct WindowsInventory;

impl DeviceInventory for WindowsInventory {
    fn removable_volumes(&self) -> Result<Vec<String>, EnumerationError> {
        drives::removable_volumes()
    }

    fn drive_type(&self, drive_letter: &str) -> Result<DriveType, EnumerationError> {
        Ok(drives::drive_type(drive_letter))
    }

    fn usb_entities(&self) -> Result<Vec<PnpEntity>, EnumerationError> {
        usb::query_usb_entities()
    }
}

/// The Windows platform: Win32/WMI inventory plus device-change notifier.
pub fn platform() -> Platform {
    Platform::new(Arc::new(WindowsInventory), Arc::new(notify::DeviceChangeNotifier))
}

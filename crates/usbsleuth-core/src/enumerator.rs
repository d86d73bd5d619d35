/// Device enumerator — on-demand snapshots of removable volumes and USB
/// devices.
///
/// Every call queries the inventory afresh; nothing is cached or diffed
/// between calls. Callers re-query after each hot-plug event.
use crate::error::EnumerationError;
use crate::model::UsbDeviceInfo;
use crate::platform::DeviceInventory;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Enumerator {
    inventory: Arc<dyn DeviceInventory>,
}

impl Enumerator {
    pub fn new(inventory: Arc<dyn DeviceInventory>) -> Self {
        Self { inventory }
    }

    /// Drive letters of all removable volumes, e.g. `["G:", "H:"]`.
    pub fn list_removable_volumes(&self) -> Result<Vec<String>, EnumerationError> {
        let volumes = self.inventory.removable_volumes()?;
        debug!("Enumerated {} removable volume(s)", volumes.len());
        Ok(volumes)
    }

    /// USB-attached devices, optionally restricted to the mass-storage class.
    ///
    /// Rows without a USB device path are skipped individually.
    pub fn list_usb_devices(
        &self,
        only_storage_class: bool,
    ) -> Result<Vec<UsbDeviceInfo>, EnumerationError> {
        let entities = self.inventory.usb_entities()?;
        let total = entities.len();

        let devices: Vec<UsbDeviceInfo> = entities
            .into_iter()
            .filter(|e| match e.device_id.as_deref() {
                Some(id) if is_usb_path(id) => true,
                _ => {
                    debug!("Skipping non-USB inventory row {:?}", e.name);
                    false
                }
            })
            .filter(|e| !only_storage_class || e.is_storage_class())
            .map(UsbDeviceInfo::from_entity)
            .collect();

        debug!(
            "Enumerated {} of {} USB device(s) (storage only: {})",
            devices.len(),
            total,
            only_storage_class
        );
        Ok(devices)
    }

    /// Filesystem root of a volume.
    pub fn mount_root(&self, drive_letter: &str) -> PathBuf {
        self.inventory.mount_root(drive_letter)
    }
}

fn is_usb_path(device_id: &str) -> bool {
    device_id
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("USB"))
}

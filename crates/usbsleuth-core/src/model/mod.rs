/// Data model shared by the enumerator, watcher and file operations.
pub mod drive_event;
pub mod file_entry;
pub mod size;
pub mod usb_device;

pub use drive_event::{default_mount_root, DriveAction, DriveEvent};
pub use file_entry::FileEntry;
pub use usb_device::{PnpEntity, UsbDeviceInfo};

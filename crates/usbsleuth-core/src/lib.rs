/// UsbSleuth Core — removable-drive enumeration, hot-plug watching and
/// file operations.
///
/// This crate contains all business logic with zero UI dependencies.
/// Everything OS-specific sits behind the traits in [`platform`], so the
/// watcher and coordinator run unchanged against the simulated backend.
///
/// # Modules
///
/// - [`model`] — Drive events, USB identity records, listing entries, formatting.
/// - [`platform`] — Device inventory and volume-notification seams, Windows and simulated backends.
/// - [`enumerator`] — On-demand snapshots of removable volumes and USB devices.
/// - [`watcher`] — Background volume hot-plug watcher with bounded-time stop.
/// - [`refresh`] — Debounced refresh coordinator and the refresh action.
/// - [`fileops`] — Write, copy with progress, delete and list against a mount.
/// - [`export`] — CSV/JSON export of the USB inventory.
pub mod enumerator;
pub mod error;
pub mod export;
pub mod fileops;
pub mod model;
pub mod platform;
pub mod refresh;
pub mod watcher;

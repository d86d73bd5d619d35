/// UsbSleuth GUI — egui-based desktop frontend.
///
/// This crate contains all UI code. Device access, watching and file
/// operations live in `usbsleuth-core`.
pub mod app;
pub mod icon;
pub mod panels;
pub mod state;
pub mod widgets;

pub use app::{UsbSleuthApp, UsbSleuthState};

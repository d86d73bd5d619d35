/// Content panels composed by the main window.
pub mod actions_panel;
pub mod files_panel;
pub mod log_panel;
pub mod usb_panel;

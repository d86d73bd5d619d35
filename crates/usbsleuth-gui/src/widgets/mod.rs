/// UI widgets for UsbSleuth.

pub mod drive_picker;
pub mod status_bar;
pub mod toolbar;

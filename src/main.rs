//! UsbSleuth — removable-storage inspector for Windows.
//!
//! Thin binary entry point. All logic lives in the `usbsleuth-core`
//! and `usbsleuth-gui` crates.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // `RUST_LOG` overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("UsbSleuth starting");

    let icon = usbsleuth_gui::icon::generate_icon(64);

    // Build application state before opening the window so the first frame
    // already shows the drive list.
    let state = usbsleuth_gui::UsbSleuthState::build(usbsleuth_core::platform::native());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("UsbSleuth -- Removable Storage Inspector")
            .with_inner_size([1200.0, 780.0])
            .with_min_inner_size([820.0, 520.0])
            .with_icon(icon)
            .with_transparent(true),
        ..Default::default()
    };

    eframe::run_native(
        "UsbSleuth",
        options,
        Box::new(|cc| {
            Ok(Box::new(usbsleuth_gui::UsbSleuthApp::with_state(
                cc, state,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))?;

    tracing::info!("UsbSleuth exited");
    Ok(())
}

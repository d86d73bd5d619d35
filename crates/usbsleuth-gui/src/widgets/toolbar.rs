/// Top action bar -- refresh controls, watcher state, theme toggle, and branding.
use crate::state::AppState;
use egui::Ui;

/// Draw the toolbar.
pub fn toolbar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        // App title -- uses the egui accent/hyperlink colour so it adapts to
        // dark and light mode automatically.
        ui.label(
            egui::RichText::new("🔌 UsbSleuth")
                .size(18.0)
                .strong()
                .color(ui.visuals().hyperlink_color),
        );

        ui.separator();

        if ui
            .button("🔄 Drives")
            .on_hover_text("Re-enumerate removable drives")
            .clicked()
        {
            state.refresh_volumes();
        }

        if ui
            .button("🔄 USB devices")
            .on_hover_text("Re-query the USB device inventory")
            .clicked()
        {
            state.refresh_usb_devices();
        }

        ui.separator();

        let can_export = !state.usb_devices.is_empty();
        ui.add(
            egui::TextEdit::singleline(&mut state.export_path)
                .desired_width(160.0)
                .hint_text("usb_devices.csv"),
        );
        if ui
            .add_enabled(can_export, egui::Button::new("📤 Export"))
            .on_hover_text(if can_export {
                "Export the USB table to CSV or JSON (by file extension)"
            } else {
                "No USB devices to export"
            })
            .clicked()
        {
            state.export_usb_devices();
        }

        // Right-aligned controls.
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("ℹ").on_hover_text("About UsbSleuth").clicked() {
                state.show_about = true;
            }

            // ── Theme toggle (☀ light / 🌙 dark) ──────────────────
            let theme_label = if state.dark_mode { "☀" } else { "🌙" };
            let theme_tip = if state.dark_mode {
                "Switch to light mode"
            } else {
                "Switch to dark mode"
            };
            if ui.button(theme_label).on_hover_text(theme_tip).clicked() {
                state.dark_mode = !state.dark_mode;
            }

            ui.separator();

            // ── Watcher indicator ─────────────────────────────────
            if state.watcher_running() {
                ui.label(
                    egui::RichText::new("👁 Watching")
                        .color(egui::Color32::from_rgb(0xa6, 0xe3, 0xa1)),
                )
                .on_hover_text("Listening for USB drive insertion and removal");
            } else {
                let tip = state
                    .watcher_failure()
                    .unwrap_or_else(|| "The drive watcher is not running".to_owned());
                if ui
                    .button(
                        egui::RichText::new("👁 Restart watcher")
                            .color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)),
                    )
                    .on_hover_text(tip)
                    .clicked()
                {
                    state.restart_watcher();
                }
            }
        });
    });
}

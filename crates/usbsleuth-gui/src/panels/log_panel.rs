/// Activity log panel.
///
/// A scrolling, timestamped record of hot-plug events, refreshes and file
/// operations, newest at the bottom.
use crate::state::{AppState, LogLevel};
use egui::Ui;

/// Draw the activity log panel.
pub fn log_panel(ui: &mut Ui, state: &mut AppState) {
    ui.vertical(|ui| {
        // ── Header row ────────────────────────────────────────────────────
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("📜 Activity")
                    .strong()
                    .color(ui.visuals().hyperlink_color),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .button("🗑 Clear")
                    .on_hover_text("Clear the activity log")
                    .clicked()
                {
                    state.log.clear();
                }
            });
        });

        ui.separator();

        // ── Content ──────────────────────────────────────────────────────
        let muted = ui.visuals().weak_text_color();
        let text_col = ui.visuals().text_color();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &state.log {
                    let color = match line.level {
                        LogLevel::Info => text_col,
                        LogLevel::Warn => egui::Color32::from_rgb(0xfa, 0xb3, 0x87),
                        LogLevel::Error => egui::Color32::from_rgb(0xf3, 0x8b, 0xa8),
                    };
                    ui.horizontal(|ui| {
                        ui.add_sized(
                            [64.0, 16.0],
                            egui::Label::new(
                                egui::RichText::new(line.at.format("%H:%M:%S").to_string())
                                    .size(11.0)
                                    .color(muted),
                            ),
                        );
                        ui.label(egui::RichText::new(&line.message).size(12.0).color(color));
                    });
                }
            });
    });
}

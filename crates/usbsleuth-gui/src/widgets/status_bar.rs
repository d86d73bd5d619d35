/// Bottom status bar — watcher state, selection, copy progress and refresh count.
use crate::state::AppState;
use egui::Ui;
use usbsleuth_core::model::size::{format_size, format_speed};

/// Draw the status bar at the bottom of the window.
pub fn status_bar(ui: &mut Ui, state: &AppState) {
    // Extract theme-adaptive colours once for this frame.
    let color_accent = ui.visuals().hyperlink_color;
    let color_weak = ui.visuals().weak_text_color();
    let color_normal = ui.visuals().text_color();
    let color_warning = egui::Color32::from_rgb(0xfa, 0xb3, 0x87);
    let color_success = egui::Color32::from_rgb(0xa6, 0xe3, 0xa1);

    ui.horizontal(|ui| {
        if state.watcher_running() {
            ui.label(
                egui::RichText::new("\u{2713} Watching for drives")
                    .size(12.0)
                    .color(color_success),
            );
        } else {
            ui.label(
                egui::RichText::new("\u{26a0} Watcher stopped")
                    .size(12.0)
                    .color(color_warning),
            );
        }

        ui.separator();

        let selection = match (&state.selected_volume, &state.selected_root) {
            (Some(letter), Some(root)) => format!("{} ({})", letter, root.display()),
            _ => "No drive selected".to_owned(),
        };
        ui.label(
            egui::RichText::new(truncate_path(&selection, 60))
                .size(12.0)
                .color(color_normal),
        );

        if let Some(ref handle) = state.copy_handle {
            ui.separator();
            ui.spinner();
            let name = handle
                .dst
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = match state.copy_progress {
                Some(p) => format!(
                    "Copying {} {}% · {} / {} · {}",
                    name,
                    p.percent(),
                    format_size(p.bytes_copied),
                    format_size(p.total_bytes),
                    format_speed(p.speed_bytes_per_second)
                ),
                None => format!("Copying {}...", name),
            };
            ui.label(egui::RichText::new(text).size(12.0).color(color_accent));
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(
                egui::RichText::new(format!("User: {}", state.user_name))
                    .size(11.0)
                    .color(color_weak),
            );
            ui.separator();
            if let Some(at) = state.last_refresh {
                ui.label(
                    egui::RichText::new(format!(
                        "{} refreshes · last {}",
                        state.refresh_count,
                        at.format("%H:%M:%S")
                    ))
                    .size(11.0)
                    .color(color_weak),
                );
            }
        });
    });
}

/// Truncate a string to fit within `max_len` characters, replacing the
/// middle with "..." if needed.
fn truncate_path(path: &str, max_len: usize) -> String {
    let count = path.chars().count();
    if count <= max_len {
        return path.to_string();
    }
    let half = (max_len - 3) / 2;
    let head: String = path.chars().take(half).collect();
    let tail: String = path.chars().skip(count - half).collect();
    format!("{}...{}", head, tail)
}

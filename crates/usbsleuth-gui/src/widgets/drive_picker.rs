/// Removable drive picker.
///
/// Displays one card per removable volume and lets the user select the
/// drive that file operations act on.
use crate::state::AppState;
use egui::{Sense, Ui, Vec2};

/// Draw the drive picker panel.
pub fn drive_picker(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Removable drives");
    ui.add_space(4.0);

    if state.volumes.is_empty() {
        ui.label(
            egui::RichText::new("No removable drive detected. Insert a USB drive.")
                .size(12.0)
                .color(ui.visuals().weak_text_color()),
        );
        return;
    }

    let mut new_selection = None;

    for letter in &state.volumes {
        let is_selected = state
            .selected_volume
            .as_deref()
            .is_some_and(|sel| sel.eq_ignore_ascii_case(letter));

        let (rect, response) =
            ui.allocate_exact_size(Vec2::new(ui.available_width(), 36.0), Sense::click());

        if response.clicked() && !is_selected {
            new_selection = Some(letter.clone());
        }

        let painter = ui.painter_at(rect);

        // Background -- deep navy card matching the accent blue hue.
        let bg = if is_selected {
            egui::Color32::from_rgb(0x36, 0x50, 0x78)
        } else if response.hovered() {
            egui::Color32::from_rgb(0x32, 0x48, 0x6e)
        } else {
            egui::Color32::from_rgb(0x28, 0x3a, 0x5c)
        };
        painter.rect_filled(rect, 4.0, bg);
        painter.rect_stroke(
            rect,
            4.0,
            egui::Stroke::new(1.0, egui::Color32::from_rgb(0x3a, 0x50, 0x72)),
            egui::StrokeKind::Outside,
        );

        painter.text(
            egui::pos2(rect.left() + 8.0, rect.center().y),
            egui::Align2::LEFT_CENTER,
            format!("💾 {}\\", letter),
            egui::FontId::proportional(14.0),
            egui::Color32::WHITE,
        );
        painter.text(
            egui::pos2(rect.right() - 8.0, rect.center().y),
            egui::Align2::RIGHT_CENTER,
            if is_selected { "Selected" } else { "Removable" },
            egui::FontId::proportional(11.0),
            egui::Color32::WHITE,
        );

        ui.add_space(2.0);
    }

    if let Some(letter) = new_selection {
        state.select_volume(&letter);
    }
}

/// Directory listing of the selected drive's root.
use crate::state::AppState;
use egui::Ui;
use egui_extras::{Column, TableBuilder};
use usbsleuth_core::model::size::format_size;

/// Draw the file listing panel.
pub fn files_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.heading("Files");
        ui.separator();
        if ui
            .checkbox(&mut state.include_hidden, "Show hidden")
            .changed()
        {
            state.reload_listing();
        }
        if ui
            .add_enabled(state.selected_root.is_some(), egui::Button::new("🔄 Reload"))
            .clicked()
        {
            state.reload_listing();
        }
    });
    ui.add_space(4.0);

    let muted = ui.visuals().weak_text_color();
    if state.selected_root.is_none() {
        ui.label(
            egui::RichText::new("Select a drive to list its contents.")
                .size(12.0)
                .color(muted),
        );
        return;
    }
    if state.entries.is_empty() {
        ui.label(egui::RichText::new("(empty)").size(12.0).color(muted));
        return;
    }

    let entries = &state.entries;
    TableBuilder::new(ui)
        .id_salt("files_table")
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::remainder().at_least(160.0).clip(true))
        .column(Column::initial(90.0))
        .column(Column::initial(140.0))
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Name");
            });
            header.col(|ui| {
                ui.strong("Size");
            });
            header.col(|ui| {
                ui.strong("Modified");
            });
        })
        .body(|body| {
            body.rows(20.0, entries.len(), |mut row| {
                let entry = &entries[row.index()];
                row.col(|ui| {
                    let icon = if entry.is_dir { "📁" } else { "📄" };
                    let mut text = egui::RichText::new(format!("{} {}", icon, entry.name));
                    if entry.is_hidden {
                        text = text.color(muted).italics();
                    }
                    ui.label(text);
                });
                row.col(|ui| {
                    if !entry.is_dir {
                        ui.label(format_size(entry.size));
                    }
                });
                row.col(|ui| {
                    let modified = entry
                        .modified
                        .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    ui.label(egui::RichText::new(modified).color(muted));
                });
            });
        });
}

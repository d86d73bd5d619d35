/// Open / write / copy / delete actions on the selected drive.
///
/// Every action re-checks that the selected mount still exists before it
/// touches the filesystem; failures open the error dialog.
use crate::state::AppState;
use egui::Ui;

/// Draw the file operation forms.
pub fn actions_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("File operations");
    ui.add_space(4.0);

    let has_mount = state.selected_root.is_some();
    let label_width = 70.0;

    if ui
        .add_enabled(has_mount, egui::Button::new("📂 Open drive folder"))
        .on_hover_text("Open the selected drive in the file manager")
        .clicked()
    {
        state.open_mount_dir();
    }
    ui.add_space(6.0);

    // ── Write ─────────────────────────────────────────────────────────────
    ui.horizontal(|ui| {
        ui.add_sized([label_width, 18.0], egui::Label::new("Write to"));
        ui.add(
            egui::TextEdit::singleline(&mut state.write_path)
                .desired_width(200.0)
                .hint_text("folder/file.txt"),
        );
        if ui
            .add_enabled(has_mount, egui::Button::new("✏ Write"))
            .on_hover_text("Write the text below to this path on the drive")
            .clicked()
        {
            state.write_text_file();
        }
    });
    ui.add(
        egui::TextEdit::multiline(&mut state.write_text)
            .desired_rows(2)
            .desired_width(f32::INFINITY)
            .hint_text("Text to write (leave empty for a test message)"),
    );

    ui.add_space(6.0);

    // ── Copy ──────────────────────────────────────────────────────────────
    ui.horizontal(|ui| {
        ui.add_sized([label_width, 18.0], egui::Label::new("Copy file"));
        ui.add(
            egui::TextEdit::singleline(&mut state.copy_source)
                .desired_width(200.0)
                .hint_text("C:\\path\\to\\source.bin"),
        );
        let copying = state.copy_handle.is_some();
        if copying {
            if ui
                .button(
                    egui::RichText::new("⏹ Cancel")
                        .color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)),
                )
                .clicked()
            {
                state.cancel_copy();
            }
        } else {
            if ui
                .add_enabled(has_mount, egui::Button::new("📂 Browse…"))
                .on_hover_text("Pick a file and copy it onto the drive")
                .clicked()
            {
                let picked = rfd::FileDialog::new()
                    .set_title("Choose a file to copy onto the drive")
                    .pick_file();
                state.copy_picked(picked);
            }
            if ui
                .add_enabled(has_mount, egui::Button::new("📥 Copy to drive"))
                .on_hover_text("Copy the file into the root of the selected drive")
                .clicked()
            {
                state.start_copy();
            }
        }
    });
    if state.copy_handle.is_some() {
        let fraction = state
            .copy_progress
            .map(|p| f32::from(p.percent()) / 100.0)
            .unwrap_or(0.0);
        ui.add(egui::ProgressBar::new(fraction).show_percentage());
    }

    ui.add_space(6.0);

    // ── Delete ────────────────────────────────────────────────────────────
    ui.horizontal(|ui| {
        ui.add_sized([label_width, 18.0], egui::Label::new("Delete"));
        ui.add(
            egui::TextEdit::singleline(&mut state.delete_path)
                .desired_width(200.0)
                .hint_text("folder or file"),
        );
        if ui
            .add_enabled(
                has_mount,
                egui::Button::new(
                    egui::RichText::new("🗑 Delete").color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)),
                ),
            )
            .on_hover_text("Delete a file or a whole folder on the drive")
            .clicked()
        {
            state.request_delete();
        }
    });
}

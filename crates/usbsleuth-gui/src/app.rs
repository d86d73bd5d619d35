/// Main `eframe::App` implementation for UsbSleuth.
///
/// This is the top-level UI layout that composes all panels and widgets.
use crate::panels;
use crate::state::AppState;
use crate::widgets;
use std::time::Instant;
use usbsleuth_core::model::DriveAction;
use usbsleuth_core::platform::Platform;
use usbsleuth_core::watcher::StopOutcome;

/// Pre-built application state.
///
/// Construct this **before** calling `eframe::run_native` so that the first
/// enumeration and the watcher start-up complete before the OS window is
/// created.
pub struct UsbSleuthState {
    pub(crate) inner: AppState,
}

impl UsbSleuthState {
    /// Start the watcher and take the initial snapshot.
    pub fn build(platform: Platform) -> Self {
        Self {
            inner: AppState::new(platform),
        }
    }
}

/// The UsbSleuth application.
pub struct UsbSleuthApp {
    state: AppState,
}

impl UsbSleuthApp {
    /// Create a new application instance from pre-built state.
    pub fn with_state(cc: &eframe::CreationContext<'_>, state: UsbSleuthState) -> Self {
        // ── Font: Segoe UI ────────────────────────────────────────────────
        let system_root = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
        let font_path = format!("{}\\Fonts\\segoeui.ttf", system_root);

        let mut fonts = egui::FontDefinitions::default();
        match std::fs::read(&font_path) {
            Ok(bytes) => {
                fonts.font_data.insert(
                    "SegoeUI".to_owned(),
                    egui::FontData::from_owned(bytes).into(),
                );
                fonts
                    .families
                    .entry(egui::FontFamily::Proportional)
                    .or_default()
                    .insert(0, "SegoeUI".to_owned());
                tracing::info!("Loaded Segoe UI from {}", font_path);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load Segoe UI from {}: {} -- using default font",
                    font_path,
                    e
                );
            }
        }
        cc.egui_ctx.set_fonts(fonts);
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        Self { state: state.inner }
    }
}

impl eframe::App for UsbSleuthApp {
    /// Override the GPU clear colour to match the active theme background.
    fn clear_color(&self, visuals: &egui::Visuals) -> [f32; 4] {
        let [r, g, b, a] = visuals.panel_fill.to_array();
        [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ]
    }

    /// Stop the watcher while logging still works, so an unconfirmed
    /// teardown is reported instead of being swallowed by `Drop`.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        match self.state.stop_watcher() {
            StopOutcome::TimedOut => tracing::warn!("Shutdown: drive watcher teardown unconfirmed"),
            outcome => tracing::info!("Shutdown: drive watcher {:?}", outcome),
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Apply theme ───────────────────────────────────────────────────
        if self.state.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        // ── Process background messages ───────────────────────────────────
        let now = Instant::now();
        let events_changed = self.state.process_watcher_messages(now);
        let copy_changed = self.state.process_copy_messages();
        if events_changed || copy_changed {
            ctx.request_repaint();
        }

        // The watcher thread cannot wake the UI by itself, so keep polling
        // while it runs; pending timers may need an earlier frame.
        let poll = std::time::Duration::from_millis(250);
        let wake = self
            .state
            .next_wakeup(now)
            .map_or(poll, |d| d.min(poll));
        if self.state.watcher_running() || self.state.copy_handle.is_some() {
            ctx.request_repaint_after(wake);
        }

        // ── Top toolbar ───────────────────────────────────────────────────
        egui::TopBottomPanel::top("toolbar")
            .min_height(36.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                widgets::toolbar::toolbar(ui, &mut self.state);
                ui.add_space(4.0);
            });

        self.about_window(ctx);
        self.notice_windows(ctx);
        self.error_window(ctx);
        self.delete_confirm_window(ctx);

        // ── Bottom status bar ─────────────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .min_height(24.0)
            .show(ctx, |ui| {
                ui.add_space(2.0);
                widgets::status_bar::status_bar(ui, &self.state);
                ui.add_space(2.0);
            });

        // ── Activity log ──────────────────────────────────────────────────
        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(160.0)
            .min_height(80.0)
            .max_height(400.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                panels::log_panel::log_panel(ui, &mut self.state);
                ui.add_space(4.0);
            });

        // ── Left sidebar ──────────────────────────────────────────────────
        egui::SidePanel::left("left_panel")
            .default_width(380.0)
            .min_width(280.0)
            .max_width(600.0)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    widgets::drive_picker::drive_picker(ui, &mut self.state);
                    ui.add_space(8.0);
                    ui.separator();
                    ui.add_space(4.0);
                    panels::actions_panel::actions_panel(ui, &mut self.state);
                });
            });

        // ── Central panel ─────────────────────────────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::usb_panel::usb_panel(ui, &mut self.state);
            ui.add_space(8.0);
            ui.separator();
            ui.add_space(4.0);
            panels::files_panel::files_panel(ui, &mut self.state);
        });
    }
}

impl UsbSleuthApp {
    fn about_window(&mut self, ctx: &egui::Context) {
        let mut show_about = self.state.show_about;
        egui::Window::new("About UsbSleuth")
            .open(&mut show_about)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([340.0, 0.0])
            .show(ctx, |ui| {
                let accent = ui.visuals().hyperlink_color;
                let muted = ui.visuals().weak_text_color();
                let normal = ui.visuals().text_color();
                let strong = ui.visuals().strong_text_color();

                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("🔌 UsbSleuth")
                            .size(24.0)
                            .strong()
                            .color(accent),
                    );
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                            .size(13.0)
                            .color(muted),
                    );
                    ui.add_space(12.0);
                    ui.label(
                        egui::RichText::new(
                            "Removable storage inspector for Windows.\n\
                             Live hot-plug detection, USB device identity,\n\
                             and quick file operations on the selected drive.",
                        )
                        .size(12.0)
                        .color(normal),
                    );
                    ui.add_space(12.0);
                    ui.separator();
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("Developed by Swatto")
                            .size(13.0)
                            .strong()
                            .color(strong),
                    );
                    ui.add_space(4.0);
                    ui.hyperlink_to(
                        "github.com/Swatto86/UsbSleuth",
                        "https://github.com/Swatto86/UsbSleuth",
                    );
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new("MIT License - (c) 2026 Swatto")
                            .size(11.0)
                            .color(muted),
                    );
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new("Built with Rust & egui")
                            .size(11.0)
                            .color(muted),
                    );
                    ui.add_space(8.0);
                });
            });
        self.state.show_about = show_about;
    }

    /// Stacked insertion/removal popups in the top-right corner.
    fn notice_windows(&mut self, ctx: &egui::Context) {
        let mut dismissed = None;
        for (i, notice) in self.state.notices.iter().enumerate() {
            let (title, body, color) = match notice.action {
                DriveAction::Inserted => (
                    "Drive inserted",
                    format!("USB drive detected: {}\\", notice.drive_letter),
                    egui::Color32::from_rgb(0xa6, 0xe3, 0xa1),
                ),
                DriveAction::Removed => (
                    "Drive removed",
                    format!("USB drive removed: {}\\", notice.drive_letter),
                    egui::Color32::from_rgb(0xfa, 0xb3, 0x87),
                ),
            };
            egui::Window::new(title)
                .id(egui::Id::new(("notice", i)))
                .collapsible(false)
                .resizable(false)
                .title_bar(false)
                .anchor(egui::Align2::RIGHT_TOP, [-12.0, 48.0 + i as f32 * 64.0])
                .fixed_size([260.0, 0.0])
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(title).strong().color(color));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✖").clicked() {
                                dismissed = Some(i);
                            }
                        });
                    });
                    ui.label(body);
                });
        }
        if let Some(i) = dismissed {
            self.state.dismiss_notice(i);
        }
    }

    fn error_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.state.error_dialog.clone() else {
            return;
        };
        let mut close = false;
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([380.0, 0.0])
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(&message).color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)),
                );
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        close = true;
                    }
                });
            });
        if close {
            self.state.error_dialog = None;
        }
    }

    fn delete_confirm_window(&mut self, ctx: &egui::Context) {
        let Some(rel) = self.state.pending_delete.clone() else {
            return;
        };
        let target = self
            .state
            .selected_root
            .as_ref()
            .map(|root| root.join(&rel).display().to_string())
            .unwrap_or(rel);

        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new("Confirm delete")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([380.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("Permanently delete {}?", target));
                ui.label(
                    egui::RichText::new("Folders are deleted with everything inside them.")
                        .size(11.0)
                        .color(ui.visuals().weak_text_color()),
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui
                        .button(
                            egui::RichText::new("🗑 Delete")
                                .color(egui::Color32::from_rgb(0xf3, 0x8b, 0xa8)),
                        )
                        .clicked()
                    {
                        confirmed = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancelled = true;
                    }
                });
            });
        if confirmed {
            self.state.confirm_delete();
        } else if cancelled {
            self.state.cancel_delete();
        }
    }
}

/// USB device table.
///
/// One row per USB-attached device from the last enumeration. IDs the
/// inventory could not provide are shown as "unknown" or left blank.
use crate::state::AppState;
use egui::Ui;
use egui_extras::{Column, TableBuilder};
use usbsleuth_core::model::usb_device::format_hex_id;

const HEADERS: [&str; 8] = [
    "Vendor ID",
    "Product ID",
    "Manufacturer",
    "Product",
    "Serial",
    "USB",
    "Bus",
    "Address",
];

/// Draw the USB device panel.
pub fn usb_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.heading("USB devices");
        ui.separator();
        if ui
            .checkbox(&mut state.only_storage, "Storage devices only")
            .on_hover_text("Show only devices driven by the USB mass-storage service (USBSTOR)")
            .changed()
        {
            state.refresh_usb_devices();
        }
        ui.label(
            egui::RichText::new(format!("{} listed", state.usb_devices.len()))
                .size(11.0)
                .color(ui.visuals().weak_text_color()),
        );
    });
    ui.add_space(4.0);

    if state.usb_devices.is_empty() {
        ui.label(
            egui::RichText::new("No USB devices found.")
                .size(12.0)
                .color(ui.visuals().weak_text_color()),
        );
        return;
    }

    let muted = ui.visuals().weak_text_color();
    let devices = &state.usb_devices;

    TableBuilder::new(ui)
        .id_salt("usb_table")
        .striped(true)
        .resizable(true)
        .max_scroll_height(180.0)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::auto().at_least(70.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::initial(140.0).clip(true))
        .column(Column::initial(180.0).clip(true))
        .column(Column::initial(160.0).clip(true))
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in HEADERS {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(20.0, devices.len(), |mut row| {
                let device = &devices[row.index()];
                let text = |value: &Option<String>| value.clone().unwrap_or_default();

                row.col(|ui| {
                    ui.monospace(format_hex_id(device.vendor_id));
                });
                row.col(|ui| {
                    ui.monospace(format_hex_id(device.product_id));
                });
                row.col(|ui| {
                    ui.label(text(&device.manufacturer));
                });
                row.col(|ui| {
                    let label = ui.label(text(&device.product));
                    if let Some(ref raw) = device.raw_device_id {
                        label.on_hover_text(raw.as_str());
                    }
                });
                row.col(|ui| {
                    ui.label(text(&device.serial_number));
                });
                row.col(|ui| {
                    ui.label(egui::RichText::new(text(&device.usb_version)).color(muted));
                });
                row.col(|ui| {
                    let bus = device.bus.map(|b| b.to_string()).unwrap_or_default();
                    ui.label(egui::RichText::new(bus).color(muted));
                });
                row.col(|ui| {
                    let address = device.address.map(|a| a.to_string()).unwrap_or_default();
                    ui.label(egui::RichText::new(address).color(muted));
                });
            });
        });
}

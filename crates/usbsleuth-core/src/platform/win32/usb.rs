/// USB device inventory through WMI (`Win32_PnPEntity`).
///
/// COM is initialised per calling thread and the UI thread may already own an
/// incompatible apartment, so every query runs on its own short-lived thread.
use crate::error::EnumerationError;
use crate::model::PnpEntity;
use std::collections::HashMap;
use wmi::{COMLibrary, Variant, WMIConnection};

const USB_ENTITY_QUERY: &str = "SELECT Name, Manufacturer, PNPDeviceID, Service \
     FROM Win32_PnPEntity WHERE PNPDeviceID LIKE 'USB%'";

/// Every USB-attached PnP entity. Rows are converted field by field so one
/// odd row never fails the whole query.
pub fn query_usb_entities() -> Result<Vec<PnpEntity>, EnumerationError> {
    std::thread::Builder::new()
        .name("usbsleuth-wmi".to_owned())
        .spawn(query_on_current_thread)
        .map_err(|e| EnumerationError::Unavailable(format!("failed to spawn WMI thread: {e}")))?
        .join()
        .map_err(|_| EnumerationError::Query("WMI query thread panicked".into()))?
}

fn query_on_current_thread() -> Result<Vec<PnpEntity>, EnumerationError> {
    let com = COMLibrary::new().map_err(|e| EnumerationError::Unavailable(e.to_string()))?;
    let wmi =
        WMIConnection::new(com.into()).map_err(|e| EnumerationError::Unavailable(e.to_string()))?;

    let rows: Vec<HashMap<String, Variant>> = wmi
        .raw_query(USB_ENTITY_QUERY)
        .map_err(|e| EnumerationError::Query(e.to_string()))?;

    tracing::debug!("WMI returned {} USB PnP rows", rows.len());
    Ok(rows.iter().map(entity_from_row).collect())
}

fn entity_from_row(row: &HashMap<String, Variant>) -> PnpEntity {
    PnpEntity {
        name: string_field(row, "Name"),
        manufacturer: string_field(row, "Manufacturer"),
        device_id: string_field(row, "PNPDeviceID"),
        service: string_field(row, "Service"),
    }
}

fn string_field(row: &HashMap<String, Variant>, key: &str) -> Option<String> {
    match row.get(key) {
        Some(Variant::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

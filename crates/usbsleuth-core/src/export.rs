/// USB inventory export to CSV or JSON.
///
/// IDs are written as `0x1234` strings; unset fields become empty CSV cells
/// or JSON `null`.
use crate::error::ExportError;
use crate::model::UsbDeviceInfo;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick the format from a file extension (`.csv` / `.json`, any case).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("csv") {
            Some(Self::Csv)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Json => "JSON",
        }
    }
}

pub fn write_csv<W: Write>(devices: &[UsbDeviceInfo], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for device in devices {
        wtr.serialize(device)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(devices: &[UsbDeviceInfo], writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, devices)?;
    Ok(())
}

/// Write `devices` to `path`; the format follows the extension and
/// defaults to CSV.
pub fn export_to_file(devices: &[UsbDeviceInfo], path: &Path) -> Result<ExportFormat, ExportError> {
    let format = ExportFormat::from_path(path).unwrap_or(ExportFormat::Csv);
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Csv => write_csv(devices, &mut writer)?,
        ExportFormat::Json => write_json(devices, &mut writer)?,
    }
    writer.flush()?;

    info!(
        "Exported {} USB device(s) as {} to {}",
        devices.len(),
        format.label(),
        path.display()
    );
    Ok(format)
}

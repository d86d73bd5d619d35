/// Drive enumeration using the Windows API.
///
/// Lists drive roots with `GetLogicalDriveStringsW` and classifies each one
/// with `GetDriveTypeW`.
use crate::error::EnumerationError;
use crate::platform::DriveType;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use windows::Win32::Storage::FileSystem::{GetDriveTypeW, GetLogicalDriveStringsW};

// Drive type constants from the Windows API.
const DRIVE_REMOVABLE_VAL: u32 = 2;
const DRIVE_FIXED_VAL: u32 = 3;
const DRIVE_REMOTE_VAL: u32 = 4;
const DRIVE_CDROM_VAL: u32 = 5;
const DRIVE_RAMDISK_VAL: u32 = 6;

/// Classify a single drive letter (`"G:"` or `"G:\"`).
pub fn drive_type(drive_letter: &str) -> DriveType {
    let root = format!("{}\\", drive_letter.trim_end_matches('\\'));
    let root_wide: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
    let raw_type = unsafe { GetDriveTypeW(windows::core::PCWSTR(root_wide.as_ptr())) };
    match raw_type {
        DRIVE_FIXED_VAL => DriveType::Fixed,
        DRIVE_REMOVABLE_VAL => DriveType::Removable,
        DRIVE_REMOTE_VAL => DriveType::Network,
        DRIVE_CDROM_VAL => DriveType::CdRom,
        DRIVE_RAMDISK_VAL => DriveType::RamDisk,
        _ => DriveType::Unknown,
    }
}

/// Drive letters of every removable volume, in drive-letter order.
pub fn removable_volumes() -> Result<Vec<String>, EnumerationError> {
    // GetLogicalDriveStringsW returns null-separated drive root strings.
    let mut buffer = [0u16; 256];
    let len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) };

    if len == 0 {
        let err = windows::core::Error::from_win32();
        return Err(EnumerationError::Unavailable(format!(
            "GetLogicalDriveStringsW failed: {err}"
        )));
    }
    if len as usize > buffer.len() {
        return Err(EnumerationError::Query(format!(
            "drive string buffer too small ({len} code units needed)"
        )));
    }

    let full = OsString::from_wide(&buffer[..len as usize]);
    let full_str = full.to_string_lossy();

    let volumes = full_str
        .split('\0')
        .filter(|s| !s.is_empty())
        .filter(|root| drive_type(root) == DriveType::Removable)
        .map(|root| root.trim_end_matches('\\').to_string())
        .collect();

    Ok(volumes)
}

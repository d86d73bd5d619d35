/// USB device identity records and device-path parsing.
///
/// Windows exposes USB devices as PnP entities whose device path looks like
/// `USB\VID_0781&PID_5567\4C530001230509115432`. Vendor/product IDs and the
/// serial number are parsed out of that string; anything that does not match
/// leaves the corresponding field unset rather than failing.
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::OnceLock;

/// Service name of the USB mass-storage class driver.
pub const USB_STORAGE_SERVICE: &str = "USBSTOR";

/// One raw row of the USB device inventory, as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PnpEntity {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: Option<String>,
    #[serde(rename = "PNPDeviceID")]
    pub device_id: Option<String>,
    #[serde(rename = "Service")]
    pub service: Option<String>,
}

impl PnpEntity {
    /// True if the registered driver service is the USB storage class.
    pub fn is_storage_class(&self) -> bool {
        self.service
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(USB_STORAGE_SERVICE))
    }
}

/// Identity of one USB-attached device.
///
/// Fields the platform cannot report at enumeration time stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsbDeviceInfo {
    #[serde(serialize_with = "serialize_hex_id")]
    pub vendor_id: Option<u16>,
    #[serde(serialize_with = "serialize_hex_id")]
    pub product_id: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    /// BCD USB specification release, e.g. `"2.00"`.
    pub usb_version: Option<String>,
    pub bus: Option<u8>,
    pub address: Option<u8>,
    pub raw_device_id: Option<String>,
    pub service_name: Option<String>,
}

impl UsbDeviceInfo {
    /// Build a record from one inventory row, parsing the device path.
    pub fn from_entity(entity: PnpEntity) -> Self {
        let ids = entity.device_id.as_deref().and_then(parse_vid_pid);
        let serial_number = entity.device_id.as_deref().and_then(parse_serial);

        Self {
            vendor_id: ids.map(|(vid, _)| vid),
            product_id: ids.map(|(_, pid)| pid),
            manufacturer: entity.manufacturer,
            product: entity.name,
            serial_number,
            usb_version: None,
            bus: None,
            address: None,
            raw_device_id: entity.device_id,
            service_name: entity.service,
        }
    }
}

/// Format an optional 16-bit ID as `0x1234`, or `"unknown"`.
pub fn format_hex_id(id: Option<u16>) -> String {
    match id {
        Some(v) => format!("0x{v:04x}"),
        None => "unknown".to_owned(),
    }
}

fn serialize_hex_id<S: Serializer>(id: &Option<u16>, s: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(v) => s.serialize_str(&format!("0x{v:04x}")),
        None => s.serialize_none(),
    }
}

fn vid_pid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)VID_([0-9A-F]{4}).*?PID_([0-9A-F]{4})").expect("static VID/PID pattern")
    })
}

fn serial_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^USB\\[^\\]+\\([^\\]+)$").expect("static serial pattern"))
}

/// Extract `(vendor_id, product_id)` from a device path.
pub fn parse_vid_pid(device_id: &str) -> Option<(u16, u16)> {
    let caps = vid_pid_regex().captures(device_id)?;
    let vid = u16::from_str_radix(&caps[1], 16).ok()?;
    let pid = u16::from_str_radix(&caps[2], 16).ok()?;
    Some((vid, pid))
}

/// Extract the serial segment from a `USB\<class>\<serial>` device path.
pub fn parse_serial(device_id: &str) -> Option<String> {
    serial_regex()
        .captures(device_id)
        .map(|caps| caps[1].to_owned())
}

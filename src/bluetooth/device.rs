use std::fmt;

use serde::{Deserialize, Serialize};

/// Display name used when an inquiry does not report one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Signal strength reported for devices found by a plain inquiry, which carries no RSSI.
pub const RSSI_UNAVAILABLE: i16 = -99;

/// A discovered or known Bluetooth peer, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Hardware address, verbatim as reported by the host tool.
    pub mac: String,
    /// Human-readable name of the device.
    pub name: String,
    /// Signal strength, [`RSSI_UNAVAILABLE`] when unknown.
    pub rssi: i16,
    /// Whether the device is paired.
    pub paired: bool,
    /// Whether the device is currently connected.
    pub connected: bool,
}

impl Device {
    /// A device seen by an inquiry: nothing but its address is known.
    pub fn from_inquiry(mac: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            name: UNKNOWN_NAME.to_string(),
            rssi: RSSI_UNAVAILABLE,
            paired: false,
            connected: false,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.mac)?;

        let flags: Vec<&str> = [(self.paired, "Paired"), (self.connected, "Connected")]
            .into_iter()
            .filter_map(|(set, label)| set.then_some(label))
            .collect();
        if !flags.is_empty() {
            write!(f, " [{}]", flags.join(", "))?;
        }

        Ok(())
    }
}

/// A validated six-octet hardware address in `XX:XX:XX:XX:XX:XX` form.
///
/// Either case is accepted. The original spelling is kept so that it can be written back to host
/// configuration exactly as the user supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareAddress<'a>(&'a str);

impl<'a> HardwareAddress<'a> {
    /// Returns `Some` if `s` is six colon-separated groups of two hex digits.
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut groups = 0;
        for group in s.split(':') {
            groups += 1;
            if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
        }
        (groups == 6).then_some(Self(s))
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl fmt::Display for HardwareAddress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_cases() {
        assert!(HardwareAddress::parse("00:11:22:33:44:55").is_some());
        assert!(HardwareAddress::parse("aa:bb:cc:dd:ee:ff").is_some());
        assert!(HardwareAddress::parse("AA:bb:CC:dd:EE:ff").is_some());
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "00:11:22:33:44",
            "00:11:22:33:44:55:66",
            "0:11:22:33:44:55",
            "000:11:22:33:44:55",
            "GG:11:22:33:44:55",
            "00-11-22-33-44-55",
            "00:11:22:33:44:",
            "BD_ADDR:",
        ] {
            assert!(HardwareAddress::parse(bad).is_none(), "{bad:?} accepted");
        }
    }

    #[test]
    fn display_lists_flags() {
        let mut device = Device::from_inquiry("00:11:22:33:44:55");
        assert_eq!(device.to_string(), "Unknown (00:11:22:33:44:55)");

        device.name = "Headset".into();
        device.paired = true;
        device.connected = true;
        assert_eq!(
            device.to_string(),
            "Headset (00:11:22:33:44:55) [Paired, Connected]"
        );
    }

    #[test]
    fn inquiry_devices_have_placeholders() {
        let device = Device::from_inquiry("00:11:22:33:44:55");
        assert_eq!(device.name, UNKNOWN_NAME);
        assert_eq!(device.rssi, RSSI_UNAVAILABLE);
        assert!(!device.paired);
        assert!(!device.connected);
    }
}

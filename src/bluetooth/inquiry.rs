use tracing::debug;

use crate::bluetooth::device::{Device, HardwareAddress};

/// Lines starting with one of these (after leading whitespace) never carry a device.
pub const HEADER_PREFIXES: &[&str] = &["Inquiry result"];

/// Recognizes a device address token in one output dialect.
pub trait TokenMatcher: Send + Sync {
    /// Returns the address carried by `token`, if any.
    fn match_token<'a>(&self, token: &'a str) -> Option<&'a str>;
}

/// `XX:XX:XX:XX:XX:XX` tokens, as printed by `hccontrol`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColonHexMatcher;

impl TokenMatcher for ColonHexMatcher {
    fn match_token<'a>(&self, token: &'a str) -> Option<&'a str> {
        HardwareAddress::parse(token).map(|addr| addr.as_str())
    }
}

pub struct InquiryParser {
    header_prefixes: Vec<String>,
    matchers: Vec<Box<dyn TokenMatcher>>,
}

impl Default for InquiryParser {
    fn default() -> Self {
        Self {
            header_prefixes: HEADER_PREFIXES.iter().map(|p| p.to_string()).collect(),
            matchers: vec![Box::new(ColonHexMatcher)],
        }
    }
}

impl InquiryParser {
    /// Adds another dialect. Matchers are tried in insertion order for every token.
    pub fn with_matcher(mut self, matcher: impl TokenMatcher + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Adds another header phrase to skip.
    pub fn with_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.header_prefixes.push(prefix.into());
        self
    }

    /// Returns one [`Device`] per line carrying an address, in line order.
    ///
    /// An address repeated within the same output (compared case-insensitively) only yields the
    /// first record.
    pub fn parse(&self, raw: &str) -> Vec<Device> {
        let mut devices: Vec<Device> = Vec::new();

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || self.is_header(trimmed) {
                continue;
            }

            let Some(mac) = self.first_address(trimmed) else {
                continue;
            };

            if devices.iter().any(|d| d.mac.eq_ignore_ascii_case(mac)) {
                debug!(address = %mac, "Skipping repeated inquiry result");
                continue;
            }
            devices.push(Device::from_inquiry(mac));
        }

        devices
    }

    fn is_header(&self, line: &str) -> bool {
        self.header_prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }

    fn first_address<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.split_whitespace()
            .find_map(|token| self.matchers.iter().find_map(|m| m.match_token(token)))
    }
}

/// Parses `raw` with the default `hccontrol` dialect.
pub fn parse_inquiry_output(raw: &str) -> Vec<Device> {
    InquiryParser::default().parse(raw)
}

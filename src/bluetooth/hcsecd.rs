use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

/// First line of a store created by the daemon.
pub const STORE_HEADER: &str = "# hcsecd.conf generated by bt-daemon\n";

/// Link key value for a device that has not completed pairing yet.
pub const NO_LINK_KEY: &str = "nokey";

/// PIN used when a pair request does not carry one.
pub const DEFAULT_PIN: &str = "0000";

/// One `device { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingEntry<'a> {
    pub address: &'a str,
    pub name: &'a str,
    pub pin: &'a str,
}

impl PairingEntry<'_> {
    /// Renders the block in the one-field-per-line layout `hcsecd` reads.
    pub fn render(&self) -> String {
        format!(
            "\ndevice {{\n\tbdaddr\t{};\n\tname\t\"{}\";\n\tkey\t{};\n\tpin\t\"{}\";\n}}\n",
            self.address, self.name, NO_LINK_KEY, self.pin
        )
    }
}

/// Whether `value` can be placed inside a quoted field without breaking the block grammar.
pub fn is_quotable(value: &str) -> bool {
    !value.contains(['"', '\\', ';', '\n', '\r'])
}

/// Appends `entry` to the store at `path` unless its address is already mentioned.
///
/// A missing store is created with [`STORE_HEADER`]. The existence check is a plain substring
/// search over the whole file, not a parse of its blocks.
///
/// Returns `Ok(false)` when the address is already present and nothing was written.
pub fn upsert_pairing(path: &Path, entry: &PairingEntry<'_>) -> io::Result<bool> {
    if !path.exists() {
        debug!("Creating pairing store {}", path.display());
        fs::write(path, STORE_HEADER)?;
    }

    let content = fs::read_to_string(path)?;
    if content.contains(entry.address) {
        info!(address = %entry.address, "Device already present in {}", path.display());
        return Ok(false);
    }

    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(entry.render().as_bytes())?;
    file.flush()?;

    info!(address = %entry.address, "Added device to {}", path.display());
    Ok(true)
}

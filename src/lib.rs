//! bt-daemon library: the privileged half of a Bluetooth management pair.
//!
//! The daemon accepts local connections on a Unix socket, runs device inquiries through the
//! host's `hccontrol`, and records pairings in the `hcsecd` configuration store.

pub mod bluetooth;
pub mod configuration;
pub mod error;
pub mod ipc;
pub mod log;
pub mod serde_ext;

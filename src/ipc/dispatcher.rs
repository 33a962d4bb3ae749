use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::bluetooth::{
    device::{HardwareAddress, UNKNOWN_NAME},
    discovery::InquiryRunner,
    hcsecd::{self, DEFAULT_PIN, PairingEntry},
    inquiry::InquiryParser,
    service::ServiceReloader,
};
use crate::ipc::protocol::{ACTION_PAIR, ACTION_SCAN, Request, Response};

pub const NO_ADDRESS: &str = "no address provided";
pub const STORE_NOT_UPDATED: &str = "failed to update configuration (or already paired)";
pub const RELOAD_FAILED: &str = "configuration updated but service reload failed";

/// Maps one [`Request`] to one [`Response`]. Holds no state between requests.
pub struct Dispatcher<I, R> {
    inquiry: I,
    reloader: R,
    parser: InquiryParser,
    /// Pairing store appended to by `pair`.
    store_path: PathBuf,
}

impl<I: InquiryRunner, R: ServiceReloader> Dispatcher<I, R> {
    pub fn new(inquiry: I, reloader: R, store_path: impl Into<PathBuf>) -> Self {
        Self {
            inquiry,
            reloader,
            parser: InquiryParser::default(),
            store_path: store_path.into(),
        }
    }

    /// Replaces the default `hccontrol` output parser.
    pub fn with_parser(mut self, parser: InquiryParser) -> Self {
        self.parser = parser;
        self
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        info!(action = %request.action, "Handling command");

        match request.action.as_str() {
            ACTION_SCAN => self.scan().await,
            ACTION_PAIR => self.pair(request.mac, request.pin).await,
            unknown => {
                warn!(action = %unknown, "Unknown command");
                Response::error(format!("unknown action: {unknown}"))
            }
        }
    }

    async fn scan(&self) -> Response {
        match self.inquiry.run_inquiry().await {
            Ok(output) => {
                let devices = self.parser.parse(&output);
                info!("Scan completed: found {} devices", devices.len());
                Response::success().with_data(devices)
            }
            Err(e) => {
                error!("Scan failed: {}", e);
                Response::error(e.to_string()).with_data(Vec::new())
            }
        }
    }

    async fn pair(&self, mac: Option<String>, pin: Option<String>) -> Response {
        let Some(mac) = mac.filter(|m| !m.is_empty()) else {
            return Response::error(NO_ADDRESS);
        };
        let Some(address) = HardwareAddress::parse(&mac) else {
            warn!(address = %mac, "Rejecting malformed address");
            return Response::error(format!("invalid address: {mac}"));
        };

        let pin = pin.unwrap_or_else(|| DEFAULT_PIN.to_string());
        if !hcsecd::is_quotable(&pin) {
            warn!(address = %address, "Rejecting pin that would corrupt the pairing store");
            return Response::error("invalid pin");
        }

        let entry = PairingEntry {
            address: address.as_str(),
            name: UNKNOWN_NAME,
            pin: &pin,
        };
        let added = hcsecd::upsert_pairing(&self.store_path, &entry).unwrap_or_else(|e| {
            error!("Failed to update {}: {}", self.store_path.display(), e);
            false
        });
        if !added {
            return Response::error(STORE_NOT_UPDATED);
        }

        if self.reloader.reload().await {
            Response::success().with_message(format!("paired with {address}"))
        } else {
            Response::warning(RELOAD_FAILED)
        }
    }
}

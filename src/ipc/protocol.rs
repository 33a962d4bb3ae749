use serde::{Deserialize, Serialize};

use crate::bluetooth::device::Device;
use crate::error::ProtocolError;

/// Maximum size of a single read or write on the socket. Longer payloads are truncated.
pub const BUFFER_SIZE: usize = 4096;

/// Message sent back when a request cannot be decoded.
pub const INVALID_FORMAT: &str = "invalid format";

pub const ACTION_SCAN: &str = "scan";
pub const ACTION_PAIR: &str = "pair";

/// An inbound command. Missing fields decode to their defaults; validation happens at dispatch.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl Request {
    pub fn scan() -> Self {
        Self {
            action: ACTION_SCAN.to_string(),
            ..Self::default()
        }
    }

    pub fn pair(mac: impl Into<String>, pin: Option<String>) -> Self {
        Self {
            action: ACTION_PAIR.to_string(),
            mac: Some(mac.into()),
            pin,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
    /// The operation partly succeeded.
    Warning,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Device>>,
}

impl Response {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            message: None,
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: Status::Warning,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, devices: Vec<Device>) -> Self {
        self.data = Some(devices);
        self
    }

    pub fn invalid_format() -> Self {
        Self::error(INVALID_FORMAT)
    }
}

/// Decodes request bytes. Anything but a UTF-8 JSON object with string-typed fields is rejected.
pub fn decode_request(bytes: &[u8]) -> Result<Request, ProtocolError> {
    let text = std::str::from_utf8(bytes)?;
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}

pub fn decode_response(bytes: &[u8]) -> Result<Response, ProtocolError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_pair_request() {
        let req = decode_request(br#"{"action":"pair","mac":"AA:BB:CC:DD:EE:FF","pin":"1234"}"#)
            .unwrap();
        assert_eq!(
            req,
            Request::pair("AA:BB:CC:DD:EE:FF", Some("1234".to_string()))
        );
    }

    #[test]
    fn missing_fields_default() {
        assert_eq!(decode_request(b"{}").unwrap(), Request::default());
        assert_eq!(
            decode_request(br#"{"action":"pair","mac":null}"#).unwrap(),
            Request {
                action: "pair".into(),
                mac: None,
                pin: None
            }
        );
    }

    #[test]
    fn unknown_fields_ignored() {
        let req = decode_request(br#"{"action":"scan","verbose":true}"#).unwrap();
        assert_eq!(req, Request::scan());
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            decode_request(b"not json"),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            decode_request(&[0xff, 0xfe, b'{']),
            Err(ProtocolError::Utf8(_))
        ));
        assert!(matches!(
            decode_request(br#"["scan"]"#),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            decode_request(br#"{"action":"scan""#),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            decode_request(br#"{"action":42}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn response_omits_absent_fields() {
        let value = serde_json::to_value(Response::success()).unwrap();
        assert_eq!(value, json!({"status": "success"}));

        let value = serde_json::to_value(Response::invalid_format()).unwrap();
        assert_eq!(value, json!({"status": "error", "message": "invalid format"}));
    }

    #[test]
    fn response_carries_devices() {
        let response = Response::success().with_data(vec![Device::from_inquiry("00:11:22:33:44:55")]);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "data": [{
                    "mac": "00:11:22:33:44:55",
                    "name": "Unknown",
                    "rssi": -99,
                    "paired": false,
                    "connected": false
                }]
            })
        );

        let bytes = encode(&response).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), response);
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wire protocol shared by the simulator server and the sensor client
//!
//! Every message is a single UTF-8 JSON object terminated by `\n`. Requests
//! are dispatched on their `action` field, responses on their `status`
//! field. There is no length prefix; message boundaries are newline
//! delimited and a single message may not exceed [`MAX_LINE_BYTES`].
//!
//! Decoding never panics: input that is not valid JSON is reported as
//! [`RequestError::InvalidJson`] so the server can answer with the
//! well-known `Invalid JSON` error response and keep the session alive.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;

pub use frame::read_frame;

mod frame;

/// Maximum accepted length of one wire message, in bytes.
///
/// The reference behavior declares no limit, but an unbounded line would let
/// a misbehaving peer grow the read buffer forever. Overflow is a transport
/// error that terminates the session, not a protocol error.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A request sent from the client to the simulator.
///
/// The wire form carries the variant in the `action` field:
///
/// ```json
/// {"action":"read","register":"D20"}
/// {"action":"read_multiple","registers":["D20","D21"]}
/// {"action":"write","register":"D20","value":42.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Read a single register value.
    Read { register: String },
    /// Read a batch of registers; unknown ids yield a partial response.
    ReadMultiple { registers: Vec<String> },
    /// Write a value to a register, rebasing its simulation center.
    Write { register: String, value: f64 },
}

/// A response sent from the simulator back to the client.
///
/// The three wire shapes share the `status` field (`ok`, `partial` or
/// `error`) but differ in their payload, so the enum is untagged and
/// deserialization picks the variant from the fields present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Single-register result of a `read` or `write`.
    Value {
        status: String,
        register: String,
        value: f64,
    },
    /// Batched result of a `read_multiple`; `errors` is present only when
    /// the status is `partial`.
    Values {
        status: String,
        values: BTreeMap<String, f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<String>>,
    },
    /// Any failure the session survives (unknown register, unknown action,
    /// malformed request body).
    Error { status: String, message: String },
}

impl Response {
    /// Successful single read; the value is rounded to 2 decimals on the wire.
    pub fn read_ok(register: impl Into<String>, value: f64) -> Self {
        Response::Value {
            status: "ok".to_string(),
            register: register.into(),
            value: round2(value),
        }
    }

    /// Successful write; echoes the value exactly as written.
    pub fn write_ok(register: impl Into<String>, value: f64) -> Self {
        Response::Value {
            status: "ok".to_string(),
            register: register.into(),
            value,
        }
    }

    /// Batched read result. The status is `ok` when every requested id was
    /// known, `partial` otherwise; values are rounded to 2 decimals.
    pub fn multi(values: BTreeMap<String, f64>, missing: Vec<String>) -> Self {
        let values = values
            .into_iter()
            .map(|(id, value)| (id, round2(value)))
            .collect();
        if missing.is_empty() {
            Response::Values {
                status: "ok".to_string(),
                values,
                errors: None,
            }
        } else {
            Response::Values {
                status: "partial".to_string(),
                values,
                errors: Some(
                    missing
                        .into_iter()
                        .map(|id| format!("Register {} not found", id))
                        .collect(),
                ),
            }
        }
    }

    /// Generic error response.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    /// Error response for a lookup of an unknown register id.
    pub fn register_not_found(register: &str) -> Self {
        Response::error(format!("Register {} not found", register))
    }

    /// The `status` field common to all response shapes.
    pub fn status(&self) -> &str {
        match self {
            Response::Value { status, .. } => status,
            Response::Values { status, .. } => status,
            Response::Error { status, .. } => status,
        }
    }

    /// True when the status is `ok`.
    pub fn is_ok(&self) -> bool {
        self.status() == "ok"
    }
}

/// Why an incoming request line could not be turned into a [`Request`].
///
/// Both cases are protocol errors: the server answers in-band and the
/// session stays open.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The line was not valid JSON, not an object, or a known action with
    /// missing or mistyped fields.
    InvalidJson,
    /// The `action` field named no known operation. Carries the offending
    /// action rendered as text (`null` when the field was absent).
    UnknownAction(String),
}

impl RequestError {
    /// The error response the server sends for this decode failure.
    pub fn to_response(&self) -> Response {
        match self {
            RequestError::InvalidJson => Response::error("Invalid JSON"),
            RequestError::UnknownAction(action) => {
                Response::error(format!("Unknown action: {}", action))
            }
        }
    }
}

/// Decode one request line.
///
/// The taxonomy distinguishes garbage from a well-formed JSON object whose
/// `action` is unknown, because the two produce different error responses.
pub fn decode_request(line: &str) -> Result<Request, RequestError> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|_| RequestError::InvalidJson)?;

    match serde_json::from_value::<Request>(value.clone()) {
        Ok(request) => Ok(request),
        Err(_) => match value.get("action") {
            Some(Value::String(action)) if !is_known_action(action) => {
                Err(RequestError::UnknownAction(action.clone()))
            }
            // Known action with malformed fields, e.g. a non-numeric value.
            Some(Value::String(_)) => Err(RequestError::InvalidJson),
            Some(other) => Err(RequestError::UnknownAction(other.to_string())),
            None if value.is_object() => {
                Err(RequestError::UnknownAction("null".to_string()))
            }
            None => Err(RequestError::InvalidJson),
        },
    }
}

/// Decode one response line, as received by the client.
///
/// Unlike the server side there is no in-band recovery: a response the
/// client cannot parse is a fatal error for the current exchange.
pub fn decode_response(line: &str) -> Result<Response, serde_json::Error> {
    serde_json::from_str(line.trim())
}

/// Encode a message as one newline-terminated wire line.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Round a value to 2 decimal places for the wire.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_known_action(action: &str) -> bool {
    matches!(action, "read" | "read_multiple" | "write")
}

/// Map a framing overflow onto a transport-level error.
pub(crate) fn oversized_line_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("message exceeds the {} byte line limit", MAX_LINE_BYTES),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_read_request() {
        let request = decode_request(r#"{"action":"read","register":"D20"}"#).unwrap();
        assert_eq!(
            request,
            Request::Read {
                register: "D20".to_string()
            }
        );
    }

    #[test]
    fn decode_read_multiple_request() {
        let request =
            decode_request(r#"{"action":"read_multiple","registers":["D20","D21"]}"#).unwrap();
        assert_eq!(
            request,
            Request::ReadMultiple {
                registers: vec!["D20".to_string(), "D21".to_string()]
            }
        );
    }

    #[test]
    fn decode_write_request() {
        let request =
            decode_request(r#"{"action":"write","register":"D23","value":1500}"#).unwrap();
        assert_eq!(
            request,
            Request::Write {
                register: "D23".to_string(),
                value: 1500.0
            }
        );
    }

    #[test]
    fn garbage_is_invalid_json() {
        assert_eq!(
            decode_request("this is not json"),
            Err(RequestError::InvalidJson)
        );
        assert_eq!(decode_request(""), Err(RequestError::InvalidJson));
    }

    #[test]
    fn unknown_action_is_reported_with_its_name() {
        assert_eq!(
            decode_request(r#"{"action":"bogus"}"#),
            Err(RequestError::UnknownAction("bogus".to_string()))
        );
        assert_eq!(
            decode_request(r#"{"action":"bogus"}"#)
                .unwrap_err()
                .to_response(),
            Response::error("Unknown action: bogus")
        );
    }

    #[test]
    fn missing_action_is_reported_as_null() {
        assert_eq!(
            decode_request(r#"{"register":"D20"}"#),
            Err(RequestError::UnknownAction("null".to_string()))
        );
    }

    #[test]
    fn known_action_with_bad_fields_is_invalid_json() {
        // "value" must be a number
        assert_eq!(
            decode_request(r#"{"action":"write","register":"D20","value":"high"}"#),
            Err(RequestError::InvalidJson)
        );
        // "register" missing entirely
        assert_eq!(
            decode_request(r#"{"action":"read"}"#),
            Err(RequestError::InvalidJson)
        );
    }

    #[test]
    fn non_object_json_is_invalid() {
        assert_eq!(decode_request("42"), Err(RequestError::InvalidJson));
        assert_eq!(decode_request("[1,2,3]"), Err(RequestError::InvalidJson));
    }

    #[test]
    fn read_ok_rounds_to_two_decimals() {
        let response = Response::read_ok("D20", 21.4567);
        let wire: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({"status":"ok","register":"D20","value":21.46})
        );
    }

    #[test]
    fn write_ok_echoes_the_exact_value() {
        let response = Response::write_ok("D20", 42.0);
        let wire: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(wire, json!({"status":"ok","register":"D20","value":42.0}));
    }

    #[test]
    fn multi_with_all_known_ids_is_ok_without_errors() {
        let mut values = BTreeMap::new();
        values.insert("D20".to_string(), 21.0);
        values.insert("D21".to_string(), 5.0);
        let response = Response::multi(values, Vec::new());

        assert_eq!(response.status(), "ok");
        let wire: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({"status":"ok","values":{"D20":21.0,"D21":5.0}})
        );
    }

    #[test]
    fn multi_with_unknown_ids_is_partial_with_one_error_each() {
        let mut values = BTreeMap::new();
        values.insert("D20".to_string(), 21.0);
        let response = Response::multi(values, vec!["D98".to_string(), "D99".to_string()]);

        assert_eq!(response.status(), "partial");
        let wire: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({
                "status":"partial",
                "values":{"D20":21.0},
                "errors":["Register D98 not found","Register D99 not found"]
            })
        );
    }

    #[test]
    fn response_roundtrip_through_the_wire() {
        for response in [
            Response::read_ok("D20", 21.46),
            Response::multi(BTreeMap::new(), vec!["D99".to_string()]),
            Response::error("Invalid JSON"),
        ] {
            let line = encode_line(&response).unwrap();
            assert!(line.ends_with('\n'));
            assert_eq!(decode_response(&line).unwrap(), response);
        }
    }
}

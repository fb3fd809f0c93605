// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SHIP message codec.
//!
//! SHIP frames are `<type><payload>`: one type byte followed by UTF-8
//! JSON. Control messages are bound through the data engine (one schema
//! per message kind); the `data` envelope carries the SPINE document
//! verbatim and is wrapped/unwrapped here.

use serde_json::{json, Value as Json};

use crate::data::{json as engine, DataCfg, DataKind, EnumTable, Value};
use crate::error::{Error, Result};

/// SHIP frame type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Init = 0x00,
    Data = 0x01,
    Control = 0x02,
    End = 0x03,
}

impl MsgType {
    pub fn from_byte(byte: u8) -> Option<MsgType> {
        match byte {
            0x00 => Some(MsgType::Init),
            0x01 => Some(MsgType::Data),
            0x02 => Some(MsgType::Control),
            0x03 => Some(MsgType::End),
            _ => None,
        }
    }
}

/// The SHIP sub-protocol identifier carried in every data envelope.
pub const PROTOCOL_ID: &str = "ee1.0";

// ============================================================================
// Message schemas
// ============================================================================

pub static HELLO_PHASE_TABLE: EnumTable = EnumTable {
    name: "connectionHelloPhase",
    entries: &[("pending", 0), ("ready", 1), ("aborted", 2)],
};

static HELLO_CFG: [DataCfg; 3] = [
    DataCfg::new("phase", DataKind::Enum(&HELLO_PHASE_TABLE)),
    DataCfg::new("waiting", DataKind::U32),
    DataCfg::new("prolongationRequest", DataKind::Bool),
];

pub static HANDSHAKE_TYPE_TABLE: EnumTable = EnumTable {
    name: "protocolHandshakeType",
    entries: &[("announceMax", 0), ("select", 1)],
};

static HANDSHAKE_VERSION_CFG: [DataCfg; 2] = [
    DataCfg::new("major", DataKind::U16),
    DataCfg::new("minor", DataKind::U16),
];

static FORMAT_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::String);

static HANDSHAKE_FORMATS_CFG: [DataCfg; 1] =
    [DataCfg::new("format", DataKind::List(&FORMAT_ITEM_CFG))];

static PROTOCOL_HANDSHAKE_CFG: [DataCfg; 3] = [
    DataCfg::new("handshakeType", DataKind::Enum(&HANDSHAKE_TYPE_TABLE)),
    DataCfg::new("version", DataKind::Sequence(&HANDSHAKE_VERSION_CFG)),
    DataCfg::new("formats", DataKind::Sequence(&HANDSHAKE_FORMATS_CFG)),
];

static PROTOCOL_HANDSHAKE_ERROR_CFG: [DataCfg; 1] = [DataCfg::new("error", DataKind::U8)];

pub static PIN_STATE_TABLE: EnumTable = EnumTable {
    name: "pinState",
    entries: &[("required", 0), ("optional", 1), ("pinOk", 2), ("none", 3)],
};

static PIN_STATE_CFG: [DataCfg; 1] =
    [DataCfg::new("pinState", DataKind::Enum(&PIN_STATE_TABLE))];

static ACCESS_METHODS_REQUEST_CFG: [DataCfg; 0] = [];

static ACCESS_METHODS_CFG: [DataCfg; 2] = [
    DataCfg::new("id", DataKind::String),
    DataCfg::new("dnsSd_mDns", DataKind::Tag),
];

pub static CLOSE_PHASE_TABLE: EnumTable = EnumTable {
    name: "connectionClosePhase",
    entries: &[("announce", 0), ("confirm", 1)],
};

pub static CLOSE_REASON_TABLE: EnumTable = EnumTable {
    name: "connectionCloseReason",
    entries: &[("unspecific", 0), ("removedConnection", 1)],
};

static CLOSE_CFG: [DataCfg; 3] = [
    DataCfg::new("phase", DataKind::Enum(&CLOSE_PHASE_TABLE)),
    DataCfg::new("maxTime", DataKind::U32),
    DataCfg::new("reason", DataKind::Enum(&CLOSE_REASON_TABLE)),
];

/// Control message arms, scanned by element name at message root.
static CONTROL_ARMS: [DataCfg; 7] = [
    DataCfg::new("connectionHello", DataKind::Sequence(&HELLO_CFG)),
    DataCfg::new(
        "messageProtocolHandshake",
        DataKind::Sequence(&PROTOCOL_HANDSHAKE_CFG),
    ),
    DataCfg::new(
        "messageProtocolHandshakeError",
        DataKind::Sequence(&PROTOCOL_HANDSHAKE_ERROR_CFG),
    ),
    DataCfg::new("connectionPinState", DataKind::Sequence(&PIN_STATE_CFG)),
    DataCfg::new(
        "accessMethodsRequest",
        DataKind::Sequence(&ACCESS_METHODS_REQUEST_CFG),
    ),
    DataCfg::new("accessMethods", DataKind::Sequence(&ACCESS_METHODS_CFG)),
    DataCfg::new("connectionClose", DataKind::Sequence(&CLOSE_CFG)),
];

static CONTROL_CHOICE: DataCfg = DataCfg::new("", DataKind::Choice(&CONTROL_ARMS));
static CONTROL_ROOT: DataCfg = DataCfg::new("", DataKind::ChoiceRoot(&CONTROL_CHOICE));

const ARM_HELLO: usize = 0;
const ARM_PROTOCOL_HANDSHAKE: usize = 1;
const ARM_PROTOCOL_HANDSHAKE_ERROR: usize = 2;
const ARM_PIN_STATE: usize = 3;
const ARM_ACCESS_METHODS_REQUEST: usize = 4;
const ARM_ACCESS_METHODS: usize = 5;
const ARM_CLOSE: usize = 6;

// ============================================================================
// Typed messages
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelloPhase {
    Pending,
    Ready,
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeType {
    AnnounceMax,
    Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinState {
    Required,
    Optional,
    PinOk,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosePhase {
    Announce,
    Confirm,
}

/// A decoded SHIP message.
#[derive(Clone, Debug, PartialEq)]
pub enum ShipMessage {
    /// CMI init frame (type byte 0x00).
    Init,
    /// End frame (type byte 0x03).
    End,
    Hello {
        phase: HelloPhase,
        /// Remaining wait in milliseconds.
        waiting: Option<u64>,
        prolongation_request: Option<bool>,
    },
    ProtocolHandshake {
        handshake_type: HandshakeType,
        major: u64,
        minor: u64,
        formats: Vec<String>,
    },
    ProtocolHandshakeError {
        error: u64,
    },
    PinState {
        pin_state: PinState,
    },
    AccessMethodsRequest,
    AccessMethods {
        id: Option<String>,
    },
    Close {
        phase: ClosePhase,
        max_time: Option<u64>,
        reason: Option<u32>,
    },
    /// SHIP data envelope; the SPINE document as unformatted JSON text.
    Data {
        payload: String,
    },
}

impl ShipMessage {
    pub fn hello(phase: HelloPhase, waiting: Option<u64>, prolongation_request: Option<bool>) -> ShipMessage {
        ShipMessage::Hello {
            phase,
            waiting,
            prolongation_request,
        }
    }

    pub fn close_announce() -> ShipMessage {
        ShipMessage::Close {
            phase: ClosePhase::Announce,
            max_time: None,
            reason: None,
        }
    }

    pub fn close_confirm() -> ShipMessage {
        ShipMessage::Close {
            phase: ClosePhase::Confirm,
            max_time: None,
            reason: None,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a message into a full SHIP frame (type byte + JSON).
pub fn encode(message: &ShipMessage) -> Result<Vec<u8>> {
    match message {
        ShipMessage::Init => Ok(vec![MsgType::Init as u8, 0x00]),
        ShipMessage::End => Ok(vec![MsgType::End as u8]),
        ShipMessage::Data { payload } => {
            let spine: Json = serde_json::from_str(payload).map_err(|_| Error::Parse)?;
            let envelope = json!({
                "data": [
                    {"header": [{"protocolId": PROTOCOL_ID}]},
                    {"payload": spine},
                ]
            });
            let mut frame = vec![MsgType::Data as u8];
            frame.extend_from_slice(
                serde_json::to_string(&envelope)
                    .map_err(|_| Error::Other("data envelope"))?
                    .as_bytes(),
            );
            Ok(frame)
        }
        _ => {
            let value = control_to_value(message)?;
            let text = engine::print(&CONTROL_ROOT, Some(&value))?;
            let mut frame = vec![MsgType::Control as u8];
            frame.extend_from_slice(text.as_bytes());
            Ok(frame)
        }
    }
}

fn control_to_value(message: &ShipMessage) -> Result<Value> {
    let (arm, slots) = match message {
        ShipMessage::Hello {
            phase,
            waiting,
            prolongation_request,
        } => {
            let phase = match phase {
                HelloPhase::Pending => 0,
                HelloPhase::Ready => 1,
                HelloPhase::Aborted => 2,
            };
            (
                ARM_HELLO,
                vec![
                    Some(Value::Enum(phase)),
                    waiting.map(Value::Unsigned),
                    prolongation_request.map(Value::Bool),
                ],
            )
        }
        ShipMessage::ProtocolHandshake {
            handshake_type,
            major,
            minor,
            formats,
        } => {
            let handshake_type = match handshake_type {
                HandshakeType::AnnounceMax => 0,
                HandshakeType::Select => 1,
            };
            let version = Value::Seq(vec![
                Some(Value::Unsigned(*major)),
                Some(Value::Unsigned(*minor)),
            ]);
            let formats = Value::Seq(vec![Some(Value::List(
                formats.iter().map(|f| Value::Str(f.clone())).collect(),
            ))]);
            (
                ARM_PROTOCOL_HANDSHAKE,
                vec![
                    Some(Value::Enum(handshake_type)),
                    Some(version),
                    Some(formats),
                ],
            )
        }
        ShipMessage::ProtocolHandshakeError { error } => (
            ARM_PROTOCOL_HANDSHAKE_ERROR,
            vec![Some(Value::Unsigned(*error))],
        ),
        ShipMessage::PinState { pin_state } => {
            let pin_state = match pin_state {
                PinState::Required => 0,
                PinState::Optional => 1,
                PinState::PinOk => 2,
                PinState::None => 3,
            };
            (ARM_PIN_STATE, vec![Some(Value::Enum(pin_state))])
        }
        ShipMessage::AccessMethodsRequest => (ARM_ACCESS_METHODS_REQUEST, vec![]),
        ShipMessage::AccessMethods { id } => (
            ARM_ACCESS_METHODS,
            vec![id.as_ref().map(|i| Value::Str(i.clone())), None],
        ),
        ShipMessage::Close {
            phase,
            max_time,
            reason,
        } => {
            let phase = match phase {
                ClosePhase::Announce => 0,
                ClosePhase::Confirm => 1,
            };
            (
                ARM_CLOSE,
                vec![
                    Some(Value::Enum(phase)),
                    max_time.map(Value::Unsigned),
                    reason.map(Value::Enum),
                ],
            )
        }
        ShipMessage::Init | ShipMessage::End | ShipMessage::Data { .. } => {
            return Err(Error::Other("not a control message"));
        }
    };

    Ok(Value::Choice {
        arm,
        value: Some(Box::new(Value::Seq(slots))),
    })
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode one assembled SHIP frame.
pub fn decode(frame: &[u8]) -> Result<ShipMessage> {
    let (&type_byte, payload) = frame.split_first().ok_or(Error::Parse)?;
    let msg_type = MsgType::from_byte(type_byte)
        .ok_or_else(|| Error::ParseMsg(format!("unknown SHIP message type {:#04x}", type_byte)))?;

    match msg_type {
        MsgType::Init => Ok(ShipMessage::Init),
        MsgType::End => Ok(ShipMessage::End),
        MsgType::Data => decode_data(payload),
        MsgType::Control => decode_control(payload),
    }
}

fn decode_data(payload: &[u8]) -> Result<ShipMessage> {
    let text = std::str::from_utf8(payload).map_err(|_| Error::Parse)?;
    let root: Json = serde_json::from_str(text).map_err(|_| Error::Parse)?;

    let entries = root
        .as_object()
        .and_then(|o| o.get("data"))
        .and_then(Json::as_array)
        .ok_or(Error::Parse)?;

    let spine = entries
        .iter()
        .find_map(|entry| entry.as_object()?.get("payload"))
        .ok_or(Error::Parse)?;

    Ok(ShipMessage::Data {
        payload: serde_json::to_string(spine).map_err(|_| Error::Parse)?,
    })
}

fn decode_control(payload: &[u8]) -> Result<ShipMessage> {
    let text = std::str::from_utf8(payload).map_err(|_| Error::Parse)?;
    let value = engine::parse(&CONTROL_ROOT, text)?
        .ok_or_else(|| Error::ParseMsg("unknown SHIP control message".into()))?;

    let Value::Choice { arm, value } = value else {
        return Err(Error::Other("control message shape"));
    };
    let body = value.as_deref();
    let slot = |i: usize| -> Option<&Value> {
        match body {
            Some(Value::Seq(slots)) => slots.get(i).and_then(Option::as_ref),
            _ => None,
        }
    };

    match arm {
        ARM_HELLO => {
            let phase = match slot(0).and_then(Value::as_enum) {
                Some(0) => HelloPhase::Pending,
                Some(1) => HelloPhase::Ready,
                Some(2) => HelloPhase::Aborted,
                _ => return Err(Error::ParseMsg("connectionHello without phase".into())),
            };
            Ok(ShipMessage::Hello {
                phase,
                waiting: slot(1).and_then(Value::as_unsigned),
                prolongation_request: slot(2).and_then(Value::as_bool),
            })
        }
        ARM_PROTOCOL_HANDSHAKE => {
            let handshake_type = match slot(0).and_then(Value::as_enum) {
                Some(0) => HandshakeType::AnnounceMax,
                Some(1) => HandshakeType::Select,
                _ => {
                    return Err(Error::ParseMsg(
                        "messageProtocolHandshake without type".into(),
                    ))
                }
            };

            let version = slot(1);
            let version_slot = |i: usize| match version {
                Some(Value::Seq(slots)) => slots
                    .get(i)
                    .and_then(Option::as_ref)
                    .and_then(Value::as_unsigned),
                _ => None,
            };

            let formats = match slot(2) {
                Some(Value::Seq(slots)) => match slots.first().and_then(Option::as_ref) {
                    Some(Value::List(items)) => items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_owned))
                        .collect(),
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };

            Ok(ShipMessage::ProtocolHandshake {
                handshake_type,
                major: version_slot(0).unwrap_or(0),
                minor: version_slot(1).unwrap_or(0),
                formats,
            })
        }
        ARM_PROTOCOL_HANDSHAKE_ERROR => Ok(ShipMessage::ProtocolHandshakeError {
            error: slot(0).and_then(Value::as_unsigned).unwrap_or(0),
        }),
        ARM_PIN_STATE => {
            let pin_state = match slot(0).and_then(Value::as_enum) {
                Some(0) => PinState::Required,
                Some(1) => PinState::Optional,
                Some(2) => PinState::PinOk,
                Some(3) => PinState::None,
                _ => return Err(Error::ParseMsg("connectionPinState without state".into())),
            };
            Ok(ShipMessage::PinState { pin_state })
        }
        ARM_ACCESS_METHODS_REQUEST => Ok(ShipMessage::AccessMethodsRequest),
        ARM_ACCESS_METHODS => Ok(ShipMessage::AccessMethods {
            id: slot(0).and_then(Value::as_str).map(str::to_owned),
        }),
        ARM_CLOSE => {
            let phase = match slot(0).and_then(Value::as_enum) {
                Some(0) => ClosePhase::Announce,
                Some(1) => ClosePhase::Confirm,
                _ => return Err(Error::ParseMsg("connectionClose without phase".into())),
            };
            Ok(ShipMessage::Close {
                phase,
                max_time: slot(1).and_then(Value::as_unsigned),
                reason: slot(2).and_then(Value::as_enum),
            })
        }
        _ => Err(Error::Other("control arm out of range")),
    }
}

// ============================================================================
// Fragment assembly
// ============================================================================

/// Accumulates WebSocket fragments until the final one arrives.
#[derive(Debug, Default)]
pub struct FragmentBuffer {
    buffer: Vec<u8>,
}

impl FragmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment; returns the assembled message once the final
    /// fragment is in.
    pub fn push(&mut self, data: &[u8], is_final: bool) -> Option<Vec<u8>> {
        if is_final && self.buffer.is_empty() {
            return Some(data.to_vec());
        }

        self.buffer.extend_from_slice(data);
        if !is_final {
            return None;
        }

        Some(std::mem::take(&mut self.buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_text(message: &ShipMessage) -> (u8, String) {
        let frame = encode(message).unwrap();
        (frame[0], String::from_utf8(frame[1..].to_vec()).unwrap())
    }

    #[test]
    fn test_hello_round_trip() {
        let message = ShipMessage::hello(HelloPhase::Ready, Some(60000), None);
        let (msg_type, text) = encode_text(&message);
        assert_eq!(msg_type, 0x02);
        assert_eq!(
            text,
            r#"{"connectionHello":[{"phase":"ready"},{"waiting":60000}]}"#
        );

        let mut frame = vec![0x02];
        frame.extend_from_slice(text.as_bytes());
        assert_eq!(decode(&frame).unwrap(), message);
    }

    #[test]
    fn test_hello_pending_prolongation() {
        let mut frame = vec![0x02];
        frame.extend_from_slice(
            br#"{"connectionHello":[{"phase":"pending"},{"prolongationRequest":true}]}"#,
        );
        assert_eq!(
            decode(&frame).unwrap(),
            ShipMessage::hello(HelloPhase::Pending, None, Some(true))
        );
    }

    #[test]
    fn test_protocol_handshake_round_trip() {
        let message = ShipMessage::ProtocolHandshake {
            handshake_type: HandshakeType::AnnounceMax,
            major: 1,
            minor: 0,
            formats: vec!["JSON-UTF8".into()],
        };
        let (msg_type, text) = encode_text(&message);
        assert_eq!(msg_type, 0x02);
        assert_eq!(
            text,
            concat!(
                r#"{"messageProtocolHandshake":[{"handshakeType":"announceMax"},"#,
                r#"{"version":[{"major":1},{"minor":0}]},"#,
                r#"{"formats":[{"format":["JSON-UTF8"]}]}]}"#
            )
        );

        let mut frame = vec![0x02];
        frame.extend_from_slice(text.as_bytes());
        assert_eq!(decode(&frame).unwrap(), message);
    }

    #[test]
    fn test_access_methods_round_trip() {
        let (_, text) = encode_text(&ShipMessage::AccessMethodsRequest);
        assert_eq!(text, r#"{"accessMethodsRequest":[]}"#);

        let (_, text) = encode_text(&ShipMessage::AccessMethods {
            id: Some("Ship-1234".into()),
        });
        assert_eq!(text, r#"{"accessMethods":[{"id":"Ship-1234"}]}"#);
    }

    #[test]
    fn test_close_round_trip() {
        let (msg_type, text) = encode_text(&ShipMessage::close_announce());
        assert_eq!(msg_type, 0x02);
        assert_eq!(text, r#"{"connectionClose":[{"phase":"announce"}]}"#);
    }

    #[test]
    fn test_data_envelope_wrap_unwrap() {
        let spine = r#"{"datagram":[{"header":[{"msgCounter":1}]}]}"#;
        let frame = encode(&ShipMessage::Data {
            payload: spine.into(),
        })
        .unwrap();

        assert_eq!(frame[0], 0x01);
        let text = std::str::from_utf8(&frame[1..]).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"data":[{"header":[{"protocolId":"ee1.0"}]},"#,
                r#"{"payload":{"datagram":[{"header":[{"msgCounter":1}]}]}}]}"#
            )
        );

        match decode(&frame).unwrap() {
            ShipMessage::Data { payload } => assert_eq!(payload, spine),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_init_and_end_frames() {
        assert_eq!(encode(&ShipMessage::Init).unwrap(), vec![0x00, 0x00]);
        assert_eq!(decode(&[0x00, 0x00]).unwrap(), ShipMessage::Init);
        assert_eq!(decode(&[0x03]).unwrap(), ShipMessage::End);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[0x07, b'{', b'}']).is_err());
        assert!(decode(b"\x02{\"unknownThing\":[]}").is_err());
        assert!(decode(b"\x02not json").is_err());
    }

    #[test]
    fn test_fragment_assembly() {
        let mut buffer = FragmentBuffer::new();

        // Single-fragment fast path.
        assert_eq!(buffer.push(b"whole", true).as_deref(), Some(&b"whole"[..]));

        // Multi-fragment accumulation.
        assert!(buffer.push(b"first-", false).is_none());
        assert!(buffer.push(b"middle-", false).is_none());
        assert_eq!(
            buffer.push(b"last", true).as_deref(),
            Some(&b"first-middle-last"[..])
        );

        // Buffer resets after delivery.
        assert_eq!(buffer.push(b"again", true).as_deref(), Some(&b"again"[..]));
    }
}

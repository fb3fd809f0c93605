// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State-level tests of the SHIP connection state machine, driven through
//! a mock transport and a captured handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Sender};

use crate::ship::connection::{
    ConnectionConfig, ConnectionHandler, QueueMsg, ShipRole, ShipTransport, SmeCore, SmeState,
    T_HELLO_PROLONG_THR_INC,
};
use crate::ship::message::{self, ShipMessage};

const TEST_REMOTE_SKI: &str = "df84a0cd9c5c9d9a1f419f357e5b513300b9fdde";

/// Records every frame the SME writes; optionally fails all writes.
#[derive(Default)]
struct MockTransport {
    written: Mutex<Vec<Vec<u8>>>,
    fail_writes: AtomicBool,
    closed: AtomicBool,
    close_reason: Mutex<String>,
}

impl MockTransport {
    fn written_messages(&self) -> Vec<ShipMessage> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .filter_map(|frame| message::decode(frame).ok())
            .collect()
    }

    fn close_reason(&self) -> String {
        self.close_reason.lock().unwrap().clone()
    }
}

impl ShipTransport for MockTransport {
    fn write(&self, frame: &[u8]) -> usize {
        if self.fail_writes.load(Ordering::SeqCst) {
            return 0;
        }
        self.written.lock().unwrap().push(frame.to_vec());
        frame.len()
    }

    fn close(&self, reason: &str) {
        self.closed.store(true, Ordering::SeqCst);
        *self.close_reason.lock().unwrap() = reason.to_owned();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct MockHandler {
    states: Mutex<Vec<(SmeState, String)>>,
    spine_data: Mutex<Vec<String>>,
}

impl ConnectionHandler for MockHandler {
    fn on_state_change(&self, _remote_ski: &str, state: SmeState, close_error: &str) {
        self.states
            .lock()
            .unwrap()
            .push((state, close_error.to_owned()));
    }

    fn on_spine_data(&self, _remote_ski: &str, spine_json: &str) {
        self.spine_data.lock().unwrap().push(spine_json.to_owned());
    }
}

struct Harness {
    core: SmeCore,
    tx: Sender<QueueMsg>,
    transport: Arc<MockTransport>,
    handler: Arc<MockHandler>,
}

fn harness(role: ShipRole, trusted: bool) -> Harness {
    let (tx, rx) = bounded(32);
    let transport = Arc::new(MockTransport::default());
    let handler = Arc::new(MockHandler::default());

    let config = ConnectionConfig {
        role,
        local_ski: "1111111111111111111111111111111111111111".into(),
        remote_ski: TEST_REMOTE_SKI.into(),
        access_methods_id: "Ship-test".into(),
        trusted,
    };

    let core = SmeCore::new(
        config,
        transport.clone() as Arc<dyn ShipTransport>,
        handler.clone() as Arc<dyn ConnectionHandler>,
        rx,
    );

    Harness {
        core,
        tx,
        transport,
        handler,
    }
}

fn push_control(tx: &Sender<QueueMsg>, json: &str) {
    let mut frame = vec![0x02];
    frame.extend_from_slice(json.as_bytes());
    tx.send(QueueMsg::DataReceived(frame)).unwrap();
}

/// Step once from a forced state and return the next state.
fn step_from(harness: &mut Harness, state: SmeState) -> SmeState {
    harness.core.force_state(state);
    harness.core.step()
}

// ============================================================================
// CMI phase
// ============================================================================

#[test]
fn test_cmi_client_handshake() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(h.core.step(), SmeState::CmiClientSend);
    assert_eq!(step_from(&mut h, SmeState::CmiClientSend), SmeState::CmiClientWait);
    assert_eq!(
        h.transport.written.lock().unwrap()[0],
        vec![0x00, 0x00],
        "client opens with the CMI init frame"
    );

    h.tx.send(QueueMsg::DataReceived(vec![0x00, 0x00])).unwrap();
    assert_eq!(step_from(&mut h, SmeState::CmiClientWait), SmeState::CmiClientEvaluate);
    assert_eq!(
        step_from(&mut h, SmeState::CmiClientEvaluate),
        SmeState::HelloReadyInit
    );
}

#[test]
fn test_cmi_rejects_non_init_message() {
    let mut h = harness(ShipRole::Client, true);
    h.core.step();

    push_control(&h.tx, r#"{"connectionHello":[{"phase":"ready"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::CmiClientWait), SmeState::CmiClientEvaluate);
    assert_eq!(step_from(&mut h, SmeState::CmiClientEvaluate), SmeState::Error);
    assert!(h.transport.is_closed());
}

#[test]
fn test_cmi_server_echoes_init() {
    let mut h = harness(ShipRole::Server, false);

    assert_eq!(h.core.step(), SmeState::CmiServerWait);
    h.tx.send(QueueMsg::DataReceived(vec![0x00, 0x00])).unwrap();
    assert_eq!(step_from(&mut h, SmeState::CmiServerWait), SmeState::CmiServerEvaluate);
    assert_eq!(
        step_from(&mut h, SmeState::CmiServerEvaluate),
        SmeState::HelloPendingInit,
        "untrusted peer lands in the pending hello"
    );
    assert_eq!(h.transport.written.lock().unwrap()[0], vec![0x00, 0x00]);
}

// ============================================================================
// Hello phase
// ============================================================================

#[test]
fn test_hello_ready_init_sends_ready() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(
        step_from(&mut h, SmeState::HelloReadyInit),
        SmeState::HelloReadyListen
    );
    assert_eq!(
        h.transport.written_messages()[0],
        ShipMessage::hello(message::HelloPhase::Ready, None, None)
    );
}

#[test]
fn test_hello_ready_listen_ready_message_completes() {
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::HelloReadyInit);

    push_control(&h.tx, r#"{"connectionHello":[{"phase":"ready"},{"waiting":60000}]}"#);
    assert_eq!(step_from(&mut h, SmeState::HelloReadyListen), SmeState::HelloOk);
}

#[test]
fn test_hello_ready_listen_abort_message() {
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::HelloReadyInit);

    push_control(&h.tx, r#"{"connectionHello":[{"phase":"aborted"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::HelloReadyListen), SmeState::HelloAbort);
}

#[test]
fn test_hello_ready_listen_pending_prolongation_request() {
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::HelloReadyInit);

    push_control(
        &h.tx,
        r#"{"connectionHello":[{"phase":"pending"},{"prolongationRequest":true}]}"#,
    );
    assert_eq!(
        step_from(&mut h, SmeState::HelloReadyListen),
        SmeState::HelloReadyListen
    );

    // We answered with a plain pending hello (no waiting attribute).
    let messages = h.transport.written_messages();
    assert_eq!(
        messages.last().unwrap(),
        &ShipMessage::hello(message::HelloPhase::Pending, None, None)
    );
}

#[test]
fn test_hello_ready_listen_prolongation_reply_send_failure_aborts() {
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::HelloReadyInit);
    h.transport.fail_writes.store(true, Ordering::SeqCst);

    push_control(
        &h.tx,
        r#"{"connectionHello":[{"phase":"pending"},{"prolongationRequest":true}]}"#,
    );
    assert_eq!(step_from(&mut h, SmeState::HelloReadyListen), SmeState::HelloAbort);
}

#[test]
fn test_hello_ready_listen_pending_without_prolongation_stays() {
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::HelloReadyInit);

    push_control(&h.tx, r#"{"connectionHello":[{"phase":"pending"}]}"#);
    assert_eq!(
        step_from(&mut h, SmeState::HelloReadyListen),
        SmeState::HelloReadyListen
    );

    push_control(
        &h.tx,
        r#"{"connectionHello":[{"phase":"pending"},{"prolongationRequest":false}]}"#,
    );
    assert_eq!(
        step_from(&mut h, SmeState::HelloReadyListen),
        SmeState::HelloReadyListen
    );
}

#[test]
fn test_hello_pending_init_announces_waiting() {
    let mut h = harness(ShipRole::Client, false);

    assert_eq!(
        step_from(&mut h, SmeState::HelloPendingInit),
        SmeState::HelloPendingListen
    );
    assert_eq!(
        h.transport.written_messages()[0],
        ShipMessage::hello(message::HelloPhase::Pending, Some(60000), None)
    );
}

#[test]
fn test_hello_pending_listen_ready_without_waiting_is_violation() {
    let mut h = harness(ShipRole::Client, false);
    step_from(&mut h, SmeState::HelloPendingInit);

    push_control(&h.tx, r#"{"connectionHello":[{"phase":"ready"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::HelloPendingListen), SmeState::HelloAbort);
}

#[test]
fn test_hello_pending_listen_waiting_restarts_prolongation_timer() {
    let mut h = harness(ShipRole::Client, false);
    step_from(&mut h, SmeState::HelloPendingInit);

    // waiting > tHelloProlongThrInc: the send-prolongation timer runs.
    push_control(&h.tx, r#"{"connectionHello":[{"phase":"ready"},{"waiting":60000}]}"#);
    assert_eq!(
        step_from(&mut h, SmeState::HelloPendingListen),
        SmeState::HelloPendingListen
    );

    // waiting < tHelloProlongThrInc: no prolongation can help anymore.
    push_control(&h.tx, r#"{"connectionHello":[{"phase":"pending"},{"waiting":1000}]}"#);
    assert_eq!(
        step_from(&mut h, SmeState::HelloPendingListen),
        SmeState::HelloPendingListen
    );
}

#[test]
fn test_hello_pending_listen_answers_prolongation_request() {
    let mut h = harness(ShipRole::Client, false);
    step_from(&mut h, SmeState::HelloPendingInit);

    push_control(
        &h.tx,
        r#"{"connectionHello":[{"phase":"pending"},{"prolongationRequest":true}]}"#,
    );
    assert_eq!(
        step_from(&mut h, SmeState::HelloPendingListen),
        SmeState::HelloPendingListen
    );
    assert_eq!(
        h.transport.written_messages().last().unwrap(),
        &ShipMessage::hello(message::HelloPhase::Pending, None, None)
    );
}

#[test]
fn test_hello_pending_becomes_ready_when_trusted() {
    let mut h = harness(ShipRole::Client, false);
    step_from(&mut h, SmeState::HelloPendingInit);

    h.tx.send(QueueMsg::Trusted).unwrap();
    assert_eq!(
        step_from(&mut h, SmeState::HelloPendingListen),
        SmeState::HelloReadyInit
    );
}

#[test]
fn test_hello_abort_reports_error_and_closes() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(step_from(&mut h, SmeState::HelloAbort), SmeState::Error);
    assert_eq!(
        h.transport.written_messages().last().unwrap(),
        &ShipMessage::hello(message::HelloPhase::Aborted, None, None)
    );
    assert!(h.transport.is_closed());
    assert_eq!(
        h.transport.close_reason(),
        "SME Hello state connection aborted"
    );
}

#[test]
fn test_hello_timeout_sends_abort_message() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(step_from(&mut h, SmeState::HelloReadyTimeout), SmeState::HelloAbort);
    assert_eq!(
        h.transport.written_messages().last().unwrap(),
        &ShipMessage::hello(message::HelloPhase::Aborted, None, None)
    );
}

#[test]
fn test_prolongation_threshold_constant() {
    assert_eq!(T_HELLO_PROLONG_THR_INC.as_millis(), 15000);
}

// ============================================================================
// Protocol handshake + pin phase
// ============================================================================

#[test]
fn test_protocol_handshake_client_happy_path() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(
        step_from(&mut h, SmeState::ProtocolClientInit),
        SmeState::ProtocolClientListenChoice
    );

    push_control(
        &h.tx,
        concat!(
            r#"{"messageProtocolHandshake":[{"handshakeType":"select"},"#,
            r#"{"version":[{"major":1},{"minor":0}]},"#,
            r#"{"formats":[{"format":["JSON-UTF8"]}]}]}"#
        ),
    );
    assert_eq!(
        step_from(&mut h, SmeState::ProtocolClientListenChoice),
        SmeState::ProtocolClientOk
    );
    assert_eq!(step_from(&mut h, SmeState::ProtocolClientOk), SmeState::PinCheckInit);
}

#[test]
fn test_protocol_handshake_version_mismatch_aborts() {
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::ProtocolClientInit);

    push_control(
        &h.tx,
        concat!(
            r#"{"messageProtocolHandshake":[{"handshakeType":"select"},"#,
            r#"{"version":[{"major":2},{"minor":0}]},"#,
            r#"{"formats":[{"format":["JSON-UTF8"]}]}]}"#
        ),
    );
    assert_eq!(
        step_from(&mut h, SmeState::ProtocolClientListenChoice),
        SmeState::Error
    );

    // The handshake error went out before the close.
    assert!(h
        .transport
        .written_messages()
        .iter()
        .any(|m| matches!(m, ShipMessage::ProtocolHandshakeError { error: 2 })));
}

#[test]
fn test_pin_check_accepts_none_only() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(step_from(&mut h, SmeState::PinCheckInit), SmeState::PinCheckListen);
    assert_eq!(
        h.transport.written_messages()[0],
        ShipMessage::PinState {
            pin_state: message::PinState::None
        }
    );

    push_control(&h.tx, r#"{"connectionPinState":[{"pinState":"none"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::PinCheckListen), SmeState::PinCheckOk);

    // A pin-protected peer is not supported.
    let mut h = harness(ShipRole::Client, true);
    step_from(&mut h, SmeState::PinCheckInit);
    push_control(&h.tx, r#"{"connectionPinState":[{"pinState":"required"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::PinCheckListen), SmeState::Error);
    assert_eq!(h.transport.close_reason(), "pin check: pin not supported");
}

// ============================================================================
// Access methods + data exchange
// ============================================================================

#[test]
fn test_access_methods_request_sent_on_entry() {
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(
        step_from(&mut h, SmeState::AccessMethodsRequest),
        SmeState::DataExchange
    );
    assert_eq!(
        h.transport.written_messages()[0],
        ShipMessage::AccessMethodsRequest
    );

    // Send failure is a hard error.
    let mut h = harness(ShipRole::Client, true);
    h.transport.fail_writes.store(true, Ordering::SeqCst);
    assert_eq!(step_from(&mut h, SmeState::AccessMethodsRequest), SmeState::Error);
}

#[test]
fn test_data_exchange_answers_access_methods_request() {
    let mut h = harness(ShipRole::Client, true);

    push_control(&h.tx, r#"{"accessMethodsRequest":[]}"#);
    assert_eq!(step_from(&mut h, SmeState::DataExchange), SmeState::DataExchange);

    assert_eq!(
        h.transport.written_messages().last().unwrap(),
        &ShipMessage::AccessMethods {
            id: Some("Ship-test".into())
        }
    );
}

#[test]
fn test_data_exchange_receive_forwards_spine_payload() {
    let mut h = harness(ShipRole::Client, true);

    let envelope = concat!(
        r#"{"data":[{"header":[{"protocolId":"ee1.0"}]},"#,
        r#"{"payload":{"datagram":[{"header":[{"msgCounter":1}]}]}}]}"#
    );
    let mut frame = vec![0x01];
    frame.extend_from_slice(envelope.as_bytes());
    h.tx.send(QueueMsg::DataReceived(frame)).unwrap();

    assert_eq!(step_from(&mut h, SmeState::DataExchange), SmeState::DataExchange);
    assert_eq!(
        h.handler.spine_data.lock().unwrap()[0],
        r#"{"datagram":[{"header":[{"msgCounter":1}]}]}"#
    );
}

#[test]
fn test_data_exchange_send_wraps_spine_payload() {
    let mut h = harness(ShipRole::Client, true);

    let spine = r#"{"datagram":[{"header":[{"msgCounter":7}]}]}"#;
    h.tx.send(QueueMsg::SpineDataToSend(spine.into())).unwrap();
    assert_eq!(step_from(&mut h, SmeState::DataExchange), SmeState::DataExchange);

    let frames = h.transport.written.lock().unwrap();
    assert_eq!(frames[0][0], 0x01, "spine datagrams travel as data frames");
    let text = std::str::from_utf8(&frames[0][1..]).unwrap();
    assert!(text.starts_with(r#"{"data":[{"header":[{"protocolId":"ee1.0"}]}"#));
    assert!(text.contains(r#"{"msgCounter":7}"#));
}

#[test]
fn test_data_exchange_close_announce_confirms_and_completes() {
    let mut h = harness(ShipRole::Client, true);

    push_control(&h.tx, r#"{"connectionClose":[{"phase":"announce"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::DataExchange), SmeState::Complete);

    assert_eq!(
        h.transport.written_messages().last().unwrap(),
        &ShipMessage::close_confirm()
    );
    assert!(h.transport.is_closed());
}

#[test]
fn test_data_exchange_cancel_announces_close() {
    let mut h = harness(ShipRole::Client, true);

    h.tx.send(QueueMsg::Cancel).unwrap();
    assert_eq!(step_from(&mut h, SmeState::DataExchange), SmeState::Complete);
    assert_eq!(
        h.transport.written_messages().last().unwrap(),
        &ShipMessage::close_announce()
    );
}

#[test]
fn test_data_exchange_rejects_handshake_messages() {
    let mut h = harness(ShipRole::Client, true);

    push_control(&h.tx, r#"{"connectionHello":[{"phase":"ready"}]}"#);
    assert_eq!(step_from(&mut h, SmeState::DataExchange), SmeState::Error);
}

#[test]
fn test_timeout_in_hello_listen_goes_through_timeout_state() {
    let mut h = harness(ShipRole::Client, true);

    // Force an immediately-expired wait-for-ready timer.
    h.core.force_state(SmeState::HelloReadyListen);
    // The timer is armed by HelloReadyInit; re-arm with zero duration via
    // the pending-init path instead: start and let it expire.
    step_from(&mut h, SmeState::HelloReadyInit);
    h.core.force_state(SmeState::HelloReadyListen);

    // No queue traffic: expiry after tHelloInit would take a minute, so
    // instead verify the timeout state transition directly.
    assert_eq!(step_from(&mut h, SmeState::HelloReadyTimeout), SmeState::HelloAbort);
}

#[test]
fn test_full_client_session_over_mock_transport() {
    // Drive the whole handshake through the public step() API.
    let mut h = harness(ShipRole::Client, true);

    assert_eq!(h.core.step(), SmeState::CmiClientSend);
    h.core.force_state(SmeState::CmiClientSend);
    assert_eq!(h.core.step(), SmeState::CmiClientWait);

    h.tx.send(QueueMsg::DataReceived(vec![0x00, 0x00])).unwrap();
    h.core.force_state(SmeState::CmiClientWait);
    assert_eq!(h.core.step(), SmeState::CmiClientEvaluate);
    h.core.force_state(SmeState::CmiClientEvaluate);
    assert_eq!(h.core.step(), SmeState::HelloReadyInit);

    h.core.force_state(SmeState::HelloReadyInit);
    assert_eq!(h.core.step(), SmeState::HelloReadyListen);
    push_control(&h.tx, r#"{"connectionHello":[{"phase":"ready"}]}"#);
    h.core.force_state(SmeState::HelloReadyListen);
    assert_eq!(h.core.step(), SmeState::HelloOk);

    h.core.force_state(SmeState::HelloOk);
    assert_eq!(h.core.step(), SmeState::ProtocolClientInit);
    h.core.force_state(SmeState::ProtocolClientInit);
    assert_eq!(h.core.step(), SmeState::ProtocolClientListenChoice);
    push_control(
        &h.tx,
        concat!(
            r#"{"messageProtocolHandshake":[{"handshakeType":"select"},"#,
            r#"{"version":[{"major":1},{"minor":0}]},"#,
            r#"{"formats":[{"format":["JSON-UTF8"]}]}]}"#
        ),
    );
    h.core.force_state(SmeState::ProtocolClientListenChoice);
    assert_eq!(h.core.step(), SmeState::ProtocolClientOk);

    h.core.force_state(SmeState::ProtocolClientOk);
    assert_eq!(h.core.step(), SmeState::PinCheckInit);
    h.core.force_state(SmeState::PinCheckInit);
    assert_eq!(h.core.step(), SmeState::PinCheckListen);
    push_control(&h.tx, r#"{"connectionPinState":[{"pinState":"none"}]}"#);
    h.core.force_state(SmeState::PinCheckListen);
    assert_eq!(h.core.step(), SmeState::PinCheckOk);

    h.core.force_state(SmeState::PinCheckOk);
    assert_eq!(h.core.step(), SmeState::AccessMethodsRequest);
    h.core.force_state(SmeState::AccessMethodsRequest);
    assert_eq!(h.core.step(), SmeState::DataExchange);
}

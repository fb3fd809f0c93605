// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The SHIP connection state machine (SME).
//!
//! One service thread per connection owns the state machine iteration,
//! the outbound write path, and timer expiry. External work reaches it
//! through a bounded queue of [`QueueMsg`] envelopes: frames from the
//! transport's I/O thread, SPINE datagrams from the host, and
//! cancellation. Timer deadlines bound the queue receive, so expiry is
//! observed by the same loop between envelopes.
//!
//! # State Machine (client happy path)
//!
//! ```text
//!   CmiInitStart -> CmiClientSend -> CmiClientWait -> CmiClientEvaluate
//!        |                                                  |
//!        v                                                  v
//!   HelloReadyInit -> HelloReadyListen -> HelloOk
//!   (HelloPendingInit/Listen while the peer is not yet trusted)
//!        |
//!        v
//!   ProtocolClientInit -> ProtocolClientListenChoice -> ProtocolClientOk
//!        |
//!        v
//!   PinCheckInit -> PinCheckListen -> PinCheckOk -> AccessMethodsRequest
//!        |
//!        v
//!   DataExchange --(close/cancel)--> Complete
//!        |
//!        +--(violation/timeout)--> HelloAbort -> Error -> Complete
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ship::message::{
    self, ClosePhase, HandshakeType, HelloPhase, PinState, ShipMessage,
};
use crate::ship::timer::{TimerKind, Timers};

/// Guard for the CMI init exchange and the access-methods phase.
pub const CMI_TIMEOUT: Duration = Duration::from_secs(60);
/// Hello phase wait (`tHelloInit`).
pub const T_HELLO_INIT: Duration = Duration::from_secs(60);
/// Threshold below which a peer's remaining wait calls for prolongation
/// (`tHelloProlongThrInc`).
pub const T_HELLO_PROLONG_THR_INC: Duration = Duration::from_secs(15);
/// Guard for the protocol-handshake and pin phases.
pub const T_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// SHIP protocol version announced in the handshake.
pub const SHIP_VERSION: (u64, u64) = (1, 0);
/// The only supported serialisation format.
pub const FORMAT_JSON_UTF8: &str = "JSON-UTF8";

const QUEUE_CAPACITY: usize = 32;

/// Which side of the TLS WebSocket we are.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShipRole {
    Client,
    Server,
}

/// SME states. One state is run per queue iteration; each state handler
/// returns the next state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmeState {
    CmiInitStart,
    CmiClientSend,
    CmiClientWait,
    CmiClientEvaluate,
    CmiServerWait,
    CmiServerEvaluate,
    HelloReadyInit,
    HelloReadyListen,
    HelloReadyTimeout,
    HelloPendingInit,
    HelloPendingListen,
    HelloPendingTimeout,
    HelloOk,
    HelloAbort,
    ProtocolClientInit,
    ProtocolClientListenChoice,
    ProtocolClientOk,
    ProtocolServerListenProposal,
    ProtocolServerListenConfirm,
    ProtocolServerOk,
    PinCheckInit,
    PinCheckListen,
    PinCheckOk,
    AccessMethodsRequest,
    DataExchange,
    Error,
    Complete,
}

impl std::fmt::Display for SmeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Envelope queue feeding the service thread.
#[derive(Debug)]
pub enum QueueMsg {
    /// One assembled SHIP frame from the transport's I/O thread.
    DataReceived(Vec<u8>),
    /// A SPINE datagram from the host, to be wrapped and written.
    SpineDataToSend(String),
    /// The host marked the remote SKI as trusted.
    Trusted,
    /// Teardown request.
    Cancel,
}

/// The transport below the SME: an opaque byte-duplex whose reads are
/// delivered through the connection queue.
pub trait ShipTransport: Send + Sync {
    /// Write one frame; returns the number of bytes accepted (a short
    /// write means failure).
    fn write(&self, frame: &[u8]) -> usize;
    /// Tear down the transport.
    fn close(&self, reason: &str);
    fn is_closed(&self) -> bool;
}

/// Host-side observer of the connection.
pub trait ConnectionHandler: Send + Sync {
    /// Every SME state change, with the terminal close error when the
    /// state is [`SmeState::Error`].
    fn on_state_change(&self, remote_ski: &str, state: SmeState, close_error: &str);
    /// A SPINE document received in the data-exchange state.
    fn on_spine_data(&self, remote_ski: &str, spine_json: &str);
}

/// Connection parameters fixed at open time.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub role: ShipRole,
    pub local_ski: String,
    pub remote_ski: String,
    /// Our access-methods identifier (sent in `accessMethods`).
    pub access_methods_id: String,
    /// Whether the remote SKI is already registered as trusted.
    pub trusted: bool,
}

enum WaitOutcome {
    Msg(QueueMsg),
    Timeout(TimerKind),
}

/// The state machine core. Owns the queue receiver and the timers; a
/// [`ShipConnection`] runs it on a dedicated service thread.
pub struct SmeCore {
    config: ConnectionConfig,
    transport: Arc<dyn ShipTransport>,
    handler: Arc<dyn ConnectionHandler>,
    rx: Receiver<QueueMsg>,

    state: SmeState,
    timers: Timers,
    close_error: String,
    trusted: bool,
    pending_message: Option<ShipMessage>,
    access_methods_sent: bool,
    access_methods_received: bool,
}

impl SmeCore {
    pub fn new(
        config: ConnectionConfig,
        transport: Arc<dyn ShipTransport>,
        handler: Arc<dyn ConnectionHandler>,
        rx: Receiver<QueueMsg>,
    ) -> SmeCore {
        let trusted = config.trusted;
        SmeCore {
            config,
            transport,
            handler,
            rx,
            state: SmeState::CmiInitStart,
            timers: Timers::default(),
            close_error: String::new(),
            trusted,
            pending_message: None,
            access_methods_sent: false,
            access_methods_received: false,
        }
    }

    pub fn state(&self) -> SmeState {
        self.state
    }

    /// Run the machine to completion.
    pub fn run(mut self) {
        while self.state != SmeState::Complete {
            let next = self.step();
            self.transition(next);
        }
    }

    /// Execute the current state's handler once and return the next
    /// state. Public for the state-level tests.
    pub fn step(&mut self) -> SmeState {
        match self.state {
            SmeState::CmiInitStart => self.cmi_init_start(),
            SmeState::CmiClientSend => self.cmi_client_send(),
            SmeState::CmiClientWait | SmeState::CmiServerWait => self.cmi_wait(),
            SmeState::CmiClientEvaluate => self.cmi_client_evaluate(),
            SmeState::CmiServerEvaluate => self.cmi_server_evaluate(),
            SmeState::HelloReadyInit => self.hello_ready_init(),
            SmeState::HelloReadyListen => self.hello_ready_listen(),
            SmeState::HelloReadyTimeout | SmeState::HelloPendingTimeout => self.hello_timeout(),
            SmeState::HelloPendingInit => self.hello_pending_init(),
            SmeState::HelloPendingListen => self.hello_pending_listen(),
            SmeState::HelloOk => self.hello_ok(),
            SmeState::HelloAbort => self.hello_abort(),
            SmeState::ProtocolClientInit => self.protocol_client_init(),
            SmeState::ProtocolClientListenChoice => self.protocol_client_listen_choice(),
            SmeState::ProtocolClientOk | SmeState::ProtocolServerOk => self.protocol_ok(),
            SmeState::ProtocolServerListenProposal => self.protocol_server_listen_proposal(),
            SmeState::ProtocolServerListenConfirm => self.protocol_server_listen_confirm(),
            SmeState::PinCheckInit => self.pin_check_init(),
            SmeState::PinCheckListen => self.pin_check_listen(),
            SmeState::PinCheckOk => self.pin_check_ok(),
            SmeState::AccessMethodsRequest => self.access_methods_request(),
            SmeState::DataExchange => self.data_exchange(),
            SmeState::Error => SmeState::Complete,
            SmeState::Complete => SmeState::Complete,
        }
    }

    /// Set the state for a state-level test.
    #[doc(hidden)]
    pub fn force_state(&mut self, state: SmeState) {
        self.state = state;
    }

    fn transition(&mut self, next: SmeState) {
        if next == self.state {
            return;
        }

        debug!(
            "ship[{}]: {} -> {}",
            self.config.remote_ski, self.state, next
        );
        self.state = next;

        let close_error = if next == SmeState::Error {
            self.close_error.clone()
        } else {
            String::new()
        };
        self.handler
            .on_state_change(&self.config.remote_ski, next, &close_error);
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn send(&self, message: &ShipMessage) -> bool {
        match message::encode(message) {
            Ok(frame) => self.transport.write(&frame) == frame.len(),
            Err(err) => {
                warn!("ship[{}]: encode failed: {}", self.config.remote_ski, err);
                false
            }
        }
    }

    /// Block on the queue, honouring running timers. Timer expiry stops
    /// the timer and surfaces as a timeout outcome.
    fn wait_event(&mut self) -> WaitOutcome {
        loop {
            match self.timers.next_deadline() {
                Some((kind, deadline)) => {
                    let now = Instant::now();
                    if deadline <= now {
                        self.timers.get_mut(kind).stop();
                        return WaitOutcome::Timeout(kind);
                    }

                    match self.rx.recv_timeout(deadline - now) {
                        Ok(msg) => return WaitOutcome::Msg(msg),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => {
                            return WaitOutcome::Msg(QueueMsg::Cancel)
                        }
                    }
                }
                None => match self.rx.recv() {
                    Ok(msg) => return WaitOutcome::Msg(msg),
                    Err(_) => return WaitOutcome::Msg(QueueMsg::Cancel),
                },
            }
        }
    }

    fn decode_frame(&self, frame: &[u8]) -> Option<ShipMessage> {
        match message::decode(frame) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(
                    "ship[{}]: dropping undecodable frame: {}",
                    self.config.remote_ski, err
                );
                None
            }
        }
    }

    /// Abort with a close error: stop every timer, tear the transport
    /// down, and land in the error state.
    fn close_with_error(&mut self, error: &str) -> SmeState {
        info!("ship[{}]: closing: {}", self.config.remote_ski, error);
        self.close_error = error.to_owned();
        self.timers.stop_all();

        if !self.transport.is_closed() {
            self.transport.close(error);
        }

        SmeState::Error
    }

    // ========================================================================
    // CMI phase
    // ========================================================================

    fn cmi_init_start(&mut self) -> SmeState {
        self.timers.wait_for_ready.start(CMI_TIMEOUT);
        match self.config.role {
            ShipRole::Client => SmeState::CmiClientSend,
            ShipRole::Server => SmeState::CmiServerWait,
        }
    }

    fn cmi_client_send(&mut self) -> SmeState {
        if !self.send(&ShipMessage::Init) {
            return self.close_with_error("CMI: error sending init message");
        }
        SmeState::CmiClientWait
    }

    fn cmi_wait(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => {
                self.close_with_error("CMI: timeout waiting for init message")
            }
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => self.close_with_error("CMI: cancelled"),
            WaitOutcome::Msg(QueueMsg::Trusted) => {
                self.trusted = true;
                self.state
            }
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => {
                self.pending_message = self.decode_frame(&frame);
                match self.config.role {
                    ShipRole::Client => SmeState::CmiClientEvaluate,
                    ShipRole::Server => SmeState::CmiServerEvaluate,
                }
            }
        }
    }

    fn cmi_client_evaluate(&mut self) -> SmeState {
        match self.pending_message.take() {
            Some(ShipMessage::Init) => {
                self.timers.wait_for_ready.stop();
                self.hello_entry()
            }
            _ => self.close_with_error("CMI: unexpected message instead of init"),
        }
    }

    fn cmi_server_evaluate(&mut self) -> SmeState {
        match self.pending_message.take() {
            Some(ShipMessage::Init) => {
                if !self.send(&ShipMessage::Init) {
                    return self.close_with_error("CMI: error echoing init message");
                }
                self.timers.wait_for_ready.stop();
                self.hello_entry()
            }
            _ => self.close_with_error("CMI: unexpected message instead of init"),
        }
    }

    fn hello_entry(&self) -> SmeState {
        if self.trusted {
            SmeState::HelloReadyInit
        } else {
            SmeState::HelloPendingInit
        }
    }

    // ========================================================================
    // Hello phase
    // ========================================================================

    fn hello_ready_init(&mut self) -> SmeState {
        self.timers.wait_for_ready.start(T_HELLO_INIT);
        if !self.send(&ShipMessage::hello(HelloPhase::Ready, None, None)) {
            return SmeState::HelloAbort;
        }
        SmeState::HelloReadyListen
    }

    fn hello_ready_listen(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => SmeState::HelloReadyTimeout,
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => SmeState::HelloAbort,
            WaitOutcome::Msg(QueueMsg::Trusted) => self.state,
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => {
                let Some(message) = self.decode_frame(&frame) else {
                    return SmeState::HelloAbort;
                };

                match message {
                    ShipMessage::Hello {
                        phase: HelloPhase::Ready,
                        ..
                    } => {
                        self.timers.wait_for_ready.stop();
                        SmeState::HelloOk
                    }
                    ShipMessage::Hello {
                        phase: HelloPhase::Aborted,
                        ..
                    } => SmeState::HelloAbort,
                    ShipMessage::Hello {
                        phase: HelloPhase::Pending,
                        prolongation_request,
                        ..
                    } => {
                        if prolongation_request == Some(true) {
                            if !self.send(&ShipMessage::hello(HelloPhase::Pending, None, None)) {
                                return SmeState::HelloAbort;
                            }
                            self.timers.wait_for_ready.start(T_HELLO_INIT);
                        }
                        self.state
                    }
                    _ => SmeState::HelloAbort,
                }
            }
        }
    }

    fn hello_pending_init(&mut self) -> SmeState {
        let waiting = T_HELLO_INIT.as_millis() as u64;
        if !self.send(&ShipMessage::hello(HelloPhase::Pending, Some(waiting), None)) {
            return SmeState::HelloAbort;
        }
        self.timers.wait_for_ready.start(T_HELLO_INIT);
        SmeState::HelloPendingListen
    }

    /// The peer told us its remaining wait: restart the prolongation
    /// machinery around it.
    fn handle_peer_waiting(&mut self, waiting_ms: u64) {
        self.timers.prolongation_reply.stop();

        let waiting = Duration::from_millis(waiting_ms);
        if waiting > T_HELLO_PROLONG_THR_INC {
            self.timers
                .send_prolongation
                .start(waiting - T_HELLO_PROLONG_THR_INC);
        } else {
            self.timers.send_prolongation.stop();
        }
    }

    fn hello_pending_listen(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => SmeState::HelloPendingTimeout,
            WaitOutcome::Timeout(TimerKind::SendProlongation) => {
                if !self.send(&ShipMessage::hello(HelloPhase::Pending, None, Some(true))) {
                    return SmeState::HelloAbort;
                }
                self.timers
                    .prolongation_reply
                    .start(T_HELLO_PROLONG_THR_INC);
                self.state
            }
            WaitOutcome::Timeout(TimerKind::ProlongationReply) => SmeState::HelloAbort,
            WaitOutcome::Msg(QueueMsg::Cancel) => SmeState::HelloAbort,
            WaitOutcome::Msg(QueueMsg::Trusted) => {
                self.trusted = true;
                SmeState::HelloReadyInit
            }
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => {
                let Some(message) = self.decode_frame(&frame) else {
                    return SmeState::HelloAbort;
                };

                match message {
                    ShipMessage::Hello {
                        phase: HelloPhase::Aborted,
                        ..
                    } => SmeState::HelloAbort,
                    ShipMessage::Hello {
                        phase: HelloPhase::Ready,
                        waiting: None,
                        ..
                    } => {
                        // Ready with no waiting while we are still
                        // pending is a protocol violation from the peer.
                        SmeState::HelloAbort
                    }
                    ShipMessage::Hello {
                        phase: HelloPhase::Ready,
                        waiting: Some(waiting),
                        ..
                    } => {
                        self.timers.wait_for_ready.start(T_HELLO_INIT);
                        self.handle_peer_waiting(waiting);
                        self.state
                    }
                    ShipMessage::Hello {
                        phase: HelloPhase::Pending,
                        waiting,
                        prolongation_request,
                    } => {
                        if prolongation_request == Some(true) {
                            if !self.send(&ShipMessage::hello(HelloPhase::Pending, None, None)) {
                                return SmeState::HelloAbort;
                            }
                            self.timers.wait_for_ready.start(T_HELLO_INIT);
                        } else if let Some(waiting) = waiting {
                            self.handle_peer_waiting(waiting);
                        }
                        self.state
                    }
                    _ => SmeState::HelloAbort,
                }
            }
        }
    }

    fn hello_timeout(&mut self) -> SmeState {
        // Tell the peer before tearing the session down.
        let _ = self.send(&ShipMessage::hello(HelloPhase::Aborted, None, None));
        SmeState::HelloAbort
    }

    fn hello_ok(&mut self) -> SmeState {
        self.timers.stop_all();
        match self.config.role {
            ShipRole::Client => SmeState::ProtocolClientInit,
            ShipRole::Server => {
                self.timers.wait_for_ready.start(T_HANDSHAKE_TIMEOUT);
                SmeState::ProtocolServerListenProposal
            }
        }
    }

    fn hello_abort(&mut self) -> SmeState {
        let _ = self.send(&ShipMessage::hello(HelloPhase::Aborted, None, None));
        self.close_with_error("SME Hello state connection aborted")
    }

    // ========================================================================
    // Protocol handshake phase
    // ========================================================================

    fn announce_handshake(&self) -> ShipMessage {
        ShipMessage::ProtocolHandshake {
            handshake_type: HandshakeType::AnnounceMax,
            major: SHIP_VERSION.0,
            minor: SHIP_VERSION.1,
            formats: vec![FORMAT_JSON_UTF8.to_owned()],
        }
    }

    fn select_handshake(&self) -> ShipMessage {
        ShipMessage::ProtocolHandshake {
            handshake_type: HandshakeType::Select,
            major: SHIP_VERSION.0,
            minor: SHIP_VERSION.1,
            formats: vec![FORMAT_JSON_UTF8.to_owned()],
        }
    }

    fn handshake_is_compatible(major: u64, minor: u64, formats: &[String]) -> bool {
        (major, minor) == SHIP_VERSION && formats.iter().any(|f| f == FORMAT_JSON_UTF8)
    }

    fn protocol_client_init(&mut self) -> SmeState {
        self.timers.wait_for_ready.start(T_HANDSHAKE_TIMEOUT);
        if !self.send(&self.announce_handshake()) {
            return self.close_with_error("protocol handshake: error sending announceMax");
        }
        SmeState::ProtocolClientListenChoice
    }

    fn protocol_client_listen_choice(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => {
                self.close_with_error("protocol handshake: timeout waiting for selection")
            }
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => {
                self.close_with_error("protocol handshake: cancelled")
            }
            WaitOutcome::Msg(QueueMsg::Trusted) => self.state,
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => {
                match self.decode_frame(&frame) {
                    Some(ShipMessage::ProtocolHandshake {
                        handshake_type: HandshakeType::Select,
                        major,
                        minor,
                        formats,
                    }) => {
                        if !Self::handshake_is_compatible(major, minor, &formats) {
                            let _ = self.send(&ShipMessage::ProtocolHandshakeError { error: 2 });
                            return self
                                .close_with_error("protocol handshake: no common version");
                        }

                        if !self.send(&self.select_handshake()) {
                            return self
                                .close_with_error("protocol handshake: error confirming selection");
                        }
                        SmeState::ProtocolClientOk
                    }
                    Some(ShipMessage::ProtocolHandshakeError { error }) => self.close_with_error(
                        &format!("protocol handshake: peer reported error {}", error),
                    ),
                    _ => {
                        let _ = self.send(&ShipMessage::ProtocolHandshakeError { error: 1 });
                        self.close_with_error("protocol handshake: unexpected message")
                    }
                }
            }
        }
    }

    fn protocol_server_listen_proposal(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => {
                self.close_with_error("protocol handshake: timeout waiting for announceMax")
            }
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => {
                self.close_with_error("protocol handshake: cancelled")
            }
            WaitOutcome::Msg(QueueMsg::Trusted) => self.state,
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => {
                match self.decode_frame(&frame) {
                    Some(ShipMessage::ProtocolHandshake {
                        handshake_type: HandshakeType::AnnounceMax,
                        major,
                        minor,
                        formats,
                    }) => {
                        if !Self::handshake_is_compatible(major, minor, &formats) {
                            let _ = self.send(&ShipMessage::ProtocolHandshakeError { error: 2 });
                            return self
                                .close_with_error("protocol handshake: no common version");
                        }

                        if !self.send(&self.select_handshake()) {
                            return self
                                .close_with_error("protocol handshake: error sending selection");
                        }
                        self.timers.wait_for_ready.start(T_HANDSHAKE_TIMEOUT);
                        SmeState::ProtocolServerListenConfirm
                    }
                    _ => {
                        let _ = self.send(&ShipMessage::ProtocolHandshakeError { error: 1 });
                        self.close_with_error("protocol handshake: unexpected message")
                    }
                }
            }
        }
    }

    fn protocol_server_listen_confirm(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => {
                self.close_with_error("protocol handshake: timeout waiting for confirmation")
            }
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => {
                self.close_with_error("protocol handshake: cancelled")
            }
            WaitOutcome::Msg(QueueMsg::Trusted) => self.state,
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => match self.decode_frame(&frame) {
                Some(ShipMessage::ProtocolHandshake {
                    handshake_type: HandshakeType::Select,
                    major,
                    minor,
                    formats,
                }) if Self::handshake_is_compatible(major, minor, &formats) => {
                    SmeState::ProtocolServerOk
                }
                _ => {
                    let _ = self.send(&ShipMessage::ProtocolHandshakeError { error: 1 });
                    self.close_with_error("protocol handshake: bad confirmation")
                }
            },
        }
    }

    fn protocol_ok(&mut self) -> SmeState {
        self.timers.stop_all();
        SmeState::PinCheckInit
    }

    // ========================================================================
    // Pin phase
    // ========================================================================

    fn pin_check_init(&mut self) -> SmeState {
        self.timers.wait_for_ready.start(T_HANDSHAKE_TIMEOUT);
        if !self.send(&ShipMessage::PinState {
            pin_state: PinState::None,
        }) {
            return self.close_with_error("pin check: error sending pin state");
        }
        SmeState::PinCheckListen
    }

    fn pin_check_listen(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => {
                self.close_with_error("pin check: timeout waiting for pin state")
            }
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => self.close_with_error("pin check: cancelled"),
            WaitOutcome::Msg(QueueMsg::Trusted) => self.state,
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(_)) => self.state,
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => match self.decode_frame(&frame) {
                Some(ShipMessage::PinState {
                    pin_state: PinState::None,
                }) => SmeState::PinCheckOk,
                Some(ShipMessage::PinState { .. }) => {
                    self.close_with_error("pin check: pin not supported")
                }
                _ => self.close_with_error("pin check: unexpected message"),
            },
        }
    }

    fn pin_check_ok(&mut self) -> SmeState {
        self.timers.stop_all();
        SmeState::AccessMethodsRequest
    }

    // ========================================================================
    // Access methods + data exchange
    // ========================================================================

    fn access_methods_request(&mut self) -> SmeState {
        if !self.send(&ShipMessage::AccessMethodsRequest) {
            return self.close_with_error("access methods: error sending request");
        }
        self.timers.wait_for_ready.start(CMI_TIMEOUT);
        SmeState::DataExchange
    }

    fn access_methods_complete(&self) -> bool {
        self.access_methods_sent && self.access_methods_received
    }

    fn data_exchange(&mut self) -> SmeState {
        match self.wait_event() {
            WaitOutcome::Timeout(TimerKind::WaitForReady) => {
                if self.access_methods_complete() {
                    self.state
                } else {
                    self.close_with_error("access methods exchange timed out")
                }
            }
            WaitOutcome::Timeout(_) => self.state,
            WaitOutcome::Msg(QueueMsg::Cancel) => {
                let _ = self.send(&ShipMessage::close_announce());
                self.timers.stop_all();
                if !self.transport.is_closed() {
                    self.transport.close("");
                }
                SmeState::Complete
            }
            WaitOutcome::Msg(QueueMsg::Trusted) => self.state,
            WaitOutcome::Msg(QueueMsg::SpineDataToSend(payload)) => {
                if !self.send(&ShipMessage::Data { payload }) {
                    return self.close_with_error("data exchange: error writing data frame");
                }
                self.state
            }
            WaitOutcome::Msg(QueueMsg::DataReceived(frame)) => {
                let Some(message) = self.decode_frame(&frame) else {
                    // Per-frame decode errors do not take the session down.
                    return self.state;
                };

                match message {
                    ShipMessage::Data { payload } => {
                        self.handler
                            .on_spine_data(&self.config.remote_ski, &payload);
                        self.state
                    }
                    ShipMessage::AccessMethodsRequest => {
                        let reply = ShipMessage::AccessMethods {
                            id: Some(self.config.access_methods_id.clone()),
                        };
                        if !self.send(&reply) {
                            return self
                                .close_with_error("data exchange: error sending access methods");
                        }
                        self.access_methods_sent = true;
                        if self.access_methods_complete() {
                            self.timers.wait_for_ready.stop();
                        }
                        self.state
                    }
                    ShipMessage::AccessMethods { id } => {
                        debug!(
                            "ship[{}]: peer access methods id {:?}",
                            self.config.remote_ski, id
                        );
                        self.access_methods_received = true;
                        if self.access_methods_complete() {
                            self.timers.wait_for_ready.stop();
                        }
                        self.state
                    }
                    ShipMessage::Close {
                        phase: ClosePhase::Announce,
                        ..
                    } => {
                        let _ = self.send(&ShipMessage::close_confirm());
                        self.timers.stop_all();
                        if !self.transport.is_closed() {
                            self.transport.close("");
                        }
                        SmeState::Complete
                    }
                    ShipMessage::Close {
                        phase: ClosePhase::Confirm,
                        ..
                    } => {
                        self.timers.stop_all();
                        SmeState::Complete
                    }
                    ShipMessage::End => {
                        self.timers.stop_all();
                        if !self.transport.is_closed() {
                            self.transport.close("");
                        }
                        SmeState::Complete
                    }
                    _ => self.close_with_error("data exchange: unexpected handshake message"),
                }
            }
        }
    }
}

/// Handle to the queue feeding a connection's service thread; the
/// transport I/O thread pushes assembled frames through it.
#[derive(Clone)]
pub struct ConnectionInput {
    tx: Sender<QueueMsg>,
}

impl ConnectionInput {
    pub fn new(tx: Sender<QueueMsg>) -> ConnectionInput {
        ConnectionInput { tx }
    }

    pub fn push_frame(&self, frame: Vec<u8>) -> Result<()> {
        self.tx
            .try_send(QueueMsg::DataReceived(frame))
            .map_err(|_| Error::Memory)
    }

    pub fn cancel(&self) {
        let _ = self.tx.try_send(QueueMsg::Cancel);
    }
}

/// Cloneable handle for submitting outbound SPINE datagrams; the host
/// thread is the only producer.
#[derive(Clone)]
pub struct SpineSender {
    tx: Sender<QueueMsg>,
}

impl SpineSender {
    pub fn send(&self, spine_json: &str) -> Result<()> {
        self.tx
            .try_send(QueueMsg::SpineDataToSend(spine_json.to_owned()))
            .map_err(|_| Error::Memory)
    }
}

/// A live SHIP connection: the SME core running on its service thread.
pub struct ShipConnection {
    tx: Sender<QueueMsg>,
    service: Option<JoinHandle<()>>,
    remote_ski: String,
}

impl ShipConnection {
    /// Create the connection queue up front, so a transport can deliver
    /// frames into it before the service thread exists.
    pub fn queue() -> (Sender<QueueMsg>, Receiver<QueueMsg>) {
        bounded(QUEUE_CAPACITY)
    }

    /// Spawn the service thread. The returned [`ConnectionInput`] is for
    /// the transport's read path.
    pub fn open(
        config: ConnectionConfig,
        transport: Arc<dyn ShipTransport>,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<(ShipConnection, ConnectionInput)> {
        let (tx, rx) = Self::queue();
        Self::open_with_queue(config, transport, handler, tx, rx)
    }

    /// Spawn the service thread over a queue made with [`Self::queue`].
    pub fn open_with_queue(
        config: ConnectionConfig,
        transport: Arc<dyn ShipTransport>,
        handler: Arc<dyn ConnectionHandler>,
        tx: Sender<QueueMsg>,
        rx: Receiver<QueueMsg>,
    ) -> Result<(ShipConnection, ConnectionInput)> {
        let remote_ski = config.remote_ski.clone();

        let core = SmeCore::new(config, transport, handler, rx);
        let service = std::thread::Builder::new()
            .name(format!("ship-{}", &remote_ski[..remote_ski.len().min(8)]))
            .spawn(move || core.run())
            .map_err(|_| Error::Thread)?;

        let input = ConnectionInput { tx: tx.clone() };
        Ok((
            ShipConnection {
                tx,
                service: Some(service),
                remote_ski,
            },
            input,
        ))
    }

    pub fn remote_ski(&self) -> &str {
        &self.remote_ski
    }

    /// Handle for the host's outbound SPINE datagrams.
    pub fn spine_sender(&self) -> SpineSender {
        SpineSender {
            tx: self.tx.clone(),
        }
    }

    /// Queue a SPINE datagram for transmission.
    pub fn send_spine_data(&self, spine_json: &str) -> Result<()> {
        self.tx
            .try_send(QueueMsg::SpineDataToSend(spine_json.to_owned()))
            .map_err(|_| Error::Memory)
    }

    /// Mark the remote SKI as trusted (moves a pending hello forward).
    pub fn set_trusted(&self) {
        let _ = self.tx.try_send(QueueMsg::Trusted);
    }

    /// Controlled teardown: enqueue cancel, join the service thread.
    pub fn close(&mut self) {
        // Blocking send: a full queue still delivers the cancel once the
        // service thread drains it; a finished thread has dropped the
        // receiver and the send fails immediately.
        let _ = self.tx.send(QueueMsg::Cancel);
        if let Some(service) = self.service.take() {
            let _ = service.join();
        }
    }
}

impl Drop for ShipConnection {
    fn drop(&mut self) {
        self.close();
    }
}

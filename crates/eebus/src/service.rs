// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node service facade.
//!
//! Owns the TLS listener, the SHIP connections, and the local SPINE
//! device; the host drives it through a small surface: open, register a
//! remote SKI, publish function data, bind/subscribe, close, and receive
//! events through a callback.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{info, warn};
use parking_lot::Mutex;

use crate::cert::TlsCredentials;
use crate::data::Value;
use crate::error::{Error, Result};
use crate::ship::connection::{
    ConnectionConfig, ConnectionHandler, ConnectionInput, ShipConnection, ShipRole, ShipTransport,
    SmeState, SpineSender,
};
use crate::spine::device::{Device, SpineEvent, UseCase};
use crate::spine::model::{FeatureAddress, FunctionType};
use crate::spine::sender::DatagramWriter;
use crate::transport::websocket::{self, WsTransport};
use crate::transport::{client_config, server_config};

/// Host-visible events.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A SHIP connection changed state (terminal errors carry the close
    /// error string).
    ShipState {
        remote_ski: String,
        state: SmeState,
        close_error: String,
    },
    /// The SPINE dispatcher produced an event for this node.
    Spine {
        remote_ski: String,
        event: SpineEvent,
    },
}

/// Service parameters.
#[derive(Clone, Debug)]
pub struct NodeServiceConfig {
    /// TCP port the SHIP server listens on.
    pub port: u16,
    /// SPINE device id (e.g. `d:_i:Demo_EVSE-234567890`).
    pub device_address: String,
    /// `deviceType` enum value advertised in discovery.
    pub device_type: u32,
    /// `networkFeatureSet` enum value advertised in discovery.
    pub network_feature_set: u32,
}

pub type EventCallback = Arc<dyn Fn(NodeEvent) + Send + Sync>;

/// Routes the device's outbound datagrams to the active SHIP connection.
struct LinkWriter {
    link: Arc<Mutex<Option<SpineSender>>>,
}

impl DatagramWriter for LinkWriter {
    fn write_datagram(&mut self, text: &str) -> Result<()> {
        match self.link.lock().as_ref() {
            Some(sender) => sender.send(text),
            None => Err(Error::Transport("no active SHIP connection".into())),
        }
    }
}

struct ServiceHandler {
    device: Arc<Mutex<Device>>,
    events: EventCallback,
}

impl ConnectionHandler for ServiceHandler {
    fn on_state_change(&self, remote_ski: &str, state: SmeState, close_error: &str) {
        (self.events)(NodeEvent::ShipState {
            remote_ski: remote_ski.to_owned(),
            state,
            close_error: close_error.to_owned(),
        });
    }

    fn on_spine_data(&self, remote_ski: &str, spine_json: &str) {
        let events = self.device.lock().handle_datagram(spine_json);
        for event in events {
            (self.events)(NodeEvent::Spine {
                remote_ski: remote_ski.to_owned(),
                event,
            });
        }
    }
}

struct ConnectionEntry {
    connection: ShipConnection,
    transport: Arc<WsTransport>,
}

struct ServiceShared {
    config: NodeServiceConfig,
    credentials: Arc<TlsCredentials>,
    device: Arc<Mutex<Device>>,
    events: EventCallback,
    trusted_skis: Mutex<Vec<String>>,
    connections: Mutex<HashMap<String, ConnectionEntry>>,
    active_link: Arc<Mutex<Option<SpineSender>>>,
    running: AtomicBool,
}

/// The EEBUS node service.
pub struct NodeService {
    shared: Arc<ServiceShared>,
    listener: Option<JoinHandle<()>>,
}

impl NodeService {
    /// Open the service: build the device, start the SHIP listener.
    pub fn open(
        config: NodeServiceConfig,
        credentials: TlsCredentials,
        events: EventCallback,
    ) -> Result<NodeService> {
        let active_link: Arc<Mutex<Option<SpineSender>>> = Arc::new(Mutex::new(None));

        let device = Arc::new(Mutex::new(Device::new(
            &config.device_address,
            config.device_type,
            config.network_feature_set,
            Box::new(LinkWriter {
                link: active_link.clone(),
            }),
        )));

        let shared = Arc::new(ServiceShared {
            config,
            credentials: Arc::new(credentials),
            device,
            events,
            trusted_skis: Mutex::new(Vec::new()),
            connections: Mutex::new(HashMap::new()),
            active_link,
            running: AtomicBool::new(true),
        });

        let listener = Self::start_listener(shared.clone())?;

        Ok(NodeService {
            shared,
            listener: Some(listener),
        })
    }

    fn start_listener(shared: Arc<ServiceShared>) -> Result<JoinHandle<()>> {
        let listener = TcpListener::bind(("0.0.0.0", shared.config.port))
            .map_err(|e| Error::Init(format!("bind port {}: {}", shared.config.port, e)))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| Error::Init(format!("listener setup: {}", e)))?;

        info!(
            "SHIP server listening on port {} (ski {})",
            shared.config.port,
            shared.credentials.ski()
        );

        std::thread::Builder::new()
            .name("ship-listener".into())
            .spawn(move || {
                let tls_config = match server_config(&shared.credentials) {
                    Ok(config) => config,
                    Err(err) => {
                        warn!("TLS server config failed: {}", err);
                        return;
                    }
                };

                while shared.running.load(Ordering::SeqCst) {
                    match listener.accept() {
                        Ok((stream, peer)) => {
                            if let Err(err) = stream.set_nonblocking(false) {
                                warn!("accept from {}: {}", peer, err);
                                continue;
                            }
                            match websocket::accept(stream, tls_config.clone()) {
                                Ok((socket, peer_ski)) => {
                                    if let Err(err) = Self::attach_connection(
                                        &shared,
                                        socket,
                                        peer_ski,
                                        ShipRole::Server,
                                    ) {
                                        warn!("SHIP accept failed: {}", err);
                                    }
                                }
                                Err(err) => warn!("TLS/websocket accept from {}: {}", peer, err),
                            }
                        }
                        Err(ref err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            std::thread::sleep(Duration::from_millis(100));
                        }
                        Err(err) => {
                            warn!("listener accept: {}", err);
                            std::thread::sleep(Duration::from_millis(100));
                        }
                    }
                }
            })
            .map_err(|_| Error::Thread)
    }

    fn attach_connection(
        shared: &Arc<ServiceShared>,
        socket: websocket::TlsWebSocket,
        peer_ski: String,
        role: ShipRole,
    ) -> Result<()> {
        let trusted = shared.trusted_skis.lock().iter().any(|s| s == &peer_ski);

        let handler = Arc::new(ServiceHandler {
            device: shared.device.clone(),
            events: shared.events.clone(),
        });

        let connection_config = ConnectionConfig {
            role,
            local_ski: shared.credentials.ski().to_owned(),
            remote_ski: peer_ski.clone(),
            access_methods_id: format!("Ship-{}", shared.credentials.ski()),
            trusted,
        };

        // The queue exists before the transport so no early frame is lost.
        let (queue_tx, queue_rx) = ShipConnection::queue();
        let frame_input = ConnectionInput::new(queue_tx.clone());
        let close_input = frame_input.clone();

        let transport = WsTransport::start(
            socket,
            peer_ski.clone(),
            Box::new(move |frame| {
                if frame_input.push_frame(frame).is_err() {
                    warn!("SHIP queue full; dropping frame");
                }
            }),
            Box::new(move || close_input.cancel()),
        )?;

        let (connection, _input) = ShipConnection::open_with_queue(
            connection_config,
            transport.clone(),
            handler,
            queue_tx,
            queue_rx,
        )?;

        *shared.active_link.lock() = Some(connection.spine_sender());

        let mut connections = shared.connections.lock();
        if let Some(mut previous) = connections.remove(&peer_ski) {
            previous.connection.close();
            previous.transport.close("replaced by new connection");
        }
        connections.insert(
            peer_ski,
            ConnectionEntry {
                connection,
                transport,
            },
        );

        Ok(())
    }

    /// Dial a remote SHIP server (client role).
    pub fn connect(&self, host: &str, port: u16) -> Result<()> {
        let tls_config = client_config(&self.shared.credentials)?;
        let (socket, peer_ski) = websocket::connect(host, port, tls_config)?;
        Self::attach_connection(&self.shared, socket, peer_ski, ShipRole::Client)
    }

    /// Register a remote SKI as trusted; a pending hello on a live
    /// connection moves forward immediately.
    pub fn register_remote_ski(&self, ski: &str) {
        let ski = ski.to_lowercase();

        let mut trusted = self.shared.trusted_skis.lock();
        if !trusted.iter().any(|s| s == &ski) {
            trusted.push(ski.clone());
        }
        drop(trusted);

        if let Some(entry) = self.shared.connections.lock().get(&ski) {
            entry.connection.set_trusted();
        }
    }

    /// The local SKI (from the credentials).
    pub fn local_ski(&self) -> String {
        self.shared.credentials.ski().to_owned()
    }

    /// Run a closure against the SPINE device (entity setup, reads).
    pub fn with_device<R>(&self, f: impl FnOnce(&mut Device) -> R) -> R {
        f(&mut self.shared.device.lock())
    }

    /// Publish a function value out-of-band; subscribers get notified.
    pub fn publish(
        &self,
        entity_index: usize,
        feature_number: u32,
        function: FunctionType,
        delta: Value,
    ) -> Result<()> {
        self.shared
            .device
            .lock()
            .publish(entity_index, feature_number, function, delta)
    }

    /// Request a binding to a peer's server feature.
    pub fn bind(
        &self,
        client: &FeatureAddress,
        server: &FeatureAddress,
        server_feature_type: u32,
    ) -> Result<u64> {
        self.shared
            .device
            .lock()
            .call_bind(client, server, server_feature_type)
    }

    /// Subscribe to a peer's server feature.
    pub fn subscribe(
        &self,
        client: &FeatureAddress,
        server: &FeatureAddress,
        server_feature_type: u32,
    ) -> Result<u64> {
        self.shared
            .device
            .lock()
            .call_subscribe(client, server, server_feature_type)
    }

    /// Read a remote function.
    pub fn read(
        &self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        function: FunctionType,
    ) -> Result<u64> {
        self.shared.device.lock().send_read(src, dest, function, None)
    }

    /// Declare a use case advertised through node management.
    pub fn add_use_case(&self, use_case: UseCase) {
        self.shared.device.lock().add_use_case(use_case);
    }

    /// Controlled shutdown: stop the listener, close every connection,
    /// join their threads.
    pub fn close(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);

        if let Some(listener) = self.listener.take() {
            let _ = listener.join();
        }

        *self.shared.active_link.lock() = None;

        let mut connections = self.shared.connections.lock();
        for (_, mut entry) in connections.drain() {
            entry.connection.close();
            entry.transport.close("service shutdown");
            entry.transport.join();
        }
    }
}

impl Drop for NodeService {
    fn drop(&mut self) {
        self.close();
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocking WebSocket transport over TLS.
//!
//! One I/O thread per connection owns the socket. Reads are delivered to
//! the SHIP connection queue as assembled frames; writes travel through a
//! single-producer write queue so callers never block on the socket, and
//! the SME's `write` is a plain enqueue from any thread.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, ServerConnection, StreamOwned};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::server::{Request, Response};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

use crate::cert::calc_public_key_ski;
use crate::error::{Error, Result};
use crate::ship::connection::ShipTransport;
use crate::transport::tls::SUBPROTOCOL_SHIP;

/// Socket poll interval for the I/O loop.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const WRITE_QUEUE_CAPACITY: usize = 25;

enum WriteCmd {
    Frame(Vec<u8>),
    Close(String),
}

/// Either side of the TLS stream under the WebSocket.
pub enum TlsWebSocket {
    Server(WebSocket<StreamOwned<ServerConnection, TcpStream>>),
    Client(WebSocket<StreamOwned<ClientConnection, TcpStream>>),
}

impl TlsWebSocket {
    fn read(&mut self) -> tungstenite::Result<Message> {
        match self {
            TlsWebSocket::Server(ws) => ws.read(),
            TlsWebSocket::Client(ws) => ws.read(),
        }
    }

    fn send(&mut self, message: Message) -> tungstenite::Result<()> {
        match self {
            TlsWebSocket::Server(ws) => ws.send(message),
            TlsWebSocket::Client(ws) => ws.send(message),
        }
    }

    fn close(&mut self) {
        let _ = match self {
            TlsWebSocket::Server(ws) => ws.close(None),
            TlsWebSocket::Client(ws) => ws.close(None),
        };
    }
}

/// The [`ShipTransport`] implementation over a [`TlsWebSocket`].
pub struct WsTransport {
    wr_tx: Sender<WriteCmd>,
    closed: Arc<AtomicBool>,
    peer_ski: String,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

impl WsTransport {
    /// Spawn the I/O thread over an established WebSocket. `on_frame` is
    /// invoked on the I/O thread for every received binary message and
    /// must only enqueue (never run user code).
    pub fn start(
        socket: TlsWebSocket,
        peer_ski: String,
        on_frame: Box<dyn Fn(Vec<u8>) + Send>,
        on_closed: Box<dyn Fn() + Send>,
    ) -> Result<Arc<WsTransport>> {
        let (wr_tx, wr_rx) = crossbeam_channel::bounded(WRITE_QUEUE_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        let transport = Arc::new(WsTransport {
            wr_tx,
            closed: closed.clone(),
            peer_ski,
            io_thread: Mutex::new(None),
        });

        let handle = std::thread::Builder::new()
            .name("ship-ws-io".into())
            .spawn(move || io_loop(socket, wr_rx, closed, on_frame, on_closed))
            .map_err(|_| Error::Thread)?;

        *transport.io_thread.lock() = Some(handle);
        Ok(transport)
    }

    /// The SKI derived from the peer's certificate.
    pub fn peer_ski(&self) -> &str {
        &self.peer_ski
    }

    /// Join the I/O thread (after close).
    pub fn join(&self) {
        if let Some(handle) = self.io_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl ShipTransport for WsTransport {
    fn write(&self, frame: &[u8]) -> usize {
        if self.closed.load(Ordering::SeqCst) {
            return 0;
        }

        match self.wr_tx.try_send(WriteCmd::Frame(frame.to_vec())) {
            Ok(()) => frame.len(),
            Err(_) => 0,
        }
    }

    fn close(&self, reason: &str) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.wr_tx.try_send(WriteCmd::Close(reason.to_owned()));
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn io_loop(
    mut socket: TlsWebSocket,
    wr_rx: Receiver<WriteCmd>,
    closed: Arc<AtomicBool>,
    on_frame: Box<dyn Fn(Vec<u8>) + Send>,
    on_closed: Box<dyn Fn() + Send>,
) {
    loop {
        // Drain the write queue first so outbound latency stays bounded
        // by the read poll interval.
        while let Ok(cmd) = wr_rx.try_recv() {
            match cmd {
                WriteCmd::Frame(frame) => {
                    if let Err(err) = socket.send(Message::Binary(frame.into())) {
                        warn!("websocket write failed: {}", err);
                        closed.store(true, Ordering::SeqCst);
                    }
                }
                WriteCmd::Close(reason) => {
                    debug!("websocket closing: {}", reason);
                    socket.close();
                    closed.store(true, Ordering::SeqCst);
                }
            }
        }

        if closed.load(Ordering::SeqCst) {
            break;
        }

        match socket.read() {
            Ok(Message::Binary(data)) => on_frame(data.to_vec()),
            Ok(Message::Close(_)) => {
                closed.store(true, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut => {}
            Err(err) => {
                debug!("websocket read ended: {}", err);
                closed.store(true, Ordering::SeqCst);
                break;
            }
        }
    }

    on_closed();
}

/// Accept one SHIP WebSocket on an incoming TCP connection (server role).
/// Returns the socket and the peer-certificate SKI.
pub fn accept(
    stream: TcpStream,
    tls_config: Arc<rustls::ServerConfig>,
) -> Result<(TlsWebSocket, String)> {
    let mut conn = ServerConnection::new(tls_config)
        .map_err(|e| Error::Init(format!("TLS accept: {}", e)))?;

    complete_server_handshake(&mut conn, &stream)?;

    let peer_ski = peer_ski_from_certs(conn.peer_certificates())?;
    let tls_stream = StreamOwned::new(conn, stream);

    let socket = tungstenite::accept_hdr(tls_stream, |request: &Request, mut response: Response| {
        let offered = request
            .headers()
            .get("Sec-WebSocket-Protocol")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if offered.split(',').any(|p| p.trim() == SUBPROTOCOL_SHIP) {
            response.headers_mut().insert(
                "Sec-WebSocket-Protocol",
                SUBPROTOCOL_SHIP.parse().expect("static header value"),
            );
        }
        Ok(response)
    })
    .map_err(|e| Error::Transport(format!("websocket accept: {}", e)))?;

    // Handshakes ran blocking; the I/O loop polls with a short timeout.
    socket
        .get_ref()
        .sock
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(Error::from)?;

    Ok((TlsWebSocket::Server(socket), peer_ski))
}

/// Dial a SHIP WebSocket (client role). Returns the socket and the
/// peer-certificate SKI.
pub fn connect(
    host: &str,
    port: u16,
    tls_config: Arc<rustls::ClientConfig>,
) -> Result<(TlsWebSocket, String)> {
    let stream = TcpStream::connect((host, port)).map_err(Error::from)?;

    let server_name = ServerName::try_from(host.to_owned())
        .map_err(|_| Error::Init(format!("invalid server name {}", host)))?;
    let mut conn = ClientConnection::new(tls_config, server_name)
        .map_err(|e| Error::Init(format!("TLS connect: {}", e)))?;

    complete_client_handshake(&mut conn, &stream)?;

    let peer_ski = peer_ski_from_certs(conn.peer_certificates())?;
    let tls_stream = StreamOwned::new(conn, stream);

    let mut request = format!("wss://{}:{}/ship", host, port)
        .into_client_request()
        .map_err(|e| Error::Transport(format!("websocket request: {}", e)))?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        SUBPROTOCOL_SHIP.parse().expect("static header value"),
    );

    let (socket, _response) = tungstenite::client(request, tls_stream)
        .map_err(|e| Error::Transport(format!("websocket connect: {}", e)))?;

    socket
        .get_ref()
        .sock
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(Error::from)?;

    Ok((TlsWebSocket::Client(socket), peer_ski))
}

/// Drive the TLS handshake to completion; tolerates a socket that
/// already carries a read timeout.
macro_rules! drive_handshake {
    ($conn:expr, $stream:expr) => {{
        let mut stream_ref: &TcpStream = $stream;
        loop {
            if !$conn.is_handshaking() {
                break Ok(());
            }
            match $conn.complete_io(&mut stream_ref) {
                Ok(_) => {}
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut => {}
                Err(err) => {
                    break Err(Error::Transport(format!("TLS handshake: {}", err)));
                }
            }
        }
    }};
}

fn complete_server_handshake(conn: &mut ServerConnection, stream: &TcpStream) -> Result<()> {
    drive_handshake!(conn, stream)
}

fn complete_client_handshake(conn: &mut ClientConnection, stream: &TcpStream) -> Result<()> {
    drive_handshake!(conn, stream)
}

fn peer_ski_from_certs(
    certs: Option<&[rustls::pki_types::CertificateDer<'_>]>,
) -> Result<String> {
    let cert = certs
        .and_then(<[_]>::first)
        .ok_or_else(|| Error::Init("peer presented no certificate".into()))?;
    calc_public_key_ski(cert.as_ref())
}

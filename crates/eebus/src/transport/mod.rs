// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transport layer: TLS 1.2 WebSocket with mutual authentication.
//!
//! The SHIP layer treats the transport as an opaque byte-duplex (see
//! [`crate::ship::connection::ShipTransport`]); this module provides the
//! production implementation over rustls + tungstenite, with the peer's
//! SKI derived from its certificate for trust pinning.

pub mod tls;
pub mod websocket;

pub use tls::{client_config, server_config, SUBPROTOCOL_SHIP};
pub use websocket::{accept, connect, TlsWebSocket, WsTransport};

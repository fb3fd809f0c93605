// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SHIP: the transport-and-handshake protocol over the TLS WebSocket.
//!
//! SHIP establishes a trusted session between two endpoints identified by
//! their certificate SKIs, negotiates protocol versions, exchanges pins
//! and access methods, keeps the link alive, and then tunnels SPINE
//! through a `data` channel.

pub mod connection;
pub mod message;
pub mod timer;

#[cfg(test)]
mod connection_tests;

pub use connection::{
    ConnectionConfig, ConnectionHandler, ConnectionInput, QueueMsg, ShipConnection, ShipRole,
    ShipTransport, SmeCore, SmeState,
};
pub use message::{FragmentBuffer, MsgType, ShipMessage};
pub use timer::{Timer, TimerKind, Timers};

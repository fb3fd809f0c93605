// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # eebus - EEBUS SHIP/SPINE device node
//!
//! A pure Rust implementation of the EEBUS SHIP (Smart Home IP) and SPINE
//! (Smart Premises Interoperable Neutral-message Exchange) protocols for
//! home-energy devices: a HEMS (Home Energy Management System) and a CLS
//! (Controllable Local System, e.g. a heat pump or EV charger) exchanging
//! energy-management data over a mutually-authenticated TLS WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        Application Layer                            |
//! |        NodeService -> Device -> Entity -> Feature -> Function       |
//! +---------------------------------------------------------------------+
//! |                          SPINE Layer                                |
//! |   Datagram dispatch | Bindings | Subscriptions | Notifications      |
//! +---------------------------------------------------------------------+
//! |                          SHIP Layer                                 |
//! |   Connection state machine | Hello/Handshake | Keep-alive | Close   |
//! +---------------------------------------------------------------------+
//! |                        Transport Layer                              |
//! |        TLS 1.2 WebSocket (mutual auth, SKI pinning, `ship`)         |
//! +---------------------------------------------------------------------+
//! ```
//!
//! All SHIP and SPINE messages are serialised through a single
//! configuration-driven engine (see [`data`]): immutable schema tables
//! describe every record type, and a dynamic value tree carries instances.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NodeService`] | Entry point: owns the listener and SHIP connections |
//! | [`TlsCredentials`] | X.509 certificate/key pair plus derived SKI |
//! | [`spine::Device`] | The local SPINE device model and dispatcher |
//! | [`ship::ShipConnection`] | One SHIP session with its service thread |
//!
//! ## See Also
//!
//! - EEBUS SHIP TS v1.0.1
//! - EEBUS SPINE TS ProtocolSpecification v1.3.0

/// X.509 credential loading and SKI derivation.
pub mod cert;
/// Configuration-driven data-model engine (JSON <-> value trees).
pub mod data;
/// Crate-wide error type.
pub mod error;
/// Node service facade (listener, connections, host callbacks).
pub mod service;
/// SHIP: transport handshake, keep-alive, data exchange, close.
pub mod ship;
/// SPINE: data model registry, device tree, datagram dispatch.
pub mod spine;
/// TLS WebSocket transport.
pub mod transport;

pub use cert::TlsCredentials;
pub use error::{Error, Result};
pub use service::{NodeEvent, NodeService, NodeServiceConfig};

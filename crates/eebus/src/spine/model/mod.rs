// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The SPINE data-model registry.
//!
//! Build-time constant schema tables consumed by the data engine: common
//! types, node-management structures, device-side function payloads, and
//! the datagram envelope. The registry arrays in [`registry`] are the
//! single source of truth for function identity — their indices are used
//! as choice discriminators on the wire and as function ids in the
//! dispatcher.

pub mod common;
pub mod datagram;
pub mod enums;
pub mod functions;
pub mod node_management;
pub mod registry;

pub use common::{ErrorResult, FeatureAddress, PossibleOperations};
pub use datagram::{Cmd, CmdControl, Datagram, Filter, Header};
pub use enums::{CmdClassifier, Role};
pub use registry::{FunctionType, FUNCTION_COUNT};

/// The SPINE specification version this stack speaks.
pub const SPECIFICATION_VERSION: &str = "1.3.0";

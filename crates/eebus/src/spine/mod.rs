// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SPINE: the application protocol carried inside SHIP `data` frames.
//!
//! A request/notify/reply/result RPC over a structured data model
//! organised as devices -> entities -> features -> functions, with
//! binding and subscription tables for push delivery.
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                         Device                                |
//! |  +--------------------+  +--------------------------------+  |
//! |  |   Entity [0]       |  |   Entity [1..]                 |  |
//! |  |   NodeManagement   |  |   Measurement | LoadControl    |  |
//! |  |   (discovery,      |  |   ActuatorLevel | ...          |  |
//! |  |    bindings,       |  +--------------------------------+  |
//! |  |    subscriptions)  |                                      |
//! |  +--------------------+                                      |
//! |            |  dispatch (read/write/call/reply/result)        |
//! |  +---------v-----------------------------------------------+ |
//! |  |                       Sender                             | |
//! |  |  msg counter | datagram assembly | DatagramWriter        | |
//! |  +----------------------------------------------------------+ |
//! +--------------------------------------------------------------+
//! ```

pub mod device;
pub mod feature;
pub mod function;
pub mod model;
pub mod sender;

pub use device::{BindingEntry, Device, SpineEvent, SubscriptionEntry, UseCase};
pub use feature::{Entity, Feature};
pub use function::Function;
pub use model::{
    CmdClassifier, Cmd, Datagram, ErrorResult, FeatureAddress, Filter, FunctionType, Header,
    PossibleOperations, Role,
};
pub use sender::{DatagramWriter, Sender};

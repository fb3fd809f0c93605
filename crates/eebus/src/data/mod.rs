// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration-driven data-model engine.
//!
//! The entire wire surface of the stack — SHIP handshake messages, SPINE
//! datagrams, function payloads, selectors and element masks — is handled
//! by one interpreter:
//!
//! - [`DataCfg`] trees describe record types (immutable `'static` tables,
//!   declared in [`crate::spine::model`] and [`crate::ship::message`]);
//! - [`Value`] trees carry instances, with `Option<Value>` slots for the
//!   optional-presence semantics of the wire format;
//! - [`json`] binds the two to JSON text, [`ops`] provides the structural
//!   read/write/partial-write/delete primitives.
//!
//! ```
//! use eebus::data::{self, DataCfg, DataKind};
//!
//! static ADDRESS_CFG: [DataCfg; 2] = [
//!     DataCfg::new("street", DataKind::String),
//!     DataCfg::new("city", DataKind::String),
//! ];
//! static ADDRESS: DataCfg = DataCfg::new("address", DataKind::Sequence(&ADDRESS_CFG));
//!
//! let parsed = data::json::parse(
//!     &ADDRESS,
//!     r#"{"address":[{"street":"10 Downing Street"},{"city":"London"}]}"#,
//! ).unwrap();
//! let text = data::json::print(&ADDRESS, parsed.as_ref()).unwrap();
//! assert!(text.contains("London"));
//! ```

pub mod cfg;
pub mod json;
pub mod ops;
pub mod time;
pub mod value;

pub use cfg::{DataCfg, DataKind, EnumTable, FLAG_IDENTIFIER, FLAG_READ_ONLY};
pub use value::Value;

use crate::error::{Error, Result};

/// Read a sequence child slot by element name.
pub fn seq_get<'v>(cfg: &DataCfg, value: Option<&'v Value>, name: &str) -> Option<&'v Value> {
    let (index, _) = cfg.child_named(name)?;
    match value {
        Some(Value::Seq(slots)) => slots.get(index)?.as_ref(),
        _ => None,
    }
}

/// Write a sequence child slot by element name, materialising the sequence
/// if it was absent.
pub fn seq_set(
    cfg: &DataCfg,
    value: &mut Option<Value>,
    name: &str,
    child: Option<Value>,
) -> Result<()> {
    let children = cfg.children().ok_or(Error::InputArgument)?;
    let (index, _) = cfg.child_named(name).ok_or(Error::InputArgument)?;

    let seq = value.get_or_insert_with(|| Value::empty_seq(children.len()));
    let slots = seq.as_seq_mut().ok_or(Error::Other("sequence value shape"))?;
    slots[index] = child;
    Ok(())
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The SPINE datagram envelope: header, payload, command frames, filters.
//!
//! Wire shape:
//!
//! ```text
//! {"datagram":[
//!   {"header":[{"specificationVersion":...},{"addressSource":[...]},...]},
//!   {"payload":[{"cmd":[[<one singleton per cmd element>...]]}]}
//! ]}
//! ```

use crate::data::{self, json, DataCfg, DataKind, Value};
use crate::error::{Error, Result};
use crate::spine::model::common::{FeatureAddress, FEATURE_ADDRESS_CFG};
use crate::spine::model::enums::{CmdClassifier, CMD_CLASSIFIER_TABLE};
use crate::spine::model::registry::{
    FunctionType, DATA_CHOICE, ELEMENTS_CHOICE, FUNCTION_TABLE, SELECTORS_CHOICE,
};

// ============================================================================
// Schemas
// ============================================================================

/// Datagram header fields.
pub static HEADER_CFG: [DataCfg; 9] = [
    DataCfg::new("specificationVersion", DataKind::String),
    DataCfg::new("addressSource", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new(
        "addressDestination",
        DataKind::Sequence(&FEATURE_ADDRESS_CFG),
    ),
    DataCfg::new("addressOriginator", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("msgCounter", DataKind::U64),
    DataCfg::new("msgCounterReference", DataKind::U64),
    DataCfg::new("cmdClassifier", DataKind::Enum(&CMD_CLASSIFIER_TABLE)),
    DataCfg::new("ackRequest", DataKind::Bool),
    DataCfg::new("timestamp", DataKind::AbsoluteOrRelativeTime),
];

static CMD_CONTROL_CFG: [DataCfg; 2] = [
    DataCfg::new("partial", DataKind::Tag),
    DataCfg::new("delete", DataKind::Tag),
];

/// Filter fields: the partial/delete marker plus selector and element
/// choice arms.
pub static FILTER_CFG: [DataCfg; 3] = [
    DataCfg::new("cmdControl", DataKind::Sequence(&CMD_CONTROL_CFG)),
    DataCfg::new("", DataKind::Choice(&SELECTORS_CHOICE)),
    DataCfg::new("", DataKind::Choice(&ELEMENTS_CHOICE)),
];

static FILTER_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::Sequence(&FILTER_CFG));

/// Standalone filter document root (`{"filter":[...]}`).
pub static FILTER_ROOT_CFG: DataCfg = DataCfg::new("filter", DataKind::Sequence(&FILTER_CFG));

/// Command frame fields: optional function name, optional filter list,
/// and the function data choice.
pub static CMD_CFG: [DataCfg; 3] = [
    DataCfg::new("function", DataKind::Enum(&FUNCTION_TABLE)),
    DataCfg::new("filter", DataKind::List(&FILTER_ITEM_CFG)),
    DataCfg::new("", DataKind::Choice(&DATA_CHOICE)),
];

static CMD_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::Sequence(&CMD_CFG));

static PAYLOAD_CFG: [DataCfg; 1] = [DataCfg::new("cmd", DataKind::List(&CMD_ITEM_CFG))];

static DATAGRAM_SEQ_CFG: [DataCfg; 2] = [
    DataCfg::new("header", DataKind::Sequence(&HEADER_CFG)),
    DataCfg::new("payload", DataKind::Sequence(&PAYLOAD_CFG)),
];

/// Datagram document root.
pub static DATAGRAM_CFG: DataCfg = DataCfg::new("datagram", DataKind::Sequence(&DATAGRAM_SEQ_CFG));

// Header child indices, fixed by HEADER_CFG declaration order.
const HDR_SPEC_VERSION: usize = 0;
const HDR_ADDR_SOURCE: usize = 1;
const HDR_ADDR_DEST: usize = 2;
const HDR_ADDR_ORIGINATOR: usize = 3;
const HDR_MSG_COUNTER: usize = 4;
const HDR_MSG_COUNTER_REF: usize = 5;
const HDR_CMD_CLASSIFIER: usize = 6;
const HDR_ACK_REQUEST: usize = 7;
const HDR_TIMESTAMP: usize = 8;

// Cmd child indices.
const CMD_FUNCTION: usize = 0;
const CMD_FILTER: usize = 1;
const CMD_DATA: usize = 2;

// Filter child indices.
const FLT_CMD_CONTROL: usize = 0;
const FLT_SELECTORS: usize = 1;
const FLT_ELEMENTS: usize = 2;

// ============================================================================
// Typed views
// ============================================================================

/// Typed view of a datagram header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub spec_version: Option<String>,
    pub src_addr: Option<FeatureAddress>,
    pub dest_addr: Option<FeatureAddress>,
    pub originator_addr: Option<FeatureAddress>,
    pub msg_counter: Option<u64>,
    pub msg_counter_reference: Option<u64>,
    pub cmd_classifier: Option<CmdClassifier>,
    pub ack_request: Option<bool>,
    pub timestamp: Option<Value>,
}

impl Header {
    /// Header validity per the dispatch contract: specification version,
    /// valid source and destination, a device-qualified originator when
    /// present, message counter and classifier.
    pub fn is_valid(&self) -> bool {
        let addr_ok = |addr: &Option<FeatureAddress>| addr.as_ref().is_some_and(|a| a.is_valid());

        let originator_ok = match &self.originator_addr {
            None => true,
            Some(addr) => addr.is_valid() && addr.device.is_some(),
        };

        self.spec_version.is_some()
            && addr_ok(&self.src_addr)
            && addr_ok(&self.dest_addr)
            && originator_ok
            && self.msg_counter.is_some()
            && self.cmd_classifier.is_some()
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut slots = vec![None; HEADER_CFG.len()];
        slots[HDR_SPEC_VERSION] = self.spec_version.as_ref().map(|v| Value::Str(v.clone()));
        slots[HDR_ADDR_SOURCE] = self.src_addr.as_ref().map(FeatureAddress::to_value);
        slots[HDR_ADDR_DEST] = self.dest_addr.as_ref().map(FeatureAddress::to_value);
        slots[HDR_ADDR_ORIGINATOR] = self.originator_addr.as_ref().map(FeatureAddress::to_value);
        slots[HDR_MSG_COUNTER] = self.msg_counter.map(Value::Unsigned);
        slots[HDR_MSG_COUNTER_REF] = self.msg_counter_reference.map(Value::Unsigned);
        slots[HDR_CMD_CLASSIFIER] = self.cmd_classifier.map(|c| Value::Enum(c.value()));
        slots[HDR_ACK_REQUEST] = self.ack_request.map(Value::Bool);
        slots[HDR_TIMESTAMP] = self.timestamp.clone();
        Ok(Value::Seq(slots))
    }

    pub fn from_value(value: Option<&Value>) -> Result<Header> {
        let Some(Value::Seq(slots)) = value else {
            return Err(Error::InputArgumentNull);
        };

        let slot = |i: usize| slots.get(i).and_then(Option::as_ref);
        let addr = |i: usize| slot(i).map(|v| FeatureAddress::from_value(Some(v))).transpose();

        Ok(Header {
            spec_version: slot(HDR_SPEC_VERSION)
                .and_then(Value::as_str)
                .map(str::to_owned),
            src_addr: addr(HDR_ADDR_SOURCE)?,
            dest_addr: addr(HDR_ADDR_DEST)?,
            originator_addr: addr(HDR_ADDR_ORIGINATOR)?,
            msg_counter: slot(HDR_MSG_COUNTER).and_then(Value::as_unsigned),
            msg_counter_reference: slot(HDR_MSG_COUNTER_REF).and_then(Value::as_unsigned),
            cmd_classifier: slot(HDR_CMD_CLASSIFIER)
                .and_then(Value::as_enum)
                .and_then(CmdClassifier::from_value),
            ack_request: slot(HDR_ACK_REQUEST).and_then(Value::as_bool),
            timestamp: slot(HDR_TIMESTAMP).cloned(),
        })
    }
}

/// Partial-operation marker inside a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdControl {
    Partial,
    Delete,
}

/// Typed view of one filter entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub cmd_control: Option<CmdControl>,
    /// Selectors arm: function it belongs to plus the selectors value.
    pub selectors: Option<(FunctionType, Option<Value>)>,
    /// Elements arm: function it belongs to plus the mask value.
    pub elements: Option<(FunctionType, Option<Value>)>,
}

impl Filter {
    /// A partial filter carrying selectors and/or an elements mask.
    pub fn partial(
        function: FunctionType,
        selectors: Option<Value>,
        elements: Option<Value>,
    ) -> Filter {
        Filter {
            cmd_control: Some(CmdControl::Partial),
            selectors: selectors.map(|s| (function, Some(s))),
            elements: elements.map(|e| (function, Some(e))),
        }
    }

    /// A delete filter carrying selectors and/or an elements mask.
    pub fn delete(
        function: FunctionType,
        selectors: Option<Value>,
        elements: Option<Value>,
    ) -> Filter {
        Filter {
            cmd_control: Some(CmdControl::Delete),
            ..Filter::partial(function, selectors, elements)
        }
    }

    pub fn is_partial(&self) -> bool {
        self.cmd_control == Some(CmdControl::Partial)
    }

    pub fn is_delete(&self) -> bool {
        self.cmd_control == Some(CmdControl::Delete)
    }

    fn to_value(&self) -> Value {
        let cmd_control = self.cmd_control.map(|control| {
            let (partial, delete) = match control {
                CmdControl::Partial => (Some(Value::Tag), None),
                CmdControl::Delete => (None, Some(Value::Tag)),
            };
            Value::Seq(vec![partial, delete])
        });

        let arm_value = |entry: &Option<(FunctionType, Option<Value>)>| {
            entry.as_ref().map(|(function, value)| Value::Choice {
                arm: function.index(),
                value: value.clone().map(Box::new),
            })
        };

        Value::Seq(vec![
            cmd_control,
            arm_value(&self.selectors),
            arm_value(&self.elements),
        ])
    }

    fn from_value(value: &Value) -> Result<Filter> {
        let Value::Seq(slots) = value else {
            return Err(Error::Parse);
        };

        let cmd_control = match slots.get(FLT_CMD_CONTROL).and_then(Option::as_ref) {
            Some(Value::Seq(control)) => {
                if control.first().is_some_and(Option::is_some) {
                    Some(CmdControl::Partial)
                } else if control.get(1).is_some_and(Option::is_some) {
                    Some(CmdControl::Delete)
                } else {
                    None
                }
            }
            _ => None,
        };

        let arm_entry = |i: usize| -> Option<(FunctionType, Option<Value>)> {
            match slots.get(i).and_then(Option::as_ref) {
                Some(Value::Choice { arm, value }) => FunctionType::from_index(*arm)
                    .map(|function| (function, value.as_deref().cloned())),
                _ => None,
            }
        };

        Ok(Filter {
            cmd_control,
            selectors: arm_entry(FLT_SELECTORS),
            elements: arm_entry(FLT_ELEMENTS),
        })
    }
}

/// Typed view of one command frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cmd {
    /// Explicit `function` element (present on partial commands).
    pub function: Option<FunctionType>,
    pub filters: Vec<Filter>,
    /// The function data arm and its payload.
    pub data: Option<(FunctionType, Option<Value>)>,
}

impl Cmd {
    /// A plain command carrying a function payload.
    pub fn with_data(function: FunctionType, value: Option<Value>) -> Cmd {
        Cmd {
            function: None,
            filters: Vec::new(),
            data: Some((function, value)),
        }
    }

    /// The partial-read/write form: explicit function element, filter
    /// list, and the (possibly empty) data arm.
    pub fn with_filters(function: FunctionType, filters: Vec<Filter>, value: Option<Value>) -> Cmd {
        Cmd {
            function: Some(function),
            filters,
            data: Some((function, value)),
        }
    }

    /// The function identified by the data choice arm.
    pub fn data_function(&self) -> Option<FunctionType> {
        self.data.as_ref().map(|(function, _)| *function)
    }

    /// The partial filter, if any.
    pub fn partial_filter(&self) -> Option<&Filter> {
        self.filters.iter().find(|f| f.is_partial())
    }

    /// The delete filter, if any.
    pub fn delete_filter(&self) -> Option<&Filter> {
        self.filters.iter().find(|f| f.is_delete())
    }

    pub fn to_value(&self) -> Value {
        let function = self.function.map(|f| Value::Enum(f.value()));

        let filters = if self.filters.is_empty() {
            None
        } else {
            Some(Value::List(
                self.filters.iter().map(Filter::to_value).collect(),
            ))
        };

        let data = self.data.as_ref().map(|(func, value)| Value::Choice {
            arm: func.index(),
            value: value.clone().map(Box::new),
        });

        Value::Seq(vec![function, filters, data])
    }

    pub fn from_value(value: &Value) -> Result<Cmd> {
        let Value::Seq(slots) = value else {
            return Err(Error::Parse);
        };

        let function = slots
            .get(CMD_FUNCTION)
            .and_then(Option::as_ref)
            .and_then(Value::as_enum)
            .and_then(|v| FunctionType::from_index(v as usize));

        let filters = match slots.get(CMD_FILTER).and_then(Option::as_ref) {
            Some(Value::List(items)) => items
                .iter()
                .map(Filter::from_value)
                .collect::<Result<Vec<Filter>>>()?,
            _ => Vec::new(),
        };

        let data = match slots.get(CMD_DATA).and_then(Option::as_ref) {
            Some(Value::Choice { arm, value }) => FunctionType::from_index(*arm)
                .map(|function| (function, value.as_deref().cloned())),
            _ => None,
        };

        Ok(Cmd {
            function,
            filters,
            data,
        })
    }
}

/// A full datagram: header plus command list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datagram {
    pub header: Header,
    pub cmds: Vec<Cmd>,
}

impl Datagram {
    pub fn new(header: Header, cmds: Vec<Cmd>) -> Self {
        Self { header, cmds }
    }

    pub fn is_valid(&self) -> bool {
        self.header.is_valid()
    }

    /// Parse a SPINE datagram document.
    pub fn parse(text: &str) -> Result<Datagram> {
        let value = json::parse(&DATAGRAM_CFG, text)?.ok_or(Error::Parse)?;

        let header = Header::from_value(data::seq_get(&DATAGRAM_CFG, Some(&value), "header"))?;

        let payload = data::seq_get(&DATAGRAM_CFG, Some(&value), "payload");
        let payload_cfg = &DATAGRAM_SEQ_CFG[1];
        let cmds = match data::seq_get(payload_cfg, payload, "cmd") {
            Some(Value::List(items)) => items
                .iter()
                .map(Cmd::from_value)
                .collect::<Result<Vec<Cmd>>>()?,
            _ => Vec::new(),
        };

        Ok(Datagram { header, cmds })
    }

    /// Print the unformatted datagram document.
    pub fn print(&self) -> Result<String> {
        let header = self.header.to_value()?;
        let cmd_list = Value::List(self.cmds.iter().map(Cmd::to_value).collect());
        let payload = Value::Seq(vec![Some(cmd_list)]);
        let datagram = Value::Seq(vec![Some(header), Some(payload)]);
        json::print(&DATAGRAM_CFG, Some(&datagram))
    }
}

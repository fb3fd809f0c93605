// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Function instances: one typed data slot per feature function.

use crate::data::{ops, Value};
use crate::error::Result;
use crate::spine::model::datagram::{Cmd, Filter};
use crate::spine::model::{FunctionType, PossibleOperations};

/// A typed data slot on a feature. Commands read, write and notify
/// functions; the schema comes from the registry, the instance lives here.
#[derive(Debug)]
pub struct Function {
    function_type: FunctionType,
    operations: PossibleOperations,
    data: Option<Value>,
}

impl Function {
    pub fn new(function_type: FunctionType, operations: PossibleOperations) -> Self {
        Self {
            function_type,
            operations,
            data: None,
        }
    }

    pub fn function_type(&self) -> FunctionType {
        self.function_type
    }

    pub fn operations(&self) -> PossibleOperations {
        self.operations
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Option<Value>) {
        self.data = data;
    }

    pub fn take_data(&mut self) -> Option<Value> {
        self.data.take()
    }

    /// Build the command frame for a read request: an empty data arm,
    /// plus function element and filter list when a partial filter is
    /// given.
    pub fn create_read_cmd(&self, filter: Option<Filter>) -> Cmd {
        let empty = empty_body(self.function_type);
        match filter {
            None => Cmd::with_data(self.function_type, Some(empty)),
            Some(filter) => Cmd::with_filters(self.function_type, vec![filter], Some(empty)),
        }
    }

    /// Build the command frame replying to a read: a copy of the current
    /// data narrowed by the requester's selectors and elements mask.
    pub fn create_reply_cmd(&self, filter: Option<&Filter>) -> Result<Cmd> {
        let value = self.read_with_filter(filter)?;
        Ok(Cmd::with_data(
            self.function_type,
            Some(value.unwrap_or_else(|| empty_body(self.function_type))),
        ))
    }

    /// Copy the current data, narrowed by selectors (which items) and the
    /// elements mask (which fields of each item).
    pub fn read_with_filter(&self, filter: Option<&Filter>) -> Result<Option<Value>> {
        let cfg = self.function_type.data_cfg();

        let Some(filter) = filter else {
            return Ok(self.data.clone());
        };

        let mut out = self.data.clone();

        if let Some((_, selectors)) = &filter.selectors {
            let mut matched = None;
            ops::copy_matching(cfg, self.data.as_ref(), &mut matched, selectors.as_ref())?;
            out = matched;
        }

        if let Some((function, elements)) = &filter.elements {
            let elements_cfg = function.elements_cfg();
            match (cfg.list_item_cfg(), out.take()) {
                // List payload: the mask applies to each item.
                (Some(item_cfg), Some(Value::Seq(mut slots))) => {
                    if let Some(Value::List(items)) = slots.first_mut().and_then(Option::take) {
                        let mut narrowed = Vec::with_capacity(items.len());
                        for item in &items {
                            let mut dst = None;
                            ops::read_elements(
                                item_cfg,
                                Some(item),
                                &mut dst,
                                elements_cfg,
                                elements.as_ref(),
                            )?;
                            if let Some(value) = dst {
                                narrowed.push(value);
                            }
                        }
                        slots[0] = Some(Value::List(narrowed));
                    }
                    out = Some(Value::Seq(slots));
                }
                (_, source) => {
                    let mut dst = None;
                    ops::read_elements(
                        cfg,
                        source.as_ref(),
                        &mut dst,
                        elements_cfg,
                        elements.as_ref(),
                    )?;
                    out = dst;
                }
            }
        }

        Ok(out)
    }

    /// Apply an inbound write: a partial filter routes through
    /// `write_partial` with its selectors, a delete filter through
    /// `delete_partial`; without filters the payload replaces the data.
    pub fn apply_write(&mut self, cmd: &Cmd) -> Result<()> {
        let cfg = self.function_type.data_cfg();
        let payload = cmd.data.as_ref().and_then(|(_, value)| value.as_ref());

        if let Some(filter) = cmd.delete_filter() {
            let (selectors_cfg, selectors) = filter_selectors(filter);
            let (elements_cfg, elements) = filter_elements(filter);
            ops::delete_partial(
                cfg,
                &mut self.data,
                selectors_cfg,
                selectors,
                elements_cfg,
                elements,
            );
        }

        match cmd.partial_filter() {
            Some(filter) if payload.is_some() => {
                let (selectors_cfg, selectors) = filter_selectors(filter);
                ops::write_partial(cfg, &mut self.data, payload, selectors_cfg, selectors)?;
            }
            Some(_) => {}
            None => {
                if cmd.delete_filter().is_none() || payload.is_some() {
                    ops::write(cfg, &mut self.data, payload)?;
                }
            }
        }

        Ok(())
    }

    /// Merge a published update into the data (keyed on identifiers for
    /// list payloads).
    pub fn update_partial(&mut self, update: Option<&Value>) -> Result<()> {
        let cfg = self.function_type.data_cfg();
        ops::write_partial(cfg, &mut self.data, update, &STUB_CFG, None)
    }
}

/// The empty body every read request and skipped reply carries
/// (`{"<function>":[]}`).
pub fn empty_body(function: FunctionType) -> Value {
    let arity = function
        .data_cfg()
        .children()
        .map(<[_]>::len)
        .unwrap_or_default();
    Value::empty_seq(arity)
}

fn filter_selectors(filter: &Filter) -> (&'static crate::data::DataCfg, Option<&Value>) {
    match &filter.selectors {
        Some((function, value)) => (function.selectors_cfg(), value.as_ref()),
        None => (&STUB_CFG, None),
    }
}

fn filter_elements(filter: &Filter) -> (&'static crate::data::DataCfg, Option<&Value>) {
    match &filter.elements {
        Some((function, value)) => (function.elements_cfg(), value.as_ref()),
        None => (&STUB_CFG, None),
    }
}

static STUB_CFG: crate::data::DataCfg =
    crate::data::DataCfg::new("", crate::data::DataKind::Stub);

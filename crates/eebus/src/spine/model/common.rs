// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Common SPINE data types: feature addresses, scaled numbers, possible
//! operations, function properties, result data.

use crate::data::{DataCfg, DataKind, Value};
use crate::error::{Error, Result};
use crate::spine::model::enums::FEATURE_TYPE_TABLE;
use crate::spine::model::registry::FunctionType;

/// Element schema for the hierarchical entity path.
pub static ENTITY_PATH_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::U32);

/// `{device?, entity[], feature?}` — all three fields are identifiers.
pub static FEATURE_ADDRESS_CFG: [DataCfg; 3] = [
    DataCfg::identifier("device", DataKind::String),
    DataCfg::identifier("entity", DataKind::List(&ENTITY_PATH_ITEM_CFG)),
    DataCfg::identifier("feature", DataKind::U32),
];

/// Address with device and entity path only (entity addressing).
pub static ENTITY_ADDRESS_CFG: [DataCfg; 2] = [
    DataCfg::identifier("device", DataKind::String),
    DataCfg::identifier("entity", DataKind::List(&ENTITY_PATH_ITEM_CFG)),
];

/// Address with the device id only (device addressing).
pub static DEVICE_ADDRESS_CFG: [DataCfg; 1] =
    [DataCfg::identifier("device", DataKind::String)];

/// Elements mask for a feature address.
pub static FEATURE_ADDRESS_ELEMENTS_CFG: [DataCfg; 3] = [
    DataCfg::new("device", DataKind::Tag),
    DataCfg::new("entity", DataKind::Tag),
    DataCfg::new("feature", DataKind::Tag),
];

/// `{number, scale}`.
pub static SCALED_NUMBER_CFG: [DataCfg; 2] = [
    DataCfg::new("number", DataKind::I64),
    DataCfg::new("scale", DataKind::I8),
];

pub static SCALED_NUMBER_ELEMENTS_CFG: [DataCfg; 2] = [
    DataCfg::new("number", DataKind::Tag),
    DataCfg::new("scale", DataKind::Tag),
];

static OPERATIONS_PARTIAL_CFG: [DataCfg; 1] = [DataCfg::new("partial", DataKind::Tag)];

/// `{read{partial?}?, write{partial?}?}`.
pub static POSSIBLE_OPERATIONS_CFG: [DataCfg; 2] = [
    DataCfg::new("read", DataKind::Sequence(&OPERATIONS_PARTIAL_CFG)),
    DataCfg::new("write", DataKind::Sequence(&OPERATIONS_PARTIAL_CFG)),
];

/// `{function, possibleOperations}`.
pub static FUNCTION_PROPERTY_CFG: [DataCfg; 2] = [
    DataCfg::new(
        "function",
        DataKind::Enum(&super::registry::FUNCTION_TABLE),
    ),
    DataCfg::new(
        "possibleOperations",
        DataKind::Sequence(&POSSIBLE_OPERATIONS_CFG),
    ),
];

/// `{errorNumber, description?}`.
pub static RESULT_DATA_CFG: [DataCfg; 2] = [
    DataCfg::new("errorNumber", DataKind::U32),
    DataCfg::new("description", DataKind::String),
];

pub static RESULT_DATA_ELEMENTS_CFG: [DataCfg; 2] = [
    DataCfg::new("errorNumber", DataKind::Tag),
    DataCfg::new("description", DataKind::Tag),
];

/// A typed view of a feature address value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureAddress {
    pub device: Option<String>,
    pub entity: Vec<u32>,
    pub feature: Option<u32>,
}

impl FeatureAddress {
    /// Address of a feature on this node's device.
    pub fn feature(device: Option<&str>, entity: &[u32], feature: u32) -> Self {
        Self {
            device: device.map(str::to_owned),
            entity: entity.to_vec(),
            feature: Some(feature),
        }
    }

    /// Build the engine value bound to [`FEATURE_ADDRESS_CFG`].
    pub fn to_value(&self) -> Value {
        let entity = Value::List(self.entity.iter().map(|e| Value::Unsigned((*e).into())).collect());

        Value::Seq(vec![
            self.device.as_ref().map(|d| Value::Str(d.clone())),
            Some(entity),
            self.feature.map(|f| Value::Unsigned(f.into())),
        ])
    }

    /// Read the typed view back out of an engine value.
    pub fn from_value(value: Option<&Value>) -> Result<FeatureAddress> {
        let Some(Value::Seq(slots)) = value else {
            return Err(Error::InputArgumentNull);
        };

        let device = slots
            .first()
            .and_then(Option::as_ref)
            .and_then(Value::as_str)
            .map(str::to_owned);

        let entity = match slots.get(1).and_then(Option::as_ref) {
            Some(Value::List(items)) => items
                .iter()
                .map(|v| v.as_unsigned().map(|u| u as u32).ok_or(Error::Parse))
                .collect::<Result<Vec<u32>>>()?,
            _ => Vec::new(),
        };

        let feature = slots
            .get(2)
            .and_then(Option::as_ref)
            .and_then(Value::as_unsigned)
            .map(|u| u as u32);

        Ok(FeatureAddress {
            device,
            entity,
            feature,
        })
    }

    /// An address is valid when it carries an entity path.
    pub fn is_valid(&self) -> bool {
        !self.entity.is_empty()
    }
}

/// Typed result payload (`resultData`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorResult {
    pub error_number: u32,
    pub description: Option<String>,
}

impl ErrorResult {
    /// Error number `0` signals success.
    pub const SUCCESS: u32 = 0;
    /// Generic failure (unknown destination, unhandled command).
    pub const GENERAL: u32 = 1;

    pub fn success() -> Self {
        Self::default()
    }

    pub fn new(error_number: u32, description: Option<&str>) -> Self {
        Self {
            error_number,
            description: description.map(str::to_owned),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Seq(vec![
            Some(Value::Unsigned(self.error_number.into())),
            self.description.as_ref().map(|d| Value::Str(d.clone())),
        ])
    }

    pub fn from_value(value: Option<&Value>) -> Result<ErrorResult> {
        let Some(Value::Seq(slots)) = value else {
            return Err(Error::InputArgumentNull);
        };

        let error_number = slots
            .first()
            .and_then(Option::as_ref)
            .and_then(Value::as_unsigned)
            .ok_or(Error::Parse)? as u32;

        let description = slots
            .get(1)
            .and_then(Option::as_ref)
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(ErrorResult {
            error_number,
            description,
        })
    }

    pub fn is_success(&self) -> bool {
        self.error_number == Self::SUCCESS
    }
}

/// Possible-operations flags advertised per function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PossibleOperations {
    pub read: bool,
    pub read_partial: bool,
    pub write: bool,
    pub write_partial: bool,
}

impl PossibleOperations {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn read_write_partial() -> Self {
        Self {
            read: true,
            read_partial: true,
            write: true,
            write_partial: true,
        }
    }

    pub fn to_value(&self) -> Value {
        let side = |enabled: bool, partial: bool| {
            enabled.then(|| Value::Seq(vec![partial.then_some(Value::Tag)]))
        };

        Value::Seq(vec![
            side(self.read, self.read_partial),
            side(self.write, self.write_partial),
        ])
    }
}

/// Build a `functionProperty` value for detailed discovery.
pub fn function_property_value(
    function: FunctionType,
    operations: PossibleOperations,
) -> Value {
    Value::Seq(vec![
        Some(Value::Enum(function.value())),
        Some(operations.to_value()),
    ])
}

/// Resolve a feature type name (e.g. `"Setpoint"`) to its enum value.
pub fn feature_type_by_name(name: &str) -> Option<u32> {
    FEATURE_TYPE_TABLE.value_of(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::json;

    static ADDRESS_ROOT: DataCfg =
        DataCfg::new("address", DataKind::Sequence(&FEATURE_ADDRESS_CFG));

    #[test]
    fn test_feature_address_round_trip() {
        let addr = FeatureAddress::feature(Some("d:_i:Demo_EVSE-234567890"), &[0], 0);
        let value = addr.to_value();

        let text = json::print(&ADDRESS_ROOT, Some(&value)).unwrap();
        assert_eq!(
            text,
            r#"{"address":[{"device":"d:_i:Demo_EVSE-234567890"},{"entity":[0]},{"feature":0}]}"#
        );

        let back = FeatureAddress::from_value(Some(&value)).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_broadcast_address_has_no_device() {
        let addr = FeatureAddress::feature(None, &[0], 0);
        let text = json::print(&ADDRESS_ROOT, Some(&addr.to_value())).unwrap();
        assert_eq!(text, r#"{"address":[{"entity":[0]},{"feature":0}]}"#);
        assert!(addr.is_valid());
        assert!(!FeatureAddress::default().is_valid());
    }

    #[test]
    fn test_error_result_values() {
        let ok = ErrorResult::success();
        assert!(ok.is_success());

        let err = ErrorResult::new(137, Some("Err. num. 137"));
        let back = ErrorResult::from_value(Some(&err.to_value())).unwrap();
        assert_eq!(back, err);
        assert!(!back.is_success());
    }
}

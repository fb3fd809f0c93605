// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device-side function schemas: actuator level, load-control limits,
//! measurements.

use crate::data::{DataCfg, DataKind};
use crate::spine::model::common::{SCALED_NUMBER_CFG, SCALED_NUMBER_ELEMENTS_CFG};
use crate::spine::model::enums::{
    ACTUATOR_LEVEL_FCT_TABLE, COMMODITY_TYPE_TABLE, LOAD_CONTROL_CATEGORY_TABLE,
    LOAD_CONTROL_LIMIT_DIRECTION_TABLE, LOAD_CONTROL_LIMIT_TYPE_TABLE, MEASUREMENT_TYPE_TABLE,
    MEASUREMENT_VALUE_SOURCE_TABLE, MEASUREMENT_VALUE_TYPE_TABLE, SCOPE_TYPE_TABLE, UNIT_TABLE,
};

// ============================================================================
// Actuator Level
// ============================================================================

/// `actuatorLevelData` body.
pub static ACTUATOR_LEVEL_DATA_CFG: [DataCfg; 2] = [
    DataCfg::new("function", DataKind::Enum(&ACTUATOR_LEVEL_FCT_TABLE)),
    DataCfg::new("value", DataKind::Sequence(&SCALED_NUMBER_CFG)),
];

pub static ACTUATOR_LEVEL_DATA_ELEMENTS_CFG: [DataCfg; 2] = [
    DataCfg::new("function", DataKind::Tag),
    DataCfg::new("value", DataKind::Sequence(&SCALED_NUMBER_ELEMENTS_CFG)),
];

/// `actuatorLevelDescriptionData` body.
pub static ACTUATOR_LEVEL_DESCRIPTION_DATA_CFG: [DataCfg; 3] = [
    DataCfg::new("label", DataKind::String),
    DataCfg::new("description", DataKind::String),
    DataCfg::new("levelDefaultUnit", DataKind::Enum(&UNIT_TABLE)),
];

pub static ACTUATOR_LEVEL_DESCRIPTION_DATA_ELEMENTS_CFG: [DataCfg; 3] = [
    DataCfg::new("label", DataKind::Tag),
    DataCfg::new("description", DataKind::Tag),
    DataCfg::new("levelDefaultUnit", DataKind::Tag),
];

// ============================================================================
// Load Control
// ============================================================================

static TIME_PERIOD_CFG: [DataCfg; 2] = [
    DataCfg::new("startTime", DataKind::AbsoluteOrRelativeTime),
    DataCfg::new("endTime", DataKind::AbsoluteOrRelativeTime),
];

static TIME_PERIOD_ELEMENTS_CFG: [DataCfg; 2] = [
    DataCfg::new("startTime", DataKind::Tag),
    DataCfg::new("endTime", DataKind::Tag),
];

pub static LOAD_CONTROL_LIMIT_CFG: [DataCfg; 5] = [
    DataCfg::identifier("limitId", DataKind::U32),
    DataCfg::new("isLimitChangeable", DataKind::Bool),
    DataCfg::new("isLimitActive", DataKind::Bool),
    DataCfg::new("timePeriod", DataKind::Sequence(&TIME_PERIOD_CFG)),
    DataCfg::new("value", DataKind::Sequence(&SCALED_NUMBER_CFG)),
];

static LOAD_CONTROL_LIMIT_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&LOAD_CONTROL_LIMIT_CFG));

/// Inner list of `loadControlLimitListData`.
pub static LOAD_CONTROL_LIMIT_LIST_CFG: DataCfg = DataCfg::new(
    "loadControlLimitData",
    DataKind::List(&LOAD_CONTROL_LIMIT_ITEM_CFG),
);

pub static LOAD_CONTROL_LIMIT_SELECTORS_CFG: [DataCfg; 1] =
    [DataCfg::identifier("limitId", DataKind::U32)];

pub static LOAD_CONTROL_LIMIT_ELEMENTS_CFG: [DataCfg; 5] = [
    DataCfg::new("limitId", DataKind::Tag),
    DataCfg::new("isLimitChangeable", DataKind::Tag),
    DataCfg::new("isLimitActive", DataKind::Tag),
    DataCfg::new("timePeriod", DataKind::Sequence(&TIME_PERIOD_ELEMENTS_CFG)),
    DataCfg::new("value", DataKind::Sequence(&SCALED_NUMBER_ELEMENTS_CFG)),
];

pub static LOAD_CONTROL_LIMIT_DESCRIPTION_CFG: [DataCfg; 7] = [
    DataCfg::identifier("limitId", DataKind::U32),
    DataCfg::new("limitType", DataKind::Enum(&LOAD_CONTROL_LIMIT_TYPE_TABLE)),
    DataCfg::new(
        "limitCategory",
        DataKind::Enum(&LOAD_CONTROL_CATEGORY_TABLE),
    ),
    DataCfg::new(
        "limitDirection",
        DataKind::Enum(&LOAD_CONTROL_LIMIT_DIRECTION_TABLE),
    ),
    DataCfg::new("measurementId", DataKind::U32),
    DataCfg::new("unit", DataKind::Enum(&UNIT_TABLE)),
    DataCfg::new("scopeType", DataKind::Enum(&SCOPE_TYPE_TABLE)),
];

static LOAD_CONTROL_LIMIT_DESCRIPTION_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&LOAD_CONTROL_LIMIT_DESCRIPTION_CFG));

/// Inner list of `loadControlLimitDescriptionListData`.
pub static LOAD_CONTROL_LIMIT_DESCRIPTION_LIST_CFG: DataCfg = DataCfg::new(
    "loadControlLimitDescriptionData",
    DataKind::List(&LOAD_CONTROL_LIMIT_DESCRIPTION_ITEM_CFG),
);

pub static LOAD_CONTROL_LIMIT_DESCRIPTION_SELECTORS_CFG: [DataCfg; 1] =
    [DataCfg::identifier("limitId", DataKind::U32)];

pub static LOAD_CONTROL_LIMIT_DESCRIPTION_ELEMENTS_CFG: [DataCfg; 7] = [
    DataCfg::new("limitId", DataKind::Tag),
    DataCfg::new("limitType", DataKind::Tag),
    DataCfg::new("limitCategory", DataKind::Tag),
    DataCfg::new("limitDirection", DataKind::Tag),
    DataCfg::new("measurementId", DataKind::Tag),
    DataCfg::new("unit", DataKind::Tag),
    DataCfg::new("scopeType", DataKind::Tag),
];

// ============================================================================
// Measurement
// ============================================================================

pub static MEASUREMENT_DATA_CFG: [DataCfg; 5] = [
    DataCfg::identifier("measurementId", DataKind::U32),
    DataCfg::new("valueType", DataKind::Enum(&MEASUREMENT_VALUE_TYPE_TABLE)),
    DataCfg::new("timestamp", DataKind::AbsoluteOrRelativeTime),
    DataCfg::new("value", DataKind::Sequence(&SCALED_NUMBER_CFG)),
    DataCfg::new(
        "valueSource",
        DataKind::Enum(&MEASUREMENT_VALUE_SOURCE_TABLE),
    ),
];

static MEASUREMENT_DATA_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&MEASUREMENT_DATA_CFG));

/// Inner list of `measurementListData`.
pub static MEASUREMENT_LIST_CFG: DataCfg =
    DataCfg::new("measurementData", DataKind::List(&MEASUREMENT_DATA_ITEM_CFG));

pub static MEASUREMENT_SELECTORS_CFG: [DataCfg; 2] = [
    DataCfg::identifier("measurementId", DataKind::U32),
    DataCfg::new("valueType", DataKind::Enum(&MEASUREMENT_VALUE_TYPE_TABLE)),
];

pub static MEASUREMENT_ELEMENTS_CFG: [DataCfg; 5] = [
    DataCfg::new("measurementId", DataKind::Tag),
    DataCfg::new("valueType", DataKind::Tag),
    DataCfg::new("timestamp", DataKind::Tag),
    DataCfg::new("value", DataKind::Sequence(&SCALED_NUMBER_ELEMENTS_CFG)),
    DataCfg::new("valueSource", DataKind::Tag),
];

pub static MEASUREMENT_DESCRIPTION_CFG: [DataCfg; 5] = [
    DataCfg::identifier("measurementId", DataKind::U32),
    DataCfg::new("measurementType", DataKind::Enum(&MEASUREMENT_TYPE_TABLE)),
    DataCfg::new("commodityType", DataKind::Enum(&COMMODITY_TYPE_TABLE)),
    DataCfg::new("unit", DataKind::Enum(&UNIT_TABLE)),
    DataCfg::new("scopeType", DataKind::Enum(&SCOPE_TYPE_TABLE)),
];

static MEASUREMENT_DESCRIPTION_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&MEASUREMENT_DESCRIPTION_CFG));

/// Inner list of `measurementDescriptionListData`.
pub static MEASUREMENT_DESCRIPTION_LIST_CFG: DataCfg = DataCfg::new(
    "measurementDescriptionData",
    DataKind::List(&MEASUREMENT_DESCRIPTION_ITEM_CFG),
);

pub static MEASUREMENT_DESCRIPTION_SELECTORS_CFG: [DataCfg; 1] =
    [DataCfg::identifier("measurementId", DataKind::U32)];

pub static MEASUREMENT_DESCRIPTION_ELEMENTS_CFG: [DataCfg; 5] = [
    DataCfg::new("measurementId", DataKind::Tag),
    DataCfg::new("measurementType", DataKind::Tag),
    DataCfg::new("commodityType", DataKind::Tag),
    DataCfg::new("unit", DataKind::Tag),
    DataCfg::new("scopeType", DataKind::Tag),
];

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The SPINE function registry.
//!
//! Three parallel `'static` arrays — data, selectors, elements — hold one
//! choice arm per registered function, in [`FunctionType`] order. The arm
//! index *is* the function identity throughout the stack; a unit test below
//! pins the ordering invariant.

use crate::data::{DataCfg, DataKind, EnumTable};
use crate::spine::model::common::{RESULT_DATA_CFG, RESULT_DATA_ELEMENTS_CFG};
use crate::spine::model::functions::{
    ACTUATOR_LEVEL_DATA_CFG, ACTUATOR_LEVEL_DATA_ELEMENTS_CFG,
    ACTUATOR_LEVEL_DESCRIPTION_DATA_CFG, ACTUATOR_LEVEL_DESCRIPTION_DATA_ELEMENTS_CFG,
    LOAD_CONTROL_LIMIT_DESCRIPTION_ELEMENTS_CFG, LOAD_CONTROL_LIMIT_DESCRIPTION_LIST_CFG,
    LOAD_CONTROL_LIMIT_DESCRIPTION_SELECTORS_CFG, LOAD_CONTROL_LIMIT_ELEMENTS_CFG,
    LOAD_CONTROL_LIMIT_LIST_CFG, LOAD_CONTROL_LIMIT_SELECTORS_CFG,
    MEASUREMENT_DESCRIPTION_ELEMENTS_CFG, MEASUREMENT_DESCRIPTION_LIST_CFG,
    MEASUREMENT_DESCRIPTION_SELECTORS_CFG, MEASUREMENT_ELEMENTS_CFG, MEASUREMENT_LIST_CFG,
    MEASUREMENT_SELECTORS_CFG,
};
use crate::spine::model::node_management::{
    BINDING_DATA_SELECTORS_CFG, BINDING_DELETE_CALL_CFG, BINDING_ENTRY_ELEMENTS_CFG,
    BINDING_ENTRY_LIST_CFG, BINDING_REQUEST_CALL_CFG, DESTINATION_DATA_ELEMENTS_CFG,
    DESTINATION_LIST_CFG, DETAILED_DISCOVERY_DATA_CFG, DETAILED_DISCOVERY_ELEMENTS_CFG,
    SUBSCRIPTION_DATA_SELECTORS_CFG, SUBSCRIPTION_DELETE_CALL_CFG,
    SUBSCRIPTION_ENTRY_ELEMENTS_CFG, SUBSCRIPTION_ENTRY_LIST_CFG,
    SUBSCRIPTION_REQUEST_CALL_CFG, USE_CASE_DATA_SELECTORS_CFG, USE_CASE_INFORMATION_ELEMENTS_CFG,
    USE_CASE_INFORMATION_LIST_CFG,
};

/// Every function the stack can carry. The discriminant doubles as the
/// choice arm index in the registry arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FunctionType {
    NodeManagementDetailedDiscoveryData = 0,
    NodeManagementBindingData = 1,
    NodeManagementBindingRequestCall = 2,
    NodeManagementBindingDeleteCall = 3,
    NodeManagementSubscriptionData = 4,
    NodeManagementSubscriptionRequestCall = 5,
    NodeManagementSubscriptionDeleteCall = 6,
    NodeManagementDestinationListData = 7,
    NodeManagementUseCaseData = 8,
    ResultData = 9,
    ActuatorLevelData = 10,
    ActuatorLevelDescriptionData = 11,
    LoadControlLimitListData = 12,
    LoadControlLimitDescriptionListData = 13,
    MeasurementListData = 14,
    MeasurementDescriptionListData = 15,
}

/// Number of registered functions.
pub const FUNCTION_COUNT: usize = 16;

const ALL_FUNCTIONS: [FunctionType; FUNCTION_COUNT] = [
    FunctionType::NodeManagementDetailedDiscoveryData,
    FunctionType::NodeManagementBindingData,
    FunctionType::NodeManagementBindingRequestCall,
    FunctionType::NodeManagementBindingDeleteCall,
    FunctionType::NodeManagementSubscriptionData,
    FunctionType::NodeManagementSubscriptionRequestCall,
    FunctionType::NodeManagementSubscriptionDeleteCall,
    FunctionType::NodeManagementDestinationListData,
    FunctionType::NodeManagementUseCaseData,
    FunctionType::ResultData,
    FunctionType::ActuatorLevelData,
    FunctionType::ActuatorLevelDescriptionData,
    FunctionType::LoadControlLimitListData,
    FunctionType::LoadControlLimitDescriptionListData,
    FunctionType::MeasurementListData,
    FunctionType::MeasurementDescriptionListData,
];

impl FunctionType {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn value(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: usize) -> Option<FunctionType> {
        ALL_FUNCTIONS.get(index).copied()
    }

    pub fn all() -> &'static [FunctionType] {
        &ALL_FUNCTIONS
    }

    /// JSON element name of this function's data arm.
    pub fn name(self) -> &'static str {
        DATA_CHOICE[self.index()].name
    }

    /// Whether the function payload is a container-of-list.
    pub fn is_list_typed(self) -> bool {
        DATA_CHOICE[self.index()].list_item_cfg().is_some()
    }

    pub fn data_cfg(self) -> &'static DataCfg {
        &DATA_CHOICE[self.index()]
    }

    pub fn selectors_cfg(self) -> &'static DataCfg {
        &SELECTORS_CHOICE[self.index()]
    }

    pub fn elements_cfg(self) -> &'static DataCfg {
        &ELEMENTS_CHOICE[self.index()]
    }

    /// The list-item schema for list-typed functions.
    pub fn list_item_cfg(self) -> Option<&'static DataCfg> {
        self.data_cfg().list_item_cfg()
    }
}

/// `function` element values (used in command frames and discovery).
pub static FUNCTION_TABLE: EnumTable = EnumTable {
    name: "function",
    entries: &[
        ("nodeManagementDetailedDiscoveryData", 0),
        ("nodeManagementBindingData", 1),
        ("nodeManagementBindingRequestCall", 2),
        ("nodeManagementBindingDeleteCall", 3),
        ("nodeManagementSubscriptionData", 4),
        ("nodeManagementSubscriptionRequestCall", 5),
        ("nodeManagementSubscriptionDeleteCall", 6),
        ("nodeManagementDestinationListData", 7),
        ("nodeManagementUseCaseData", 8),
        ("resultData", 9),
        ("actuatorLevelData", 10),
        ("actuatorLevelDescriptionData", 11),
        ("loadControlLimitListData", 12),
        ("loadControlLimitDescriptionListData", 13),
        ("measurementListData", 14),
        ("measurementDescriptionListData", 15),
    ],
};

/// Data choice: one arm per function, enum order.
pub static DATA_CHOICE: [DataCfg; FUNCTION_COUNT] = [
    DataCfg::new(
        "nodeManagementDetailedDiscoveryData",
        DataKind::Sequence(&DETAILED_DISCOVERY_DATA_CFG),
    ),
    DataCfg::new(
        "nodeManagementBindingData",
        DataKind::Container(&BINDING_ENTRY_LIST_CFG),
    ),
    DataCfg::new(
        "nodeManagementBindingRequestCall",
        DataKind::Sequence(&BINDING_REQUEST_CALL_CFG),
    ),
    DataCfg::new(
        "nodeManagementBindingDeleteCall",
        DataKind::Sequence(&BINDING_DELETE_CALL_CFG),
    ),
    DataCfg::new(
        "nodeManagementSubscriptionData",
        DataKind::Container(&SUBSCRIPTION_ENTRY_LIST_CFG),
    ),
    DataCfg::new(
        "nodeManagementSubscriptionRequestCall",
        DataKind::Sequence(&SUBSCRIPTION_REQUEST_CALL_CFG),
    ),
    DataCfg::new(
        "nodeManagementSubscriptionDeleteCall",
        DataKind::Sequence(&SUBSCRIPTION_DELETE_CALL_CFG),
    ),
    DataCfg::new(
        "nodeManagementDestinationListData",
        DataKind::Container(&DESTINATION_LIST_CFG),
    ),
    DataCfg::new(
        "nodeManagementUseCaseData",
        DataKind::Container(&USE_CASE_INFORMATION_LIST_CFG),
    ),
    DataCfg::new("resultData", DataKind::Sequence(&RESULT_DATA_CFG)),
    DataCfg::new(
        "actuatorLevelData",
        DataKind::Sequence(&ACTUATOR_LEVEL_DATA_CFG),
    ),
    DataCfg::new(
        "actuatorLevelDescriptionData",
        DataKind::Sequence(&ACTUATOR_LEVEL_DESCRIPTION_DATA_CFG),
    ),
    DataCfg::new(
        "loadControlLimitListData",
        DataKind::Container(&LOAD_CONTROL_LIMIT_LIST_CFG),
    ),
    DataCfg::new(
        "loadControlLimitDescriptionListData",
        DataKind::Container(&LOAD_CONTROL_LIMIT_DESCRIPTION_LIST_CFG),
    ),
    DataCfg::new(
        "measurementListData",
        DataKind::Container(&MEASUREMENT_LIST_CFG),
    ),
    DataCfg::new(
        "measurementDescriptionListData",
        DataKind::Container(&MEASUREMENT_DESCRIPTION_LIST_CFG),
    ),
];

/// Selectors choice: enum order; stub arms for functions without list
/// payloads (a stub never matches on the wire).
pub static SELECTORS_CHOICE: [DataCfg; FUNCTION_COUNT] = [
    DataCfg::new("", DataKind::Stub),
    DataCfg::new(
        "nodeManagementBindingDataSelectors",
        DataKind::Sequence(&BINDING_DATA_SELECTORS_CFG),
    ),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new(
        "nodeManagementSubscriptionDataSelectors",
        DataKind::Sequence(&SUBSCRIPTION_DATA_SELECTORS_CFG),
    ),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new(
        "nodeManagementUseCaseDataSelectors",
        DataKind::Sequence(&USE_CASE_DATA_SELECTORS_CFG),
    ),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new(
        "loadControlLimitListDataSelectors",
        DataKind::Sequence(&LOAD_CONTROL_LIMIT_SELECTORS_CFG),
    ),
    DataCfg::new(
        "loadControlLimitDescriptionListDataSelectors",
        DataKind::Sequence(&LOAD_CONTROL_LIMIT_DESCRIPTION_SELECTORS_CFG),
    ),
    DataCfg::new(
        "measurementListDataSelectors",
        DataKind::Sequence(&MEASUREMENT_SELECTORS_CFG),
    ),
    DataCfg::new(
        "measurementDescriptionListDataSelectors",
        DataKind::Sequence(&MEASUREMENT_DESCRIPTION_SELECTORS_CFG),
    ),
];

/// Elements choice: enum order; every leaf of every arm is a tag.
pub static ELEMENTS_CHOICE: [DataCfg; FUNCTION_COUNT] = [
    DataCfg::new(
        "nodeManagementDetailedDiscoveryDataElements",
        DataKind::Sequence(&DETAILED_DISCOVERY_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "bindingManagementEntryDataElements",
        DataKind::Sequence(&BINDING_ENTRY_ELEMENTS_CFG),
    ),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new(
        "subscriptionManagementEntryDataElements",
        DataKind::Sequence(&SUBSCRIPTION_ENTRY_ELEMENTS_CFG),
    ),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new("", DataKind::Stub),
    DataCfg::new(
        "nodeManagementDestinationDataElements",
        DataKind::Sequence(&DESTINATION_DATA_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "useCaseInformationDataElements",
        DataKind::Sequence(&USE_CASE_INFORMATION_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "resultDataElements",
        DataKind::Sequence(&RESULT_DATA_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "actuatorLevelDataElements",
        DataKind::Sequence(&ACTUATOR_LEVEL_DATA_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "actuatorLevelDescriptionDataElements",
        DataKind::Sequence(&ACTUATOR_LEVEL_DESCRIPTION_DATA_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "loadControlLimitDataElements",
        DataKind::Sequence(&LOAD_CONTROL_LIMIT_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "loadControlLimitDescriptionDataElements",
        DataKind::Sequence(&LOAD_CONTROL_LIMIT_DESCRIPTION_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "measurementDataElements",
        DataKind::Sequence(&MEASUREMENT_ELEMENTS_CFG),
    ),
    DataCfg::new(
        "measurementDescriptionDataElements",
        DataKind::Sequence(&MEASUREMENT_DESCRIPTION_ELEMENTS_CFG),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataKind;

    #[test]
    fn test_enum_order_matches_choice_arms() {
        for function in FunctionType::all() {
            let (name, value) = FUNCTION_TABLE.entries[function.index()];
            assert_eq!(value, function.value());
            assert_eq!(name, DATA_CHOICE[function.index()].name);
            assert_eq!(function.name(), name);
        }
    }

    #[test]
    fn test_from_index_round_trip() {
        for index in 0..FUNCTION_COUNT {
            assert_eq!(FunctionType::from_index(index).unwrap().index(), index);
        }
        assert!(FunctionType::from_index(FUNCTION_COUNT).is_none());
    }

    #[test]
    fn test_list_typed_functions() {
        assert!(FunctionType::LoadControlLimitListData.is_list_typed());
        assert!(FunctionType::MeasurementListData.is_list_typed());
        assert!(FunctionType::NodeManagementBindingData.is_list_typed());
        assert!(!FunctionType::ResultData.is_list_typed());
        assert!(!FunctionType::NodeManagementDetailedDiscoveryData.is_list_typed());
    }

    /// Elements arms must be tag-leafed: every leaf is a tag, every
    /// intermediate node a sequence.
    fn assert_tag_leafed(cfg: &DataCfg) {
        match &cfg.kind {
            DataKind::Tag => {}
            DataKind::Sequence(children) => children.iter().for_each(assert_tag_leafed),
            other => panic!(
                "elements schema node {:?} is neither tag nor sequence",
                std::mem::discriminant(other)
            ),
        }
    }

    #[test]
    fn test_elements_schemas_are_tag_leafed() {
        for arm in ELEMENTS_CHOICE.iter().filter(|arm| !arm.is_stub()) {
            assert_tag_leafed(arm);
        }
    }

    /// Identifier flags line up between the list-item schema and the
    /// selectors schema for every list-typed function.
    #[test]
    fn test_identifier_flags_align_with_selectors() {
        for function in FunctionType::all() {
            let Some(item_cfg) = function.list_item_cfg() else {
                continue;
            };
            let selectors = function.selectors_cfg();
            if selectors.is_stub() {
                continue;
            }

            for selector_child in selectors.children().unwrap() {
                if !selector_child.is_identifier() {
                    continue;
                }
                let (_, data_child) = item_cfg
                    .child_named(selector_child.name)
                    .unwrap_or_else(|| panic!("selector field {} missing", selector_child.name));
                assert!(
                    data_child.is_identifier(),
                    "identifier flag mismatch on {}",
                    selector_child.name
                );
            }
        }
    }
}

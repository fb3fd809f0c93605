// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node-management function schemas: detailed discovery, binding and
//! subscription management, destination list, use-case advertisement.

use crate::data::{DataCfg, DataKind};
use crate::spine::model::common::{
    DEVICE_ADDRESS_CFG, ENTITY_PATH_ITEM_CFG, FEATURE_ADDRESS_CFG, FUNCTION_PROPERTY_CFG,
};
use crate::spine::model::enums::{
    DEVICE_TYPE_TABLE, ENTITY_TYPE_TABLE, FEATURE_TYPE_TABLE, NETWORK_FEATURE_SET_TABLE,
    ROLE_TABLE, USE_CASE_ACTOR_TABLE, USE_CASE_NAME_TABLE,
};

// ============================================================================
// Detailed Discovery
// ============================================================================

static SPECIFICATION_VERSION_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::String);

static SPECIFICATION_VERSION_LIST_CFG: [DataCfg; 1] = [DataCfg::new(
    "specificationVersion",
    DataKind::List(&SPECIFICATION_VERSION_ITEM_CFG),
)];

pub static DEVICE_DESCRIPTION_CFG: [DataCfg; 3] = [
    DataCfg::identifier("deviceAddress", DataKind::Sequence(&DEVICE_ADDRESS_CFG)),
    DataCfg::new("deviceType", DataKind::Enum(&DEVICE_TYPE_TABLE)),
    DataCfg::new(
        "networkFeatureSet",
        DataKind::Enum(&NETWORK_FEATURE_SET_TABLE),
    ),
];

static DEVICE_INFORMATION_CFG: [DataCfg; 1] = [DataCfg::new(
    "description",
    DataKind::Sequence(&DEVICE_DESCRIPTION_CFG),
)];

static DISCOVERY_ENTITY_ADDRESS_CFG: [DataCfg; 1] = [DataCfg::identifier(
    "entity",
    DataKind::List(&ENTITY_PATH_ITEM_CFG),
)];

pub static ENTITY_DESCRIPTION_CFG: [DataCfg; 2] = [
    DataCfg::identifier(
        "entityAddress",
        DataKind::Sequence(&DISCOVERY_ENTITY_ADDRESS_CFG),
    ),
    DataCfg::new("entityType", DataKind::Enum(&ENTITY_TYPE_TABLE)),
];

static ENTITY_INFORMATION_CFG: [DataCfg; 1] = [DataCfg::new(
    "description",
    DataKind::Sequence(&ENTITY_DESCRIPTION_CFG),
)];

static ENTITY_INFORMATION_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&ENTITY_INFORMATION_CFG));

static DISCOVERY_FEATURE_ADDRESS_CFG: [DataCfg; 2] = [
    DataCfg::identifier("entity", DataKind::List(&ENTITY_PATH_ITEM_CFG)),
    DataCfg::identifier("feature", DataKind::U32),
];

static FUNCTION_PROPERTY_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&FUNCTION_PROPERTY_CFG));

pub static FEATURE_DESCRIPTION_CFG: [DataCfg; 5] = [
    DataCfg::identifier(
        "featureAddress",
        DataKind::Sequence(&DISCOVERY_FEATURE_ADDRESS_CFG),
    ),
    DataCfg::new("featureType", DataKind::Enum(&FEATURE_TYPE_TABLE)),
    DataCfg::new("role", DataKind::Enum(&ROLE_TABLE)),
    DataCfg::new(
        "supportedFunction",
        DataKind::List(&FUNCTION_PROPERTY_ITEM_CFG),
    ),
    DataCfg::new("description", DataKind::String),
];

static FEATURE_INFORMATION_CFG: [DataCfg; 1] = [DataCfg::new(
    "description",
    DataKind::Sequence(&FEATURE_DESCRIPTION_CFG),
)];

static FEATURE_INFORMATION_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&FEATURE_INFORMATION_CFG));

/// `nodeManagementDetailedDiscoveryData` body.
pub static DETAILED_DISCOVERY_DATA_CFG: [DataCfg; 4] = [
    DataCfg::new(
        "specificationVersionList",
        DataKind::Sequence(&SPECIFICATION_VERSION_LIST_CFG),
    ),
    DataCfg::new(
        "deviceInformation",
        DataKind::Sequence(&DEVICE_INFORMATION_CFG),
    ),
    DataCfg::new(
        "entityInformation",
        DataKind::List(&ENTITY_INFORMATION_ITEM_CFG),
    ),
    DataCfg::new(
        "featureInformation",
        DataKind::List(&FEATURE_INFORMATION_ITEM_CFG),
    ),
];

pub static DETAILED_DISCOVERY_ELEMENTS_CFG: [DataCfg; 4] = [
    DataCfg::new("specificationVersionList", DataKind::Tag),
    DataCfg::new("deviceInformation", DataKind::Tag),
    DataCfg::new("entityInformation", DataKind::Tag),
    DataCfg::new("featureInformation", DataKind::Tag),
];

// ============================================================================
// Binding Management
// ============================================================================

pub static BINDING_ENTRY_CFG: [DataCfg; 3] = [
    DataCfg::identifier("bindingId", DataKind::U32),
    DataCfg::new("clientAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
];

static BINDING_ENTRY_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::Sequence(&BINDING_ENTRY_CFG));

pub static BINDING_ENTRY_LIST_CFG: DataCfg =
    DataCfg::new("bindingEntry", DataKind::List(&BINDING_ENTRY_ITEM_CFG));

pub static BINDING_DATA_SELECTORS_CFG: [DataCfg; 1] =
    [DataCfg::identifier("bindingId", DataKind::U32)];

pub static BINDING_ENTRY_ELEMENTS_CFG: [DataCfg; 3] = [
    DataCfg::new("bindingId", DataKind::Tag),
    DataCfg::new("clientAddress", DataKind::Tag),
    DataCfg::new("serverAddress", DataKind::Tag),
];

/// `{clientAddress, serverAddress, serverFeatureType}`.
pub static BINDING_REQUEST_CFG: [DataCfg; 3] = [
    DataCfg::new("clientAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverFeatureType", DataKind::Enum(&FEATURE_TYPE_TABLE)),
];

/// `nodeManagementBindingRequestCall` body.
pub static BINDING_REQUEST_CALL_CFG: [DataCfg; 1] = [DataCfg::new(
    "bindingRequest",
    DataKind::Sequence(&BINDING_REQUEST_CFG),
)];

static BINDING_DELETE_CFG: [DataCfg; 2] = [
    DataCfg::new("clientAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
];

/// `nodeManagementBindingDeleteCall` body.
pub static BINDING_DELETE_CALL_CFG: [DataCfg; 1] = [DataCfg::new(
    "bindingDelete",
    DataKind::Sequence(&BINDING_DELETE_CFG),
)];

// ============================================================================
// Subscription Management
// ============================================================================

pub static SUBSCRIPTION_ENTRY_CFG: [DataCfg; 3] = [
    DataCfg::identifier("subscriptionId", DataKind::U32),
    DataCfg::new("clientAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
];

static SUBSCRIPTION_ENTRY_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&SUBSCRIPTION_ENTRY_CFG));

pub static SUBSCRIPTION_ENTRY_LIST_CFG: DataCfg = DataCfg::new(
    "subscriptionEntry",
    DataKind::List(&SUBSCRIPTION_ENTRY_ITEM_CFG),
);

pub static SUBSCRIPTION_DATA_SELECTORS_CFG: [DataCfg; 1] =
    [DataCfg::identifier("subscriptionId", DataKind::U32)];

pub static SUBSCRIPTION_ENTRY_ELEMENTS_CFG: [DataCfg; 3] = [
    DataCfg::new("subscriptionId", DataKind::Tag),
    DataCfg::new("clientAddress", DataKind::Tag),
    DataCfg::new("serverAddress", DataKind::Tag),
];

static SUBSCRIPTION_REQUEST_CFG: [DataCfg; 3] = [
    DataCfg::new("clientAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverFeatureType", DataKind::Enum(&FEATURE_TYPE_TABLE)),
];

/// `nodeManagementSubscriptionRequestCall` body.
pub static SUBSCRIPTION_REQUEST_CALL_CFG: [DataCfg; 1] = [DataCfg::new(
    "subscriptionRequest",
    DataKind::Sequence(&SUBSCRIPTION_REQUEST_CFG),
)];

static SUBSCRIPTION_DELETE_CFG: [DataCfg; 2] = [
    DataCfg::new("clientAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
    DataCfg::new("serverAddress", DataKind::Sequence(&FEATURE_ADDRESS_CFG)),
];

/// `nodeManagementSubscriptionDeleteCall` body.
pub static SUBSCRIPTION_DELETE_CALL_CFG: [DataCfg; 1] = [DataCfg::new(
    "subscriptionDelete",
    DataKind::Sequence(&SUBSCRIPTION_DELETE_CFG),
)];

// ============================================================================
// Destination List
// ============================================================================

static DESTINATION_DATA_CFG: [DataCfg; 1] = [DataCfg::new(
    "deviceDescription",
    DataKind::Sequence(&DEVICE_DESCRIPTION_CFG),
)];

static DESTINATION_DATA_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&DESTINATION_DATA_CFG));

pub static DESTINATION_LIST_CFG: DataCfg = DataCfg::new(
    "nodeManagementDestinationData",
    DataKind::List(&DESTINATION_DATA_ITEM_CFG),
);

pub static DESTINATION_DATA_ELEMENTS_CFG: [DataCfg; 1] =
    [DataCfg::new("deviceDescription", DataKind::Tag)];

// ============================================================================
// Use Case Advertisement
// ============================================================================

static SCENARIO_SUPPORT_ITEM_CFG: DataCfg = DataCfg::new("", DataKind::U32);

static USE_CASE_SUPPORT_CFG: [DataCfg; 3] = [
    DataCfg::identifier("useCaseName", DataKind::Enum(&USE_CASE_NAME_TABLE)),
    DataCfg::new("useCaseVersion", DataKind::String),
    DataCfg::new(
        "scenarioSupport",
        DataKind::List(&SCENARIO_SUPPORT_ITEM_CFG),
    ),
];

static USE_CASE_SUPPORT_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&USE_CASE_SUPPORT_CFG));

pub static USE_CASE_INFORMATION_CFG: [DataCfg; 3] = [
    DataCfg::identifier("address", DataKind::Sequence(&DEVICE_ADDRESS_CFG)),
    DataCfg::identifier("actor", DataKind::Enum(&USE_CASE_ACTOR_TABLE)),
    DataCfg::new("useCaseSupport", DataKind::List(&USE_CASE_SUPPORT_ITEM_CFG)),
];

static USE_CASE_INFORMATION_ITEM_CFG: DataCfg =
    DataCfg::new("", DataKind::Sequence(&USE_CASE_INFORMATION_CFG));

pub static USE_CASE_INFORMATION_LIST_CFG: DataCfg = DataCfg::new(
    "useCaseInformation",
    DataKind::List(&USE_CASE_INFORMATION_ITEM_CFG),
);

pub static USE_CASE_DATA_SELECTORS_CFG: [DataCfg; 2] = [
    DataCfg::identifier("address", DataKind::Sequence(&DEVICE_ADDRESS_CFG)),
    DataCfg::identifier("actor", DataKind::Enum(&USE_CASE_ACTOR_TABLE)),
];

pub static USE_CASE_INFORMATION_ELEMENTS_CFG: [DataCfg; 3] = [
    DataCfg::new("address", DataKind::Tag),
    DataCfg::new("actor", DataKind::Tag),
    DataCfg::new("useCaseSupport", DataKind::Tag),
];

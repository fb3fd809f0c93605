// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enumeration tables of the SPINE data model.
//!
//! Every enum is serialised as a JSON string through an
//! [`EnumTable`](crate::data::EnumTable); values equal table order so the
//! tables double as discriminant maps for the Rust-side enums.

use crate::data::EnumTable;

/// SPINE command classifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CmdClassifier {
    Read = 0,
    Reply = 1,
    Notify = 2,
    Write = 3,
    Call = 4,
    Result = 5,
}

pub static CMD_CLASSIFIER_TABLE: EnumTable = EnumTable {
    name: "cmdClassifier",
    entries: &[
        ("read", 0),
        ("reply", 1),
        ("notify", 2),
        ("write", 3),
        ("call", 4),
        ("result", 5),
    ],
};

impl CmdClassifier {
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Read),
            1 => Some(Self::Reply),
            2 => Some(Self::Notify),
            3 => Some(Self::Write),
            4 => Some(Self::Call),
            5 => Some(Self::Result),
            _ => None,
        }
    }

    pub fn value(self) -> u32 {
        self as u32
    }
}

/// Feature roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Role {
    Client = 0,
    Server = 1,
    Special = 2,
}

pub static ROLE_TABLE: EnumTable = EnumTable {
    name: "role",
    entries: &[("client", 0), ("server", 1), ("special", 2)],
};

impl Role {
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Client),
            1 => Some(Self::Server),
            2 => Some(Self::Special),
            _ => None,
        }
    }

    pub fn value(self) -> u32 {
        self as u32
    }
}

pub static DEVICE_TYPE_TABLE: EnumTable = EnumTable {
    name: "deviceType",
    entries: &[
        ("Generic", 0),
        ("EnergyManagementSystem", 1),
        ("HeatPumpAppliance", 2),
        ("ChargingStation", 3),
        ("Inverter", 4),
        ("SubMeterElectricity", 5),
    ],
};

pub static ENTITY_TYPE_TABLE: EnumTable = EnumTable {
    name: "entityType",
    entries: &[
        ("DeviceInformation", 0),
        ("CEM", 1),
        ("HeatPump", 2),
        ("EVSE", 3),
        ("EV", 4),
        ("Generic", 5),
    ],
};

pub static FEATURE_TYPE_TABLE: EnumTable = EnumTable {
    name: "featureType",
    entries: &[
        ("NodeManagement", 0),
        ("DeviceClassification", 1),
        ("DeviceDiagnosis", 2),
        ("Measurement", 3),
        ("LoadControl", 4),
        ("ActuatorLevel", 5),
        ("Setpoint", 6),
        ("ElectricalConnection", 7),
        ("Generic", 8),
    ],
};

/// Well-known feature type values (indices into [`FEATURE_TYPE_TABLE`]).
pub mod feature_type {
    pub const NODE_MANAGEMENT: u32 = 0;
    pub const DEVICE_CLASSIFICATION: u32 = 1;
    pub const DEVICE_DIAGNOSIS: u32 = 2;
    pub const MEASUREMENT: u32 = 3;
    pub const LOAD_CONTROL: u32 = 4;
    pub const ACTUATOR_LEVEL: u32 = 5;
    pub const SETPOINT: u32 = 6;
    pub const ELECTRICAL_CONNECTION: u32 = 7;
}

pub static NETWORK_FEATURE_SET_TABLE: EnumTable = EnumTable {
    name: "networkFeatureSet",
    entries: &[("simple", 0), ("smart", 1), ("router", 2), ("gateway", 3)],
};

pub static USE_CASE_ACTOR_TABLE: EnumTable = EnumTable {
    name: "useCaseActor",
    entries: &[
        ("CEM", 0),
        ("HeatPump", 1),
        ("EVSE", 2),
        ("MonitoredUnit", 3),
        ("MonitoringAppliance", 4),
    ],
};

pub static USE_CASE_NAME_TABLE: EnumTable = EnumTable {
    name: "useCaseName",
    entries: &[
        ("monitoringOfPowerConsumption", 0),
        ("limitationOfPowerConsumption", 1),
        ("coordinatedEvCharging", 2),
        ("evseCommissioningAndConfiguration", 3),
    ],
};

pub static UNIT_TABLE: EnumTable = EnumTable {
    name: "unitOfMeasurement",
    entries: &[("W", 0), ("Wh", 1), ("A", 2), ("V", 3), ("Hz", 4), ("%", 5)],
};

/// Well-known unit values (indices into [`UNIT_TABLE`]).
pub mod unit {
    pub const WATT: u32 = 0;
    pub const WATT_HOUR: u32 = 1;
    pub const AMPERE: u32 = 2;
    pub const VOLT: u32 = 3;
    pub const HERTZ: u32 = 4;
    pub const PERCENT: u32 = 5;
}

pub static MEASUREMENT_TYPE_TABLE: EnumTable = EnumTable {
    name: "measurementType",
    entries: &[
        ("power", 0),
        ("energy", 1),
        ("current", 2),
        ("voltage", 3),
        ("frequency", 4),
    ],
};

pub static MEASUREMENT_VALUE_TYPE_TABLE: EnumTable = EnumTable {
    name: "measurementValueType",
    entries: &[
        ("value", 0),
        ("averageValue", 1),
        ("minValue", 2),
        ("maxValue", 3),
    ],
};

pub static MEASUREMENT_VALUE_SOURCE_TABLE: EnumTable = EnumTable {
    name: "measurementValueSource",
    entries: &[
        ("measuredValue", 0),
        ("calculatedValue", 1),
        ("empiricalValue", 2),
    ],
};

pub static COMMODITY_TYPE_TABLE: EnumTable = EnumTable {
    name: "commodityType",
    entries: &[("electricity", 0), ("water", 1), ("gas", 2)],
};

pub static SCOPE_TYPE_TABLE: EnumTable = EnumTable {
    name: "scopeType",
    entries: &[
        ("acPowerTotal", 0),
        ("acPower", 1),
        ("acCurrent", 2),
        ("acVoltage", 3),
        ("acFrequency", 4),
        ("activePowerLimit", 5),
    ],
};

pub static LOAD_CONTROL_LIMIT_TYPE_TABLE: EnumTable = EnumTable {
    name: "loadControlLimitType",
    entries: &[
        ("maximumUsageLimit", 0),
        ("minimumUsageLimit", 1),
        ("signDependentAbsValueLimit", 2),
    ],
};

pub static LOAD_CONTROL_CATEGORY_TABLE: EnumTable = EnumTable {
    name: "loadControlCategory",
    entries: &[("obligation", 0), ("recommendation", 1), ("optimization", 2)],
};

pub static LOAD_CONTROL_LIMIT_DIRECTION_TABLE: EnumTable = EnumTable {
    name: "loadControlLimitDirection",
    entries: &[("consume", 0), ("produce", 1)],
};

pub static ACTUATOR_LEVEL_FCT_TABLE: EnumTable = EnumTable {
    name: "actuatorLevelFct",
    entries: &[
        ("start", 0),
        ("up", 1),
        ("down", 2),
        ("stop", 3),
        ("percentageAbsolute", 4),
        ("percentageRelative", 5),
        ("absolut", 6),
        ("relative", 7),
    ],
};

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Heat-pump (CLS) demo node.
//!
//! Serves SHIP on the given port and publishes simulated electrical
//! measurements once per second: total and per-phase active power, AC
//! frequency. Values are scaled by 100 (W * 100, Hz * 100) as in the
//! monitoring-of-power-consumption use case.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use eebus::data::Value;
use eebus::spine::model::enums;
use eebus::spine::{Entity, Feature, FunctionType, PossibleOperations, Role, SpineEvent, UseCase};
use eebus::{NodeEvent, NodeService, NodeServiceConfig, TlsCredentials};

const DEVICE_ADDRESS: &str = "d:_i:Demo_HeatPump-87654321";
const MEASUREMENT_ENTITY: usize = 1;
const MEASUREMENT_FEATURE: u32 = 1;
const LOAD_CONTROL_FEATURE: u32 = 2;

// Measurement ids published by this node.
const ID_POWER_TOTAL: u64 = 1;
const ID_POWER_PHASE_A: u64 = 2;
const ID_POWER_PHASE_B: u64 = 3;
const ID_POWER_PHASE_C: u64 = 4;
const ID_FREQUENCY: u64 = 5;

#[derive(Parser)]
#[command(name = "eebus-heat-pump", about = "EEBUS heat-pump demo node")]
struct Args {
    /// SHIP server port.
    server_port: u16,
    /// Remote SKI to trust (the HEMS).
    remote_ski: String,
    /// PEM certificate file.
    certificate_file: PathBuf,
    /// PEM private key file.
    private_key_file: PathBuf,
}

fn measurement_item(id: u64, number: i64) -> Value {
    Value::Seq(vec![
        Some(Value::Unsigned(id)),
        Some(Value::Enum(0)), // valueType: value
        None,
        Some(Value::Seq(vec![Some(Value::Signed(number)), None])),
        Some(Value::Enum(0)), // valueSource: measuredValue
    ])
}

fn measurement_delta(items: Vec<Value>) -> Value {
    Value::Seq(vec![Some(Value::List(items))])
}

fn setup_device(service: &NodeService) {
    service.with_device(|device| {
        let mut entity = Entity::new(
            vec![1],
            eebus::spine::model::enums::ENTITY_TYPE_TABLE
                .value_of("HeatPump")
                .unwrap_or(0),
        );
        entity.add_feature(
            Feature::new(
                MEASUREMENT_FEATURE,
                enums::feature_type::MEASUREMENT,
                Role::Server,
            )
            .with_description("Heat pump power measurements")
            .with_function(
                FunctionType::MeasurementListData,
                PossibleOperations::read_only(),
            )
            .with_function(
                FunctionType::MeasurementDescriptionListData,
                PossibleOperations::read_only(),
            ),
        );
        entity.add_feature(
            Feature::new(
                LOAD_CONTROL_FEATURE,
                enums::feature_type::LOAD_CONTROL,
                Role::Server,
            )
            .with_description("Active power consumption limit")
            .with_function(
                FunctionType::LoadControlLimitListData,
                PossibleOperations::read_write_partial(),
            )
            .with_function(
                FunctionType::LoadControlLimitDescriptionListData,
                PossibleOperations::read_only(),
            ),
        );
        device.add_entity(entity);
    });

    service.add_use_case(UseCase {
        actor: enums::USE_CASE_ACTOR_TABLE
            .value_of("MonitoredUnit")
            .unwrap_or(0),
        name: enums::USE_CASE_NAME_TABLE
            .value_of("monitoringOfPowerConsumption")
            .unwrap_or(0),
        version: "1.0.0".into(),
        scenarios: vec![1, 4, 5],
    });
    service.add_use_case(UseCase {
        actor: enums::USE_CASE_ACTOR_TABLE
            .value_of("MonitoredUnit")
            .unwrap_or(0),
        name: enums::USE_CASE_NAME_TABLE
            .value_of("limitationOfPowerConsumption")
            .unwrap_or(0),
        version: "1.0.0".into(),
        scenarios: vec![1, 2],
    });
}

/// Publish one round of simulated values: total power split over three
/// phases with a little imbalance, frequency around 50 Hz.
fn publish_measurements(service: &NodeService, total_w: i64) {
    let a_w = total_w * 34 / 100;
    let b_w = total_w * 33 / 100;
    let c_w = total_w - a_w - b_w;

    let f_chz = 5000 + fastrand::i64(-5..=5);

    let delta = measurement_delta(vec![
        measurement_item(ID_POWER_TOTAL, total_w * 100),
        measurement_item(ID_POWER_PHASE_A, a_w * 100),
        measurement_item(ID_POWER_PHASE_B, b_w * 100),
        measurement_item(ID_POWER_PHASE_C, c_w * 100),
        measurement_item(ID_FREQUENCY, f_chz),
    ]);

    if let Err(err) = service.publish(
        MEASUREMENT_ENTITY,
        MEASUREMENT_FEATURE,
        FunctionType::MeasurementListData,
        delta,
    ) {
        error!("publish failed: {}", err);
    } else {
        info!(
            "[MPC] P: total={}W A={}W B={}W C={}W f={}.{:02}Hz",
            total_w,
            a_w,
            b_w,
            c_w,
            f_chz / 100,
            f_chz % 100
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let credentials =
        match TlsCredentials::load(&args.certificate_file, &args.private_key_file) {
            Ok(credentials) => credentials,
            Err(err) => {
                eprintln!("Failed to load TLS certificate and private key: {}", err);
                std::process::exit(-1);
            }
        };

    let config = NodeServiceConfig {
        port: args.server_port,
        device_address: DEVICE_ADDRESS.into(),
        device_type: eebus::spine::model::enums::DEVICE_TYPE_TABLE
            .value_of("HeatPumpAppliance")
            .unwrap_or(0),
        network_feature_set: 1, // smart
    };

    let events: Arc<dyn Fn(NodeEvent) + Send + Sync> = Arc::new(|event| match event {
        NodeEvent::ShipState {
            remote_ski,
            state,
            close_error,
        } => {
            if close_error.is_empty() {
                info!("ship[{}]: {}", remote_ski, state);
            } else {
                error!("ship[{}]: {} ({})", remote_ski, state, close_error);
            }
        }
        NodeEvent::Spine { event, .. } => {
            if let SpineEvent::LocalDataChanged { function, .. } = event {
                info!("remote write applied to {:?}", function);
            }
        }
    });

    let mut service = match NodeService::open(config, credentials, events) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("Failed to open heat pump EEBUS service: {}", err);
            std::process::exit(-1);
        }
    };

    setup_device(&service);
    service.register_remote_ski(&args.remote_ski);

    let running = Arc::new(AtomicBool::new(true));
    let running_flag = running.clone();
    ctrlc::set_handler(move || {
        running_flag.store(false, Ordering::SeqCst);
    })?;

    // Random walk around 1.5 kW, clamped to [0, 5000] W.
    let mut power_w: i64 = 1500;
    while running.load(Ordering::SeqCst) {
        power_w = (power_w + fastrand::i64(-250..=250)).clamp(0, 5000);
        publish_measurements(&service, power_w);
        std::thread::sleep(Duration::from_secs(1));
    }

    service.close();
    Ok(())
}

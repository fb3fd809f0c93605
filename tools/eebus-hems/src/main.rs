// SPDX-License-Identifier: Apache-2.0 OR MIT

//! HEMS demo node.
//!
//! Serves SHIP on the given port (and can dial a CLS directly), then
//! takes commands from stdin:
//!
//! ```text
//! connect <host> <port>      dial a CLS
//! discover <deviceId>        read detailed discovery from the peer
//! subscribe <deviceId>       subscribe to the peer's measurements
//! bind <deviceId>            bind to the peer's load-control feature
//! limit <deviceId> <watts>   write an active power limit
//! quit
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use eebus::data::Value;
use eebus::spine::model::enums;
use eebus::spine::{FeatureAddress, Filter, FunctionType, SpineEvent};
use eebus::{NodeEvent, NodeService, NodeServiceConfig, TlsCredentials};

const DEVICE_ADDRESS: &str = "d:_i:Demo_HEMS-12345678";

// Feature layout of the demo CLS peer.
const PEER_MEASUREMENT_FEATURE: u32 = 1;
const PEER_LOAD_CONTROL_FEATURE: u32 = 2;

#[derive(Parser)]
#[command(name = "eebus-hems", about = "EEBUS HEMS demo node")]
struct Args {
    /// SHIP server port.
    server_port: u16,
    /// Remote SKI to trust (the CLS).
    remote_ski: String,
    /// PEM certificate file.
    certificate_file: PathBuf,
    /// PEM private key file.
    private_key_file: PathBuf,
}

fn client_address() -> FeatureAddress {
    FeatureAddress::feature(Some(DEVICE_ADDRESS), &[0], 0)
}

fn peer_feature(device: &str, feature: u32) -> FeatureAddress {
    FeatureAddress::feature(Some(device), &[1], feature)
}

fn limit_delta(limit_w: i64) -> Value {
    let item = Value::Seq(vec![
        Some(Value::Unsigned(1)), // limitId
        None,
        Some(Value::Bool(true)), // isLimitActive
        None,
        Some(Value::Seq(vec![Some(Value::Signed(limit_w * 100)), None])),
    ]);
    Value::Seq(vec![Some(Value::List(vec![item]))])
}

fn handle_command(service: &NodeService, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };

    let result = match (command, parts.next(), parts.next()) {
        ("quit", _, _) => return false,
        ("connect", Some(host), Some(port)) => match port.parse::<u16>() {
            Ok(port) => service.connect(host, port).map(|_| 0),
            Err(_) => {
                error!("bad port: {}", port);
                return true;
            }
        },
        ("discover", Some(device), _) => service.read(
            &client_address(),
            &FeatureAddress::feature(Some(device), &[0], 0),
            FunctionType::NodeManagementDetailedDiscoveryData,
        ),
        ("subscribe", Some(device), _) => service.subscribe(
            &client_address(),
            &peer_feature(device, PEER_MEASUREMENT_FEATURE),
            enums::feature_type::MEASUREMENT,
        ),
        ("bind", Some(device), _) => service.bind(
            &client_address(),
            &peer_feature(device, PEER_LOAD_CONTROL_FEATURE),
            enums::feature_type::LOAD_CONTROL,
        ),
        ("limit", Some(device), Some(watts)) => match watts.parse::<i64>() {
            Ok(watts) => service.with_device(|dev| {
                dev.send_write(
                    &client_address(),
                    &peer_feature(device, PEER_LOAD_CONTROL_FEATURE),
                    FunctionType::LoadControlLimitListData,
                    limit_delta(watts),
                    Some(Filter::partial(
                        FunctionType::LoadControlLimitListData,
                        None,
                        None,
                    )),
                )
            }),
            Err(_) => {
                error!("bad watts value: {}", watts);
                return true;
            }
        },
        _ => {
            info!("commands: connect | discover | subscribe | bind | limit | quit");
            return true;
        }
    };

    match result {
        Ok(msg_counter) if msg_counter > 0 => info!("sent (msgCounter {})", msg_counter),
        Ok(_) => info!("ok"),
        Err(err) => error!("{} failed: {}", command, err),
    }

    true
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
        device_type: enums::DEVICE_TYPE_TABLE
            .value_of("EnergyManagementSystem")
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
        NodeEvent::Spine { remote_ski, event } => match event {
            SpineEvent::FunctionUpdated {
                function, data, ..
            } => {
                let presence = if data.is_some() { "data" } else { "empty" };
                info!("[{}] {:?} updated ({})", remote_ski, function, presence);
            }
            SpineEvent::CallCompleted {
                msg_counter_reference,
                result,
            } => {
                if result.is_success() {
                    info!("[{}] call {} acknowledged", remote_ski, msg_counter_reference);
                } else {
                    error!(
                        "[{}] call {} failed: {} {}",
                        remote_ski,
                        msg_counter_reference,
                        result.error_number,
                        result.description.as_deref().unwrap_or("")
                    );
                }
            }
            SpineEvent::LocalDataChanged { function, .. } => {
                info!("[{}] local {:?} changed by peer", remote_ski, function);
            }
        },
    });

    let mut service = match NodeService::open(config, credentials, events) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("Failed to open HEMS EEBUS service: {}", err);
            std::process::exit(-1);
        }
    };

    service.register_remote_ski(&args.remote_ski);

    let running = Arc::new(AtomicBool::new(true));
    let running_flag = running.clone();
    ctrlc::set_handler(move || {
        running_flag.store(false, Ordering::SeqCst);
    })?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        match line {
            Ok(line) => {
                if !handle_command(&service, &line) {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    service.close();
    Ok(())
}

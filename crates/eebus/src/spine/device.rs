// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The local SPINE device: entity/feature tree, datagram dispatch,
//! binding and subscription tables, notifications.
//!
//! Addressing note: features are always located through
//! `(entity index, feature index)` pairs resolved per dispatch — the
//! tables never hold references into the tree, and binding/subscription
//! entries carry peer addresses by value.

use log::{debug, warn};

use crate::data::Value;
use crate::error::{Error, Result};
use crate::spine::feature::{Entity, Feature};
use crate::spine::function::{empty_body, Function};
use crate::spine::model::datagram::{Cmd, Datagram, Filter, Header};
use crate::spine::model::{
    CmdClassifier, ErrorResult, FeatureAddress, FunctionType, PossibleOperations,
    SPECIFICATION_VERSION,
};
use crate::spine::sender::{DatagramWriter, Sender};

/// A committed (or provisionally committed) binding table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEntry {
    pub id: u32,
    pub client: FeatureAddress,
    pub server: FeatureAddress,
    pub server_feature_type: u32,
}

/// A subscription table entry; same shape as a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry {
    pub id: u32,
    pub client: FeatureAddress,
    pub server: FeatureAddress,
    pub server_feature_type: u32,
}

/// A use case advertised through `nodeManagementUseCaseData`.
#[derive(Debug, Clone)]
pub struct UseCase {
    pub actor: u32,
    pub name: u32,
    pub version: String,
    pub scenarios: Vec<u32>,
}

/// What a dispatched datagram produced for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SpineEvent {
    /// A reply or notify updated our mirror of a remote function.
    FunctionUpdated {
        remote_device: Option<String>,
        function: FunctionType,
        data: Option<Value>,
    },
    /// A `result` completed one of our outbound calls.
    CallCompleted {
        msg_counter_reference: u64,
        result: ErrorResult,
    },
    /// A remote write changed a local server function.
    LocalDataChanged {
        address: FeatureAddress,
        function: FunctionType,
    },
}

/// Commit/rollback bookkeeping for outbound calls awaiting their result.
#[derive(Debug, Clone, Copy)]
enum PendingAction {
    CommitBinding(u32),
    RemoveBinding(u32),
    CommitSubscription(u32),
    RemoveSubscription(u32),
}

/// The local SPINE device model and dispatcher.
pub struct Device {
    address: String,
    device_type: u32,
    network_feature_set: u32,
    entities: Vec<Entity>,
    use_cases: Vec<UseCase>,

    bindings: Vec<BindingEntry>,
    next_binding_id: u32,
    subscriptions: Vec<SubscriptionEntry>,
    next_subscription_id: u32,
    pending_calls: Vec<(u64, PendingAction)>,

    /// Mirror of remote function data, keyed by source device id.
    remote_mirror: Vec<(Option<String>, FunctionType, Option<Value>)>,

    sender: Sender,
}

impl Device {
    /// Create a device with its device-information entity (`[0]`) and the
    /// node-management feature (`0`, role special) already in place.
    pub fn new(
        address: &str,
        device_type: u32,
        network_feature_set: u32,
        writer: Box<dyn DatagramWriter>,
    ) -> Device {
        let mut info = Entity::new(vec![0], 0);
        info.add_feature(
            Feature::new(0, 0, crate::spine::model::Role::Special)
                .with_function(
                    FunctionType::NodeManagementDetailedDiscoveryData,
                    PossibleOperations::read_only(),
                )
                .with_function(
                    FunctionType::NodeManagementUseCaseData,
                    PossibleOperations::read_only(),
                )
                .with_function(
                    FunctionType::NodeManagementDestinationListData,
                    PossibleOperations::read_only(),
                )
                .with_function(
                    FunctionType::NodeManagementBindingData,
                    PossibleOperations::read_only(),
                )
                .with_function(
                    FunctionType::NodeManagementSubscriptionData,
                    PossibleOperations::read_only(),
                ),
        );

        Device {
            address: address.to_owned(),
            device_type,
            network_feature_set,
            entities: vec![info],
            use_cases: Vec::new(),
            bindings: Vec::new(),
            next_binding_id: 1,
            subscriptions: Vec::new(),
            next_subscription_id: 1,
            pending_calls: Vec::new(),
            remote_mirror: Vec::new(),
            sender: Sender::new(writer),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn add_use_case(&mut self, use_case: UseCase) {
        self.use_cases.push(use_case);
    }

    pub fn bindings(&self) -> &[BindingEntry] {
        &self.bindings
    }

    pub fn subscriptions(&self) -> &[SubscriptionEntry] {
        &self.subscriptions
    }

    /// Seed the outbound message counter (test hook).
    pub fn set_msg_counter(&mut self, value: u64) {
        self.sender.set_msg_counter(value);
    }

    /// Address of the node-management feature.
    pub fn node_management_address(&self) -> FeatureAddress {
        FeatureAddress::feature(Some(&self.address), &[0], 0)
    }

    /// Address of a feature in the local tree.
    pub fn feature_address(&self, entity_index: usize, feature_number: u32) -> FeatureAddress {
        let path = self
            .entities
            .get(entity_index)
            .map(|e| e.address().to_vec())
            .unwrap_or_default();
        FeatureAddress::feature(Some(&self.address), &path, feature_number)
    }

    /// Resolve a destination address against the local tree. A missing
    /// device id addresses this node (broadcast form).
    fn find_feature(&self, addr: &FeatureAddress) -> Option<(usize, usize)> {
        if let Some(device) = &addr.device {
            if device != &self.address {
                return None;
            }
        }

        let feature_number = addr.feature?;
        self.entities
            .iter()
            .enumerate()
            .find(|(_, e)| e.address() == addr.entity.as_slice())
            .and_then(|(entity_index, entity)| {
                entity
                    .feature_by_number(feature_number)
                    .map(|(feature_index, _)| (entity_index, feature_index))
            })
    }

    fn feature(&self, entity_index: usize, feature_index: usize) -> Option<&Feature> {
        self.entities.get(entity_index)?.features().get(feature_index)
    }

    fn function_mut(
        &mut self,
        entity_index: usize,
        feature_index: usize,
        function_type: FunctionType,
    ) -> Option<&mut Function> {
        self.entities
            .get_mut(entity_index)?
            .feature_mut(feature_index)?
            .function_mut(function_type)
    }

    // ========================================================================
    // Inbound dispatch
    // ========================================================================

    /// Dispatch one inbound SPINE datagram (raw JSON).
    pub fn handle_datagram(&mut self, text: &str) -> Vec<SpineEvent> {
        let mut events = Vec::new();

        let datagram = match Datagram::parse(text) {
            Ok(datagram) => datagram,
            Err(err) => {
                warn!("dropping malformed datagram: {}", err);
                return events;
            }
        };

        if !datagram.is_valid() {
            warn!("dropping datagram with invalid header");
            return events;
        }

        let Some(classifier) = datagram.header.cmd_classifier else {
            return events;
        };

        for cmd in &datagram.cmds {
            let outcome = match classifier {
                CmdClassifier::Read => self.handle_read(&datagram.header, cmd),
                CmdClassifier::Write => self.handle_write(&datagram.header, cmd, &mut events),
                CmdClassifier::Call => self.handle_call(&datagram.header, cmd),
                CmdClassifier::Reply | CmdClassifier::Notify => {
                    self.handle_update(&datagram.header, cmd, &mut events)
                }
                CmdClassifier::Result => self.handle_result(&datagram.header, cmd, &mut events),
            };

            if let Err(err) = outcome {
                warn!("datagram dispatch failed: {}", err);
            }
        }

        events
    }

    fn reply_error(&mut self, header: &Header, error: ErrorResult) -> Result<()> {
        let sender_addr = self.node_management_address();
        self.sender.result(header, &sender_addr, &error)?;
        Ok(())
    }

    fn handle_read(&mut self, header: &Header, cmd: &Cmd) -> Result<()> {
        let dest = header.dest_addr.clone().unwrap_or_default();
        let Some((entity_index, feature_index)) = self.find_feature(&dest) else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };

        let Some(function_type) = cmd.data_function() else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };

        self.refresh_node_management(entity_index, feature_index, function_type)?;

        // Build the reply first so the tree borrow ends before sending.
        let reply = self
            .feature(entity_index, feature_index)
            .and_then(|feature| {
                feature
                    .function(function_type)
                    .map(|function| (feature.number(), function.create_reply_cmd(cmd.partial_filter())))
            });

        let Some((feature_number, reply_cmd)) = reply else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };
        let reply_cmd = reply_cmd?;

        let sender_addr = self.feature_address(entity_index, feature_number);
        self.sender.reply(header, &sender_addr, reply_cmd)?;
        Ok(())
    }

    fn handle_write(
        &mut self,
        header: &Header,
        cmd: &Cmd,
        events: &mut Vec<SpineEvent>,
    ) -> Result<()> {
        let dest = header.dest_addr.clone().unwrap_or_default();
        let Some((entity_index, feature_index)) = self.find_feature(&dest) else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };

        let Some(function_type) = cmd.data_function() else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };

        let applied = self
            .function_mut(entity_index, feature_index, function_type)
            .map(|function| function.apply_write(cmd));

        let Some(applied) = applied else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };
        applied?;

        let feature_number = self
            .feature(entity_index, feature_index)
            .map(Feature::number)
            .unwrap_or_default();
        let address = self.feature_address(entity_index, feature_number);

        events.push(SpineEvent::LocalDataChanged {
            address: address.clone(),
            function: function_type,
        });

        let sender_addr = address.clone();
        self.sender
            .result(header, &sender_addr, &ErrorResult::success())?;

        // Push the change to current subscribers, carrying the written
        // payload as the minimal delta.
        let delta = cmd.data.as_ref().and_then(|(_, value)| value.clone());
        self.notify_subscribers(&address, function_type, delta)?;
        Ok(())
    }

    fn handle_call(&mut self, header: &Header, cmd: &Cmd) -> Result<()> {
        let Some(function_type) = cmd.data_function() else {
            return self.reply_error(header, ErrorResult::new(ErrorResult::GENERAL, None));
        };

        let payload = cmd.data.as_ref().and_then(|(_, value)| value.as_ref());

        let result = match function_type {
            FunctionType::NodeManagementBindingRequestCall => {
                self.accept_binding_request(payload)
            }
            FunctionType::NodeManagementBindingDeleteCall => self.accept_binding_delete(payload),
            FunctionType::NodeManagementSubscriptionRequestCall => {
                self.accept_subscription_request(payload)
            }
            FunctionType::NodeManagementSubscriptionDeleteCall => {
                self.accept_subscription_delete(payload)
            }
            _ => ErrorResult::new(ErrorResult::GENERAL, Some("unsupported call")),
        };

        let sender_addr = self.node_management_address();
        self.sender.result(header, &sender_addr, &result)?;
        Ok(())
    }

    fn handle_update(
        &mut self,
        header: &Header,
        cmd: &Cmd,
        events: &mut Vec<SpineEvent>,
    ) -> Result<()> {
        let Some(function_type) = cmd.data_function() else {
            return Ok(());
        };

        let data = cmd.data.as_ref().and_then(|(_, value)| value.clone());
        let remote_device = header.src_addr.as_ref().and_then(|a| a.device.clone());

        // Update the remote mirror for that device's function; a partial
        // notify merges into the mirrored state instead of replacing it.
        let found = self.remote_mirror.iter().position(|(device, function, _)| {
            *device == remote_device && *function == function_type
        });
        let position = match found {
            Some(position) => position,
            None => {
                self.remote_mirror
                    .push((remote_device.clone(), function_type, None));
                self.remote_mirror.len() - 1
            }
        };

        if cmd.partial_filter().is_some() || cmd.delete_filter().is_some() {
            let mut mirror = Function::new(function_type, PossibleOperations::default());
            mirror.set_data(self.remote_mirror[position].2.take());
            if let Err(err) = mirror.apply_write(cmd) {
                warn!("mirror update failed: {}", err);
            }
            self.remote_mirror[position].2 = mirror.take_data();
        } else {
            self.remote_mirror[position].2 = data.clone();
        }

        events.push(SpineEvent::FunctionUpdated {
            remote_device,
            function: function_type,
            data,
        });

        // An explicit ack request still expects a success result.
        if header.ack_request == Some(true) {
            let sender_addr = self.node_management_address();
            self.sender
                .result(header, &sender_addr, &ErrorResult::success())?;
        }

        Ok(())
    }

    fn handle_result(
        &mut self,
        header: &Header,
        cmd: &Cmd,
        events: &mut Vec<SpineEvent>,
    ) -> Result<()> {
        let Some(reference) = header.msg_counter_reference else {
            return Ok(());
        };

        let result = match &cmd.data {
            Some((FunctionType::ResultData, value)) => {
                ErrorResult::from_value(value.as_ref()).unwrap_or_default()
            }
            _ => ErrorResult::success(),
        };

        if let Some(position) = self
            .pending_calls
            .iter()
            .position(|(counter, _)| *counter == reference)
        {
            let (_, action) = self.pending_calls.swap_remove(position);
            self.settle_pending(action, &result);
        }

        events.push(SpineEvent::CallCompleted {
            msg_counter_reference: reference,
            result,
        });
        Ok(())
    }

    fn settle_pending(&mut self, action: PendingAction, result: &ErrorResult) {
        match action {
            PendingAction::CommitBinding(id) => {
                if !result.is_success() {
                    self.bindings.retain(|b| b.id != id);
                }
            }
            PendingAction::RemoveBinding(id) => {
                if result.is_success() {
                    self.bindings.retain(|b| b.id != id);
                }
            }
            PendingAction::CommitSubscription(id) => {
                if !result.is_success() {
                    self.subscriptions.retain(|s| s.id != id);
                }
            }
            PendingAction::RemoveSubscription(id) => {
                if result.is_success() {
                    self.subscriptions.retain(|s| s.id != id);
                }
            }
        }
    }

    /// Node-management data is generated from device state right before
    /// every read.
    fn refresh_node_management(
        &mut self,
        entity_index: usize,
        feature_index: usize,
        function_type: FunctionType,
    ) -> Result<()> {
        let value = match function_type {
            FunctionType::NodeManagementDetailedDiscoveryData => {
                Some(self.detailed_discovery_data())
            }
            FunctionType::NodeManagementUseCaseData => Some(self.use_case_data()),
            FunctionType::NodeManagementDestinationListData => Some(self.destination_list_data()),
            FunctionType::NodeManagementBindingData => Some(self.binding_data()),
            FunctionType::NodeManagementSubscriptionData => Some(self.subscription_data()),
            _ => None,
        };

        if let Some(value) = value {
            if let Some(function) = self.function_mut(entity_index, feature_index, function_type)
            {
                function.set_data(Some(value));
            }
        }

        Ok(())
    }

    // ========================================================================
    // Outbound operations
    // ========================================================================

    /// Read a remote function (optionally partial).
    pub fn send_read(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        function_type: FunctionType,
        filter: Option<Filter>,
    ) -> Result<u64> {
        let function = Function::new(function_type, PossibleOperations::read_only());
        let cmd = function.create_read_cmd(filter);
        self.sender.read(src, dest, cmd)
    }

    /// Write a remote function. A partial/delete filter routes the peer
    /// through its partial-write machinery; without one the payload
    /// replaces the remote data.
    pub fn send_write(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        function_type: FunctionType,
        value: Value,
        filter: Option<Filter>,
    ) -> Result<u64> {
        let cmd = match filter {
            Some(filter) => Cmd::with_filters(function_type, vec![filter], Some(value)),
            None => Cmd::with_data(function_type, Some(value)),
        };
        self.sender.write(src, dest, cmd)
    }

    /// Request a binding from `client` (ours) to the peer's `server`
    /// feature. The entry is committed or rolled back by the peer's
    /// result.
    pub fn call_bind(
        &mut self,
        client: &FeatureAddress,
        server: &FeatureAddress,
        server_feature_type: u32,
    ) -> Result<u64> {
        let id = self.next_binding_id;
        self.next_binding_id += 1;

        self.bindings.push(BindingEntry {
            id,
            client: client.clone(),
            server: server.clone(),
            server_feature_type,
        });

        let request = Value::Seq(vec![
            Some(client.to_value()),
            Some(server.to_value()),
            Some(Value::Enum(server_feature_type)),
        ]);
        let body = Value::Seq(vec![Some(request)]);
        let cmd = Cmd::with_data(FunctionType::NodeManagementBindingRequestCall, Some(body));

        let msg_counter = self.sender.call(client, server, cmd)?;
        self.pending_calls
            .push((msg_counter, PendingAction::CommitBinding(id)));
        Ok(msg_counter)
    }

    /// Release an established binding.
    pub fn call_unbind(
        &mut self,
        client: &FeatureAddress,
        server: &FeatureAddress,
    ) -> Result<u64> {
        let entry = self
            .bindings
            .iter()
            .find(|b| &b.client == client && &b.server == server)
            .ok_or(Error::InputArgument)?;
        let id = entry.id;

        let delete = Value::Seq(vec![Some(client.to_value()), Some(server.to_value())]);
        let body = Value::Seq(vec![Some(delete)]);
        let cmd = Cmd::with_data(FunctionType::NodeManagementBindingDeleteCall, Some(body));

        let msg_counter = self.sender.call(client, server, cmd)?;
        self.pending_calls
            .push((msg_counter, PendingAction::RemoveBinding(id)));
        Ok(msg_counter)
    }

    /// Subscribe `client` (ours) to the peer's `server` feature.
    pub fn call_subscribe(
        &mut self,
        client: &FeatureAddress,
        server: &FeatureAddress,
        server_feature_type: u32,
    ) -> Result<u64> {
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;

        self.subscriptions.push(SubscriptionEntry {
            id,
            client: client.clone(),
            server: server.clone(),
            server_feature_type,
        });

        let request = Value::Seq(vec![
            Some(client.to_value()),
            Some(server.to_value()),
            Some(Value::Enum(server_feature_type)),
        ]);
        let body = Value::Seq(vec![Some(request)]);
        let cmd = Cmd::with_data(
            FunctionType::NodeManagementSubscriptionRequestCall,
            Some(body),
        );

        let msg_counter = self.sender.call(client, server, cmd)?;
        self.pending_calls
            .push((msg_counter, PendingAction::CommitSubscription(id)));
        Ok(msg_counter)
    }

    /// Cancel an established subscription.
    pub fn call_unsubscribe(
        &mut self,
        client: &FeatureAddress,
        server: &FeatureAddress,
    ) -> Result<u64> {
        let entry = self
            .subscriptions
            .iter()
            .find(|s| &s.client == client && &s.server == server)
            .ok_or(Error::InputArgument)?;
        let id = entry.id;

        let delete = Value::Seq(vec![Some(client.to_value()), Some(server.to_value())]);
        let body = Value::Seq(vec![Some(delete)]);
        let cmd = Cmd::with_data(
            FunctionType::NodeManagementSubscriptionDeleteCall,
            Some(body),
        );

        let msg_counter = self.sender.call(client, server, cmd)?;
        self.pending_calls
            .push((msg_counter, PendingAction::RemoveSubscription(id)));
        Ok(msg_counter)
    }

    /// Update a local server function and notify its subscribers with the
    /// given delta (for list functions: only the modified elements).
    pub fn publish(
        &mut self,
        entity_index: usize,
        feature_number: u32,
        function_type: FunctionType,
        delta: Value,
    ) -> Result<()> {
        let address = self.feature_address(entity_index, feature_number);

        let Some(entity) = self.entities.get_mut(entity_index) else {
            return Err(Error::InputArgument);
        };
        let Some((feature_index, _)) = entity.feature_by_number(feature_number) else {
            return Err(Error::InputArgument);
        };
        let Some(function) = entity
            .feature_mut(feature_index)
            .and_then(|f| f.function_mut(function_type))
        else {
            return Err(Error::InputArgument);
        };

        function.update_partial(Some(&delta))?;
        self.notify_subscribers(&address, function_type, Some(delta))
    }

    fn notify_subscribers(
        &mut self,
        server_addr: &FeatureAddress,
        function_type: FunctionType,
        delta: Option<Value>,
    ) -> Result<()> {
        let targets: Vec<FeatureAddress> = self
            .subscriptions
            .iter()
            .filter(|s| {
                s.server.entity == server_addr.entity && s.server.feature == server_addr.feature
            })
            .map(|s| s.client.clone())
            .collect();

        for client in targets {
            let cmd = Cmd::with_data(
                function_type,
                Some(
                    delta
                        .clone()
                        .unwrap_or_else(|| empty_body(function_type)),
                ),
            );
            self.sender.notify(server_addr, &client, cmd)?;
        }

        Ok(())
    }

    // ========================================================================
    // Incoming binding/subscription calls
    // ========================================================================

    fn parse_addresses(payload: Option<&Value>) -> Option<(FeatureAddress, FeatureAddress, Option<u32>)> {
        // Both request and delete bodies are a one-child sequence whose
        // child carries clientAddress/serverAddress (+ serverFeatureType).
        let Some(Value::Seq(outer)) = payload else {
            return None;
        };
        let Some(Value::Seq(inner)) = outer.first().and_then(Option::as_ref) else {
            return None;
        };

        let client =
            FeatureAddress::from_value(inner.first().and_then(Option::as_ref)).ok()?;
        let server = FeatureAddress::from_value(inner.get(1).and_then(Option::as_ref)).ok()?;
        let feature_type = inner.get(2).and_then(Option::as_ref).and_then(Value::as_enum);

        Some((client, server, feature_type))
    }

    fn accept_binding_request(&mut self, payload: Option<&Value>) -> ErrorResult {
        let Some((client, server, feature_type)) = Self::parse_addresses(payload) else {
            return ErrorResult::new(ErrorResult::GENERAL, Some("malformed binding request"));
        };
        let server_feature_type = feature_type.unwrap_or_default();

        let duplicate = self.bindings.iter().any(|b| {
            b.client == client
                && b.server == server
                && b.server_feature_type == server_feature_type
        });
        if duplicate {
            return ErrorResult::new(ErrorResult::GENERAL, Some("binding already exists"));
        }

        let id = self.next_binding_id;
        self.next_binding_id += 1;
        debug!("accepting binding {} from {:?}", id, client.device);

        self.bindings.push(BindingEntry {
            id,
            client,
            server,
            server_feature_type,
        });
        ErrorResult::success()
    }

    fn accept_binding_delete(&mut self, payload: Option<&Value>) -> ErrorResult {
        let Some((client, server, _)) = Self::parse_addresses(payload) else {
            return ErrorResult::new(ErrorResult::GENERAL, Some("malformed binding delete"));
        };

        let before = self.bindings.len();
        self.bindings
            .retain(|b| !(b.client == client && b.server == server));

        if self.bindings.len() == before {
            ErrorResult::new(ErrorResult::GENERAL, Some("no such binding"))
        } else {
            ErrorResult::success()
        }
    }

    fn accept_subscription_request(&mut self, payload: Option<&Value>) -> ErrorResult {
        let Some((client, server, feature_type)) = Self::parse_addresses(payload) else {
            return ErrorResult::new(ErrorResult::GENERAL, Some("malformed subscription request"));
        };
        let server_feature_type = feature_type.unwrap_or_default();

        let duplicate = self.subscriptions.iter().any(|s| {
            s.client == client
                && s.server == server
                && s.server_feature_type == server_feature_type
        });
        if duplicate {
            return ErrorResult::new(ErrorResult::GENERAL, Some("subscription already exists"));
        }

        let id = self.next_subscription_id;
        self.next_subscription_id += 1;

        self.subscriptions.push(SubscriptionEntry {
            id,
            client,
            server,
            server_feature_type,
        });
        ErrorResult::success()
    }

    fn accept_subscription_delete(&mut self, payload: Option<&Value>) -> ErrorResult {
        let Some((client, server, _)) = Self::parse_addresses(payload) else {
            return ErrorResult::new(ErrorResult::GENERAL, Some("malformed subscription delete"));
        };

        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|s| !(s.client == client && s.server == server));

        if self.subscriptions.len() == before {
            ErrorResult::new(ErrorResult::GENERAL, Some("no such subscription"))
        } else {
            ErrorResult::success()
        }
    }

    // ========================================================================
    // Node-management data builders
    // ========================================================================

    fn device_description_value(&self) -> Value {
        Value::Seq(vec![
            Some(Value::Seq(vec![Some(Value::Str(self.address.clone()))])),
            Some(Value::Enum(self.device_type)),
            Some(Value::Enum(self.network_feature_set)),
        ])
    }

    /// Build `nodeManagementDetailedDiscoveryData` from the device tree.
    pub fn detailed_discovery_data(&self) -> Value {
        let spec_versions = Value::Seq(vec![Some(Value::List(vec![Value::Str(
            SPECIFICATION_VERSION.to_owned(),
        )]))]);

        let device_information = Value::Seq(vec![Some(self.device_description_value())]);

        let entity_information = Value::List(
            self.entities
                .iter()
                .map(|entity| {
                    let path = Value::List(
                        entity
                            .address()
                            .iter()
                            .map(|n| Value::Unsigned((*n).into()))
                            .collect(),
                    );
                    let description = Value::Seq(vec![
                        Some(Value::Seq(vec![Some(path)])),
                        Some(Value::Enum(entity.entity_type())),
                    ]);
                    Value::Seq(vec![Some(description)])
                })
                .collect(),
        );

        let mut features = Vec::new();
        for entity in &self.entities {
            for feature in entity.features() {
                let path = Value::List(
                    entity
                        .address()
                        .iter()
                        .map(|n| Value::Unsigned((*n).into()))
                        .collect(),
                );
                let feature_addr = Value::Seq(vec![
                    Some(path),
                    Some(Value::Unsigned(feature.number().into())),
                ]);

                let supported = Value::List(
                    feature
                        .functions()
                        .iter()
                        .map(|function| {
                            crate::spine::model::common::function_property_value(
                                function.function_type(),
                                function.operations(),
                            )
                        })
                        .collect(),
                );

                let description = Value::Seq(vec![
                    Some(feature_addr),
                    Some(Value::Enum(feature.feature_type())),
                    Some(Value::Enum(feature.role().value())),
                    Some(supported),
                    feature.description().map(|d| Value::Str(d.to_owned())),
                ]);
                features.push(Value::Seq(vec![Some(description)]));
            }
        }

        Value::Seq(vec![
            Some(spec_versions),
            Some(device_information),
            Some(entity_information),
            Some(Value::List(features)),
        ])
    }

    /// Build `nodeManagementUseCaseData` from the advertised use cases.
    pub fn use_case_data(&self) -> Value {
        let mut by_actor: Vec<(u32, Vec<&UseCase>)> = Vec::new();
        for use_case in &self.use_cases {
            match by_actor.iter_mut().find(|(actor, _)| *actor == use_case.actor) {
                Some((_, list)) => list.push(use_case),
                None => by_actor.push((use_case.actor, vec![use_case])),
            }
        }

        let items = by_actor
            .into_iter()
            .map(|(actor, use_cases)| {
                let support = Value::List(
                    use_cases
                        .iter()
                        .map(|uc| {
                            Value::Seq(vec![
                                Some(Value::Enum(uc.name)),
                                Some(Value::Str(uc.version.clone())),
                                Some(Value::List(
                                    uc.scenarios
                                        .iter()
                                        .map(|s| Value::Unsigned((*s).into()))
                                        .collect(),
                                )),
                            ])
                        })
                        .collect(),
                );

                Value::Seq(vec![
                    Some(Value::Seq(vec![Some(Value::Str(self.address.clone()))])),
                    Some(Value::Enum(actor)),
                    Some(support),
                ])
            })
            .collect();

        Value::Seq(vec![Some(Value::List(items))])
    }

    /// Build `nodeManagementDestinationListData` (this device only).
    pub fn destination_list_data(&self) -> Value {
        let item = Value::Seq(vec![Some(self.device_description_value())]);
        Value::Seq(vec![Some(Value::List(vec![item]))])
    }

    /// Build `nodeManagementBindingData` from the binding table.
    pub fn binding_data(&self) -> Value {
        let items = self
            .bindings
            .iter()
            .map(|b| {
                Value::Seq(vec![
                    Some(Value::Unsigned(b.id.into())),
                    Some(b.client.to_value()),
                    Some(b.server.to_value()),
                ])
            })
            .collect();
        Value::Seq(vec![Some(Value::List(items))])
    }

    /// Build `nodeManagementSubscriptionData` from the subscription table.
    pub fn subscription_data(&self) -> Value {
        let items = self
            .subscriptions
            .iter()
            .map(|s| {
                Value::Seq(vec![
                    Some(Value::Unsigned(s.id.into())),
                    Some(s.client.to_value()),
                    Some(s.server.to_value()),
                ])
            })
            .collect();
        Value::Seq(vec![Some(Value::List(items))])
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outbound datagram construction.
//!
//! The sender owns the device's message counter: it is incremented before
//! every outbound datagram, and the caller can associate the returned
//! counter value with the message it emitted (calls track it for their
//! pending `result`).

use crate::error::Result;
use crate::spine::model::datagram::{Cmd, Datagram, Header};
use crate::spine::model::{
    CmdClassifier, ErrorResult, FeatureAddress, FunctionType, SPECIFICATION_VERSION,
};

/// Where finished datagrams go: the SHIP connection in production, a
/// capture buffer in tests.
pub trait DatagramWriter: Send {
    fn write_datagram(&mut self, text: &str) -> Result<()>;
}

impl<F> DatagramWriter for F
where
    F: FnMut(&str) -> Result<()> + Send,
{
    fn write_datagram(&mut self, text: &str) -> Result<()> {
        self(text)
    }
}

/// Builds and emits SPINE datagrams over a [`DatagramWriter`].
pub struct Sender {
    msg_counter: u64,
    writer: Box<dyn DatagramWriter>,
}

impl Sender {
    pub fn new(writer: Box<dyn DatagramWriter>) -> Self {
        Self {
            msg_counter: 0,
            writer,
        }
    }

    /// Set the counter (test hook; production always starts at zero).
    pub fn set_msg_counter(&mut self, value: u64) {
        self.msg_counter = value;
    }

    fn next_msg_counter(&mut self) -> u64 {
        self.msg_counter += 1;
        self.msg_counter
    }

    fn header(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        classifier: CmdClassifier,
        ack_request: bool,
    ) -> Header {
        Header {
            spec_version: Some(SPECIFICATION_VERSION.to_owned()),
            src_addr: Some(src.clone()),
            dest_addr: Some(dest.clone()),
            msg_counter: Some(self.next_msg_counter()),
            cmd_classifier: Some(classifier),
            ack_request: ack_request.then_some(true),
            ..Header::default()
        }
    }

    fn emit(&mut self, header: Header, cmds: Vec<Cmd>) -> Result<u64> {
        let msg_counter = header.msg_counter.unwrap_or_default();
        let text = Datagram::new(header, cmds).print()?;
        self.writer.write_datagram(&text)?;
        Ok(msg_counter)
    }

    /// `read` request; no acknowledgement.
    pub fn read(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<u64> {
        let header = self.header(src, dest, CmdClassifier::Read, false);
        self.emit(header, vec![cmd])
    }

    /// `reply` to a read, referencing the request's message counter.
    pub fn reply(
        &mut self,
        request_header: &Header,
        sender_addr: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<u64> {
        let dest = request_header.src_addr.clone().unwrap_or_default();
        let mut header = self.header(sender_addr, &dest, CmdClassifier::Reply, false);
        header.msg_counter_reference = request_header.msg_counter;
        self.emit(header, vec![cmd])
    }

    /// Push `notify` to a subscriber; no acknowledgement.
    pub fn notify(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<u64> {
        let header = self.header(src, dest, CmdClassifier::Notify, false);
        self.emit(header, vec![cmd])
    }

    /// `write` request with acknowledgement.
    pub fn write(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<u64> {
        let header = self.header(src, dest, CmdClassifier::Write, true);
        self.emit(header, vec![cmd])
    }

    /// `call` request with acknowledgement.
    pub fn call(
        &mut self,
        src: &FeatureAddress,
        dest: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<u64> {
        let header = self.header(src, dest, CmdClassifier::Call, true);
        self.emit(header, vec![cmd])
    }

    /// `result` answering `request_header` with an error payload (error
    /// number zero acknowledges success).
    pub fn result(
        &mut self,
        request_header: &Header,
        sender_addr: &FeatureAddress,
        result: &ErrorResult,
    ) -> Result<u64> {
        let dest = request_header.src_addr.clone().unwrap_or_default();
        let mut header = self.header(sender_addr, &dest, CmdClassifier::Result, false);
        header.msg_counter_reference = request_header.msg_counter;

        let cmd = Cmd::with_data(FunctionType::ResultData, Some(result.to_value()));
        self.emit(header, vec![cmd])
    }
}

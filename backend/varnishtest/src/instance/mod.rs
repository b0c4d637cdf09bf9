//! The caller-facing surface: build, start, drive, close.

pub mod builder;
pub mod startup;

pub use builder::VarnishBuilder;

use crate::dispatch::CommandDispatcher;
use crate::error::protocol::ProtocolError;
use crate::protocol::AdmCommand;
use crate::supervisor::ProcessSupervisor;

use common::ErrorLocation;
use models::{InstanceIdentity, ProtocolMessage};

use std::panic::Location;
use std::path::Path;

use log::info;

/// A running, ready instance.
///
/// Only [`VarnishBuilder::start`] creates one, and only after the readiness
/// poll resolved a listen address. Call [`InstanceHandle::close`] when done;
/// dropping the handle kills the child but cannot wait for it.
#[derive(Debug)]
pub struct InstanceHandle {
    base_url: String,
    supervisor: ProcessSupervisor,
    closed: bool,
}

impl InstanceHandle {
    pub(crate) fn new(base_url: String, supervisor: ProcessSupervisor) -> Self {
        Self {
            base_url,
            supervisor,
            closed: false,
        }
    }

    /// Base URL of the client-facing listener, e.g. `http://127.0.0.1:38123`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn identity(&self) -> &InstanceIdentity {
        self.supervisor.identity()
    }

    pub fn work_dir(&self) -> &Path {
        self.supervisor.work_dir()
    }

    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    /// Issue a further management command. The status is returned as-is.
    pub async fn send(&mut self, command: &AdmCommand) -> Result<ProtocolMessage, ProtocolError> {
        match self.supervisor.dispatcher_mut() {
            Some(dispatcher) => dispatcher.send(command).await,
            None => Err(ProtocolError::Closed {
                message: format!("Instance {} is closed", self.supervisor.identity()),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Tear the instance down. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        info!("Closing instance {}", self.supervisor.identity());
        self.supervisor.terminate().await;
    }
}

use crate::dispatch::CommandDispatcher;
use crate::error::protocol::ProtocolError;
use crate::protocol::AdmCommand;

use common::ErrorLocation;
use models::ProtocolMessage;

use std::collections::VecDeque;
use std::panic::Location;

/// Dispatcher that answers from a fixed script and records what it was sent.
pub(crate) struct ScriptedDispatcher {
    responses: VecDeque<ProtocolMessage>,
    pub(crate) sent: Vec<String>,
}

impl ScriptedDispatcher {
    pub(crate) fn new(responses: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(status, body)| ProtocolMessage::new(status, body.as_bytes().to_vec()))
                .collect(),
            sent: Vec::new(),
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl CommandDispatcher for ScriptedDispatcher {
    async fn send(&mut self, command: &AdmCommand) -> Result<ProtocolMessage, ProtocolError> {
        self.sent.push(command.words().join(" "));
        self.responses
            .pop_front()
            .ok_or_else(|| ProtocolError::Closed {
                message: "script exhausted".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

use crate::error::protocol::ProtocolError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("Command Error: '{command}' answered {status}: {message} {location}")]
    Rejected {
        command: String,
        status: u16,
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

use crate::error::protocol::ProtocolError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ReadinessError {
    #[error("Readiness Error: child stopped before running {location}")]
    ChildStopped { location: ErrorLocation },

    #[error("Readiness Error: 'status' request got a {status} response: {message} {location}")]
    Status {
        status: u16,
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

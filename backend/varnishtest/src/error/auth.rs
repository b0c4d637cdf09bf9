use crate::error::protocol::ProtocolError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("Bootstrap Error: expected status {expected}, got {status} {location}")]
    Bootstrap {
        expected: u16,
        status: u16,
        location: ErrorLocation,
    },

    #[error("Nonce Error: challenge is {length} bytes, need at least {required} {location}")]
    NonceTooShort {
        length: usize,
        required: usize,
        location: ErrorLocation,
    },

    #[error("Secret Error: {path}: {source} {location}")]
    Secret {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Rejected Error: auth answered {status}: {message} {location}")]
    Rejected {
        status: u16,
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

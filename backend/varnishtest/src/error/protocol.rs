use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

/// Failures of the management channel itself: framing, transport, output shape.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Header Error: {message} {location}")]
    Header {
        message: String,
        location: ErrorLocation,
    },

    #[error("Delimiter Error: expected '\\n' after body, got {found:#04x} {location}")]
    Delimiter { found: u8, location: ErrorLocation },

    #[error("Listen Address Error: {message} {location}")]
    ListenAddress {
        message: String,
        location: ErrorLocation,
    },

    #[error("Schema Error: {message} {location}")]
    Schema {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Channel Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Exec Error: {message} {location}")]
    Exec {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}

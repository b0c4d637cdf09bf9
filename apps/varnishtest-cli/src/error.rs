use common::ErrorLocation;
use models::ModelError;
use varnishtest::VarnishError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Error from this binary
    #[error("Cli Error: {message} {location}")]
    Cli {
        message: String,
        location: ErrorLocation,
    },

    /// Logger could not be set up
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Varnish(#[from] VarnishError),
}

pub mod auth;
pub mod command;
pub mod config;
pub mod protocol;
pub mod readiness;
pub mod spawn;

pub use auth::AuthError;
pub use command::CommandError;
pub use config::ConfigError;
pub use protocol::ProtocolError;
pub use readiness::ReadinessError;
pub use spawn::SpawnError;

use models::ModelError;
use thiserror::Error;

/// Composite failure of the startup sequence.
///
/// Whichever step failed first is carried unchanged; teardown has already
/// been attempted by the time a caller sees this.
#[derive(Debug, Error)]
pub enum VarnishError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

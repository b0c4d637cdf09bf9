pub mod config;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod instance;
pub mod protocol;
pub mod readiness;
pub mod supervisor;
pub mod vcl;

#[cfg(test)]
mod tests;

pub use config::{SupervisorConfig, Transport};
pub use error::VarnishError;
pub use instance::{InstanceHandle, VarnishBuilder};

pub const VARNISHD_BINARY: &str = "varnishd";
pub const VARNISHADM_BINARY: &str = "varnishadm";
pub const LOCALHOST: &str = "127.0.0.1";
/// Client traffic listens on an ephemeral loopback port.
pub const CLIENT_LISTEN_ADDRESS: &str = const_format::concatcp!(LOCALHOST, ":0");
/// Shared secret written by varnishd inside its working directory.
pub const SECRET_FILE_NAME: &str = "_.secret";

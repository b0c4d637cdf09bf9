//! One command in, one framed response out.
//!
//! [`CommandDispatcher`] is the only way anything above the framer talks to
//! an instance. `send` takes `&mut self`, so a dispatcher can never have two
//! requests outstanding. Two transports implement it:
//!
//! - [`SocketDispatcher`] writes to the authenticated `-M` connection
//! - [`ExecDispatcher`] runs `varnishadm` once per command
//!
//! [`Dispatcher`] selects between them at runtime.

pub mod exec;
pub mod socket;

pub use exec::ExecDispatcher;
pub use socket::SocketDispatcher;

use crate::error::protocol::ProtocolError;
use crate::protocol::{AdmCommand, DEBUG_LISTEN_ADDRESS};

use common::ErrorLocation;
use models::{ListenAddress, ProtocolMessage};

use std::future::Future;
use std::panic::Location;
use std::sync::OnceLock;

use regex::Regex;
use tokio::net::TcpStream;

const LISTEN_ADDRESS_PATTERN: &str =
    r"^(?P<name>\S+)\s+(?P<address>\S+)\s+(?P<port>\d+)\s*$";

static LISTEN_ADDRESS_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_listen_address_regex() -> &'static Regex {
    LISTEN_ADDRESS_REGEX
        .get_or_init(|| Regex::new(LISTEN_ADDRESS_PATTERN).expect("valid regex pattern"))
}

pub trait CommandDispatcher: Send {
    /// Issue one command and wait for its response.
    fn send(
        &mut self,
        command: &AdmCommand,
    ) -> impl Future<Output = Result<ProtocolMessage, ProtocolError>> + Send;

    /// Ask the instance where it accepts client traffic.
    fn listen_address(
        &mut self,
    ) -> impl Future<Output = Result<ListenAddress, ProtocolError>> + Send {
        async move {
            let command = AdmCommand::new(DEBUG_LISTEN_ADDRESS);
            let message = self.send(&command).await?;

            if !message.is_ok() {
                return Err(ProtocolError::ListenAddress {
                    message: format!(
                        "'{DEBUG_LISTEN_ADDRESS}' answered {}: {}",
                        message.status(),
                        message.body_text()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            parse_listen_address(&message.body_text())
        }
    }
}

/// Parse `debug.listen_address` output: `<name> <address> <port>`.
///
/// Only the first non-empty line is used when several sockets are listed.
#[track_caller]
pub fn parse_listen_address(text: &str) -> Result<ListenAddress, ProtocolError> {
    let line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| ProtocolError::ListenAddress {
            message: "Empty listen address response".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let captures = get_listen_address_regex()
        .captures(line)
        .ok_or_else(|| ProtocolError::ListenAddress {
            message: format!("Expected '<name> <address> <port>', got {line:?}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let port = captures["port"]
        .parse::<u16>()
        .map_err(|e| ProtocolError::ListenAddress {
            message: format!("Invalid port {:?}: {e}", &captures["port"]),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(ListenAddress::new(
        &captures["name"],
        &captures["address"],
        port,
    ))
}

/// The transport chosen by configuration.
#[derive(Debug)]
pub enum Dispatcher {
    Socket(SocketDispatcher<TcpStream>),
    Exec(ExecDispatcher),
}

impl Dispatcher {
    /// Release the channel. A no-op for the exec transport.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        match self {
            Dispatcher::Socket(socket) => socket.shutdown().await,
            Dispatcher::Exec(_) => Ok(()),
        }
    }
}

impl CommandDispatcher for Dispatcher {
    async fn send(&mut self, command: &AdmCommand) -> Result<ProtocolMessage, ProtocolError> {
        match self {
            Dispatcher::Socket(socket) => socket.send(command).await,
            Dispatcher::Exec(exec) => exec.send(command).await,
        }
    }

    async fn listen_address(&mut self) -> Result<ListenAddress, ProtocolError> {
        match self {
            Dispatcher::Socket(socket) => socket.listen_address().await,
            Dispatcher::Exec(exec) => exec.listen_address().await,
        }
    }
}

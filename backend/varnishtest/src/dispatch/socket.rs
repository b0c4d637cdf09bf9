use crate::dispatch::CommandDispatcher;
use crate::error::protocol::ProtocolError;
use crate::protocol::{AdmCommand, encode_command, read_message};

use common::ErrorLocation;
use models::ProtocolMessage;

use std::panic::Location;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Dispatcher over a direct management connection.
#[derive(Debug)]
pub struct SocketDispatcher<S> {
    stream: BufReader<S>,
}

impl<S> SocketDispatcher<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Read one unsolicited message, i.e. the banner varnishd sends on connect.
    pub async fn receive(&mut self) -> Result<ProtocolMessage, ProtocolError> {
        read_message(&mut self.stream).await
    }

    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.stream
            .get_mut()
            .shutdown()
            .await
            .map_err(|e| ProtocolError::Io {
                message: "Failed to close management channel".to_string(),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })
    }
}

impl<S> CommandDispatcher for SocketDispatcher<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, command: &AdmCommand) -> Result<ProtocolMessage, ProtocolError> {
        debug!("Sending command: {command}");

        let bytes = encode_command(command);
        let writer = self.stream.get_mut();

        writer
            .write_all(&bytes)
            .await
            .map_err(|e| ProtocolError::Io {
                message: format!("Failed to write command '{}'", command.name()),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        writer.flush().await.map_err(|e| ProtocolError::Io {
            message: format!("Failed to flush command '{}'", command.name()),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        let message = read_message(&mut self.stream).await?;
        trace!(
            "Command '{}' answered {} ({} bytes)",
            command.name(),
            message.status(),
            message.body().len()
        );
        Ok(message)
    }
}

use crate::error::protocol::ProtocolError;
use crate::protocol::AdmCommand;

use common::ErrorLocation;
use models::ProtocolMessage;

use std::panic::Location;

use log::trace;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use uuid::Uuid;

const DELIMITER: u8 = b'\n';
const HEREDOC_TOKEN: &str = "XXYYZZ";
/// "%-3d %-8u\n" plus slack for sloppy peers.
const MAX_HEADER_LEN: u64 = 64;
const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// Parse a response header line, e.g. `"200 13      \n"`.
///
/// The line must end with `\n` and hold exactly two whitespace-separated
/// decimal fields: status, then body length.
#[track_caller]
pub fn parse_header(line: &[u8]) -> Result<(u16, usize), ProtocolError> {
    let Some(content) = line.strip_suffix(&[DELIMITER]) else {
        return Err(ProtocolError::Header {
            message: format!(
                "Header is missing its newline: {:?}",
                String::from_utf8_lossy(line)
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let text = std::str::from_utf8(content).map_err(|e| ProtocolError::Header {
        message: format!("Header is not ASCII: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let fields: Vec<&str> = text.split_whitespace().collect();
    let [status, length] = fields.as_slice() else {
        return Err(ProtocolError::Header {
            message: format!("Expected '<status> <length>', got {text:?}"),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let status = status.parse::<u16>().map_err(|e| ProtocolError::Header {
        message: format!("Invalid status {status:?}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let length = length.parse::<usize>().map_err(|e| ProtocolError::Header {
        message: format!("Invalid body length {length:?}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if length > MAX_BODY_LEN {
        return Err(ProtocolError::Header {
            message: format!("Body length {length} exceeds {MAX_BODY_LEN} bytes"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok((status, length))
}

/// Read one framed message.
///
/// Consumes the header line, then exactly `length + 1` bytes regardless of
/// how the transport fragments them. The trailing delimiter is checked and
/// dropped from the returned body.
pub async fn read_message<R>(reader: &mut R) -> Result<ProtocolMessage, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_HEADER_LEN)
        .read_until(DELIMITER, &mut line)
        .await
        .map_err(|e| ProtocolError::Io {
            message: "Failed to read message header".to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

    if read == 0 {
        return Err(ProtocolError::Closed {
            message: "Channel closed while waiting for a response".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if line.last() != Some(&DELIMITER) && (read as u64) < MAX_HEADER_LEN {
        return Err(ProtocolError::Closed {
            message: format!(
                "Channel closed after {read} header bytes: {:?}",
                String::from_utf8_lossy(&line)
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let (status, length) = parse_header(&line)?;

    // read_exact keeps reading until the buffer is full; a short read is
    // never mistaken for a complete body.
    let mut body = vec![0u8; length + 1];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| ProtocolError::Io {
            message: format!("Failed to read {} body bytes", length + 1),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

    match body.pop() {
        Some(DELIMITER) => {}
        found => {
            return Err(ProtocolError::Delimiter {
                found: found.unwrap_or_default(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    trace!("Received message: status={status} length={length}");
    Ok(ProtocolMessage::new(status, body))
}

/// Encode a command for the wire as a single buffer.
pub fn encode_command(command: &AdmCommand) -> Vec<u8> {
    let line = command.words().join(" ");

    match command.body() {
        None => format!("{line}\n").into_bytes(),
        Some(body) => {
            let token = heredoc_token(body);
            format!("{line} << {token}\n{body}\n{token}\n").into_bytes()
        }
    }
}

/// Sentinel that does not occur as a line of `body`.
fn heredoc_token(body: &str) -> String {
    let mut token = HEREDOC_TOKEN.to_string();
    while body.lines().any(|line| line == token) {
        token = format!("VT{}", Uuid::new_v4().simple());
    }
    token
}

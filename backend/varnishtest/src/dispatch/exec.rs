use crate::dispatch::CommandDispatcher;
use crate::error::protocol::ProtocolError;
use crate::protocol::{AdmCommand, DEBUG_LISTEN_ADDRESS, encode_command};

use common::ErrorLocation;
use models::{CliStatus, ListenAddress, ProtocolMessage};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;

const INSTANCE_FLAG: &str = "-n";
const JSON_FLAG: &str = "-j";
/// `[version, argv, timestamp, entry...]`
const JSON_HEADER_LEN: usize = 3;

/// Dispatcher that runs the admin tool once per command.
///
/// varnishadm locates the instance through its working directory and
/// authenticates on its own. Its only status signal is the exit code, so
/// success maps to 200 and any failure to 300.
#[derive(Debug, Clone)]
pub struct ExecDispatcher {
    program: String,
    work_dir: PathBuf,
}

impl ExecDispatcher {
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn build_command(&self, command: &AdmCommand) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.arg(INSTANCE_FLAG)
            .arg(&self.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Heredoc bodies only work in pipe mode, where the command comes on stdin.
        if command.body().is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null()).args(command.words());
        }

        cmd
    }
}

impl CommandDispatcher for ExecDispatcher {
    async fn send(&mut self, command: &AdmCommand) -> Result<ProtocolMessage, ProtocolError> {
        debug!("Running {} for command: {command}", self.program);

        let mut child = self
            .build_command(command)
            .spawn()
            .map_err(|e| ProtocolError::Exec {
                message: format!("Failed to run {}: {e}", self.program),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        if command.body().is_some()
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(&encode_command(command))
                .await
                .map_err(|e| ProtocolError::Exec {
                    message: format!("Failed to write '{}' to {}", command.name(), self.program),
                    location: ErrorLocation::from(Location::caller()),
                    source: e,
                })?;
            // Dropping stdin sends EOF so the tool exits after one command.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ProtocolError::Exec {
                message: format!("Failed to wait for {}: {e}", self.program),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        if !output.stderr.is_empty() {
            trace!(
                "{} stderr: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let status = if output.status.success() {
            CliStatus::Ok
        } else {
            CliStatus::Cant
        };

        let mut body = output.stdout;
        if body.last() == Some(&b'\n') {
            body.pop();
        }

        Ok(ProtocolMessage::new(status.code(), body))
    }

    async fn listen_address(&mut self) -> Result<ListenAddress, ProtocolError> {
        let command = AdmCommand::new(DEBUG_LISTEN_ADDRESS).arg(JSON_FLAG);
        let message = self.send(&command).await?;

        if !message.is_ok() {
            return Err(ProtocolError::ListenAddress {
                message: format!(
                    "'{DEBUG_LISTEN_ADDRESS} {JSON_FLAG}' failed: {}",
                    message.body_text()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        parse_listen_json(message.body())
    }
}

#[derive(Debug, Deserialize)]
struct ListenEntry {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Endpoint")]
    endpoint: String,
}

/// Parse the JSON form of `debug.listen_address`.
///
/// The expected shape is `[version, [argv...], timestamp, {"Endpoint": "addr:port", "Name"?: ..}, ...]`.
/// This layout belongs to varnishadm and is checked field by field here
/// rather than indexed blindly.
// TODO: revalidate this shape against each supported varnish release; `-j` output is not a stable interface.
#[track_caller]
pub fn parse_listen_json(bytes: &[u8]) -> Result<ListenAddress, ProtocolError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| ProtocolError::Schema {
        message: format!("listen address output is not JSON: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let Value::Array(items) = value else {
        return Err(ProtocolError::Schema {
            message: "listen address output is not a JSON array".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let header_ok = items.len() > JSON_HEADER_LEN
        && items[0].is_u64()
        && items[1].is_array()
        && items[2].is_number();

    if !header_ok {
        return Err(ProtocolError::Schema {
            message: format!(
                "Expected [version, argv, timestamp, entry...], got {} elements",
                items.len()
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let entry: ListenEntry = serde_json::from_value(items[JSON_HEADER_LEN].clone()).map_err(
        |e| ProtocolError::Schema {
            message: format!("Listen entry has unexpected shape: {e}"),
            location: ErrorLocation::from(Location::caller()),
        },
    )?;

    let (address, port) = split_endpoint(&entry.endpoint)?;
    let name = entry.name.unwrap_or_default();

    Ok(ListenAddress::new(name, address, port))
}

/// Split `"127.0.0.1:8080"`, `"[::1]:8080"` or `"127.0.0.1 8080"`.
#[track_caller]
fn split_endpoint(endpoint: &str) -> Result<(String, u16), ProtocolError> {
    let split = endpoint
        .rsplit_once(' ')
        .or_else(|| endpoint.rsplit_once(':'));

    let Some((address, port)) = split else {
        return Err(ProtocolError::Schema {
            message: format!("Endpoint {endpoint:?} has no port"),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let port = port.trim().parse::<u16>().map_err(|e| ProtocolError::Schema {
        message: format!("Endpoint {endpoint:?} has invalid port: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let address = address
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    Ok((address, port))
}

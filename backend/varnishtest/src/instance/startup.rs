//! The startup sequence, strictly ordered and fail-fast:
//! spawn → accept → authenticate → load → `vcl.use` → `start` → poll.
//!
//! Any failure after the spawn tears down whatever was acquired before the
//! error is returned.

use crate::config::SupervisorConfig;
use crate::dispatch::{CommandDispatcher, Dispatcher, SocketDispatcher};
use crate::error::VarnishError;
use crate::error::command::CommandError;
use crate::error::spawn::SpawnError;
use crate::handshake::{authenticate, secret_path};
use crate::instance::{InstanceHandle, VarnishBuilder};
use crate::protocol::command::quote;
use crate::protocol::{AdmCommand, START, VCL_INLINE, VCL_LOAD, VCL_NAME, VCL_USE};
use crate::readiness::ReadinessPoller;
use crate::supervisor::{ProcessSupervisor, Rendezvous};
use crate::vcl::render_inline;

use common::ErrorLocation;
use models::{InstanceIdentity, VclSource};

use std::panic::Location;
use std::path::Path;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout as TokioTimeout;

/// The command that loads the builder's configuration as `vcl1`.
pub fn load_command(builder: &VarnishBuilder) -> AdmCommand {
    match &builder.vcl {
        VclSource::Inline(body) => AdmCommand::new(VCL_INLINE)
            .arg(VCL_NAME)
            .with_body(render_inline(builder.vcl_version, &builder.backends, body)),
        VclSource::File(path) => AdmCommand::new(VCL_LOAD)
            .arg(VCL_NAME)
            .arg(quote(&path.to_string_lossy())),
    }
}

/// Send a command that must answer 200.
pub async fn expect_ok<D>(dispatcher: &mut D, command: &AdmCommand) -> Result<(), CommandError>
where
    D: CommandDispatcher,
{
    let response = dispatcher.send(command).await?;

    if !response.is_ok() {
        return Err(CommandError::Rejected {
            command: command.to_string(),
            status: response.status(),
            message: response.body_text().into_owned(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!("'{command}' OK");
    Ok(())
}

/// Load the configuration, make it active and start the child.
pub async fn configure<D>(dispatcher: &mut D, load: &AdmCommand) -> Result<(), CommandError>
where
    D: CommandDispatcher,
{
    expect_ok(dispatcher, load).await?;
    expect_ok(dispatcher, &AdmCommand::new(VCL_USE).arg(VCL_NAME)).await?;
    expect_ok(dispatcher, &AdmCommand::new(START)).await?;
    Ok(())
}

async fn configure_and_poll<D>(
    dispatcher: &mut D,
    load: &AdmCommand,
    config: &SupervisorConfig,
) -> Result<String, VarnishError>
where
    D: CommandDispatcher,
{
    configure(dispatcher, load).await?;
    let base_url = ReadinessPoller::new(config.poll_interval())
        .run(dispatcher)
        .await?;
    Ok(base_url)
}

/// Everything after the accept, on an already connected management channel:
/// authenticate, configure, then poll until ready.
pub async fn serve_on_channel<S>(
    dispatcher: &mut SocketDispatcher<S>,
    secret_file: &Path,
    load: &AdmCommand,
    config: &SupervisorConfig,
) -> Result<String, VarnishError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    authenticate(dispatcher, secret_file, config.secret_wait()).await?;
    configure_and_poll(dispatcher, load, config).await
}

async fn bring_up(
    supervisor: &mut ProcessSupervisor,
    rendezvous: Rendezvous,
    config: &SupervisorConfig,
    load: &AdmCommand,
) -> Result<String, VarnishError> {
    let secret_file = secret_path(supervisor.work_dir());

    match supervisor.connect(rendezvous, config).await? {
        Dispatcher::Socket(socket) => serve_on_channel(socket, &secret_file, load, config).await,
        Dispatcher::Exec(exec) => configure_and_poll(exec, load, config).await,
    }
}

pub(crate) async fn start(builder: VarnishBuilder) -> Result<InstanceHandle, VarnishError> {
    builder.config.validate()?;

    let config = &builder.config;
    let identity = builder
        .identity
        .clone()
        .unwrap_or_else(InstanceIdentity::generate);
    let load = load_command(&builder);

    let (mut supervisor, rendezvous) =
        ProcessSupervisor::spawn(config, identity, &builder.parameters).await?;

    let result = match config.startup_timeout() {
        Some(deadline) => {
            match TokioTimeout(deadline, bring_up(&mut supervisor, rendezvous, config, &load)).await
            {
                Ok(result) => result,
                Err(_) => Err(SpawnError::Timeout {
                    message: format!("Instance did not become ready within {deadline:?}"),
                    location: ErrorLocation::from(Location::caller()),
                }
                .into()),
            }
        }
        None => bring_up(&mut supervisor, rendezvous, config, &load).await,
    };

    match result {
        Ok(base_url) => {
            info!(
                "Instance {} ready at {base_url} (PID: {:?})",
                supervisor.identity(),
                supervisor.pid()
            );
            Ok(InstanceHandle::new(base_url, supervisor))
        }
        Err(e) => {
            warn!("Startup of instance {} failed, tearing down: {e}", supervisor.identity());
            supervisor.terminate().await;
            Err(e)
        }
    }
}

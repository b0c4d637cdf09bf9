//! Process lifecycle of one varnishd instance.
//!
//! [`ProcessSupervisor`] owns the three resources of an instance: the child
//! process, its working directory and the management channel. Spawning binds
//! the rendezvous listener first so varnishd has somewhere to connect back
//! to; [`ProcessSupervisor::terminate`] releases everything on a best-effort
//! basis and is safe to call more than once.

pub mod spawn;

use crate::config::{SupervisorConfig, Transport};
use crate::dispatch::{CommandDispatcher, Dispatcher, ExecDispatcher, SocketDispatcher};
use crate::error::VarnishError;
use crate::error::spawn::SpawnError;
use crate::handshake::{read_secret, secret_path};
use crate::protocol::{AdmCommand, STOP};
use crate::supervisor::spawn::{build_spawn_command, forward_output};
use crate::LOCALHOST;

use common::ErrorLocation;
use models::InstanceIdentity;

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::net::TcpListener;
use tokio::process::Child as TokioChild;
use tokio::time::timeout as TokioTimeout;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// What the child will use to reach us once it is up.
#[derive(Debug)]
pub enum Rendezvous {
    /// Accept exactly one connection here; it becomes the management channel.
    Listener(TcpListener),
    /// No connection: commands go through the admin tool.
    Exec { varnishadm_path: String },
}

#[derive(Debug)]
pub struct ProcessSupervisor {
    identity: InstanceIdentity,
    work_dir: PathBuf,
    child: Option<TokioChild>,
    dispatcher: Option<Dispatcher>,
    cleaned_up: bool,
}

impl ProcessSupervisor {
    /// Bind the rendezvous endpoint (socket transport), then spawn varnishd.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError::Bind`] if the listener cannot be bound and
    /// [`SpawnError::Spawn`] if the executable cannot be started.
    pub async fn spawn(
        config: &SupervisorConfig,
        identity: InstanceIdentity,
        parameters: &[(String, String)],
    ) -> Result<(Self, Rendezvous), SpawnError> {
        let work_dir = identity.work_dir(&config.work_root);

        let (rendezvous, management) = match config.transport {
            Transport::Socket => {
                let listener =
                    TcpListener::bind((LOCALHOST, 0))
                        .await
                        .map_err(|e| SpawnError::Bind {
                            message: format!("Failed to bind rendezvous listener on {LOCALHOST}"),
                            location: ErrorLocation::from(Location::caller()),
                            source: e,
                        })?;
                let address = listener.local_addr().map_err(|e| SpawnError::Bind {
                    message: "Failed to read rendezvous listener address".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                    source: e,
                })?;
                debug!("Rendezvous listener bound on {address}");
                (Rendezvous::Listener(listener), Some(address))
            }
            Transport::Exec => (
                Rendezvous::Exec {
                    varnishadm_path: config.varnishadm_path.clone(),
                },
                None,
            ),
        };

        let mut child = build_spawn_command(
            &config.varnishd_path,
            &work_dir,
            management,
            parameters,
        )
        .spawn()
        .map_err(|e| SpawnError::Spawn {
            message: format!("Failed to spawn {}: {e}", config.varnishd_path),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        forward_output(&mut child);

        info!(
            "Spawned {} (PID: {:?}) for instance {identity} in {}",
            config.varnishd_path,
            child.id(),
            work_dir.display()
        );

        Ok((
            Self {
                identity,
                work_dir,
                child: Some(child),
                dispatcher: None,
                cleaned_up: false,
            },
            rendezvous,
        ))
    }

    /// Establish the management channel.
    ///
    /// With a listener this accepts the single connection varnishd makes back
    /// (authentication is left to the caller). With the exec transport it
    /// waits for the secret file, which varnishd writes once its manager is up.
    /// Either way the child exiting first is a [`SpawnError::EarlyExit`].
    pub async fn connect(
        &mut self,
        rendezvous: Rendezvous,
        config: &SupervisorConfig,
    ) -> Result<&mut Dispatcher, VarnishError> {
        let Some(child) = self.child.as_mut() else {
            return Err(SpawnError::EarlyExit {
                message: "No child process to connect to".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        };

        let dispatcher = match rendezvous {
            Rendezvous::Listener(listener) => {
                let stream = tokio::select! {
                    accepted = listener.accept() => {
                        let (stream, peer) = accepted.map_err(|e| SpawnError::Accept {
                            message: "Failed to accept management connection".to_string(),
                            location: ErrorLocation::from(Location::caller()),
                            source: e,
                        })?;
                        debug!("Management connection from {peer}");
                        stream
                    }
                    exit = child.wait() => {
                        return Err(early_exit(exit).into());
                    }
                };

                if let Err(e) = stream.set_nodelay(true) {
                    trace!("Could not set TCP_NODELAY on management channel: {e}");
                }

                Dispatcher::Socket(SocketDispatcher::new(stream))
            }
            Rendezvous::Exec { varnishadm_path } => {
                let secret = secret_path(&self.work_dir);
                tokio::select! {
                    read = read_secret(&secret, config.secret_wait()) => {
                        read?;
                    }
                    exit = child.wait() => {
                        return Err(early_exit(exit).into());
                    }
                }

                Dispatcher::Exec(ExecDispatcher::new(varnishadm_path, self.work_dir.clone()))
            }
        };

        Ok(self.dispatcher.insert(dispatcher))
    }

    pub fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(TokioChild::id)
    }

    pub fn dispatcher_mut(&mut self) -> Option<&mut Dispatcher> {
        self.dispatcher.as_mut()
    }

    /// Stop, close the channel, kill the child, remove the working directory.
    ///
    /// Every step is attempted even if an earlier one fails; failures are
    /// logged, never returned. Calling this again does nothing.
    pub async fn terminate(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            match TokioTimeout(STOP_TIMEOUT, dispatcher.send(&AdmCommand::new(STOP))).await {
                Ok(Ok(message)) => debug!("'{STOP}' answered {}", message.status()),
                Ok(Err(e)) => debug!("'{STOP}' failed, continuing teardown: {e}"),
                Err(_) => warn!("'{STOP}' did not answer within {STOP_TIMEOUT:?}, continuing teardown"),
            }

            if let Err(e) = dispatcher.close().await {
                warn!("Failed to close management channel: {e}");
            }
        }

        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            match child.kill().await {
                Ok(()) => debug!("Killed varnishd (PID: {pid:?})"),
                Err(e) => warn!("Failed to kill varnishd (PID: {pid:?}): {e}"),
            }
        }

        if !self.cleaned_up {
            self.cleaned_up = true;
            match tokio::fs::remove_dir_all(&self.work_dir).await {
                Ok(()) => debug!("Removed working directory {}", self.work_dir.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    trace!("Working directory {} already gone", self.work_dir.display());
                }
                Err(e) => warn!(
                    "Failed to remove working directory {}: {e}",
                    self.work_dir.display()
                ),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        identity: InstanceIdentity,
        work_dir: PathBuf,
        child: Option<TokioChild>,
        dispatcher: Option<Dispatcher>,
    ) -> Self {
        Self {
            identity,
            work_dir,
            child,
            dispatcher,
            cleaned_up: false,
        }
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        // The child is killed by kill_on_drop; only the directory needs care.
        if !self.cleaned_up {
            warn!(
                "Instance {} dropped without close, removing {}",
                self.identity,
                self.work_dir.display()
            );
            if let Err(e) = std::fs::remove_dir_all(&self.work_dir)
                && e.kind() != ErrorKind::NotFound
            {
                warn!("Failed to remove {}: {e}", self.work_dir.display());
            }
        }
    }
}

#[track_caller]
fn early_exit(exit: std::io::Result<std::process::ExitStatus>) -> SpawnError {
    let message = match exit {
        Ok(status) => format!("varnishd exited ({status}) before the management channel was up"),
        Err(e) => format!("varnishd could not be waited on before the management channel was up: {e}"),
    };

    SpawnError::EarlyExit {
        message,
        location: ErrorLocation::from(Location::caller()),
    }
}

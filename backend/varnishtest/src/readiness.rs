//! Poll `status` until the child is running, then resolve its listen address.

use crate::dispatch::CommandDispatcher;
use crate::error::readiness::ReadinessError;
use crate::protocol::{AdmCommand, STATUS};

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use log::{debug, info, trace};
use tokio::time::sleep as TokioSleep;

/// `status` body once the child serves traffic. The frame delimiter that
/// follows it on the wire is not part of the body.
pub const CHILD_RUNNING: &str = "Child in state running";
pub const CHILD_STOPPED: &str = "Child in state stopped";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    /// No `status` answer has reported the child running yet.
    Loading,
    /// The child reported running; the listen address is being resolved.
    Running,
    /// Terminal: serving at the contained base URL.
    Ready(String),
    /// Terminal: the poll stopped with an error.
    Failed,
}

impl ReadinessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadinessState::Ready(_) | ReadinessState::Failed)
    }
}

/// Readiness state machine driven one `status` query per tick.
///
/// There is no retry limit; bound the wait with an outer timeout.
#[derive(Debug)]
pub struct ReadinessPoller {
    interval: Duration,
    state: ReadinessState,
    status_queries: usize,
}

impl ReadinessPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: ReadinessState::Loading,
            status_queries: 0,
        }
    }

    pub fn state(&self) -> &ReadinessState {
        &self.state
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries
    }

    /// Issue one `status` query and advance the state.
    ///
    /// Bodies are compared for exact equality with the known state lines;
    /// anything else leaves the poller in `Loading`.
    pub async fn tick<D>(&mut self, dispatcher: &mut D) -> Result<(), ReadinessError>
    where
        D: CommandDispatcher,
    {
        self.status_queries += 1;

        let message = match dispatcher.send(&AdmCommand::new(STATUS)).await {
            Ok(message) => message,
            Err(e) => return Err(self.fail(e.into())),
        };

        if !message.is_ok() {
            let error = ReadinessError::Status {
                status: message.status(),
                message: message.body_text().into_owned(),
                location: ErrorLocation::from(Location::caller()),
            };
            return Err(self.fail(error));
        }

        let body = message.body_text();

        if body == CHILD_STOPPED {
            let error = ReadinessError::ChildStopped {
                location: ErrorLocation::from(Location::caller()),
            };
            return Err(self.fail(error));
        }

        if body != CHILD_RUNNING {
            trace!("Child not running yet: {body:?}");
            return Ok(());
        }

        debug!("Child running, resolving listen address");
        self.state = ReadinessState::Running;

        match dispatcher.listen_address().await {
            Ok(address) => {
                let base_url = address.base_url();
                info!("Instance listening on {base_url} ({})", address.name);
                self.state = ReadinessState::Ready(base_url);
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Tick until a terminal state, sleeping the poll interval between ticks.
    pub async fn run<D>(&mut self, dispatcher: &mut D) -> Result<String, ReadinessError>
    where
        D: CommandDispatcher,
    {
        loop {
            self.tick(dispatcher).await?;

            if let ReadinessState::Ready(base_url) = &self.state {
                return Ok(base_url.clone());
            }

            TokioSleep(self.interval).await;
        }
    }

    fn fail(&mut self, error: ReadinessError) -> ReadinessError {
        debug!("Readiness poll failed after {} queries: {error}", self.status_queries);
        self.state = ReadinessState::Failed;
        error
    }
}

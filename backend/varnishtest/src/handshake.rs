//! Challenge-response authentication on a fresh management connection.
//!
//! varnishd opens the `-M` connection with a 107 banner whose body starts
//! with a 32-byte challenge. The answer is
//! `auth hex(sha256(challenge "\n" secret challenge "\n"))`, where the secret
//! is the `_.secret` file in the instance's working directory.

use crate::SECRET_FILE_NAME;
use crate::dispatch::{CommandDispatcher, SocketDispatcher};
use crate::error::auth::AuthError;
use crate::protocol::{AUTH, AdmCommand};

use common::{ErrorLocation, RedactedSecret};
use models::CliStatus;

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep as TokioSleep;

pub const NONCE_LEN: usize = 32;
const SECRET_RETRY_INITIAL: Duration = Duration::from_millis(10);

pub fn secret_path(work_dir: &Path) -> PathBuf {
    work_dir.join(SECRET_FILE_NAME)
}

/// Lower-case hex SHA-256 over `challenge "\n" secret challenge "\n"`.
pub fn auth_token(challenge: &[u8; NONCE_LEN], secret: &RedactedSecret) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge);
    hasher.update(b"\n");
    hasher.update(secret.expose());
    hasher.update(challenge);
    hasher.update(b"\n");
    hex::encode(hasher.finalize())
}

/// Read the shared secret, waiting up to `max_wait` for varnishd to create it.
///
/// Only a missing file is retried; any other I/O error fails immediately.
pub async fn read_secret(path: &Path, max_wait: Duration) -> Result<RedactedSecret, AuthError> {
    let mut backoff = ExponentialBackoff {
        initial_interval: SECRET_RETRY_INITIAL,
        current_interval: SECRET_RETRY_INITIAL,
        max_interval: max_wait,
        max_elapsed_time: Some(max_wait),
        ..Default::default()
    };

    loop {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                debug!("Read secret from {} ({} bytes)", path.display(), bytes.len());
                return Ok(RedactedSecret::new(bytes));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Secret {} not there yet, retrying after {duration:?}", path.display());
                    TokioSleep(duration).await;
                }
                None => {
                    return Err(AuthError::Secret {
                        path: path.to_path_buf(),
                        location: ErrorLocation::from(Location::caller()),
                        source: e,
                    });
                }
            },
            Err(e) => {
                return Err(AuthError::Secret {
                    path: path.to_path_buf(),
                    location: ErrorLocation::from(Location::caller()),
                    source: e,
                });
            }
        }
    }
}

/// Run the handshake on a freshly accepted management connection.
///
/// Reads the banner, validates the challenge, then reads the secret and
/// answers. No command is sent before the challenge has been validated.
pub async fn authenticate<S>(
    dispatcher: &mut SocketDispatcher<S>,
    secret_file: &Path,
    secret_wait: Duration,
) -> Result<(), AuthError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let banner = dispatcher.receive().await?;

    if banner.status() != CliStatus::Auth.code() {
        return Err(AuthError::Bootstrap {
            expected: CliStatus::Auth.code(),
            status: banner.status(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let challenge: [u8; NONCE_LEN] = banner
        .body()
        .get(..NONCE_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| AuthError::NonceTooShort {
            length: banner.body().len(),
            required: NONCE_LEN,
            location: ErrorLocation::from(Location::caller()),
        })?;

    let secret = read_secret(secret_file, secret_wait).await?;
    let token = auth_token(&challenge, &secret);
    drop(secret);

    let response = dispatcher.send(&AdmCommand::new(AUTH).arg(token)).await?;

    if !response.is_ok() {
        return Err(AuthError::Rejected {
            status: response.status(),
            message: response.body_text().into_owned(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    info!("Authenticated on management channel");
    Ok(())
}

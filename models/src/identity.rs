use crate::{ErrorLocation, ModelError};

use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};

use uuid::Uuid;

const WORK_DIR_PREFIX: &str = "varnishtest-rs.";

/// Unique name of one supervised instance.
///
/// The token names the child's working directory (`varnishd -n`) and is the
/// key used to find and remove that directory at close. Generate a fresh one
/// per instance, or inject a fixed token in tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceIdentity {
    token: String,
}

impl InstanceIdentity {
    pub fn generate() -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
        }
    }

    /// Use a caller-chosen token.
    ///
    /// The token becomes a single path component, so separators and the
    /// `.`/`..` components are rejected.
    #[track_caller]
    pub fn from_token(token: impl Into<String>) -> Result<Self, ModelError> {
        let token = token.into();

        if token.is_empty() || token == "." || token == ".." {
            return Err(ModelError::Validation {
                message: format!("Invalid instance token '{token}'"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if token.contains(['/', '\\', '\0']) {
            return Err(ModelError::Validation {
                message: format!("Instance token must be a single path component: '{token}'"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn dir_name(&self) -> String {
        format!("{WORK_DIR_PREFIX}{}", self.token)
    }

    /// Working directory of this instance under `root`.
    pub fn work_dir(&self, root: &Path) -> PathBuf {
        root.join(self.dir_name())
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

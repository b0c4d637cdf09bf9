use crate::config::SupervisorConfig;
use crate::error::VarnishError;
use crate::instance::InstanceHandle;
use crate::instance::startup;

use models::{BackendSpec, InstanceIdentity, ModelError, VclSource, VclVersion};

use std::path::PathBuf;

/// Builder for a test instance.
///
/// Defaults to VCL 4.1, an empty inline body, no backends and the default
/// [`SupervisorConfig`].
#[derive(Debug, Clone, Default)]
pub struct VarnishBuilder {
    pub(crate) vcl_version: VclVersion,
    pub(crate) vcl: VclSource,
    pub(crate) backends: Vec<BackendSpec>,
    pub(crate) parameters: Vec<(String, String)>,
    pub(crate) config: SupervisorConfig,
    pub(crate) identity: Option<InstanceIdentity>,
}

impl VarnishBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vcl41(mut self) -> Self {
        self.vcl_version = VclVersion::V41;
        self
    }

    pub fn vcl40(mut self) -> Self {
        self.vcl_version = VclVersion::V40;
        self
    }

    /// Send the body without a version header; it must carry its own.
    pub fn no_vcl_version(mut self) -> Self {
        self.vcl_version = VclVersion::Unversioned;
        self
    }

    pub fn vcl_string(mut self, vcl: impl Into<String>) -> Self {
        self.vcl = VclSource::Inline(vcl.into());
        self
    }

    /// Load configuration from a file on varnishd's side. Declared backends
    /// and the version header are not applied to file-backed VCL.
    pub fn vcl_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.vcl = VclSource::File(path.into());
        self
    }

    /// Append `name value` to the varnishd command line, unvalidated.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Declare a backend from a URL such as `http://127.0.0.1:8080`.
    pub fn backend(mut self, name: impl Into<String>, url: &str) -> Result<Self, ModelError> {
        self.backends.push(BackendSpec::from_url(name, url)?);
        Ok(self)
    }

    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a fixed identity instead of a random one.
    pub fn identity(mut self, identity: InstanceIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Spawn, authenticate, load and start, then wait for readiness.
    pub async fn start(self) -> Result<InstanceHandle, VarnishError> {
        startup::start(self).await
    }
}

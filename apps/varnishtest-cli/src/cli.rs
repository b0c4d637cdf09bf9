//! Command line: flags, and their translation into a [`VarnishBuilder`].

use crate::error::CliError;

use common::ErrorLocation;
use varnishtest::{SupervisorConfig, VarnishBuilder};

use std::panic::Location;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;

const DEFAULT_CONFIG_FILE: &str = "varnishtest.toml";

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum VclVersionArg {
    #[value(name = "4.1")]
    V41,
    #[value(name = "4.0")]
    V40,
    /// The VCL carries its own `vcl` line.
    #[value(name = "none")]
    Unversioned,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "varnishtest",
    about = "Start a throwaway varnishd and print its base URL",
    version,
    long_about = None
)]
pub struct Args {
    /// TOML supervisor configuration; defaults apply if it does not exist.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Inline VCL body, appended after the version line and backends.
    #[arg(long, conflicts_with = "vcl_file")]
    pub vcl: Option<String>,

    /// VCL file loaded by varnishd itself.
    #[arg(long)]
    pub vcl_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = VclVersionArg::V41)]
    pub vcl_version: VclVersionArg,

    /// Backend as NAME=URL, e.g. `origin=http://127.0.0.1:8080`. Repeatable.
    #[arg(long = "backend", value_name = "NAME=URL", action = ArgAction::Append)]
    pub backends: Vec<String>,

    /// Extra varnishd argument pair, passed through verbatim. Repeatable.
    #[arg(
        long = "arg",
        num_args = 2,
        value_names = ["FLAG", "VALUE"],
        allow_hyphen_values = true,
        action = ArgAction::Append
    )]
    pub extra: Vec<String>,

    /// Directory for varnishtest.log.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevelArg::Info)]
    pub log_level: LogLevelArg,
}

impl Args {
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Build the instance description from the flags.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Cli`] for a backend without `=`, and
    /// [`CliError::Model`] for a backend URL that does not parse.
    pub fn builder(&self, config: SupervisorConfig) -> Result<VarnishBuilder, CliError> {
        let mut builder = VarnishBuilder::new().config(config);

        builder = match self.vcl_version {
            VclVersionArg::V41 => builder.vcl41(),
            VclVersionArg::V40 => builder.vcl40(),
            VclVersionArg::Unversioned => builder.no_vcl_version(),
        };

        for backend in &self.backends {
            let Some((name, url)) = backend.split_once('=') else {
                return Err(CliError::Cli {
                    message: format!("Backend '{backend}' must be NAME=URL"),
                    location: ErrorLocation::from(Location::caller()),
                });
            };
            builder = builder.backend(name, url)?;
        }

        if let Some(path) = &self.vcl_file {
            builder = builder.vcl_file(path);
        } else if let Some(vcl) = &self.vcl {
            builder = builder.vcl_string(vcl);
        }

        for pair in self.extra.chunks_exact(2) {
            builder = builder.parameter(&pair[0], &pair[1]);
        }

        Ok(builder)
    }
}

//! Domain models for a supervised varnishd test instance.
//!
//! This crate contains pure data structures: what a backend is, how an
//! instance is identified, what a management-protocol message looks like.
//! No I/O happens here.
//!
//! ## Architecture
//!
//! - **models** (this crate): Pure data structures
//! - **varnishtest**: Protocol engine and process lifecycle operating on models
//! - **varnishtest-cli**: Binary wiring everything together

pub mod backend;
pub mod error;
pub mod identity;
pub mod listen_address;
pub mod message;
pub mod vcl;

#[cfg(test)]
mod tests;

pub use backend::BackendSpec;
pub use error::model_error::ModelError;
pub use identity::InstanceIdentity;
pub use listen_address::ListenAddress;
pub use message::{CliStatus, ProtocolMessage};
pub use vcl::{VclSource, VclVersion};

pub use common::ErrorLocation;

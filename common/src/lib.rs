//! Shared building blocks for the varnishtest workspace.
//!
//! Everything here is free of I/O: error location capture used by every
//! error enum in the workspace, and a credential holder that refuses to
//! leak its contents through `Debug`, `Display` or serde.

pub mod error;
pub mod redacted_secret;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_secret::RedactedSecret;

//! Wire format of the varnish management protocol.
//!
//! Responses are framed as `"<status> <length>\n"` followed by exactly
//! `length` body bytes and one `\n`. Requests are plain command lines, or a
//! heredoc when a command carries a multi-line body (`vcl.inline`).

pub mod command;
pub mod framer;

pub use command::AdmCommand;
pub use framer::{encode_command, parse_header, read_message};

pub const AUTH: &str = "auth";
pub const VCL_INLINE: &str = "vcl.inline";
pub const VCL_LOAD: &str = "vcl.load";
pub const VCL_USE: &str = "vcl.use";
pub const START: &str = "start";
pub const STOP: &str = "stop";
pub const STATUS: &str = "status";
pub const DEBUG_LISTEN_ADDRESS: &str = "debug.listen_address";

/// Name every configuration is loaded under.
pub const VCL_NAME: &str = "vcl1";

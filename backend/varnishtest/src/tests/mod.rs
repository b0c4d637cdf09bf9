// Unit tests for crate-private behaviour.
// Public API scenarios live in integration_tests/.

mod command;
mod framer;
mod readiness;
mod scripted;
mod startup;

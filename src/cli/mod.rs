//! CLI command handlers
//!
//! This module contains argument parsing structures and command execution
//! for the `cadence` binary.

pub mod args;
pub mod router;

pub use args::{Cli, Commands, SignalCommands, VendorCommands, WaveCommands};
pub use router::execute_command;

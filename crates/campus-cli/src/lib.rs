//! Library side of the `campus` binary: argument parsing, logging setup and
//! the command implementations, kept here so they can be unit tested.

pub mod cli;
pub mod commands;
pub mod logging;

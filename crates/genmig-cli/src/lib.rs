//! genmig command line
//!
//! Argument parsing, logging setup and report output for the `genmig` binary.

#![allow(missing_docs)]

pub mod cli;
pub mod logging;
pub mod run;

pub use cli::{command, Invocation};
pub use run::{execute, Exit};

//! Command line options for the `pgbootstrap` binary, and their conversion to
//! the library's configuration.
mod cli;
mod status;

pub use cli::{CliOpts, CollationArg, LogLevelArg, Settings};
pub use status::{failure_line, success_line};

pub extern crate clap;

// Screening Tool CLI lib.rs
//
// Command line front end: configuration and subcommand dispatch.

pub mod commands;
pub mod config;

pub use commands::{run, Cli, Commands};
pub use config::AppConfig;

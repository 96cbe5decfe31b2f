//! Club timer CLI library.
//!
//! This crate provides the CLI interface for the agenda parser and the
//! stage timers.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, TimerAction};
pub use config::Config;

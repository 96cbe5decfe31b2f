//! CLI subcommand implementations.

pub mod agenda;
pub mod history;
pub mod import;
pub mod parse;
pub mod status;
pub mod timer;
pub mod util;

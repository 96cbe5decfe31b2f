//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stage timer for club meetings.
///
/// Parses pasted agendas into timed items and runs green/yellow/red card
/// timers for each speaker.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse agenda text and show the items found.
    Parse {
        /// Agenda file (reads stdin when omitted).
        file: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse agenda text and store it.
    Import {
        /// Agenda file (reads stdin when omitted).
        file: Option<PathBuf>,

        /// Replace the stored agenda instead of appending.
        #[arg(long)]
        replace: bool,
    },

    /// List the stored agenda.
    Agenda {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Drive the timer of an agenda item.
    #[command(subcommand)]
    Timer(TimerAction),

    /// Show completed items, planned against actual.
    History {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show database, agenda and open timers.
    Status,
}

/// Timer commands. `ITEM` is an item id, a unique id prefix or a 1-based
/// agenda position.
#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start or resume the timer.
    Start { item: String },

    /// Pause the timer.
    Pause { item: String },

    /// Stop the timer and record the result.
    Stop { item: String },

    /// Reset the timer to zero.
    Reset { item: String },

    /// Show the timer without changing it.
    Status { item: String },

    /// Run the timer in the foreground, announcing card changes.
    Watch {
        item: String,

        /// Stop watching after this many seconds.
        #[arg(long)]
        ticks: Option<u64>,
    },
}

impl TimerAction {
    pub fn item(&self) -> &str {
        match self {
            Self::Start { item }
            | Self::Pause { item }
            | Self::Stop { item }
            | Self::Reset { item }
            | Self::Status { item }
            | Self::Watch { item, .. } => item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timer_position() {
        let cli = Cli::try_parse_from(["ct", "timer", "start", "3"]).unwrap();
        match cli.command {
            Some(Commands::Timer(action)) => assert_eq!(action.item(), "3"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ct", "agenda", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Agenda { json: true })));
    }

    #[test]
    fn watch_accepts_tick_limit() {
        let cli = Cli::try_parse_from(["ct", "timer", "watch", "abc", "--ticks", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Timer(TimerAction::Watch { ticks: Some(5), .. }))
        ));
    }
}

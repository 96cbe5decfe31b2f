//! Core domain logic for the club timer.
//!
//! This crate contains the fundamental types and logic for:
//! - Agenda parsing: turning pasted schedules into typed items
//! - Classification: mapping titles and durations to timing categories
//! - Timers: the phase state machine, the multi-timer coordinator and
//!   snapshot recovery

pub mod agenda;
pub mod category;
pub mod coordinator;
pub mod duration;
pub mod notifier;
pub mod rules;
pub mod schedule;
pub mod snapshot;
pub mod subtimer;
pub mod timer;
pub mod types;

pub use agenda::{AgendaEntry, AgendaItem, ParsedAgenda, parse_agenda, to_tab_text, validate_entries};
pub use category::{Category, classify, is_impromptu_session};
pub use coordinator::Coordinator;
pub use duration::{DEFAULT_DURATION_SECS, format_duration_token, normalize_duration, parse_duration};
pub use notifier::{Cue, Notifier, RecordingNotifier, dispatch};
pub use rules::{Phase, PhaseRules};
pub use schedule::{Punctuality, punctuality};
pub use snapshot::{MemoryStore, Recovery, SnapshotStore, StoreError, TimerSnapshot, decide_recovery};
pub use subtimer::{PersonalSubTimer, SubTimerSet};
pub use timer::{
    CompletionRecord, TimerCommand, TimerConfig, TimerError, TimerEvent, TimerInstance, TimerStatus,
    format_clock,
};
pub use types::{ItemId, SubTimerId, ValidationError};

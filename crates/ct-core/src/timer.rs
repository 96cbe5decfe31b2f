//! Per-item countdown state machine.
//!
//! The timer owns no thread or clock. The caller invokes [`TimerInstance::tick`]
//! once per second while the timer runs; every tick is an atomic update that
//! may yield a phase-change event.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> Running <-> Paused -> Stopped
//! ```
//!
//! `Stopped` is terminal. Commands issued in a state that forbids them fail
//! with [`TimerError::InvalidTransition`] and leave the timer untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agenda::AgendaItem;
use crate::category::Category;
use crate::rules::{DEFAULT_WHITE_GRACE_SECS, Phase, PhaseRules};
use crate::snapshot::{Recovery, TimerSnapshot, decide_recovery};
use crate::types::{ItemId, SubTimerId, ValidationError};

/// Tunables shared by every timer a coordinator creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Snapshots older than this resume paused instead of running.
    /// Default: 300 (5 minutes).
    pub staleness_secs: i64,

    /// Overtime grace before the white card; `None` disables white.
    /// Default: 30.
    pub white_grace_secs: Option<i64>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            staleness_secs: 300,
            white_grace_secs: Some(DEFAULT_WHITE_GRACE_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    NotStarted,
    Running,
    Paused,
    Stopped,
}

impl TimerStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command a caller can issue, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Stop,
    Reset,
    Retarget,
    Recategorize,
    SetRules,
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Retarget => "retarget",
            Self::Recategorize => "recategorize",
            Self::SetRules => "change the rules of",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The command is not valid in the timer's current status.
    #[error("cannot {command} a timer that is {status}")]
    InvalidTransition {
        command: TimerCommand,
        status: TimerStatus,
    },
    /// An item already has a timer that has not been stopped.
    #[error("item {item_id} already has an active timer")]
    AlreadyActive { item_id: ItemId },
    /// No timer is open for the item.
    #[error("no timer is open for item {item_id}")]
    UnknownItem { item_id: ItemId },
    /// The item does not run personal sub-timers.
    #[error("item {item_id} is not an impromptu session")]
    NotImpromptu { item_id: ItemId },
    /// No sub-timer with the given id.
    #[error("unknown sub-timer {id}")]
    UnknownSubTimer { id: SubTimerId },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Emitted when a timer stops. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub item_id: ItemId,
    pub target_secs: i64,
    pub actual_secs: i64,
    pub is_overtime: bool,
    pub overtime_secs: i64,
}

/// Every state change produces an event; notifiers subscribe to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Started {
        item_id: ItemId,
        elapsed_secs: i64,
        resumed: bool,
    },
    Paused {
        item_id: ItemId,
        elapsed_secs: i64,
    },
    Reset {
        item_id: ItemId,
    },
    /// The displayed phase changed. Fired once per crossing.
    PhaseChanged {
        item_id: ItemId,
        from: Phase,
        to: Phase,
        elapsed_secs: i64,
    },
}

/// Countdown for one agenda item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerInstance {
    item_id: ItemId,
    category: Category,
    target_secs: i64,
    elapsed_secs: i64,
    status: TimerStatus,
    has_started: bool,
    white_grace_secs: Option<i64>,
    custom_rules: Option<PhaseRules>,
    /// Phase seen at the last tick; a cue fires only when this changes.
    last_phase: Phase,
}

impl TimerInstance {
    /// Creates a timer in `NotStarted` with the category's preset rules.
    pub fn new(item_id: ItemId, target_secs: i64, category: Category, config: &TimerConfig) -> Self {
        let mut timer = Self {
            item_id,
            category,
            target_secs,
            elapsed_secs: 0,
            status: TimerStatus::NotStarted,
            has_started: false,
            white_grace_secs: config.white_grace_secs,
            custom_rules: None,
            last_phase: Phase::Normal,
        };
        timer.rebaseline();
        timer
    }

    /// Creates a timer for an agenda item.
    pub fn for_item(item: &AgendaItem, config: &TimerConfig) -> Self {
        Self::new(
            item.id.clone(),
            item.entry.duration_secs,
            item.entry.category,
            config,
        )
    }

    /// Creates a timer and applies a stored snapshot, if any.
    ///
    /// `now` is passed in so recovery is deterministic.
    pub fn restore(
        item: &AgendaItem,
        config: &TimerConfig,
        snapshot: Option<&TimerSnapshot>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> (Self, Recovery) {
        let mut timer = Self::for_item(item, config);
        let recovery = snapshot.map_or(Recovery::Fresh, |snap| {
            decide_recovery(snap, now, config.staleness_secs)
        });
        match recovery {
            Recovery::Resumed { elapsed_secs, .. } => {
                timer.elapsed_secs = elapsed_secs;
                timer.status = TimerStatus::Running;
                timer.has_started = true;
            }
            Recovery::Paused { elapsed_secs, .. } => {
                timer.elapsed_secs = elapsed_secs;
                timer.status = TimerStatus::Paused;
                timer.has_started = true;
            }
            Recovery::Fresh => {}
        }
        timer.rebaseline();
        tracing::debug!(item_id = %timer.item_id, ?recovery, "restored timer");
        (timer, recovery)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub const fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    pub const fn status(&self) -> TimerStatus {
        self.status
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.status, TimerStatus::Running)
    }

    pub const fn has_started(&self) -> bool {
        self.has_started
    }

    pub const fn elapsed_secs(&self) -> i64 {
        self.elapsed_secs
    }

    pub const fn target_secs(&self) -> i64 {
        self.target_secs
    }

    /// Seconds left until the target; negative in overtime.
    pub const fn remaining_secs(&self) -> i64 {
        self.target_secs - self.elapsed_secs
    }

    pub const fn is_overtime(&self) -> bool {
        self.elapsed_secs > self.target_secs
    }

    pub fn overtime_secs(&self) -> i64 {
        (self.elapsed_secs - self.target_secs).max(0)
    }

    /// Rules in effect: the override if set, else the category preset.
    pub fn rules(&self) -> PhaseRules {
        self.custom_rules.unwrap_or_else(|| {
            PhaseRules::preset_with_grace(self.category, self.white_grace_secs)
        })
    }

    pub const fn has_custom_rules(&self) -> bool {
        self.custom_rules.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.rules().phase_at(self.elapsed_secs, self.target_secs)
    }

    /// Build a snapshot for the recovery store.
    pub fn snapshot(&self, now: chrono::DateTime<chrono::Utc>) -> TimerSnapshot {
        TimerSnapshot {
            item_id: self.item_id.clone(),
            elapsed_secs: self.elapsed_secs,
            running: self.is_running(),
            has_started: self.has_started,
            snapshot_at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<TimerEvent, TimerError> {
        match self.status {
            TimerStatus::NotStarted | TimerStatus::Paused => {
                let resumed = self.status == TimerStatus::Paused;
                self.status = TimerStatus::Running;
                self.has_started = true;
                tracing::debug!(item_id = %self.item_id, elapsed = self.elapsed_secs, resumed, "timer started");
                Ok(TimerEvent::Started {
                    item_id: self.item_id.clone(),
                    elapsed_secs: self.elapsed_secs,
                    resumed,
                })
            }
            status => Err(self.reject(TimerCommand::Start, status)),
        }
    }

    pub fn pause(&mut self) -> Result<TimerEvent, TimerError> {
        match self.status {
            TimerStatus::Running => {
                self.status = TimerStatus::Paused;
                tracing::debug!(item_id = %self.item_id, elapsed = self.elapsed_secs, "timer paused");
                Ok(TimerEvent::Paused {
                    item_id: self.item_id.clone(),
                    elapsed_secs: self.elapsed_secs,
                })
            }
            status => Err(self.reject(TimerCommand::Pause, status)),
        }
    }

    /// Stops the timer for good and returns its completion record.
    pub fn stop(&mut self) -> Result<CompletionRecord, TimerError> {
        match self.status {
            TimerStatus::Running | TimerStatus::Paused => {
                self.status = TimerStatus::Stopped;
                let record = CompletionRecord {
                    item_id: self.item_id.clone(),
                    target_secs: self.target_secs,
                    actual_secs: self.elapsed_secs,
                    is_overtime: self.is_overtime(),
                    overtime_secs: self.overtime_secs(),
                };
                tracing::debug!(item_id = %self.item_id, actual = record.actual_secs, overtime = record.overtime_secs, "timer stopped");
                Ok(record)
            }
            status => Err(self.reject(TimerCommand::Stop, status)),
        }
    }

    /// Returns to `NotStarted` at zero. Rejected once stopped.
    pub fn reset(&mut self) -> Result<TimerEvent, TimerError> {
        if self.status == TimerStatus::Stopped {
            return Err(self.reject(TimerCommand::Reset, self.status));
        }
        self.status = TimerStatus::NotStarted;
        self.elapsed_secs = 0;
        self.has_started = false;
        self.rebaseline();
        tracing::debug!(item_id = %self.item_id, "timer reset");
        Ok(TimerEvent::Reset {
            item_id: self.item_id.clone(),
        })
    }

    /// Advances one second. Returns a phase change when a threshold is crossed.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.status != TimerStatus::Running {
            return None;
        }
        self.elapsed_secs += 1;
        let phase = self.phase();
        if phase == self.last_phase {
            return None;
        }
        let from = self.last_phase;
        self.last_phase = phase;
        tracing::debug!(item_id = %self.item_id, %from, to = %phase, elapsed = self.elapsed_secs, "phase changed");
        Some(TimerEvent::PhaseChanged {
            item_id: self.item_id.clone(),
            from,
            to: phase,
            elapsed_secs: self.elapsed_secs,
        })
    }

    /// Changes the target duration (seconds).
    pub fn set_target(&mut self, target_secs: i64) -> Result<(), TimerError> {
        if self.status == TimerStatus::Stopped {
            return Err(self.reject(TimerCommand::Retarget, self.status));
        }
        if target_secs <= 0 {
            return Err(ValidationError::Empty { field: "target duration" }.into());
        }
        self.target_secs = target_secs;
        self.rebaseline();
        Ok(())
    }

    /// Switches the category; preset rules follow unless overridden.
    pub fn set_category(&mut self, category: Category) -> Result<(), TimerError> {
        if self.status == TimerStatus::Stopped {
            return Err(self.reject(TimerCommand::Recategorize, self.status));
        }
        self.category = category;
        self.rebaseline();
        Ok(())
    }

    /// Installs (or with `None`, clears) an item-specific rule override.
    pub fn set_rules(&mut self, rules: Option<PhaseRules>) -> Result<(), TimerError> {
        if self.status == TimerStatus::Stopped {
            return Err(self.reject(TimerCommand::SetRules, self.status));
        }
        self.custom_rules = rules;
        self.rebaseline();
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Re-reads the current phase without emitting a change.
    fn rebaseline(&mut self) {
        self.last_phase = self.phase();
    }

    fn reject(&self, command: TimerCommand, status: TimerStatus) -> TimerError {
        tracing::debug!(item_id = %self.item_id, %command, %status, "rejected timer command");
        TimerError::InvalidTransition { command, status }
    }
}

/// Formats seconds as `M:SS`, with a leading `-` when negative.
pub fn format_clock(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.unsigned_abs();
    format!("{sign}{}:{:02}", abs / 60, abs % 60)
}

//! Timer commands.
//!
//! Every invocation reopens the item's timer from its snapshot, applies one
//! command and checkpoints the result, so a timer keeps running between
//! invocations as long as the gap stays under the staleness bound.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use ct_core::notifier::{Cue, Notifier, dispatch};
use ct_core::{
    AgendaItem, Coordinator, CompletionRecord, ItemId, Phase, Recovery, SnapshotStore, TimerConfig, TimerEvent,
    TimerInstance, format_clock, punctuality,
};
use ct_db::Database;

use super::util::resolve_item;
use crate::TimerAction;

/// Runs a one-shot timer command. `Watch` is handled by [`watch`].
pub fn run<W: Write>(
    writer: &mut W,
    db: Database,
    config: TimerConfig,
    action: &TimerAction,
    now: DateTime<Local>,
) -> Result<()> {
    let item = resolve_item(&db, action.item())?;
    let utc = now.with_timezone(&Utc);
    let mut coordinator = Coordinator::new(db, config);
    let recovery = coordinator.open(&item, utc)?;
    report_recovery(writer, recovery, coordinator.config())?;

    let event = match action {
        TimerAction::Start { .. } => Some(coordinator.start(&item.id, utc)?),
        TimerAction::Pause { .. } => Some(coordinator.pause(&item.id, utc)?),
        TimerAction::Reset { .. } => Some(coordinator.reset(&item.id, utc)?),
        TimerAction::Status { .. } => None,
        TimerAction::Stop { .. } => {
            let record = coordinator.stop(&item.id)?;
            let mut db = coordinator.into_store();
            db.record_completion(&record, &item.entry.title, utc)?;
            return write_completion(writer, &item, &record);
        }
        TimerAction::Watch { ticks, .. } => {
            return watch(
                writer,
                &mut coordinator,
                &item,
                *ticks,
                Local::now,
                || std::thread::sleep(std::time::Duration::from_secs(1)),
            );
        }
    };

    if let Some(event) = event {
        write_event(writer, &item, &event, now)?;
    }
    if let Some(timer) = coordinator.timer(&item.id) {
        write_status(writer, &item, timer)?;
    }
    Ok(())
}

/// Foreground loop: ticks once per `pause()`, announcing card changes.
///
/// Starts the timer if it is not already running. Stops after `ticks`
/// seconds, or never when `ticks` is `None`.
pub fn watch<W, S, C, P>(
    writer: &mut W,
    coordinator: &mut Coordinator<S>,
    item: &AgendaItem,
    ticks: Option<u64>,
    mut clock: C,
    mut pause: P,
) -> Result<()>
where
    W: Write,
    S: SnapshotStore,
    C: FnMut() -> DateTime<Local>,
    P: FnMut(),
{
    let running = coordinator.timer(&item.id).is_some_and(TimerInstance::is_running);
    if !running {
        let now = clock();
        let event = coordinator.start(&item.id, now.with_timezone(&Utc))?;
        write_event(writer, item, &event, now)?;
    }

    {
        let mut notifier = TerminalNotifier::new(writer, &item.entry.title);
        let mut count = 0;
        while ticks.is_none_or(|limit| count < limit) {
            pause();
            let events = coordinator.tick_all(clock().with_timezone(&Utc));
            dispatch(&events, &mut notifier);
            count += 1;
        }
    }

    if let Some(timer) = coordinator.timer(&item.id) {
        write_status(writer, item, timer)?;
    }
    Ok(())
}

/// Prints card changes, ringing the terminal bell when a cue applies.
struct TerminalNotifier<'a, W> {
    writer: &'a mut W,
    title: &'a str,
}

impl<'a, W: Write> TerminalNotifier<'a, W> {
    const fn new(writer: &'a mut W, title: &'a str) -> Self {
        Self { writer, title }
    }
}

impl<W: Write> Notifier for TerminalNotifier<'_, W> {
    fn phase_entered(&mut self, item_id: &ItemId, phase: Phase, cue: Option<Cue>) {
        let bell = if cue.is_some() { "\u{7}" } else { "" };
        if let Err(e) = writeln!(self.writer, "{bell}[{phase}] {}", self.title) {
            tracing::warn!(%item_id, error = %e, "failed to print card change");
        }
    }
}

fn report_recovery<W: Write>(writer: &mut W, recovery: Recovery, config: &TimerConfig) -> Result<()> {
    tracing::debug!(?recovery, "timer recovery");
    if let Recovery::Paused { stale: true, .. } = recovery {
        writeln!(
            writer,
            "Timer was away longer than {}s; resuming paused.",
            config.staleness_secs
        )?;
    }
    Ok(())
}

fn write_event<W: Write>(writer: &mut W, item: &AgendaItem, event: &TimerEvent, now: DateTime<Local>) -> Result<()> {
    match event {
        TimerEvent::Started { resumed: false, .. } => {
            writeln!(writer, "Started {}", item.entry.title)?;
            if let Some(scheduled) = item.entry.scheduled_time {
                writeln!(writer, "Scheduled {}: {}", scheduled.format("%H:%M"), punctuality(scheduled, now.time()))?;
            }
        }
        TimerEvent::Started { resumed: true, .. } => writeln!(writer, "Resumed {}", item.entry.title)?,
        TimerEvent::Paused { .. } => writeln!(writer, "Paused {}", item.entry.title)?,
        TimerEvent::Reset { .. } => writeln!(writer, "Reset {}", item.entry.title)?,
        TimerEvent::PhaseChanged { .. } => {}
    }
    Ok(())
}

fn write_status<W: Write>(writer: &mut W, item: &AgendaItem, timer: &TimerInstance) -> Result<()> {
    writeln!(
        writer,
        "{}: {}  {} / {}  remaining {}  {}",
        item.entry.title,
        timer.status(),
        format_clock(timer.elapsed_secs()),
        format_clock(timer.target_secs()),
        format_clock(timer.remaining_secs()),
        timer.phase()
    )?;
    Ok(())
}

fn write_completion<W: Write>(writer: &mut W, item: &AgendaItem, record: &CompletionRecord) -> Result<()> {
    write!(
        writer,
        "Completed {}: {} of {}",
        item.entry.title,
        format_clock(record.actual_secs),
        format_clock(record.target_secs)
    )?;
    if record.is_overtime {
        write!(writer, ", overtime {}", format_clock(record.overtime_secs))?;
    }
    writeln!(writer)?;
    Ok(())
}

//! History command: completed items, planned against actual.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ct_core::format_clock;
use ct_db::Database;
use serde::Serialize;

/// Completion row for display.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub item_id: String,
    pub title: String,
    pub target_secs: i64,
    pub actual_secs: i64,
    pub is_overtime: bool,
    pub overtime_secs: i64,
    pub completed_at: DateTime<Utc>,
}

pub fn get_history(db: &Database) -> Result<Vec<HistoryEntry>> {
    let entries = db
        .list_completions()?
        .into_iter()
        .map(|entry| HistoryEntry {
            item_id: entry.record.item_id.to_string(),
            title: entry.title,
            target_secs: entry.record.target_secs,
            actual_secs: entry.record.actual_secs,
            is_overtime: entry.record.is_overtime,
            overtime_secs: entry.record.overtime_secs,
            completed_at: entry.completed_at,
        })
        .collect();
    Ok(entries)
}

pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let entries = get_history(db)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No completed items.")?;
        return Ok(());
    }

    writeln!(writer, "Completed items:")?;
    for entry in &entries {
        let verdict = if entry.is_overtime {
            format!("+{} over", format_clock(entry.overtime_secs))
        } else {
            "within time".to_string()
        };
        writeln!(
            writer,
            "- {}  {}  {} / {}  {}",
            entry.completed_at.format("%Y-%m-%d %H:%M"),
            entry.title,
            format_clock(entry.actual_secs),
            format_clock(entry.target_secs),
            verdict
        )?;
    }
    let overtime_count = entries.iter().filter(|e| e.is_overtime).count();
    writeln!(writer, "{} items, {} over time", entries.len(), overtime_count)?;
    Ok(())
}

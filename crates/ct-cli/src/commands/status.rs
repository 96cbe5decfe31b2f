//! Status command for showing the agenda size and open timers.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ct_core::{Recovery, SnapshotStore, TimerConfig, decide_recovery, format_clock};
use ct_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    database_path: &Path,
    config: &TimerConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    writeln!(writer, "Club timer status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Agenda items: {}", db.agenda_count()?)?;

    let snapshots = db.list_snapshots()?;
    if snapshots.is_empty() {
        writeln!(writer, "No open timers.")?;
        return Ok(());
    }

    writeln!(writer, "Open timers:")?;
    for snapshot in snapshots {
        let title = db
            .agenda_item(snapshot.item_id.as_str())?
            .map_or_else(|| snapshot.item_id.to_string(), |item| item.entry.title);
        let line = match decide_recovery(&snapshot, now, config.staleness_secs) {
            Recovery::Resumed { elapsed_secs, .. } => format!("running {}", format_clock(elapsed_secs)),
            Recovery::Paused { elapsed_secs, stale: true } => {
                format!("stale, paused at {}", format_clock(elapsed_secs))
            }
            Recovery::Paused { elapsed_secs, stale: false } => {
                format!("paused at {}", format_clock(elapsed_secs))
            }
            Recovery::Fresh => "not started".to_string(),
        };
        writeln!(writer, "- {title}: {line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use ct_core::{AgendaEntry, AgendaItem, ItemId, TimerSnapshot};
    use insta::assert_snapshot;

    #[test]
    fn status_command_outputs_open_timers() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("ct.db");
        let mut db = Database::open(&db_path).unwrap();
        db.append_agenda(&[
            AgendaItem::new(ItemId::new("a").unwrap(), AgendaEntry::new("备稿演讲", 420)),
            AgendaItem::new(ItemId::new("b").unwrap(), AgendaEntry::new("个人评估", 180)),
        ])
        .unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 1, 11, 30, 0).unwrap();
        db.save_snapshot(&TimerSnapshot {
            item_id: ItemId::new("a").unwrap(),
            elapsed_secs: 100,
            running: true,
            has_started: true,
            snapshot_at: now - Duration::seconds(20),
        })
        .unwrap();
        db.save_snapshot(&TimerSnapshot {
            item_id: ItemId::new("b").unwrap(),
            elapsed_secs: 45,
            running: false,
            has_started: true,
            snapshot_at: now - Duration::seconds(900),
        })
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &db_path, &TimerConfig::default(), now).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/ct.db");
        assert_snapshot!(output, @r"
        Club timer status
        Database: [TEMP]/ct.db
        Agenda items: 2
        Open timers:
        - 备稿演讲: running 2:00
        - 个人评估: paused at 0:45
        ");
    }

    #[test]
    fn status_without_timers() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, Path::new("ct.db"), &TimerConfig::default(), Utc::now()).unwrap();
        assert!(String::from_utf8(output).unwrap().ends_with("Agenda items: 0\nNo open timers.\n"));
    }
}

//! Shared utilities for CLI commands.

use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use ct_core::{AgendaEntry, AgendaItem, format_duration_token};
use ct_db::Database;

/// Reads agenda text from a file, or stdin when no file is given.
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Finds an agenda item by id, 1-based position, or unique id prefix.
pub fn resolve_item(db: &Database, key: &str) -> Result<AgendaItem> {
    let key = key.trim();
    if let Ok(position) = key.parse::<i64>() {
        return db
            .agenda_item_at(position)?
            .with_context(|| format!("no agenda item at position {position}"));
    }
    if let Some(item) = db.agenda_item(key)? {
        return Ok(item);
    }

    let mut matches: Vec<AgendaItem> = db
        .list_agenda()?
        .into_iter()
        .filter(|item| item.id.as_str().starts_with(key))
        .collect();
    match matches.len() {
        0 => bail!("no agenda item matches '{key}'"),
        1 => Ok(matches.remove(0)),
        n => bail!("'{key}' matches {n} agenda items; use a longer prefix"),
    }
}

/// Shortens an item id for display.
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// One display line for an agenda entry, without a leading index.
pub fn format_entry(entry: &AgendaEntry) -> String {
    let mut line = String::new();
    if let Some(time) = entry.scheduled_time_text() {
        let _ = write!(line, "{time}  ");
    }
    let _ = write!(
        line,
        "{}  {}  {}",
        entry.title,
        format_duration_token(entry.duration_secs),
        entry.category.label()
    );
    if let Some(speaker) = &entry.speaker {
        let _ = write!(line, "  {speaker}");
    }
    if let Some(level) = &entry.level {
        let _ = write!(line, " ({level})");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::ItemId;

    fn stored(db: &mut Database, ids: &[&str]) {
        let items: Vec<AgendaItem> = ids
            .iter()
            .map(|id| AgendaItem::new(ItemId::new(*id).unwrap(), AgendaEntry::new("备稿演讲", 420)))
            .collect();
        db.append_agenda(&items).unwrap();
    }

    #[test]
    fn resolves_by_position_id_and_prefix() {
        let mut db = Database::open_in_memory().unwrap();
        stored(&mut db, &["alpha-1", "beta-1", "beta-2"]);

        assert_eq!(resolve_item(&db, "2").unwrap().id.as_str(), "beta-1");
        assert_eq!(resolve_item(&db, "beta-2").unwrap().id.as_str(), "beta-2");
        assert_eq!(resolve_item(&db, "al").unwrap().id.as_str(), "alpha-1");
    }

    #[test]
    fn reports_missing_and_ambiguous_keys() {
        let mut db = Database::open_in_memory().unwrap();
        stored(&mut db, &["beta-1", "beta-2"]);

        let err = resolve_item(&db, "9").unwrap_err();
        assert_eq!(err.to_string(), "no agenda item at position 9");
        let err = resolve_item(&db, "beta").unwrap_err();
        assert_eq!(err.to_string(), "'beta' matches 2 agenda items; use a longer prefix");
        assert!(resolve_item(&db, "gamma").is_err());
    }

    #[test]
    fn reads_input_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("agenda.txt");
        std::fs::write(&path, "备稿演讲\t7'\n").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "备稿演讲\t7'\n");
        assert!(read_input(Some(&temp.path().join("missing.txt"))).is_err());
    }
}

//! Agenda command for listing the stored items.

use std::io::Write;

use anyhow::Result;
use ct_db::Database;

use super::util::{format_entry, short_id};

pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let items = db.list_agenda()?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&items)?)?;
        return Ok(());
    }

    if items.is_empty() {
        writeln!(writer, "No agenda imported.")?;
        return Ok(());
    }
    writeln!(writer, "Agenda ({} items)", items.len())?;
    for (index, item) in items.iter().enumerate() {
        writeln!(
            writer,
            "{:>2}. [{}] {}",
            index + 1,
            short_id(item.id.as_str()),
            format_entry(&item.entry)
        )?;
    }
    Ok(())
}

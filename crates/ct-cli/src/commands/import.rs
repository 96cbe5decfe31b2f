//! Import command for storing a parsed agenda in the local `SQLite` store.

use anyhow::{Result, bail};
use ct_core::{AgendaItem, ItemId, parse_agenda};
use ct_db::Database;
use uuid::Uuid;

/// Parses `text` and stores its items.
///
/// Any validation error blocks the whole import. Returns the stored items.
pub fn run(db: &mut Database, text: &str, replace: bool) -> Result<Vec<AgendaItem>> {
    let parsed = parse_agenda(text);
    if !parsed.is_valid() {
        bail!(
            "agenda has {} validation error(s), nothing imported:\n{}",
            parsed.errors.len(),
            parsed.errors.join("\n")
        );
    }
    if parsed.entries.is_empty() {
        bail!("no agenda items found");
    }

    let items = parsed
        .entries
        .into_iter()
        .map(|entry| Ok(AgendaItem::new(ItemId::new(Uuid::new_v4().to_string())?, entry)))
        .collect::<Result<Vec<_>>>()?;

    if replace {
        db.replace_agenda(&items)?;
    } else {
        db.append_agenda(&items)?;
    }
    tracing::debug!(count = items.len(), replace, "imported agenda");
    Ok(items)
}

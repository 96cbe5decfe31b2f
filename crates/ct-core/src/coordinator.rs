//! Owner of every open timer.
//!
//! Timers are keyed by item id. Any number may run at once, but an item has
//! at most one open timer. Each command is checkpointed to the snapshot store
//! after it succeeds; store failures are logged and otherwise ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::agenda::AgendaItem;
use crate::category::{Category, is_impromptu_session};
use crate::rules::PhaseRules;
use crate::snapshot::{Recovery, SnapshotStore};
use crate::subtimer::{PersonalSubTimer, SubTimerSet};
use crate::timer::{CompletionRecord, TimerConfig, TimerError, TimerEvent, TimerInstance};
use crate::types::{ItemId, SubTimerId};

#[derive(Debug)]
struct Slot {
    timer: TimerInstance,
    /// Present only for impromptu sessions.
    sub_timers: Option<SubTimerSet>,
}

#[derive(Debug)]
pub struct Coordinator<S> {
    config: TimerConfig,
    store: S,
    slots: BTreeMap<ItemId, Slot>,
}

impl<S: SnapshotStore> Coordinator<S> {
    pub fn new(store: S, config: TimerConfig) -> Self {
        Self {
            config,
            store,
            slots: BTreeMap::new(),
        }
    }

    pub const fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Opens a timer for `item`, restoring any stored snapshot.
    ///
    /// Fails with [`TimerError::AlreadyActive`] if the item already has one.
    pub fn open(&mut self, item: &AgendaItem, now: DateTime<Utc>) -> Result<Recovery, TimerError> {
        if self.slots.contains_key(&item.id) {
            return Err(TimerError::AlreadyActive {
                item_id: item.id.clone(),
            });
        }

        let snapshot = self.store.load_snapshot(&item.id).unwrap_or_else(|e| {
            tracing::warn!(item_id = %item.id, error = %e, "ignoring unreadable snapshot");
            None
        });
        let (timer, recovery) = TimerInstance::restore(item, &self.config, snapshot.as_ref(), now);
        let sub_timers = is_impromptu_session(&item.entry.title, item.entry.category).then(SubTimerSet::new);

        self.slots.insert(item.id.clone(), Slot { timer, sub_timers });
        Ok(recovery)
    }

    /// Drops a timer without completing it. Its snapshot is kept, so a later
    /// [`open`](Self::open) picks up where it left off.
    pub fn close(&mut self, item_id: &ItemId) -> Option<TimerInstance> {
        self.slots.remove(item_id).map(|slot| slot.timer)
    }

    pub fn start(&mut self, item_id: &ItemId, now: DateTime<Utc>) -> Result<TimerEvent, TimerError> {
        self.command(item_id, now, TimerInstance::start)
    }

    pub fn pause(&mut self, item_id: &ItemId, now: DateTime<Utc>) -> Result<TimerEvent, TimerError> {
        self.command(item_id, now, TimerInstance::pause)
    }

    pub fn reset(&mut self, item_id: &ItemId, now: DateTime<Utc>) -> Result<TimerEvent, TimerError> {
        self.command(item_id, now, TimerInstance::reset)
    }

    /// Stops a timer, discards it and deletes its snapshot.
    pub fn stop(&mut self, item_id: &ItemId) -> Result<CompletionRecord, TimerError> {
        let record = self.slot_mut(item_id)?.timer.stop()?;
        self.slots.remove(item_id);
        if let Err(e) = self.store.delete_snapshot(item_id) {
            tracing::warn!(%item_id, error = %e, "failed to delete snapshot");
        }
        Ok(record)
    }

    pub fn set_target(&mut self, item_id: &ItemId, target_secs: i64, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.command(item_id, now, |timer| timer.set_target(target_secs))
    }

    pub fn set_rules(&mut self, item_id: &ItemId, rules: Option<PhaseRules>) -> Result<(), TimerError> {
        self.slot_mut(item_id)?.timer.set_rules(rules)
    }

    pub fn set_category(&mut self, item_id: &ItemId, category: Category) -> Result<(), TimerError> {
        self.slot_mut(item_id)?.timer.set_category(category)
    }

    /// Advances every open timer and sub-timer by one second.
    ///
    /// Running timers are checkpointed. Returns the phase changes in item id
    /// order.
    pub fn tick_all(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        for slot in self.slots.values_mut() {
            if let Some(sub_timers) = slot.sub_timers.as_mut() {
                sub_timers.tick();
            }
            if !slot.timer.is_running() {
                continue;
            }
            events.extend(slot.timer.tick());
            checkpoint(&mut self.store, &slot.timer, now);
        }
        events
    }

    pub fn timer(&self, item_id: &ItemId) -> Option<&TimerInstance> {
        self.slots.get(item_id).map(|slot| &slot.timer)
    }

    pub fn timers(&self) -> impl Iterator<Item = &TimerInstance> {
        self.slots.values().map(|slot| &slot.timer)
    }

    pub fn running_count(&self) -> usize {
        self.timers().filter(|t| t.is_running()).count()
    }

    // ── Sub-timers ───────────────────────────────────────────────────

    pub fn sub_timers(&self, item_id: &ItemId) -> Option<&SubTimerSet> {
        self.slots.get(item_id)?.sub_timers.as_ref()
    }

    pub fn add_sub_timer(&mut self, item_id: &ItemId, name: &str) -> Result<SubTimerId, TimerError> {
        Ok(self.sub_timers_mut(item_id)?.add(name)?)
    }

    pub fn toggle_sub_timer(&mut self, item_id: &ItemId, id: SubTimerId) -> Result<bool, TimerError> {
        self.sub_timers_mut(item_id)?.toggle(id)
    }

    pub fn reset_sub_timer(&mut self, item_id: &ItemId, id: SubTimerId) -> Result<(), TimerError> {
        self.sub_timers_mut(item_id)?.reset(id)
    }

    pub fn remove_sub_timer(&mut self, item_id: &ItemId, id: SubTimerId) -> Result<PersonalSubTimer, TimerError> {
        self.sub_timers_mut(item_id)?.remove(id)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn command<T>(
        &mut self,
        item_id: &ItemId,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut TimerInstance) -> Result<T, TimerError>,
    ) -> Result<T, TimerError> {
        let slot = self.slots.get_mut(item_id).ok_or_else(|| TimerError::UnknownItem {
            item_id: item_id.clone(),
        })?;
        let out = apply(&mut slot.timer)?;
        checkpoint(&mut self.store, &slot.timer, now);
        Ok(out)
    }

    fn slot_mut(&mut self, item_id: &ItemId) -> Result<&mut Slot, TimerError> {
        self.slots.get_mut(item_id).ok_or_else(|| TimerError::UnknownItem {
            item_id: item_id.clone(),
        })
    }

    fn sub_timers_mut(&mut self, item_id: &ItemId) -> Result<&mut SubTimerSet, TimerError> {
        self.slot_mut(item_id)?
            .sub_timers
            .as_mut()
            .ok_or_else(|| TimerError::NotImpromptu {
                item_id: item_id.clone(),
            })
    }
}

fn checkpoint<S: SnapshotStore>(store: &mut S, timer: &TimerInstance, now: DateTime<Utc>) {
    if let Err(e) = store.save_snapshot(&timer.snapshot(now)) {
        tracing::warn!(item_id = %timer.item_id(), error = %e, "failed to save snapshot");
    }
}

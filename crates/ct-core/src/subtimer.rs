//! Personal count-up timers for impromptu sessions.
//!
//! Each impromptu speaker gets a named stopwatch beside the session timer.
//! Sub-timers have no phases or cues.

use serde::{Deserialize, Serialize};

use crate::timer::TimerError;
use crate::types::{SubTimerId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalSubTimer {
    pub id: SubTimerId,
    pub name: String,
    pub elapsed_secs: i64,
    pub running: bool,
}

/// The sub-timers owned by one session timer, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubTimerSet {
    timers: Vec<PersonalSubTimer>,
    next_id: u32,
}

impl SubTimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stopped sub-timer. The name is trimmed and must not be blank.
    pub fn add(&mut self, name: &str) -> Result<SubTimerId, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "speaker name" });
        }
        self.next_id += 1;
        let id = SubTimerId(self.next_id);
        self.timers.push(PersonalSubTimer {
            id,
            name: name.to_string(),
            elapsed_secs: 0,
            running: false,
        });
        Ok(id)
    }

    /// Flips running/stopped. Returns the new running flag.
    pub fn toggle(&mut self, id: SubTimerId) -> Result<bool, TimerError> {
        let timer = self.get_mut(id)?;
        timer.running = !timer.running;
        Ok(timer.running)
    }

    /// Zeroes and stops a sub-timer.
    pub fn reset(&mut self, id: SubTimerId) -> Result<(), TimerError> {
        let timer = self.get_mut(id)?;
        timer.elapsed_secs = 0;
        timer.running = false;
        Ok(())
    }

    pub fn remove(&mut self, id: SubTimerId) -> Result<PersonalSubTimer, TimerError> {
        let index = self
            .timers
            .iter()
            .position(|t| t.id == id)
            .ok_or(TimerError::UnknownSubTimer { id })?;
        Ok(self.timers.remove(index))
    }

    /// Advances every running sub-timer by one second.
    pub fn tick(&mut self) {
        for timer in self.timers.iter_mut().filter(|t| t.running) {
            timer.elapsed_secs += 1;
        }
    }

    pub fn get(&self, id: SubTimerId) -> Option<&PersonalSubTimer> {
        self.timers.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonalSubTimer> {
        self.timers.iter()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn get_mut(&mut self, id: SubTimerId) -> Result<&mut PersonalSubTimer, TimerError> {
        self.timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TimerError::UnknownSubTimer { id })
    }
}

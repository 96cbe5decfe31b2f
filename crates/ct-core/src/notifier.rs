//! Rendering of timer events.
//!
//! Timers only emit [`TimerEvent`]s. A [`Notifier`] decides what a phase
//! change looks or sounds like: a tone, a terminal bell, a log line.

use serde::Serialize;

use crate::rules::Phase;
use crate::timer::TimerEvent;
use crate::types::ItemId;

/// A short tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cue {
    pub frequency_hz: u32,
    pub duration_ms: u32,
    pub volume: f32,
}

impl Cue {
    const fn tone(frequency_hz: u32, duration_ms: u32, volume: f32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            volume,
        }
    }

    /// The tone played when a phase is entered. `Normal` is silent.
    pub const fn for_phase(phase: Phase) -> Option<Self> {
        match phase {
            Phase::Normal => None,
            Phase::Green => Some(Self::tone(800, 500, 0.3)),
            Phase::Yellow => Some(Self::tone(1000, 800, 0.3)),
            Phase::Red => Some(Self::tone(1200, 1000, 0.5)),
            Phase::White => Some(Self::tone(1500, 300, 0.6)),
        }
    }

    /// Manual attention signal, independent of phase.
    pub const FLASH: Self = Self::tone(1000, 200, 0.4);
}

/// Receives phase entries and manual flashes.
pub trait Notifier {
    fn phase_entered(&mut self, item_id: &ItemId, phase: Phase, cue: Option<Cue>);

    /// Manual attention signal. Plays [`Cue::FLASH`] where supported.
    fn flash(&mut self, item_id: &ItemId) {
        tracing::debug!(%item_id, frequency_hz = Cue::FLASH.frequency_hz, "flash requested");
    }
}

/// Forwards every phase change in `events` to `notifier`.
pub fn dispatch<'a, N>(events: impl IntoIterator<Item = &'a TimerEvent>, notifier: &mut N)
where
    N: Notifier + ?Sized,
{
    for event in events {
        if let TimerEvent::PhaseChanged { item_id, to, .. } = event {
            notifier.phase_entered(item_id, *to, Cue::for_phase(*to));
        }
    }
}

/// Keeps every notification, for tests and replays.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub phases: Vec<(ItemId, Phase)>,
    pub flashes: Vec<ItemId>,
}

impl Notifier for RecordingNotifier {
    fn phase_entered(&mut self, item_id: &ItemId, phase: Phase, _cue: Option<Cue>) {
        self.phases.push((item_id.clone(), phase));
    }

    fn flash(&mut self, item_id: &ItemId) {
        self.flashes.push(item_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::timer::{TimerConfig, TimerInstance};

    #[test]
    fn cue_catalogue() {
        assert_eq!(Cue::for_phase(Phase::Normal), None);
        let red = Cue::for_phase(Phase::Red).unwrap();
        assert_eq!((red.frequency_hz, red.duration_ms), (1200, 1000));
        assert!((red.volume - 0.5).abs() < f32::EPSILON);
        let white = Cue::for_phase(Phase::White).unwrap();
        assert_eq!((white.frequency_hz, white.duration_ms), (1500, 300));
        assert_eq!(Cue::for_phase(Phase::Green).unwrap().frequency_hz, 800);
        assert_eq!(Cue::for_phase(Phase::Yellow).unwrap().frequency_hz, 1000);
    }

    #[test]
    fn dispatch_forwards_only_phase_changes() {
        let id = ItemId::new("eval").unwrap();
        let mut timer = TimerInstance::new(id.clone(), 90, Category::ShortEvaluation, &TimerConfig::default());
        let mut events = vec![timer.start().unwrap()];
        for _ in 0..130 {
            events.extend(timer.tick());
        }

        let mut notifier = RecordingNotifier::default();
        dispatch(&events, &mut notifier);
        let seen: Vec<Phase> = notifier.phases.iter().map(|(_, p)| *p).collect();
        assert_eq!(seen, vec![Phase::Green, Phase::Yellow, Phase::Red, Phase::White]);
        assert!(notifier.phases.iter().all(|(item, _)| item == &id));
    }

    #[test]
    fn flash_is_recorded() {
        let id = ItemId::new("x").unwrap();
        let mut notifier = RecordingNotifier::default();
        notifier.flash(&id);
        assert_eq!(notifier.flashes, vec![id]);
    }
}

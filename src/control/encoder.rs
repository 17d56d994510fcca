//! Rotary encoder handling

use crate::library::{SoundIndex, SoundLibrary};

/// One decoded encoder step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderEvent {
    /// No movement since the last poll
    #[default]
    None,
    /// One detent clockwise
    Clockwise,
    /// One detent counter-clockwise
    CounterClockwise,
}

/// What an encoder step acts on, from the modifier button level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderMode {
    /// Step through the active track's sound library
    Navigate,
    /// Nudge the active track's volume
    Nudge,
}

impl EncoderMode {
    /// Mode for the given modifier level
    pub fn from_modifier(held: bool) -> Self {
        if held {
            EncoderMode::Nudge
        } else {
            EncoderMode::Navigate
        }
    }
}

/// Result of a volume nudge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NudgeOutcome {
    /// Volume moved by the full step
    Applied(f32),
    /// Step would leave `[0, max]`; volume pinned to the bound
    Clamped(f32),
}

impl NudgeOutcome {
    /// Resulting volume
    pub fn value(self) -> f32 {
        match self {
            NudgeOutcome::Applied(v) | NudgeOutcome::Clamped(v) => v,
        }
    }
}

/// Apply one encoder step to a volume
pub fn nudge(volume: f32, event: EncoderEvent, step: f32, max: f32) -> Option<NudgeOutcome> {
    let target = match event {
        EncoderEvent::None => return None,
        EncoderEvent::Clockwise => volume + step,
        EncoderEvent::CounterClockwise => volume - step,
    };
    let clamped = target.clamp(0.0, max);
    if clamped == target {
        Some(NudgeOutcome::Applied(target))
    } else {
        Some(NudgeOutcome::Clamped(clamped))
    }
}

/// Next library position for one encoder step, wrapping at both ends
pub fn navigate(library: &SoundLibrary, current: SoundIndex, event: EncoderEvent) -> SoundIndex {
    match event {
        EncoderEvent::None => current,
        EncoderEvent::Clockwise => library.next(current),
        EncoderEvent::CounterClockwise => library.previous(current),
    }
}

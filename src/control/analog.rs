//! Analog sampling schedule and raw-to-parameter mappings

use std::time::{Duration, Instant};

/// Analog inputs read by the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    /// Master volume knob
    MasterVolume,
    /// Master pitch knob
    MasterPitch,
    /// Filter knob, bound to the active track
    Filter,
}

impl AnalogChannel {
    /// All channels in sampling order
    pub const ALL: [AnalogChannel; 3] = [
        AnalogChannel::MasterVolume,
        AnalogChannel::MasterPitch,
        AnalogChannel::Filter,
    ];
}

/// Fixed-interval sampling schedule
#[derive(Debug, Clone, Copy)]
pub struct AnalogScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AnalogScheduler {
    /// Sample every `interval`, starting with the first poll
    pub fn new(interval: Duration) -> Self {
        AnalogScheduler {
            interval,
            next_due: None,
        }
    }

    /// True when a sample is due at `now`; schedules the next one
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(next) if now < next => false,
            _ => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }
}

/// Map `raw` in `[0, raw_max]` linearly onto `[min, max]`
#[inline]
pub fn map_linear(raw: u16, raw_max: u16, min: f32, max: f32) -> f32 {
    let norm = raw.min(raw_max) as f32 / raw_max as f32;
    min + norm * (max - min)
}

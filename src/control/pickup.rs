//! Value pickup
//!
//! A physical knob bound to a logical parameter only takes over once it has been
//! turned to (near) the parameter's current position. Until then the parameter
//! keeps its value, so switching the knob to another track does not make that
//! track's value jump.

/// Whether the knob drives the parameter yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickupState {
    /// Knob position is ignored until it comes within tolerance
    #[default]
    Uncaptured,
    /// Every reading is mapped straight onto the parameter
    Captured,
}

/// Pickup reconciliation for one knob
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuePickup {
    min: f32,
    max: f32,
    raw_max: u16,
    tolerance: u16,
    state: PickupState,
    last_raw: Option<u16>,
}

impl ValuePickup {
    /// Create an uncaptured pickup for a parameter in `[min, max]`
    pub fn new(min: f32, max: f32, raw_max: u16, tolerance: u16) -> Self {
        ValuePickup {
            min,
            max,
            raw_max,
            tolerance,
            state: PickupState::Uncaptured,
            last_raw: None,
        }
    }

    /// Current state
    pub fn state(&self) -> PickupState {
        self.state
    }

    /// Most recent raw reading
    pub fn last_raw(&self) -> Option<u16> {
        self.last_raw
    }

    /// Back to uncaptured, e.g. after the bound parameter changed
    pub fn reset(&mut self) {
        self.state = PickupState::Uncaptured;
    }

    /// Raw position that corresponds to `value`
    pub fn synthetic_raw(&self, value: f32) -> u16 {
        let span = self.max - self.min;
        let norm = ((value - self.min) / span).clamp(0.0, 1.0);
        (norm * self.raw_max as f32).round() as u16
    }

    /// Logical value for raw reading `raw`
    pub fn value_for(&self, raw: u16) -> f32 {
        let raw = raw.min(self.raw_max);
        self.min + (raw as f32 / self.raw_max as f32) * (self.max - self.min)
    }

    /// Feed one reading; returns the new value once captured
    ///
    /// `current` is the parameter's present value. The reading that captures
    /// the parameter is applied immediately.
    pub fn sample(&mut self, raw: u16, current: f32) -> Option<f32> {
        self.last_raw = Some(raw);
        if self.state == PickupState::Uncaptured {
            let synthetic = self.synthetic_raw(current);
            if raw.abs_diff(synthetic) < self.tolerance {
                log::debug!("Knob captured at raw {} (parameter at {})", raw, synthetic);
                self.state = PickupState::Captured;
            } else {
                return None;
            }
        }
        Some(self.value_for(raw))
    }
}

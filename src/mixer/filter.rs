//! Resonant state-variable filter
//!
//! Chamberlin topology: two integrators produce low, band and high outputs from
//! one input sample. Only the low-pass tap feeds the mix.

/// Default damping of the band integrator
pub const DEFAULT_RESONANCE: f32 = 0.2;

/// Per-track state-variable filter
///
/// State persists across calls and across sound changes on the track. The
/// coefficient is supplied per sample so the control context can sweep it
/// without the filter owning any shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVariableFilter {
    low: f32,
    band: f32,
    high: f32,
    resonance: f32,
}

impl StateVariableFilter {
    /// Create a filter with zeroed state
    pub fn new(resonance: f32) -> Self {
        StateVariableFilter {
            low: 0.0,
            band: 0.0,
            high: 0.0,
            resonance,
        }
    }

    /// Run one sample through the filter and return the low-pass output
    ///
    /// `coefficient` must stay inside `[0.01, 0.99]` (or the configured range);
    /// values approaching 1.0 push the loop towards instability.
    #[inline]
    pub fn process(&mut self, input: f32, coefficient: f32) -> f32 {
        self.low += coefficient * self.band;
        self.high = input - self.low - self.resonance * self.band;
        self.band += coefficient * self.high;

        // A runaway integrator would otherwise poison every later sample
        if !self.low.is_finite() || !self.band.is_finite() {
            self.reset();
        }
        self.low
    }

    /// Low-pass output of the last sample
    pub fn low(&self) -> f32 {
        self.low
    }

    /// Band-pass output of the last sample
    pub fn band(&self) -> f32 {
        self.band
    }

    /// High-pass output of the last sample
    pub fn high(&self) -> f32 {
        self.high
    }

    /// Resonance (band damping) in use
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Zero the integrators
    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
        self.high = 0.0;
    }
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RESONANCE)
    }
}

//! Track-select button debounce

use std::time::{Duration, Instant};

/// Button level as last seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    /// Not pressed
    #[default]
    Released,
    /// Pressed; no further presses until released
    Held,
}

/// Edge-triggered debouncer with a minimum interval between accepted presses
#[derive(Debug, Clone, Copy)]
pub struct ButtonDebouncer {
    state: ButtonState,
    last_accepted: Option<Instant>,
    min_interval: Duration,
}

impl ButtonDebouncer {
    /// Create a released debouncer
    pub fn new(min_interval: Duration) -> Self {
        ButtonDebouncer {
            state: ButtonState::Released,
            last_accepted: None,
            min_interval,
        }
    }

    /// Current state
    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Feed the current level; true when this is an accepted press
    pub fn update(&mut self, pressed: bool, now: Instant) -> bool {
        match (self.state, pressed) {
            (ButtonState::Released, true) => {
                self.state = ButtonState::Held;
                let settled = self
                    .last_accepted
                    .map_or(true, |last| now.saturating_duration_since(last) >= self.min_interval);
                if settled {
                    self.last_accepted = Some(now);
                }
                settled
            }
            (ButtonState::Held, false) => {
                self.state = ButtonState::Released;
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_held_button_counts_once() {
        let t0 = Instant::now();
        let mut b = ButtonDebouncer::new(ms(200));
        assert!(b.update(true, t0));
        assert!(!b.update(true, t0 + ms(500)));
        assert!(!b.update(true, t0 + ms(900)));
        assert_eq!(b.state(), ButtonState::Held);
    }

    #[test]
    fn test_bounce_inside_interval_is_ignored() {
        let t0 = Instant::now();
        let mut b = ButtonDebouncer::new(ms(200));
        assert!(b.update(true, t0));
        assert!(!b.update(false, t0 + ms(5)));
        assert!(!b.update(true, t0 + ms(10)));
        assert!(!b.update(false, t0 + ms(150)));
        assert!(b.update(true, t0 + ms(200)));
    }

    #[test]
    fn test_release_without_press() {
        let mut b = ButtonDebouncer::new(ms(200));
        assert!(!b.update(false, Instant::now()));
        assert_eq!(b.state(), ButtonState::Released);
    }
}

//! Control context
//!
//! Turns encoder steps, button levels and periodic analog readings into
//! parameter store writes. Nothing here touches storage or blocks on the render
//! side; sound changes are only requested.

pub mod analog;
pub mod debounce;
pub mod encoder;
pub mod pickup;

pub use analog::{map_linear, AnalogChannel, AnalogScheduler};
pub use debounce::{ButtonDebouncer, ButtonState};
pub use encoder::{EncoderEvent, EncoderMode, NudgeOutcome};
pub use pickup::{PickupState, ValuePickup};

use crate::config::{ControlConfig, EngineConfig};
use crate::library::{SoundIndex, SoundLibrary, TrackIndex};
use crate::params::ParameterStore;
use crate::{AmbientError, Result};
use bitflags::bitflags;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

bitflags! {
    /// Button levels sampled once per poll
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        /// Encoder modifier: held switches the encoder to volume nudge
        const MODIFIER = 0x01;
        /// Advance the active track
        const TRACK_SELECT = 0x02;
    }
}

/// Physical controls as seen by the control loop
pub trait ControlSurface {
    /// Encoder movement since the previous call
    fn read_encoder(&mut self) -> EncoderEvent;

    /// Current button levels
    fn buttons(&mut self) -> Buttons;

    /// Raw reading of one analog input in `[0, raw_max]`
    fn read_analog(&mut self, channel: AnalogChannel) -> u16;
}

/// Control surface driven from a prepared script
///
/// Encoder events and button levels are consumed one per poll; once a queue
/// runs dry the last button level stays held and the encoder reports no
/// movement. Analog readings hold until changed.
#[derive(Debug, Clone)]
pub struct ScriptedSurface {
    encoder: VecDeque<EncoderEvent>,
    buttons: VecDeque<Buttons>,
    held: Buttons,
    master_volume: u16,
    master_pitch: u16,
    filter: u16,
}

impl ScriptedSurface {
    /// No movement, no buttons, both master knobs fully up and the filter knob at zero
    pub fn idle() -> Self {
        ScriptedSurface {
            encoder: VecDeque::new(),
            buttons: VecDeque::new(),
            held: Buttons::empty(),
            master_volume: crate::config::DEFAULT_RAW_MAX,
            master_pitch: crate::config::DEFAULT_RAW_MAX,
            filter: 0,
        }
    }

    /// Queue encoder events
    pub fn with_encoder(mut self, events: &[EncoderEvent]) -> Self {
        self.encoder.extend(events.iter().copied());
        self
    }

    /// Queue button levels
    pub fn with_buttons(mut self, levels: &[Buttons]) -> Self {
        self.buttons.extend(levels.iter().copied());
        self
    }

    /// Set one analog reading
    pub fn with_analog(mut self, channel: AnalogChannel, raw: u16) -> Self {
        self.set_analog(channel, raw);
        self
    }

    /// Change one analog reading
    pub fn set_analog(&mut self, channel: AnalogChannel, raw: u16) {
        match channel {
            AnalogChannel::MasterVolume => self.master_volume = raw,
            AnalogChannel::MasterPitch => self.master_pitch = raw,
            AnalogChannel::Filter => self.filter = raw,
        }
    }

    /// Queue one encoder event
    pub fn push_encoder(&mut self, event: EncoderEvent) {
        self.encoder.push_back(event);
    }

    /// Queue one button level
    pub fn push_buttons(&mut self, level: Buttons) {
        self.buttons.push_back(level);
    }

    /// True once every queued event has been consumed
    pub fn is_drained(&self) -> bool {
        self.encoder.is_empty() && self.buttons.is_empty()
    }
}

impl ControlSurface for ScriptedSurface {
    fn read_encoder(&mut self) -> EncoderEvent {
        self.encoder.pop_front().unwrap_or_default()
    }

    fn buttons(&mut self) -> Buttons {
        if let Some(level) = self.buttons.pop_front() {
            self.held = level;
        }
        self.held
    }

    fn read_analog(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::MasterVolume => self.master_volume,
            AnalogChannel::MasterPitch => self.master_pitch,
            AnalogChannel::Filter => self.filter,
        }
    }
}

/// What an encoder step did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncoderAction {
    /// Sound selection moved; `requested` is false when the library has a single entry
    Navigated {
        /// Active track
        track: TrackIndex,
        /// New navigation position
        sound: SoundIndex,
        /// Whether a sound change was written to the pending slot
        requested: bool,
    },
    /// Active track volume nudged
    Nudged {
        /// Active track
        track: TrackIndex,
        /// Step result
        outcome: NudgeOutcome,
    },
}

/// Summary of one control poll
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PollSummary {
    /// Encoder action, if the encoder moved
    pub encoder: Option<EncoderAction>,
    /// New active track after an accepted track-select press
    pub track_selected: Option<TrackIndex>,
    /// Whether analog inputs were sampled this poll
    pub analog_sampled: bool,
}

/// Control input processor
///
/// Owns all control-side state: pickup, debounce, the analog schedule and the
/// per-track navigation position.
#[derive(Debug)]
pub struct ControlProcessor {
    params: Arc<ParameterStore>,
    config: ControlConfig,
    libraries: Vec<SoundLibrary>,
    navigation: Vec<SoundIndex>,
    track_select: ButtonDebouncer,
    filter_pickup: ValuePickup,
    analog: AnalogScheduler,
}

impl ControlProcessor {
    /// Build the processor for `config`'s tracks
    pub fn new(config: &EngineConfig, params: Arc<ParameterStore>) -> Result<Self> {
        config.validate()?;
        if params.track_count() != config.tracks.len() {
            return Err(AmbientError::ConfigError(format!(
                "parameter store holds {} tracks, configuration {}",
                params.track_count(),
                config.tracks.len()
            )));
        }

        let mut libraries = Vec::with_capacity(config.tracks.len());
        let mut navigation = Vec::with_capacity(config.tracks.len());
        for track in &config.tracks {
            let library = SoundLibrary::new(&track.name, track.sounds.clone())?;
            navigation.push(library.index(track.initial_sound).unwrap_or(library.first()));
            libraries.push(library);
        }

        let c = config.control;
        Ok(ControlProcessor {
            params,
            config: c,
            libraries,
            navigation,
            track_select: ButtonDebouncer::new(Duration::from_millis(c.debounce_ms)),
            filter_pickup: ValuePickup::new(c.filter_min, c.filter_max, c.raw_max, c.pickup_tolerance),
            analog: AnalogScheduler::new(Duration::from_millis(c.analog_interval_ms)),
        })
    }

    /// Shared parameter store
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Library of `track`
    pub fn library(&self, track: TrackIndex) -> Option<&SoundLibrary> {
        self.libraries.get(track.get())
    }

    /// Navigation position of `track`
    pub fn navigation(&self, track: TrackIndex) -> Option<SoundIndex> {
        self.navigation.get(track.get()).copied()
    }

    /// Filter knob pickup state
    pub fn filter_pickup(&self) -> PickupState {
        self.filter_pickup.state()
    }

    /// Poll every input once
    pub fn poll<C: ControlSurface + ?Sized>(&mut self, now: Instant, surface: &mut C) -> PollSummary {
        let buttons = surface.buttons();
        let mut summary = PollSummary::default();

        if self
            .track_select
            .update(buttons.contains(Buttons::TRACK_SELECT), now)
        {
            summary.track_selected = Some(self.advance_track());
        }

        let event = surface.read_encoder();
        if event != EncoderEvent::None {
            let mode = EncoderMode::from_modifier(buttons.contains(Buttons::MODIFIER));
            summary.encoder = Some(self.handle_encoder(mode, event));
        }

        if self.analog.due(now) {
            self.sample_analog(surface);
            summary.analog_sampled = true;
        }

        summary
    }

    fn advance_track(&mut self) -> TrackIndex {
        let next = self.params.active_track().next(self.libraries.len());
        self.params.set_active_track(next);
        // Filter knob now addresses a different coefficient
        self.filter_pickup.reset();
        log::info!(
            "Active track {} ({})",
            next,
            self.libraries[next.get()].name()
        );
        next
    }

    fn handle_encoder(&mut self, mode: EncoderMode, event: EncoderEvent) -> EncoderAction {
        let track = self.params.active_track();
        match mode {
            EncoderMode::Nudge => {
                let volume = self.params.volume(track);
                // event is never None here
                let outcome = encoder::nudge(volume, event, self.config.nudge_step, self.config.volume_max)
                    .unwrap_or(NudgeOutcome::Applied(volume));
                self.params.set_volume(track, outcome.value());
                if let NudgeOutcome::Clamped(v) = outcome {
                    log::debug!("Track {} volume pinned at {:.3}", track, v);
                }
                EncoderAction::Nudged { track, outcome }
            }
            EncoderMode::Navigate => {
                let library = &self.libraries[track.get()];
                let current = self.navigation[track.get()];
                let sound = encoder::navigate(library, current, event);
                let requested = sound != current;
                if requested {
                    self.navigation[track.get()] = sound;
                    self.params.request_sound_change(track, sound);
                    log::debug!(
                        "Track {}: requested '{}'",
                        track,
                        library.sound(sound)
                    );
                }
                EncoderAction::Navigated {
                    track,
                    sound,
                    requested,
                }
            }
        }
    }

    fn sample_analog<C: ControlSurface + ?Sized>(&mut self, surface: &mut C) {
        let c = &self.config;

        let raw = surface.read_analog(AnalogChannel::MasterVolume);
        self.params
            .set_master_volume(map_linear(raw, c.raw_max, 0.0, 1.0));

        let raw = surface.read_analog(AnalogChannel::MasterPitch);
        self.params
            .set_master_pitch(map_linear(raw, c.raw_max, c.pitch_min, c.pitch_max));

        let track = self.params.active_track();
        let raw = surface.read_analog(AnalogChannel::Filter);
        if let Some(coefficient) = self.filter_pickup.sample(raw, self.params.filter(track)) {
            self.params.set_filter(track, coefficient);
        }
    }
}

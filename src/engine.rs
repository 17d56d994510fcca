//! Engine assembly
//!
//! Wires a [`Renderer`], a [`ControlProcessor`] and a [`StatusReporter`] around one
//! shared [`ParameterStore`]. The two contexts can run on their own threads
//! ([`Engine::spawn`]) or interleaved in one loop ([`Engine::run_single_context`]).

use crate::config::EngineConfig;
use crate::control::{ControlProcessor, ControlSurface};
use crate::library::SoundLibrary;
use crate::mixer::{CycleOutcome, Renderer};
use crate::params::ParameterStore;
use crate::sink::SampleSink;
use crate::status::StatusReporter;
use crate::storage::Storage;
use crate::{AmbientError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Fully initialized engine, not yet running
pub struct Engine<S: Storage> {
    params: Arc<ParameterStore>,
    renderer: Renderer<S>,
    control: ControlProcessor,
    status: StatusReporter,
    poll_delay: Duration,
}

impl<S: Storage> Engine<S> {
    /// Validate `config`, open every track's initial sound and prepare both contexts
    ///
    /// # Errors
    ///
    /// Configuration errors and any failure to open an initial sound. Nothing
    /// runs until this succeeds.
    pub fn new(config: EngineConfig, storage: S) -> Result<Self> {
        config.validate()?;
        let params = Arc::new(ParameterStore::from_config(&config));
        let renderer = Renderer::new(&config, storage, Arc::clone(&params))?;
        let control = ControlProcessor::new(&config, Arc::clone(&params))?;
        let libraries = config
            .tracks
            .iter()
            .map(|t| SoundLibrary::new(&t.name, t.sounds.clone()))
            .collect::<Result<Vec<_>>>()?;
        let status = StatusReporter::new(
            libraries,
            Duration::from_millis(config.control.status_interval_ms),
        );

        log::info!(
            "Engine ready: {} tracks, {} samples per block, base rate {} Hz",
            config.tracks.len(),
            config.render.block_samples,
            config.render.base_rate
        );

        Ok(Engine {
            params,
            renderer,
            control,
            status,
            poll_delay: Duration::from_millis(config.control.poll_delay_ms),
        })
    }

    /// Shared parameter store
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Render side
    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }

    /// Control side
    pub fn control(&self) -> &ControlProcessor {
        &self.control
    }

    /// One control poll followed by one render cycle
    pub fn step<C, K>(&mut self, now: Instant, surface: &mut C, sink: &mut K) -> Result<CycleOutcome>
    where
        C: ControlSurface + ?Sized,
        K: SampleSink + ?Sized,
    {
        self.control.poll(now, surface);
        self.status.tick(now, &self.params);
        self.renderer.render_cycle(sink)
    }

    /// Interleave control and render in the calling thread until `running` clears
    ///
    /// For targets with a single execution context.
    pub fn run_single_context<C, K>(
        &mut self,
        surface: &mut C,
        sink: &mut K,
        running: &AtomicBool,
    ) -> Result<()>
    where
        C: ControlSurface + ?Sized,
        K: SampleSink + ?Sized,
    {
        while running.load(Ordering::Relaxed) {
            self.step(Instant::now(), surface, sink)?;
        }
        Ok(())
    }
}

impl<S: Storage + 'static> Engine<S> {
    /// Start control and render on two threads
    ///
    /// The threads share nothing but the parameter store and the running flag.
    pub fn spawn<C, K>(self, surface: C, sink: K) -> Result<EngineHandle<C, K>>
    where
        C: ControlSurface + Send + 'static,
        K: SampleSink + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let Engine {
            params,
            mut renderer,
            mut control,
            mut status,
            poll_delay,
        } = self;

        let render = {
            let running = Arc::clone(&running);
            let mut sink = sink;
            std::thread::Builder::new()
                .name("render".into())
                .spawn(move || -> Result<K> {
                    while running.load(Ordering::Relaxed) {
                        if renderer.render_cycle(&mut sink)? == CycleOutcome::Skipped {
                            std::thread::yield_now();
                        }
                    }
                    Ok(sink)
                })?
        };

        let control_thread = {
            let running = Arc::clone(&running);
            let params = Arc::clone(&params);
            let mut surface = surface;
            std::thread::Builder::new()
                .name("control".into())
                .spawn(move || -> C {
                    while running.load(Ordering::Relaxed) {
                        let now = Instant::now();
                        control.poll(now, &mut surface);
                        status.tick(now, &params);
                        std::thread::sleep(poll_delay);
                    }
                    surface
                })?
        };

        log::info!("Engine running");
        Ok(EngineHandle {
            running,
            params,
            control: control_thread,
            render,
        })
    }
}

/// Handle to a running engine
pub struct EngineHandle<C, K> {
    running: Arc<AtomicBool>,
    params: Arc<ParameterStore>,
    control: JoinHandle<C>,
    render: JoinHandle<Result<K>>,
}

impl<C, K> EngineHandle<C, K> {
    /// Shared parameter store, e.g. for a host-side UI
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// True while neither context has stopped
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && !self.control.is_finished()
            && !self.render.is_finished()
    }

    /// Stop both contexts and hand back the surface and sink
    ///
    /// # Errors
    ///
    /// A sink failure that stopped the render thread, or a panic in either thread.
    pub fn shutdown(self) -> Result<(C, K)> {
        self.running.store(false, Ordering::Relaxed);
        let surface = self
            .control
            .join()
            .map_err(|_| AmbientError::Other("control thread panicked".into()))?;
        let sink = self
            .render
            .join()
            .map_err(|_| AmbientError::Other("render thread panicked".into()))??;
        log::info!("Engine stopped");
        Ok((surface, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use crate::control::{EncoderEvent, ScriptedSurface};
    use crate::library::TrackIndex;
    use crate::mixer::test_support::wav_bytes;
    use crate::sink::MemorySink;
    use crate::storage::MemoryStorage;

    fn setup() -> (EngineConfig, MemoryStorage) {
        let mut config = EngineConfig::reference();
        config.tracks = vec![
            TrackConfig::new("Water", &["rain.wav", "surf.wav"]),
            TrackConfig::new("Air", &["wind.wav"]),
        ];
        let storage = MemoryStorage::new()
            .with_file("rain.wav", wav_bytes(&[1000; 2048]))
            .with_file("surf.wav", wav_bytes(&[-1000; 2048]))
            .with_file("wind.wav", wav_bytes(&[500; 2048]));
        (config, storage)
    }

    #[test]
    fn test_missing_initial_sound_is_fatal() {
        let (config, storage) = setup();
        let storage = {
            let mut s = storage;
            s.remove("wind.wav");
            s
        };
        assert!(matches!(
            Engine::new(config, storage),
            Err(AmbientError::OpenFailed { .. })
        ));
    }

    #[test]
    fn test_step_routes_encoder_to_render() {
        let (config, storage) = setup();
        let mut engine = Engine::new(config, storage).unwrap();
        let mut surface = ScriptedSurface::idle().with_encoder(&[EncoderEvent::Clockwise]);
        let mut sink = MemorySink::new();
        let t0 = Instant::now();

        let outcome = engine.step(t0, &mut surface, &mut sink).unwrap();
        assert_eq!(outcome, CycleOutcome::Rendered { frames: 256 });
        let water = TrackIndex::new(0);
        assert_eq!(engine.renderer().current_sound(water), Some("surf.wav"));
        assert_eq!(engine.params().selected_sound(water), 1);
        assert_eq!(engine.params().pending_sound_change(water), None);
    }

    #[test]
    fn test_single_context_stops_on_flag() {
        let (config, storage) = setup();
        let mut engine = Engine::new(config, storage).unwrap();
        let running = AtomicBool::new(false);
        let mut sink = MemorySink::new();
        engine
            .run_single_context(&mut ScriptedSurface::idle(), &mut sink, &running)
            .unwrap();
        assert!(sink.frames().is_empty());
    }
}

//! Command-line front end for the ambient mixer.
//!
//! `render` mixes the configured tracks offline into a WAV file, `inspect` dumps
//! a WAV header as the engine sees it, and `play` (feature `streaming`) drives
//! the default audio device in real time.

use ambient_mixer::container::parse_header;
use ambient_mixer::export::render_to_wav;
use ambient_mixer::library::TrackIndex;
use ambient_mixer::{EngineConfig, FsStorage, ParameterStore, Renderer};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Consecutive skipped cycles tolerated by an offline render
const MAX_CONSECUTIVE_SKIPS: u32 = 64;

#[derive(Parser)]
#[command(name = "ambient-mixer")]
#[command(about = "Mix looping ambient sound tracks")]
struct Cli {
    /// JSON engine configuration (reference layout when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the sound files
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Park forever instead of exiting when startup fails
    #[arg(long, global = true)]
    halt_on_error: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the mix offline into a WAV file
    Render {
        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Length of the render in seconds
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f32,

        #[command(flatten)]
        knobs: Knobs,
    },
    /// Print the header of a WAV file
    Inspect {
        /// File to inspect
        file: PathBuf,
    },
    /// Play the mix on the default audio device
    #[cfg(feature = "streaming")]
    Play {
        /// Stop after this many seconds (runs until killed when omitted)
        #[arg(short, long)]
        seconds: Option<f32>,

        #[command(flatten)]
        knobs: Knobs,
    },
}

/// Control positions applied before the mix starts
#[derive(Args, Debug, Clone)]
struct Knobs {
    /// Master volume in [0, 1]
    #[arg(long, default_value_t = 1.0)]
    master_volume: f32,

    /// Master pitch ratio
    #[arg(long, default_value_t = 1.0)]
    pitch: f32,

    /// Per-track volume, in track order
    #[arg(long, value_delimiter = ',')]
    volume: Vec<f32>,

    /// Per-track filter coefficient, in track order
    #[arg(long, value_delimiter = ',')]
    filter: Vec<f32>,

    /// Per-track initial sound index, in track order
    #[arg(long, value_delimiter = ',')]
    sound: Vec<usize>,
}

impl Knobs {
    /// Fold per-track positions into the startup configuration
    fn apply_to(&self, config: &mut EngineConfig) -> Result<()> {
        let tracks = config.tracks.len();
        for (name, given) in [
            ("volume", self.volume.len()),
            ("filter", self.filter.len()),
            ("sound", self.sound.len()),
        ] {
            if given > tracks {
                bail!("--{name} lists {given} values but only {tracks} tracks are configured");
            }
        }
        for (track, &v) in config.tracks.iter_mut().zip(&self.volume) {
            track.volume = v;
        }
        for (track, &f) in config.tracks.iter_mut().zip(&self.filter) {
            track.filter = f;
        }
        for (track, &s) in config.tracks.iter_mut().zip(&self.sound) {
            track.initial_sound = s;
        }
        config.validate()?;
        Ok(())
    }

    fn apply_masters(&self, params: &ParameterStore, config: &EngineConfig) {
        let c = &config.control;
        params.set_master_volume(self.master_volume.clamp(0.0, 1.0));
        params.set_master_pitch(self.pitch.clamp(c.pitch_min, c.pitch_max));
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(EngineConfig::reference()),
    }
}

fn render(cli: &Cli, output: &PathBuf, seconds: f32, knobs: &Knobs) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    knobs.apply_to(&mut config)?;

    let params = Arc::new(ParameterStore::from_config(&config));
    knobs.apply_masters(&params, &config);
    let mut renderer = Renderer::new(&config, FsStorage::new(&cli.root), Arc::clone(&params))
        .context("opening initial sounds")?;

    for i in 0..renderer.track_count() {
        let track = TrackIndex::new(i);
        log::info!(
            "Track {} ({}): '{}'",
            track,
            config.tracks[i].name,
            renderer.current_sound(track).unwrap_or("-")
        );
    }

    // A WAV header has one rate, so pitch is baked in here
    let rate = (config.render.base_rate as f32 * params.master_pitch()).round() as u32;
    let frames = (seconds.max(0.0) * rate as f32) as u64;
    let written = render_to_wav(&mut renderer, output, rate, frames, MAX_CONSECUTIVE_SKIPS)?;
    println!(
        "Wrote {} frames ({:.1}s at {} Hz) to {}",
        written,
        written as f32 / rate as f32,
        rate,
        output.display()
    );
    Ok(())
}

fn inspect(file: &PathBuf) -> Result<()> {
    let mut reader = std::fs::File::open(file)
        .with_context(|| format!("opening {}", file.display()))?;
    let header = parse_header(&mut reader)?;

    println!("File:            {}", file.display());
    println!("Payload offset:  {}", header.payload_start);
    println!("Payload length:  {} bytes", header.payload_length);
    match header.format {
        Some(fmt) => {
            println!(
                "Format:          {}",
                fmt.format()
                    .map(|f| format!("{f:?}"))
                    .unwrap_or_else(|| format!("unknown (0x{:04X})", fmt.format_code))
            );
            println!("Channels:        {}", fmt.channels);
            println!("Sample rate:     {} Hz", fmt.sample_rate);
            println!("Byte rate:       {}", fmt.byte_rate);
            println!("Block align:     {}", fmt.block_align);
            println!("Bits per sample: {}", fmt.bits_per_sample);
        }
        None => println!("Format:          (no fmt chunk)"),
    }
    match header.ensure_renderable() {
        Ok(()) => println!("Renderable:      yes"),
        Err(e) => println!("Renderable:      no ({e})"),
    }
    Ok(())
}

#[cfg(feature = "streaming")]
fn play(cli: &Cli, seconds: Option<f32>, knobs: &Knobs) -> Result<()> {
    use ambient_mixer::control::{AnalogChannel, ScriptedSurface};
    use ambient_mixer::streaming::{StreamConfig, StreamingSink};
    use ambient_mixer::Engine;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    let mut config = load_config(cli.config.as_ref())?;
    knobs.apply_to(&mut config)?;
    let c = config.control;
    let base_rate = config.render.base_rate;

    let mut engine = Engine::new(config, FsStorage::new(&cli.root))
        .context("opening initial sounds")?;
    let mut sink = StreamingSink::open(StreamConfig::stable(base_rate))?;

    // Hold the master knobs where the arguments put them
    let raw = |v: f32| (v.clamp(0.0, 1.0) * c.raw_max as f32).round() as u16;
    let pitch_norm = (knobs.pitch - c.pitch_min) / (c.pitch_max - c.pitch_min);
    let mut surface = ScriptedSurface::idle()
        .with_analog(AnalogChannel::MasterVolume, raw(knobs.master_volume))
        .with_analog(AnalogChannel::MasterPitch, raw(pitch_norm));

    let running = Arc::new(AtomicBool::new(true));
    if let Some(seconds) = seconds {
        let running = Arc::clone(&running);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs_f32(seconds.max(0.0)));
            running.store(false, Ordering::Relaxed);
        });
    }

    engine.run_single_context(&mut surface, &mut sink, &running)?;
    sink.device().finish();
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Render {
            output,
            seconds,
            knobs,
        } => render(cli, output, *seconds, knobs),
        Command::Inspect { file } => inspect(file),
        #[cfg(feature = "streaming")]
        Command::Play { seconds, knobs } => play(cli, *seconds, knobs),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        log::error!("{err:#}");
        if cli.halt_on_error {
            log::error!("Halted");
            loop {
                std::thread::park();
            }
        }
        return Err(err);
    }
    Ok(())
}

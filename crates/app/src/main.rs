mod synth;

use std::{path::Path, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use futures::executor::block_on;
use slotdeck_core::{
    register_builtin_scenes, AppConfig, AudioEngine, AudioFeatureExtractor, Compositor,
    FrameClock, FramePacer, SceneCatalog, SceneManager,
};
use tracing_subscriber::EnvFilter;

use crate::synth::BeatSynth;

fn main() -> slotdeck_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            frames,
            seconds_per_frame,
            switch_every,
        } => run(RunOptions {
            config,
            frames,
            seconds_per_frame,
            switch_every,
        }),
        Commands::Scenes => list_scenes(),
        Commands::CheckConfig { path } => check_config(&path),
        Commands::DefaultConfig => {
            println!("{}", AppConfig::default().to_json_string()?);
            Ok(())
        }
    }
}

struct RunOptions {
    config: Option<PathBuf>,
    frames: u32,
    seconds_per_frame: Option<f32>,
    switch_every: Option<u32>,
}

fn run(options: RunOptions) -> slotdeck_core::Result<()> {
    let config = match &options.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let delta = options
        .seconds_per_frame
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(1.0 / config.render.fps as f32);
    tracing::info!(frames = options.frames, delta, "starting headless run");

    let mut manager = SceneManager::from_config(Arc::new(builtin_catalog()), &config);
    block_on(manager.initialize(config.slots.clone()))?;
    if config.current_slot != 0 && !manager.switch_to(config.current_slot) {
        tracing::warn!(slot = config.current_slot, "configured start slot is unavailable");
    }
    block_on(manager.settle());

    let audio = AudioEngine::new(config.audio.clone());
    let analysis = audio.start()?;
    let mut synth = BeatSynth::new(audio.sample_rate(), 120.0);
    let mut extractor = AudioFeatureExtractor::new(config.audio.sensitivity);
    let mut compositor = Compositor::from_config(config.render.surface_size(), &config.visual);
    let mut clock = FrameClock::new();
    let mut pacer = FramePacer::new(config.render.fps as f32);

    let block_len = ((audio.sample_rate() as f32 * delta).round() as usize).max(1);
    let mut spectrum = Vec::with_capacity(analysis.bin_count()?);
    let mut rendered = 0u32;
    let mut switches = 0u32;
    let mut luma_total = 0.0f64;

    for index in 0..options.frames {
        audio.push_samples(&synth.next_block(block_len))?;
        analysis.spectrum_into(&mut spectrum)?;
        let frame = extractor.update(&spectrum);

        if let Some(every) = options.switch_every.filter(|n| *n > 0) {
            if index > 0 && index % every == 0 && manager.switch_to_next_available(false) {
                switches += 1;
                tracing::info!(frame = index, "switching to next slot");
            }
        }

        let time = clock.tick(delta);
        manager.update(&frame, time);
        compositor.update_effects(&frame, time.delta);

        if pacer.should_render(time.delta) {
            let image = compositor.render(&mut manager);
            luma_total += mean_luma(image.pixels());
            rendered += 1;
        }
    }

    tracing::info!(
        rendered,
        switches,
        current = manager.current_slot(),
        scene = manager
            .slot(manager.current_slot())
            .map(|slot| slot.name().to_string())
            .unwrap_or_default(),
        mean_luma = luma_total / rendered.max(1) as f64,
        "run finished"
    );
    manager.dispose_all();
    Ok(())
}

fn list_scenes() -> slotdeck_core::Result<()> {
    for name in builtin_catalog().names() {
        println!("{name}");
    }
    Ok(())
}

fn check_config(path: &Path) -> slotdeck_core::Result<()> {
    let config = load_config(path)?;
    let catalog = builtin_catalog();
    for (index, name) in config.slots.iter().enumerate() {
        if !slotdeck_core::scene::is_empty_scene(name) && !catalog.is_registered(name) {
            tracing::warn!(slot = index, scene = %name, "slot names an unknown scene");
        }
    }
    println!("{}: ok", path.display());
    Ok(())
}

fn load_config(path: &Path) -> slotdeck_core::Result<AppConfig> {
    tracing::info!(?path, "loading settings");
    let json = std::fs::read_to_string(path)?;
    AppConfig::from_json_str(&json)
}

fn builtin_catalog() -> SceneCatalog {
    let mut catalog = SceneCatalog::new();
    register_builtin_scenes(&mut catalog);
    catalog
}

fn mean_luma(pixels: &[u8]) -> f64 {
    let count = pixels.len() / 4;
    if count == 0 {
        return 0.0;
    }
    let sum: f64 = pixels
        .chunks_exact(4)
        .map(|px| 0.2126 * px[0] as f64 + 0.7152 * px[1] as f64 + 0.0722 * px[2] as f64)
        .sum();
    sum / count as f64
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Five-slot audio reactive scene deck", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the deck headlessly from a synthesized beat.
    Run {
        /// Settings file to load instead of the defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of host-loop ticks to run.
        #[arg(long, default_value_t = 600)]
        frames: u32,
        /// Host-loop tick length; defaults to one render frame.
        #[arg(long)]
        seconds_per_frame: Option<f32>,
        /// Request a switch to the next non-empty slot every N ticks.
        #[arg(long)]
        switch_every: Option<u32>,
    },
    /// List the scenes the deck can load.
    Scenes,
    /// Validate a settings file.
    CheckConfig {
        /// Path to the JSON settings file.
        path: PathBuf,
    },
    /// Print the default settings as JSON.
    DefaultConfig,
}

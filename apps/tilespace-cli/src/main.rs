mod demo;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tilespace_kernel::{Engine, EngineConfig, Headless};
use tilespace_loader::load_file;
use tilespace_object::AcceptAll;

#[derive(Parser)]
#[command(name = "tilespace-cli", about = "CLI tool for tilespace levels and the engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Parse a level file and print what it contains
    Inspect {
        /// Path to the level file
        map: PathBuf,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run the engine headless for a number of frames
    Run {
        /// YAML engine config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Map to load, overriding the config's initial map
        #[arg(short, long)]
        map: Option<String>,
        /// Frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// Simulated frame time in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tilespace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", tilespace_common::crate_info());
            println!("pool: {}", tilespace_pool::crate_info());
            println!("object: {}", tilespace_object::crate_info());
            println!("world: {}", tilespace_world::crate_info());
            println!("loader: {}", tilespace_loader::crate_info());
            println!("kernel: {}", tilespace_kernel::crate_info());
        }
        Commands::Inspect { map, json } => inspect(&map, json)?,
        Commands::Run {
            config,
            map,
            frames,
            frame_ms,
        } => run(config.as_deref(), map, frames, frame_ms)?,
    }

    Ok(())
}

fn inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let level = load_file(path, &AcceptAll)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if json {
        let layers: Vec<_> = level
            .layers
            .iter()
            .map(|layer| {
                serde_json::json!({
                    "width": layer.width(),
                    "height": layer.height(),
                    "solid": layer.solid_count(),
                    "segments": layer.segments().len(),
                    "blocks": layer.blocks().len(),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "map": path.display().to_string(),
            "fingerprint": level.fingerprint(),
            "layers": layers,
            "objects": level.objects,
            "stats": level.stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Level: {}", path.display());
    println!("Fingerprint: {}", level.fingerprint());
    for (i, layer) in level.layers.iter().enumerate() {
        println!(
            "Layer {i}: {}x{}, solid={}, segments={}, blocks={}",
            layer.width(),
            layer.height(),
            layer.solid_count(),
            layer.segments().len(),
            layer.blocks().len()
        );
    }
    for object in &level.objects {
        println!(
            "Object {}: pos=({:.2}, {:.2}) size=({:.2}, {:.2}) params={}",
            object.type_name,
            object.args.position.x,
            object.args.position.y,
            object.args.size.x,
            object.args.size.y,
            object.params.len()
        );
    }
    let stats = level.stats;
    println!(
        "Skipped: objects={}, layers={}, properties={}; truncated={}, overflowing tiles={}",
        stats.skipped_objects,
        stats.skipped_layers,
        stats.dropped_properties,
        stats.truncated_values,
        stats.overflowing_tiles
    );
    Ok(())
}

fn run(config: Option<&Path>, map: Option<String>, frames: u64, frame_ms: u64) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if map.is_some() {
        config.initial_map = map;
    }

    let mut engine = demo::install(Engine::builder(config)).build()?;
    let mut platform =
        Headless::fixed(Duration::from_millis(frame_ms)).with_frame_limit(frames);
    engine.run(&mut platform);

    println!(
        "Ran {} frames: ticks={}, map={}, objects={}, sprites drawn={}",
        engine.frame_count(),
        engine.tick(),
        engine.map_name().unwrap_or("-"),
        engine.object_count(),
        platform.sprites_presented()
    );
    Ok(())
}

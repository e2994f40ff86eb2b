//! Replays a captured clientbound packet stream into a world mirror.
//!
//! Run with: `cargo run -p quarry-replay -- session.cap`

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use quarry_config::{CliArgs, Config, default_config_dir};
use quarry_world::{EventChannel, World, WorldPacketHandler};
use tracing::{error, info, warn};

use quarry_replay::capture::FrameConfig;
use quarry_replay::replay::{self, ReplayError, registry_from_config, spawn_event_consumer};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Load config from the chosen directory, falling back to defaults.
    let config_dir = args.config.clone().or_else(default_config_dir);
    let mut config = match &config_dir {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config
        .log
        .log_dir
        .clone()
        .or_else(|| config_dir.as_ref().map(|d| d.join("logs")));
    quarry_log::init_logging(log_dir.as_deref(), config.log.json_file, Some(&config));

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Replay failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs, config: &Config) -> Result<(), ReplayError> {
    config.validate()?;

    let file = File::open(&args.capture).map_err(|source| ReplayError::Open {
        path: args.capture.clone(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let (channel, events) = EventChannel::bounded(config.replay.event_queue_capacity);
    let channel = Arc::new(channel);
    let world = Arc::new(World::with_listener(channel.clone()));
    let dimensions = Arc::new(registry_from_config(&config.world));
    let handler = WorldPacketHandler::new(world, dimensions);
    let consumer = spawn_event_consumer(events)?;

    info!(
        "Replaying {} starting in {}",
        args.capture.display(),
        config.world.initial_dimension
    );
    let frame_config = FrameConfig {
        max_payload_size: u32::try_from(config.replay.max_frame_size).unwrap_or(u32::MAX),
    };
    let result = replay::replay(
        &mut reader,
        &handler,
        &frame_config,
        config.replay.stop_on_error,
    );

    let loaded = handler.world().loaded_count();
    // Dropping the handler drops the world and with it the channel's last
    // sender, which ends the consumer.
    drop(handler);
    let dropped = channel.dropped();
    drop(channel);
    let tally = match consumer.join() {
        Ok(tally) => tally,
        Err(_) => {
            warn!("Event consumer panicked");
            Default::default()
        }
    };

    let summary = result?;
    info!(
        "Frames: {} | handled: {} | ignored: {} | failed: {}",
        summary.frames, summary.handled, summary.ignored, summary.failed
    );
    info!(
        "Loaded columns: {} | events: {} (loaded {}, unloaded {}, voxel {}, batch {}) | dropped events: {}",
        loaded,
        tally.total(),
        tally.columns_loaded,
        tally.columns_unloaded,
        tally.voxels_changed,
        tally.batch_voxels_changed,
        dropped
    );
    Ok(())
}

//! Command-line argument parsing for the replay tool.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Replays a captured packet stream into a client-side world mirror.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "quarry-replay", about = "Replay a captured packet stream")]
pub struct CliArgs {
    /// Capture file of length-prefixed packet frames.
    pub capture: PathBuf,

    /// Log filter (error, warn, info, debug, trace, or RUST_LOG syntax).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory for the JSON log file.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Write a JSON log file (requires a log directory).
    #[arg(long)]
    pub json_log: bool,

    /// Dimension active before the first spawn packet.
    #[arg(long)]
    pub dimension: Option<String>,

    /// Largest accepted frame in bytes.
    #[arg(long)]
    pub max_frame_size: Option<usize>,

    /// Abort on the first packet that fails to apply.
    #[arg(long)]
    pub stop_on_error: bool,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref level) = args.log_level {
            self.log.level = level.clone();
        }
        if let Some(ref dir) = args.log_dir {
            self.log.log_dir = Some(dir.clone());
        }
        if args.json_log {
            self.log.json_file = true;
        }
        if let Some(ref dimension) = args.dimension {
            self.world.initial_dimension = dimension.clone();
        }
        if let Some(size) = args.max_frame_size {
            self.replay.max_frame_size = size;
        }
        if args.stop_on_error {
            self.replay.stop_on_error = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::parse_from([
            "quarry-replay",
            "session.cap",
            "--dimension",
            "minecraft:the_end",
            "--max-frame-size",
            "65536",
            "--stop-on-error",
        ]);
        config.apply_cli_overrides(&args);
        assert_eq!(args.capture, PathBuf::from("session.cap"));
        assert_eq!(config.world.initial_dimension, "minecraft:the_end");
        assert_eq!(config.replay.max_frame_size, 65536);
        assert!(config.replay.stop_on_error);
        // Non-overridden fields retain defaults
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json_file);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        let args = CliArgs::parse_from(["quarry-replay", "session.cap"]);
        config.apply_cli_overrides(&args);
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_requires_capture() {
        assert!(CliArgs::try_parse_from(["quarry-replay"]).is_err());
    }
}

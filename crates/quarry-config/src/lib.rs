//! Configuration for the Quarry tools.
//!
//! Settings persist to disk as `config.ron`, can be hot-reloaded, and are
//! overridden by command-line arguments parsed with clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, Config, DimensionEntry, LogConfig, ReplayConfig, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;

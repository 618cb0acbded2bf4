//! Command-line configuration.

use clap::Parser;
use std::path::PathBuf;

/// Bundle every runtime dependency of an AppDir into the AppDir itself.
///
/// The staging directory must already contain the application: a top-level
/// desktop entry and the executable it points at. Everything the
/// executable (and whatever it pulls in) needs at load time is copied in
/// next to it and relocated.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Config {
    /// Path to the AppDir staging directory.
    pub appdir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

//! Entry point for the appdir-deploy bundler.
//!
//! Simple flow: parse args → discover the AppDir → deploy into it.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use appdir_deploy::appdir::AppDir;
use appdir_deploy::config::Config;
use appdir_deploy::deploy;

fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let appdir = AppDir::new(&config.appdir)?;
    info!("Deploying {}", appdir.path.display());
    deploy::deploy(&appdir)?;
    info!("Deployed {} successfully", appdir.path.display());
    Ok(())
}

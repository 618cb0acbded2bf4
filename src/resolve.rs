//! Library name resolution.
//!
//! Emulates the host dynamic linker's search just closely enough for
//! bundling: a fixed list of well-known system directories plus
//! LD_LIBRARY_PATH, extended by every directory the closure discovers.
//! Requester RPATHs are merged into the shared directory list instead of
//! being applied per requester, and /etc/ld.so.cache is not consulted.
//! Both choices make the search more permissive than ld.so, never less: a
//! library the real linker could load is always found.

use anyhow::{bail, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::context::DeployContext;
use crate::paths;

/// Directories ld.so searches by default, plus the ld.so.conf.d entries of
/// a stock Ubuntu install.
const DEFAULT_LIBRARY_DIRS: [&str; 11] = [
    "/usr/lib64",
    "/lib64",
    "/usr/lib",
    "/lib",
    "/usr/lib/x86_64-linux-gnu/libfakeroot",
    "/usr/local/lib",
    "/usr/local/lib/x86_64-linux-gnu",
    "/lib/x86_64-linux-gnu",
    "/usr/lib/x86_64-linux-gnu",
    "/lib32",
    "/usr/lib32",
];

/// Seeds the search directories once per run: the defaults in order, then
/// the non-empty components of LD_LIBRARY_PATH.
pub fn seed_library_dirs(ctx: &mut DeployContext) {
    if !ctx.mark_seeded() {
        return;
    }
    for dir in DEFAULT_LIBRARY_DIRS {
        ctx.push_library_dir(PathBuf::from(dir));
    }
    if let Ok(ld_library_path) = env::var("LD_LIBRARY_PATH") {
        for component in ld_library_path.split(':').filter(|c| !c.is_empty()) {
            ctx.push_library_dir(paths::normalize(Path::new(component)));
        }
    }
}

/// Resolves a bare library name to the first `<dir>/<name>` that exists,
/// searching the directories in insertion order.
pub fn find_library(ctx: &mut DeployContext, name: &str) -> Result<PathBuf> {
    seed_library_dirs(ctx);
    for dir in ctx.library_dirs() {
        let candidate = dir.join(name);
        if candidate.exists() {
            debug!("Resolved {} to {}", name, candidate.display());
            return Ok(candidate);
        }
    }
    bail!("did not find library {name} in any search directory")
}

//! Origin-relative relocation.
//!
//! Every object in the closure ends up inside the AppDir at the mirror of
//! its host path, and its embedded search path is rewritten so each known
//! library directory is reachable relative to the object itself. The
//! mirror layout is what makes this possible: the relative position of any
//! two bundled objects equals their relative position on the host.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::appdir::AppDir;
use crate::context::DeployContext;
use crate::fsutil;
use crate::inspect;
use crate::paths;

/// The library directories as they appear inside the AppDir: every host
/// directory mapped to its mirror, directories already inside kept as-is,
/// insertion-ordered and deduplicated.
pub fn library_dirs_in_appdir(ctx: &DeployContext, appdir: &AppDir) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in ctx.library_dirs() {
        let mapped = if appdir.contains(dir) {
            dir.clone()
        } else {
            appdir.mirror(dir)
        };
        if !dirs.contains(&mapped) {
            dirs.push(mapped);
        }
    }
    dirs
}

/// The `:`-joined `$ORIGIN`-relative search path for an object bundled at
/// `bundled`, covering every mapped library directory. The token is
/// emitted literally; the dynamic linker expands it at load time.
pub fn relocation_string(bundled: &Path, dirs_in_appdir: &[PathBuf]) -> String {
    let origin = bundled.parent().unwrap_or(Path::new("/"));
    let tokens: Vec<String> = dirs_in_appdir
        .iter()
        .map(|dir| format!("$ORIGIN/{}", paths::relative_from(origin, dir).display()))
        .collect();
    tokens.join(":")
}

/// Copies every host-external object into the AppDir mirror and rewrites
/// the embedded search path of every bundled object.
pub fn relocate_objects(ctx: &DeployContext, appdir: &AppDir) -> Result<()> {
    info!("Copying in and patching binary objects not already in the AppDir...");
    let dirs = library_dirs_in_appdir(ctx, appdir);
    for obj in ctx.objects() {
        if !appdir.contains(obj) {
            let bundled = appdir.mirror(obj);
            if !bundled.exists() {
                fsutil::copy_file(obj, &bundled)
                    .with_context(|| format!("could not bundle {}", obj.display()))?;
            }
        }
        patch_search_path(appdir, &dirs, obj)?;
    }
    Ok(())
}

/// Rewrites one object's search path inside the AppDir. The loader keeps
/// its own untouched: its search path is supplied by the launcher
/// invocation, and origin-relative entries would be meaningless there.
fn patch_search_path(appdir: &AppDir, dirs_in_appdir: &[PathBuf], obj: &Path) -> Result<()> {
    let bundled = if appdir.contains(obj) {
        obj.to_path_buf()
    } else {
        appdir.mirror(obj)
    };

    if bundled
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with("ld-linux"))
    {
        debug!("Not rewriting the search path of {}", bundled.display());
        return Ok(());
    }
    if !bundled.exists() {
        return Ok(());
    }
    if !inspect::is_dynamic_object(&bundled)? {
        debug!(
            "{} is not dynamically linked, nothing to rewrite",
            bundled.display()
        );
        return Ok(());
    }

    let joined = relocation_string(&bundled, dirs_in_appdir);
    inspect::write_embedded_search_path(&bundled, &joined)
}

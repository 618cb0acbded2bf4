//! Dynamic loader bundling.
//!
//! The bundle ships its own copy of ld-linux so it can run on hosts older
//! than the build system. The copy gets its hard-wired `/usr` prefix
//! rewritten to `/xxx`: both strings have the same length, which keeps
//! every file offset inside the live binary intact, and the bogus prefix
//! makes the loader fail loudly instead of quietly reaching into the host.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::appdir::AppDir;
use crate::fsutil;
use crate::inspect;

/// Copies the interpreter of the main executable into the AppDir (unless a
/// copy is already bundled) and neutralizes its default library prefix.
/// Returns the interpreter's host path; a statically linked main
/// executable has none and gets no loader.
pub fn bundle_loader(appdir: &AppDir) -> Result<Option<PathBuf>> {
    if !inspect::has_interpreter(&appdir.main_executable)? {
        info!(
            "No interpreter recorded in {}, not bundling a loader",
            appdir.main_executable.display()
        );
        return Ok(None);
    }
    info!("Patching ld-linux...");
    let ld_linux = PathBuf::from(inspect::interpreter(&appdir.main_executable)?);
    let bundled = appdir.mirror(&ld_linux);

    if !bundled.exists() {
        let source = resolve_link_once(&ld_linux)?;
        fsutil::copy_file(&source, &bundled)
            .with_context(|| format!("could not copy {}", ld_linux.display()))?;
    }

    fsutil::patch_file(&bundled, b"/usr", b"/xxx")
        .with_context(|| format!("could not patch {}", bundled.display()))?;
    Ok(Some(ld_linux))
}

/// Follows a symlink one level; a relative target resolves against the
/// link's own directory.
fn resolve_link_once(path: &Path) -> Result<PathBuf> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("could not find the loader at {}", path.display()))?;
    if !metadata.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }
    let target = fs::read_link(path)
        .with_context(|| format!("could not resolve the loader link {}", path.display()))?;
    if target.is_absolute() {
        Ok(target)
    } else {
        Ok(path.parent().unwrap_or(Path::new("/")).join(target))
    }
}

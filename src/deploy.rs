//! Deployment orchestration.
//!
//! The sequencing mirrors how the bundle is consumed at run time: first
//! the closure over the staged tree, then the auxiliary trees that closure
//! reveals, then the loader, the launcher, and finally the relocation pass
//! that freezes every object's search path.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::appdir::AppDir;
use crate::apprun;
use crate::auxiliary;
use crate::closure;
use crate::context::DeployContext;
use crate::copyright::CopyrightIndex;
use crate::fsutil;
use crate::loader;
use crate::relocate;

/// Makes the AppDir self-contained: every object the staged tree needs at
/// load time ends up inside it, relocated relative to itself.
pub fn deploy(appdir: &AppDir) -> Result<()> {
    let mut ctx = DeployContext::new();

    info!("Gathering all required libraries for the AppDir...");
    closure::discover_tree(&mut ctx, &appdir.path)?;

    auxiliary::bundle_gdk_pixbuf(&mut ctx, appdir)?;
    auxiliary::bundle_gstreamer(&mut ctx)?;
    auxiliary::bundle_gtk(&mut ctx, appdir, 3)?;
    auxiliary::bundle_gtk(&mut ctx, appdir, 2)?;

    loader::bundle_loader(appdir)?;

    auxiliary::bundle_gconv(&mut ctx)?;
    auxiliary::compile_glib_schemas(appdir)?;
    auxiliary::link_fontconfig(appdir)?;
    auxiliary::patch_ui_paths(appdir)?;

    apprun::write_app_run(appdir)?;

    if let Some(version) = auxiliary::detected_qt_version(&ctx) {
        auxiliary::bundle_qt(&mut ctx, version)?;
    }

    for dir in ctx.library_dirs() {
        debug!("Library directory: {}", dir.display());
    }
    for dir in relocate::library_dirs_in_appdir(&ctx, appdir) {
        debug!("Library directory in AppDir: {}", dir.display());
    }
    for obj in ctx.objects() {
        debug!("Bundling: {}", obj.display());
    }

    relocate::relocate_objects(&ctx, appdir)?;

    bundle_copyright_files(&ctx, appdir);
    Ok(())
}

/// Mirrors the copyright file of every bundled host library into the
/// AppDir. Hosts without dpkg, and files no package owns, are skipped.
fn bundle_copyright_files(ctx: &DeployContext, appdir: &AppDir) {
    info!("Copying in copyright files...");
    let mut index = CopyrightIndex::new();
    for obj in ctx.objects() {
        if appdir.contains(obj) {
            continue;
        }
        match index.lookup(obj) {
            Ok(copyright) => {
                if let Err(err) = fsutil::copy_file(&copyright, &appdir.mirror(&copyright)) {
                    warn!("Could not bundle {}: {err:#}", copyright.display());
                }
            }
            Err(err) => debug!("No copyright metadata for {}: {err:#}", obj.display()),
        }
    }
}

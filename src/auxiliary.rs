//! Auxiliary-tree bundling.
//!
//! Some libraries only work together with companion data or plugin trees
//! that the dependency closure cannot see: pixbuf loaders, GStreamer
//! plugins, Gtk theme data, Qt platform plugins, gconv converters. The
//! presence of a marker library in the closure triggers the matching
//! ingest, and every ingest ends in another closure pass so the new trees'
//! own dependencies get bundled too.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::appdir::AppDir;
use crate::closure;
use crate::context::DeployContext;
use crate::fsutil;
use crate::inspect;
use crate::resolve;

/// Known locations of gst-plugin-scanner. There is no stable way to derive
/// this; every distribution places it somewhere else.
const GST_PLUGIN_SCANNER_CANDIDATES: [&str; 2] = [
    "/usr/libexec/gstreamer-1.0/gst-plugin-scanner",
    "/usr/lib/x86_64-linux-gnu/gstreamer1.0/gstreamer-1.0/gst-plugin-scanner",
];

/// Bundles the Gdk pixbuf loader trees when the closure pulled in a
/// libgdk_pixbuf, and strips the absolute loader directory from the
/// mirrored loaders.cache so the launcher can point GDK_PIXBUF_MODULE_FILE
/// at it.
pub fn bundle_gdk_pixbuf(ctx: &mut DeployContext, appdir: &AppDir) -> Result<()> {
    if !ctx.has_object_with_prefix("libgdk_pixbuf") {
        return Ok(());
    }
    info!("Determining Gdk pixbuf loaders (for GDK_PIXBUF_MODULEDIR and GDK_PIXBUF_MODULE_FILE)...");
    let locations = ctx
        .find_with_prefix("gdk-pixbuf")
        .context("could not find the Gdk pixbuf loaders")?;
    for location in locations {
        closure::discover_tree(ctx, &location)?;

        let caches = fsutil::files_with_suffix(&location, "loaders.cache");
        let Some(cache) = caches.first() else {
            bail!("no loaders.cache under {}", location.display());
        };
        let bundled_cache = appdir.mirror(cache);
        fsutil::copy_file(cache, &bundled_cache)
            .with_context(|| format!("could not copy {}", cache.display()))?;

        let loaders = fsutil::files_with_suffix(&location, "libpixbufloader-png.so");
        let Some(png_loader) = loaders.first() else {
            bail!("no libpixbufloader-png.so under {}", location.display());
        };
        let Some(loader_dir) = png_loader.parent() else {
            bail!("{} has no containing directory", png_loader.display());
        };

        // The patched cache must carry bare loader names, no paths.
        let prefix = format!("{}/", loader_dir.display());
        info!("Patching {}, removing {}", bundled_cache.display(), prefix);
        fsutil::patch_file(&bundled_cache, prefix.as_bytes(), b"")
            .with_context(|| format!("could not patch {}", bundled_cache.display()))?;
    }
    Ok(())
}

/// Bundles the GStreamer 1.0 plugin tree and the out-of-process plugin
/// scanner it spawns at startup.
pub fn bundle_gstreamer(ctx: &mut DeployContext) -> Result<()> {
    if !ctx.has_object_with_prefix("libgstreamer-1.0") {
        return Ok(());
    }
    info!("Bundling GStreamer 1.0 directory (for GST_PLUGIN_PATH)...");
    let locations = ctx
        .find_with_prefix("gstreamer-1.0")
        .context("could not find the GStreamer 1.0 directory")?;
    info!("Bundling dependencies of GStreamer 1.0 directory...");
    closure::discover_tree(ctx, &locations[0])?;

    for candidate in GST_PLUGIN_SCANNER_CANDIDATES {
        let candidate = Path::new(candidate);
        if candidate.exists() {
            info!("Determining gst-plugin-scanner...");
            closure::discover_tree(ctx, candidate)?;
            break;
        }
    }
    Ok(())
}

/// Bundles the Gtk module tree of the given major version, together with
/// the Default theme the launcher selects via GTK_THEME.
pub fn bundle_gtk(ctx: &mut DeployContext, appdir: &AppDir, version: u32) -> Result<()> {
    if !ctx.has_object_with_prefix(&format!("libgtk-{version}")) {
        return Ok(());
    }
    info!("Bundling Gtk {version} directory (for GTK_EXE_PREFIX)...");
    let locations = ctx
        .find_with_prefix(&format!("gtk-{version}"))
        .with_context(|| format!("could not find the Gtk {version} directory"))?;
    for location in locations {
        info!("Bundling dependencies of Gtk {version} directory...");
        closure::discover_tree(ctx, &location)?;

        info!("Bundling Default theme for Gtk {version} (for GTK_THEME=Default)...");
        let theme = PathBuf::from(format!("/usr/share/themes/Default/gtk-{version}.0"));
        fsutil::copy_tree(&theme, &appdir.mirror(&theme))
            .with_context(|| format!("could not copy {}", theme.display()))?;
    }
    Ok(())
}

/// Bundles the gconv character-set converters the bundled libc loads at
/// run time. A host without a gconv directory is tolerated.
pub fn bundle_gconv(ctx: &mut DeployContext) -> Result<()> {
    info!("Determining gconv (for GCONV_PATH)...");
    if let Some(locations) = ctx.find_with_prefix("gconv") {
        closure::discover_tree(ctx, &locations[0])?;
    }
    Ok(())
}

/// Compiles bundled GSettings schemas so the GSETTINGS_SCHEMA_DIR the
/// launcher exports actually works.
pub fn compile_glib_schemas(appdir: &AppDir) -> Result<()> {
    let schemas = appdir.path.join("usr/share/glib-2.0/schemas");
    if !schemas.exists() {
        return Ok(());
    }
    info!("Compiling glib-2.0 schemas...");
    let status = Command::new("glib-compile-schemas")
        .arg(".")
        .current_dir(&schemas)
        .status()
        .context("failed to run glib-compile-schemas")?;
    if !status.success() {
        bail!("glib-compile-schemas failed in {}", schemas.display());
    }
    Ok(())
}

/// Points the bundle at the host fontconfig configuration unless it ships
/// its own.
pub fn link_fontconfig(appdir: &AppDir) -> Result<()> {
    let fonts_dir = appdir.path.join("etc/fonts");
    if fonts_dir.exists() {
        return Ok(());
    }
    info!("Adding fontconfig symlink...");
    fs::create_dir_all(&fonts_dir)
        .with_context(|| format!("failed to create {}", fonts_dir.display()))?;
    let link = fonts_dir.join("fonts.conf");
    std::os::unix::fs::symlink("/etc/fonts/fonts.conf", &link)
        .with_context(|| format!("failed to link {}", link.display()))?;
    Ok(())
}

/// Gtk builder `.ui` files are loaded from paths baked into the binary.
/// Rewriting `/usr` to `././` makes those paths relative, and the launcher
/// changes into `usr/` before exec so they resolve.
pub fn patch_ui_paths(appdir: &AppDir) -> Result<()> {
    let ui_files = fsutil::files_with_suffix(&appdir.path, ".ui");
    if ui_files.is_empty() {
        return Ok(());
    }
    info!("Gtk .ui files found, making the main binary load them from a relative path");
    for ui_file in &ui_files {
        debug!("Interface file: {}", ui_file.display());
    }
    fsutil::patch_file(&appdir.main_executable, b"/usr", b"././").with_context(|| {
        format!("could not patch {}", appdir.main_executable.display())
    })?;
    Ok(())
}

/// Qt major version detection over the closure. When both versions are
/// present the Qt 4 answer wins, matching the historical behavior.
pub fn detected_qt_version(ctx: &DeployContext) -> Option<u32> {
    let mut version = None;
    if ctx.has_object_named("libQt5Core.so.5") {
        info!("Detected Qt 5");
        version = Some(5);
    }
    if ctx.has_object_named("libQtCore.so.4") {
        info!("Detected Qt 4");
        version = Some(4);
    }
    version
}

/// Bundles the Qt platform plugin for the detected version. The plugin
/// tree location is baked into the core library as `qt_prfxpath`. Qt 4 is
/// recognized but has no ingest.
pub fn bundle_qt(ctx: &mut DeployContext, version: u32) -> Result<()> {
    if version < 5 {
        info!("Qt {version} detected, no platform plugin ingest for this version");
        return Ok(());
    }
    let core = resolve::find_library(ctx, "libQt5Core.so.5")
        .context("could not find libQt5Core.so.5")?;
    let prefix = inspect::read_qt_prefix(&core)?;
    info!("Looking in {prefix}/plugins");

    let platform_plugin = PathBuf::from(&prefix).join("plugins/platforms/libqxcb.so");
    if !platform_plugin.exists() {
        bail!("no Qt platform plugin at {}", platform_plugin.display());
    }
    closure::discover_tree(ctx, &platform_plugin)?;
    Ok(())
}

//! Transitive dependency closure.
//!
//! Walks a staging tree for binary objects and chases their NEEDED entries
//! through the resolver until nothing new turns up. The object set only
//! grows and the host holds finitely many files, so the walk terminates;
//! the membership test before each recursion breaks dependency cycles.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::context::DeployContext;
use crate::inspect;
use crate::paths;
use crate::resolve;

/// Discovers every binary object under `root` (a directory, or a single
/// file taken as-is), registers each one, then expands its dependencies.
pub fn discover_tree(ctx: &mut DeployContext, root: &Path) -> Result<()> {
    debug!("Scanning {} for binary objects", root.display());
    let found = find_binary_objects(root)?;
    for path in &found {
        register_object(ctx, path)?;
    }
    for path in &found {
        expand_dependencies(ctx, path)?;
    }
    debug!(
        "Closure now holds {} objects across {} library directories",
        ctx.objects().len(),
        ctx.library_dirs().len()
    );
    Ok(())
}

fn find_binary_objects(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && inspect::is_binary_object(entry.path()) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Adds one object to the closure: the object itself, its containing
/// directory, and its pre-existing embedded search-path entries (with
/// `$ORIGIN` substituted by the containing directory) all become state.
pub fn register_object(ctx: &mut DeployContext, path: &Path) -> Result<()> {
    let search_path = inspect::embedded_search_path(path)
        .with_context(|| format!("could not determine the search path of {}", path.display()))?;
    let origin = path.parent().unwrap_or(Path::new("/"));
    for entry in search_path {
        let dir = paths::normalize(&substitute_origin(&entry, origin));
        if ctx.push_library_dir(dir.clone()) {
            debug!("Added {} to the library search directories", dir.display());
        }
    }
    ctx.push_library_dir(paths::normalize(origin));
    ctx.push_object(path.to_path_buf());
    Ok(())
}

/// `$ORIGIN` is a textual macro here: ingested search-path entries refer to
/// the directory holding the object they came from.
fn substitute_origin(entry: &str, origin: &Path) -> PathBuf {
    PathBuf::from(entry.replace("$ORIGIN", &origin.to_string_lossy()))
}

/// Resolves every imported library of `obj` that is not part of the
/// closure yet, registers it, and recurses into its own imports.
pub fn expand_dependencies(ctx: &mut DeployContext, obj: &Path) -> Result<()> {
    let imported = inspect::imported_libraries(obj)
        .with_context(|| format!("could not read the dependencies of {}", obj.display()))?;
    for name in imported {
        let resolved = resolve::find_library(ctx, &name)
            .with_context(|| format!("unresolved dependency {} of {}", name, obj.display()))?;
        if ctx.contains_object(&resolved) {
            continue;
        }
        register_object(ctx, &resolved)?;
        expand_dependencies(ctx, &resolved)?;
    }
    Ok(())
}

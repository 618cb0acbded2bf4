//! AppDir discovery.
//!
//! An AppDir is a staging directory holding at least one top-level desktop
//! entry and the executable that entry points at, laid out like a Unix
//! filesystem root underneath.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fsutil;

/// A validated AppDir staging directory.
#[derive(Debug, Clone)]
pub struct AppDir {
    /// Canonicalized root of the staging directory.
    pub path: PathBuf,
    /// The executable the first desktop entry points at.
    pub main_executable: PathBuf,
}

impl AppDir {
    pub fn new(path: &Path) -> Result<Self> {
        let path = fs::canonicalize(path)
            .with_context(|| format!("AppDir {} is not accessible", path.display()))?;
        if !path.is_dir() {
            bail!("AppDir {} is not a directory", path.display());
        }

        let desktop_files = top_level_desktop_files(&path)?;
        let Some(desktop_file) = desktop_files.first() else {
            bail!("no desktop entry at the top level of {}", path.display());
        };
        debug!("Using desktop entry {}", desktop_file.display());

        let exec_name = exec_entry(desktop_file)?;
        let main_executable = locate_executable(&path, &exec_name).with_context(|| {
            format!(
                "could not locate the executable {exec_name} inside {}",
                path.display()
            )
        })?;
        debug!("Main executable is {}", main_executable.display());

        Ok(Self {
            path,
            main_executable,
        })
    }

    /// Maps a host path to its mirrored location inside the AppDir: the
    /// full host path is reproduced as a subtree beneath the root.
    pub fn mirror(&self, host: &Path) -> PathBuf {
        match host.strip_prefix("/") {
            Ok(relative) => self.path.join(relative),
            Err(_) => self.path.join(host),
        }
    }

    /// True for paths that already live inside the AppDir.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

fn top_level_desktop_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("failed to list {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "desktop"))
        .collect();
    found.sort();
    Ok(found)
}

/// The program name of the first `Exec=` line: the first word of the
/// value, stripped of any leading path.
fn exec_entry(desktop_file: &Path) -> Result<String> {
    let contents = fs::read_to_string(desktop_file)
        .with_context(|| format!("failed to read {}", desktop_file.display()))?;
    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("Exec=") {
            let Some(word) = value.split_whitespace().next() else {
                continue;
            };
            let name = word.rsplit('/').next().unwrap_or(word);
            return Ok(name.to_string());
        }
    }
    bail!("no Exec entry in {}", desktop_file.display())
}

/// Looks for the executable in the usual bin directories first, then
/// anywhere in the tree.
fn locate_executable(root: &Path, name: &str) -> Option<PathBuf> {
    for dir in ["usr/bin", "bin", "usr/sbin", "usr/games"] {
        let candidate = root.join(dir).join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    fsutil::files_with_suffix(root, name)
        .into_iter()
        .find(|path| path.file_name().is_some_and(|file| file == name))
}

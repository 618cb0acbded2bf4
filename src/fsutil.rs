//! Filesystem helpers shared by the bundling passes.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copies `src` to `dst`, creating parent directories. Permission bits come
/// along with the copy.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Recursively copies the directory tree at `src` into `dst`. Symbolic
/// links are recreated as links, not followed.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        let target = dst.join(entry.path().strip_prefix(src)?);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .with_context(|| format!("failed to read link {}", entry.path().display()))?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            std::os::unix::fs::symlink(&link, &target)
                .with_context(|| format!("failed to link {}", target.display()))?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Every file under `root` whose name ends with `suffix`, in walk order.
pub fn files_with_suffix(root: &Path, suffix: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(suffix))
        .map(|entry| entry.into_path())
        .collect()
}

/// The entries of `dir` whose names start with `prefix`, sorted. An
/// unreadable directory simply has no matches.
pub fn entries_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .collect();
    found.sort();
    found
}

/// Replaces every occurrence of `search` with `replace` in the file at
/// `path`. The patched content is staged next to the original and renamed
/// over it, keeping the original permission bits.
pub fn patch_file(path: &Path, search: &[u8], replace: &[u8]) -> Result<()> {
    let permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    let input = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let output = replace_all(&input, search, replace);

    let staged = PathBuf::from(format!("{}.patched", path.display()));
    fs::write(&staged, output)
        .with_context(|| format!("failed to write {}", staged.display()))?;
    fs::set_permissions(&staged, permissions)
        .with_context(|| format!("failed to set permissions on {}", staged.display()))?;
    fs::rename(&staged, path)
        .with_context(|| format!("failed to rename {} over {}", staged.display(), path.display()))?;
    Ok(())
}

fn replace_all(input: &[u8], search: &[u8], replace: &[u8]) -> Vec<u8> {
    if search.is_empty() {
        return input.to_vec();
    }
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i..].starts_with(search) {
            out.extend_from_slice(replace);
            i += search.len();
        } else {
            out.push(input[i]);
            i += 1;
        }
    }
    out
}

//! Lexical path helpers.
//!
//! Relocation math works on host paths mirrored into the AppDir, so both
//! normalization and relative-path computation must stay purely lexical:
//! no symlink resolution, no filesystem access.

use std::path::{Component, Path, PathBuf};

/// Collapses `.` components and resolves `..` against preceding components.
/// A `..` directly under the root is dropped; a leading `..` in a relative
/// path is kept. An empty result becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// The path of `target` relative to the directory `base`. Both paths must
/// be absolute and normalized. Yields `.` when they are equal.
pub fn relative_from(base: &Path, target: &Path) -> PathBuf {
    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();
    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for component in &target_parts[common..] {
        out.push(component.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dot_and_dotdot() {
        assert_eq!(normalize(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/./b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn relative_from_walks_up_and_down() {
        assert_eq!(
            relative_from(Path::new("/app/usr/lib"), Path::new("/app/usr/lib")),
            PathBuf::from(".")
        );
        assert_eq!(
            relative_from(Path::new("/app/usr/lib"), Path::new("/app/usr/lib/gconv")),
            PathBuf::from("gconv")
        );
        assert_eq!(
            relative_from(Path::new("/app/usr/bin"), Path::new("/app/lib64")),
            PathBuf::from("../../lib64")
        );
        assert_eq!(
            relative_from(
                Path::new("/app/usr/lib/x86_64-linux-gnu"),
                Path::new("/app/usr/lib")
            ),
            PathBuf::from("..")
        );
    }
}

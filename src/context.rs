//! Per-run deployment state.
//!
//! Everything the closure accumulates lives here: the ordered set of binary
//! objects to bundle and the ordered set of host directories consulted for
//! library resolution. Threading one value through the passes leaves a host
//! process free to run several deployments without bleed-through.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::fsutil;

/// Mutable state for one deployment run.
///
/// Both sets preserve insertion order, so diagnostics and the generated
/// search paths come out deterministic, and deduplicate by absolute path.
/// They only ever grow.
#[derive(Debug, Default)]
pub struct DeployContext {
    objects: Vec<PathBuf>,
    object_set: HashSet<PathBuf>,
    library_dirs: Vec<PathBuf>,
    library_dir_set: HashSet<PathBuf>,
    seeded: bool,
}

impl DeployContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binary object; returns false if it was already present.
    pub fn push_object(&mut self, path: PathBuf) -> bool {
        if !self.object_set.insert(path.clone()) {
            return false;
        }
        self.objects.push(path);
        true
    }

    pub fn contains_object(&self, path: &Path) -> bool {
        self.object_set.contains(path)
    }

    /// Adds a library search directory; returns false if it was already
    /// present.
    pub fn push_library_dir(&mut self, dir: PathBuf) -> bool {
        if !self.library_dir_set.insert(dir.clone()) {
            return false;
        }
        self.library_dirs.push(dir);
        true
    }

    /// The bundled objects, in insertion order.
    pub fn objects(&self) -> &[PathBuf] {
        &self.objects
    }

    /// The library search directories, in insertion order.
    pub fn library_dirs(&self) -> &[PathBuf] {
        &self.library_dirs
    }

    /// Marks the directory list as seeded; returns true the first time.
    pub fn mark_seeded(&mut self) -> bool {
        !std::mem::replace(&mut self.seeded, true)
    }

    /// True when the closure contains an object with this exact file name.
    pub fn has_object_named(&self, name: &str) -> bool {
        self.objects
            .iter()
            .any(|path| path.file_name().is_some_and(|file| file == name))
    }

    /// True when the closure contains an object whose file name starts with
    /// `prefix`.
    pub fn has_object_with_prefix(&self, prefix: &str) -> bool {
        self.objects.iter().any(|path| {
            path.file_name()
                .is_some_and(|file| file.to_string_lossy().starts_with(prefix))
        })
    }

    /// Files or directories whose names start with `prefix`, searching the
    /// library directories in insertion order and returning the matches
    /// from the first directory that has any.
    pub fn find_with_prefix(&self, prefix: &str) -> Option<Vec<PathBuf>> {
        for dir in &self.library_dirs {
            let found = fsutil::entries_with_prefix(dir, prefix);
            if !found.is_empty() {
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sets_deduplicate_and_keep_insertion_order() {
        let mut ctx = DeployContext::new();
        assert!(ctx.push_object(PathBuf::from("/lib/liba.so")));
        assert!(ctx.push_object(PathBuf::from("/lib/libb.so")));
        assert!(!ctx.push_object(PathBuf::from("/lib/liba.so")));
        assert_eq!(
            ctx.objects(),
            [PathBuf::from("/lib/liba.so"), PathBuf::from("/lib/libb.so")]
        );

        assert!(ctx.push_library_dir(PathBuf::from("/lib")));
        assert!(!ctx.push_library_dir(PathBuf::from("/lib")));
        assert_eq!(ctx.library_dirs(), [PathBuf::from("/lib")]);
    }

    #[test]
    fn object_name_queries() {
        let mut ctx = DeployContext::new();
        ctx.push_object(PathBuf::from("/usr/lib/libQt5Core.so.5"));
        assert!(ctx.has_object_named("libQt5Core.so.5"));
        assert!(!ctx.has_object_named("libQtCore.so.4"));
        assert!(ctx.has_object_with_prefix("libQt5"));
        assert!(!ctx.has_object_with_prefix("libgtk-3"));
    }

    #[test]
    fn seeding_happens_once() {
        let mut ctx = DeployContext::new();
        assert!(ctx.mark_seeded());
        assert!(!ctx.mark_seeded());
    }

    #[test]
    fn find_with_prefix_stops_at_the_first_directory_with_matches() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        fs::create_dir_all(first.join("gtk-3.0")).unwrap();
        fs::create_dir_all(second.join("gtk-3.0")).unwrap();
        fs::create_dir_all(second.join("gconv")).unwrap();

        let mut ctx = DeployContext::new();
        ctx.push_library_dir(tmp.path().join("empty"));
        ctx.push_library_dir(first.clone());
        ctx.push_library_dir(second.clone());

        assert_eq!(
            ctx.find_with_prefix("gtk-3"),
            Some(vec![first.join("gtk-3.0")])
        );
        assert_eq!(ctx.find_with_prefix("gconv"), Some(vec![second.join("gconv")]));
        assert_eq!(ctx.find_with_prefix("gstreamer"), None);
    }
}

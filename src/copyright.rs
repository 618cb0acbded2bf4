//! Copyright-file lookup through the host package manager.
//!
//! Bundled host libraries carry their Debian copyright files along when
//! the metadata is available. Every failure here is non-fatal: on non-dpkg
//! systems, or for files no package owns, the bundle simply ships without
//! that file.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Lazily populated package → copyright-file index, cached for the run so
/// each package is queried at most once.
#[derive(Debug, Default)]
pub struct CopyrightIndex {
    cache: HashMap<String, PathBuf>,
}

impl CopyrightIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The copyright file of the package owning `path`, if the host
    /// package manager knows one.
    pub fn lookup(&mut self, path: &Path) -> Result<PathBuf> {
        let package = owning_package(path)?;
        if let Some(cached) = self.cache.get(&package) {
            return Ok(cached.clone());
        }
        let copyright = copyright_file_of(&package)?;
        debug!("Copyright file of {}: {}", package, copyright.display());
        self.cache.insert(package, copyright.clone());
        Ok(copyright)
    }
}

fn owning_package(path: &Path) -> Result<String> {
    let output = Command::new("dpkg")
        .arg("-S")
        .arg(path)
        .output()
        .context("dpkg is not available")?;
    if !output.status.success() {
        bail!("{} does not belong to any package", path.display());
    }
    parse_owning_package(&String::from_utf8_lossy(&output.stdout))
}

/// `dpkg -S` answers `package[:arch]: /path`; the package identity is
/// everything before the first colon.
fn parse_owning_package(output: &str) -> Result<String> {
    let line = output.lines().next().unwrap_or("");
    match line.split(':').next() {
        Some(package) if !package.trim().is_empty() => Ok(package.trim().to_string()),
        _ => bail!("could not parse a package name out of {output:?}"),
    }
}

fn copyright_file_of(package: &str) -> Result<PathBuf> {
    let output = Command::new("dpkg-query")
        .arg("-L")
        .arg(package)
        .output()
        .context("dpkg-query is not available")?;
    if !output.status.success() {
        bail!("dpkg-query -L {package} failed");
    }
    parse_copyright_listing(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("no copyright file recorded for {package}"))
}

/// The last listed path under usr/share/doc that names a copyright file.
fn parse_copyright_listing(listing: &str) -> Option<PathBuf> {
    listing
        .lines()
        .filter(|line| line.contains("usr/share/doc") && line.contains("copyright"))
        .last()
        .map(|line| PathBuf::from(line.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_stops_at_the_first_colon() {
        assert_eq!(
            parse_owning_package("libc6:amd64: /lib/x86_64-linux-gnu/libc.so.6\n").unwrap(),
            "libc6"
        );
        assert_eq!(parse_owning_package("zlib1g: /usr/lib/libz.so.1\n").unwrap(), "zlib1g");
        assert!(parse_owning_package("").is_err());
    }

    #[test]
    fn the_last_copyright_line_wins() {
        let listing = "/usr\n\
                       /usr/share/doc/libc6\n\
                       /usr/share/doc/libc6/copyright\n\
                       /usr/share/doc/libc6-extra/copyright\n\
                       /usr/lib/libc.so.6\n";
        assert_eq!(
            parse_copyright_listing(listing),
            Some(PathBuf::from("/usr/share/doc/libc6-extra/copyright"))
        );
        assert_eq!(parse_copyright_listing("/usr/lib/libz.so.1\n"), None);
    }
}

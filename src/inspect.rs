//! Binary object inspection.
//!
//! Identification and dependency extraction happen in-process with the
//! `object` crate. Mutating an object's search path and querying its
//! interpreter are delegated to `patchelf`, which owns the actual ELF
//! rewriting; it is treated as a black-box mutator here.

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use object::elf;
use object::read::elf::{Dyn, FileHeader, ProgramHeader, SectionHeader};
use object::read::FileKind;
use object::Endianness;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;

/// The four magic bytes at offset 0 of every ELF object.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// True when the file starts with the ELF magic. Unreadable or short files
/// are simply not binary objects.
pub fn is_binary_object(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    match File::open(path).and_then(|mut file| file.read_exact(&mut magic)) {
        Ok(()) => magic == ELF_MAGIC,
        Err(_) => false,
    }
}

/// The object's direct NEEDED entries, in file order.
pub fn imported_libraries(path: &Path) -> Result<Vec<String>> {
    Ok(dynamic_info(path)?.needed)
}

/// The object's recorded RPATH/RUNPATH entries, split on `:` and trimmed,
/// with any `$ORIGIN` token preserved verbatim. An object without the
/// attribute yields an empty list.
pub fn embedded_search_path(path: &Path) -> Result<Vec<String>> {
    Ok(dynamic_info(path)?.search_path)
}

/// True when the object carries a dynamic section at all. Statically
/// linked executables have none and no search path to speak of.
pub fn is_dynamic_object(path: &Path) -> Result<bool> {
    Ok(dynamic_info(path)?.is_dynamic)
}

/// True when the object records an interpreter in its program headers.
pub fn has_interpreter(path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("failed to map {}", path.display()))?;
    let data = &*mmap;
    match FileKind::parse(data)
        .with_context(|| format!("failed to identify {}", path.display()))?
    {
        FileKind::Elf32 => parse_interp::<elf::FileHeader32<Endianness>>(data),
        FileKind::Elf64 => parse_interp::<elf::FileHeader64<Endianness>>(data),
        other => bail!("{} is not an ELF object ({:?})", path.display(), other),
    }
    .with_context(|| format!("failed to read the program headers of {}", path.display()))
}

fn parse_interp<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> Result<bool> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let segments = header.program_headers(endian, data)?;
    Ok(segments
        .iter()
        .any(|segment| segment.p_type(endian) == elf::PT_INTERP))
}

/// Overwrites the object's RPATH/RUNPATH with the given `:`-joined string,
/// creating the attribute if absent.
pub fn write_embedded_search_path(path: &Path, joined: &str) -> Result<()> {
    patchelf(&[OsStr::new("--set-rpath"), OsStr::new(joined), path.as_os_str()])
        .with_context(|| format!("failed to rewrite the search path of {}", path.display()))?;
    Ok(())
}

/// The PT_INTERP path recorded in the executable.
pub fn interpreter(path: &Path) -> Result<String> {
    patchelf(&[OsStr::new("--print-interpreter"), path.as_os_str()])
        .with_context(|| format!("failed to read the interpreter of {}", path.display()))
}

/// Extracts the `qt_prfxpath=` record baked into a Qt core library: the
/// bytes between the marker and the next NUL, trimmed.
pub fn read_qt_prefix(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("failed to map {}", path.display()))?;
    let data = &*mmap;

    let marker = b"qt_prfxpath=";
    let start = find_bytes(data, marker)
        .with_context(|| format!("no qt_prfxpath record in {}", path.display()))?
        + marker.len();
    let end = data[start..]
        .iter()
        .position(|&byte| byte == 0)
        .map(|nul| start + nul)
        .unwrap_or(data.len());

    let prefix = String::from_utf8_lossy(&data[start..end]).trim().to_string();
    if prefix.is_empty() {
        bail!("empty qt_prfxpath record in {}", path.display());
    }
    Ok(prefix)
}

/// Offset of the first occurrence of `needle` within `haystack`.
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[derive(Debug, Default)]
struct DynamicInfo {
    needed: Vec<String>,
    search_path: Vec<String>,
    is_dynamic: bool,
}

fn dynamic_info(path: &Path) -> Result<DynamicInfo> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("failed to map {}", path.display()))?;
    let data = &*mmap;
    match FileKind::parse(data)
        .with_context(|| format!("failed to identify {}", path.display()))?
    {
        FileKind::Elf32 => parse_dynamic::<elf::FileHeader32<Endianness>>(data),
        FileKind::Elf64 => parse_dynamic::<elf::FileHeader64<Endianness>>(data),
        other => bail!("{} is not an ELF object ({:?})", path.display(), other),
    }
    .with_context(|| format!("failed to read the dynamic section of {}", path.display()))
}

fn parse_dynamic<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> Result<DynamicInfo> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;

    let mut info = DynamicInfo::default();
    let mut rpath = None;
    let mut runpath = None;
    for section in sections.iter() {
        let Some((entries, link)) = section.dynamic(endian, data)? else {
            continue;
        };
        info.is_dynamic = true;
        let strings = sections.strings(endian, data, link)?;
        for entry in entries {
            match entry.tag32(endian) {
                Some(elf::DT_NULL) => break,
                Some(elf::DT_NEEDED) => {
                    let name = entry.string(endian, strings)?;
                    info.needed.push(String::from_utf8_lossy(name).into_owned());
                }
                Some(elf::DT_RPATH) => rpath = Some(entry.string(endian, strings)?),
                Some(elf::DT_RUNPATH) => runpath = Some(entry.string(endian, strings)?),
                _ => {}
            }
        }
    }

    // ld.so honors DT_RUNPATH over DT_RPATH when both are present.
    if let Some(raw) = runpath.or(rpath) {
        let raw = String::from_utf8_lossy(raw);
        info.search_path = raw
            .split(':')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect();
    }
    Ok(info)
}

/// Runs patchelf with the given arguments; any nonzero exit is an error.
fn patchelf(args: &[&OsStr]) -> Result<String> {
    let output = Command::new("patchelf")
        .args(args)
        .output()
        .context("failed to run patchelf (is it on the PATH?)")?;
    if !output.status.success() {
        bail!(
            "patchelf {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn elf_magic_identifies_binary_objects() {
        let tmp = TempDir::new().unwrap();
        let object = tmp.path().join("object");
        fs::write(&object, [0x7f, b'E', b'L', b'F', 0, 0]).unwrap();
        assert!(is_binary_object(&object));

        let script = tmp.path().join("script");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        assert!(!is_binary_object(&script));

        let short = tmp.path().join("short");
        fs::write(&short, [0x7f, b'E']).unwrap();
        assert!(!is_binary_object(&short));

        assert!(!is_binary_object(&tmp.path().join("missing")));
    }

    #[test]
    fn find_bytes_locates_the_first_occurrence() {
        assert_eq!(find_bytes(b"aabcabc", b"abc"), Some(1));
        assert_eq!(find_bytes(b"abc", b"abcd"), None);
        assert_eq!(find_bytes(b"abc", b""), Some(0));
    }

    #[test]
    fn qt_prefix_is_the_bytes_up_to_the_nul() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join("libQt5Core.so.5");
        fs::write(&library, b"noise qt_prfxpath=/opt/qt5\0noise").unwrap();
        assert_eq!(read_qt_prefix(&library).unwrap(), "/opt/qt5");
    }

    #[test]
    fn empty_or_missing_qt_prefix_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        fs::write(&empty, b"qt_prfxpath=\0").unwrap();
        assert!(read_qt_prefix(&empty).is_err());

        let absent = tmp.path().join("absent");
        fs::write(&absent, b"no marker here").unwrap();
        assert!(read_qt_prefix(&absent).is_err());
    }
}

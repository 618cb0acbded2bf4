//! Builders for the minimal ELF objects used across the integration tests.

use object::elf;
use object::endian::{Endianness, U16, U32, U64};
use object::pod::bytes_of;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn u16v(v: u16) -> U16<Endianness> {
    U16::new(Endianness::Little, v)
}
fn u32v(v: u32) -> U32<Endianness> {
    U32::new(Endianness::Little, v)
}
fn u64v(v: u64) -> U64<Endianness> {
    U64::new(Endianness::Little, v)
}

const EHDR_SIZE: usize = 64;
const SHDR_SIZE: usize = 64;
const DYN_SIZE: usize = 16;

fn file_header(shoff: u64, shnum: u16, shstrndx: u16) -> elf::FileHeader64<Endianness> {
    elf::FileHeader64 {
        e_ident: elf::Ident {
            magic: elf::ELFMAG,
            class: elf::ELFCLASS64,
            data: elf::ELFDATA2LSB,
            version: elf::EV_CURRENT,
            os_abi: elf::ELFOSABI_SYSV,
            abi_version: 0,
            padding: [0; 7],
        },
        e_type: u16v(elf::ET_DYN),
        e_machine: u16v(elf::EM_X86_64),
        e_version: u32v(elf::EV_CURRENT as u32),
        e_entry: u64v(0),
        e_phoff: u64v(0),
        e_shoff: u64v(shoff),
        e_flags: u32v(0),
        e_ehsize: u16v(EHDR_SIZE as u16),
        e_phentsize: u16v(56),
        e_phnum: u16v(0),
        e_shentsize: u16v(SHDR_SIZE as u16),
        e_shnum: u16v(shnum),
        e_shstrndx: u16v(shstrndx),
    }
}

/// A 64-bit ELF with no section table at all: enough to be identified as a
/// binary object, with no dependencies and no search path.
pub fn plain_elf() -> Vec<u8> {
    bytes_of(&file_header(0, 0, 0)).to_vec()
}

/// A 64-bit ELF whose dynamic section carries the given NEEDED entries
/// and, optionally, a DT_RUNPATH.
pub fn dynamic_elf(needed: &[&str], runpath: Option<&str>) -> Vec<u8> {
    let mut strtab = vec![0u8];
    let mut name_offsets = Vec::new();
    for name in needed {
        name_offsets.push(strtab.len() as u64);
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);
    }
    let runpath_offset = runpath.map(|value| {
        let offset = strtab.len() as u64;
        strtab.extend_from_slice(value.as_bytes());
        strtab.push(0);
        offset
    });
    // The dynamic entries and section headers carry 8-byte fields; keep
    // their file offsets aligned.
    while (EHDR_SIZE + strtab.len()) % 8 != 0 {
        strtab.push(0);
    }

    let mut dynamic = Vec::new();
    for offset in &name_offsets {
        dynamic.push(elf::Dyn64::<Endianness> {
            d_tag: u64v(elf::DT_NEEDED as u64),
            d_val: u64v(*offset),
        });
    }
    if let Some(offset) = runpath_offset {
        dynamic.push(elf::Dyn64 {
            d_tag: u64v(elf::DT_RUNPATH as u64),
            d_val: u64v(offset),
        });
    }
    dynamic.push(elf::Dyn64 {
        d_tag: u64v(elf::DT_NULL as u64),
        d_val: u64v(0),
    });

    let strtab_offset = EHDR_SIZE;
    let dynamic_offset = strtab_offset + strtab.len();
    let dynamic_size = dynamic.len() * DYN_SIZE;

    // Section header names live in their own string table, as on a real
    // ELF object; object's section reader rejects an e_shstrndx of 0 once
    // any section headers are present.
    let mut shstrtab = vec![0u8];
    let dynamic_name_offset = shstrtab.len() as u32;
    shstrtab.extend_from_slice(b".dynamic\0");
    let dynstr_name_offset = shstrtab.len() as u32;
    shstrtab.extend_from_slice(b".dynstr\0");
    let shstrtab_name_offset = shstrtab.len() as u32;
    shstrtab.extend_from_slice(b".shstrtab\0");

    let shstrtab_offset = dynamic_offset + dynamic_size;
    let shoff = shstrtab_offset + shstrtab.len();

    let mut out = Vec::new();
    out.extend_from_slice(bytes_of(&file_header(shoff as u64, 4, 3)));
    out.extend_from_slice(&strtab);
    for entry in &dynamic {
        out.extend_from_slice(bytes_of(entry));
    }
    out.extend_from_slice(&shstrtab);

    let null_section = elf::SectionHeader64::<Endianness> {
        sh_name: u32v(0),
        sh_type: u32v(elf::SHT_NULL),
        sh_flags: u64v(0),
        sh_addr: u64v(0),
        sh_offset: u64v(0),
        sh_size: u64v(0),
        sh_link: u32v(0),
        sh_info: u32v(0),
        sh_addralign: u64v(0),
        sh_entsize: u64v(0),
    };
    out.extend_from_slice(bytes_of(&null_section));

    let dynamic_section = elf::SectionHeader64::<Endianness> {
        sh_name: u32v(dynamic_name_offset),
        sh_type: u32v(elf::SHT_DYNAMIC),
        sh_flags: u64v(elf::SHF_ALLOC as u64),
        sh_addr: u64v(0),
        sh_offset: u64v(dynamic_offset as u64),
        sh_size: u64v(dynamic_size as u64),
        sh_link: u32v(2),
        sh_info: u32v(0),
        sh_addralign: u64v(8),
        sh_entsize: u64v(DYN_SIZE as u64),
    };
    out.extend_from_slice(bytes_of(&dynamic_section));

    let strtab_section = elf::SectionHeader64::<Endianness> {
        sh_name: u32v(dynstr_name_offset),
        sh_type: u32v(elf::SHT_STRTAB),
        sh_flags: u64v(0),
        sh_addr: u64v(0),
        sh_offset: u64v(strtab_offset as u64),
        sh_size: u64v(strtab.len() as u64),
        sh_link: u32v(0),
        sh_info: u32v(0),
        sh_addralign: u64v(1),
        sh_entsize: u64v(0),
    };
    out.extend_from_slice(bytes_of(&strtab_section));

    let shstrtab_section = elf::SectionHeader64::<Endianness> {
        sh_name: u32v(shstrtab_name_offset),
        sh_type: u32v(elf::SHT_STRTAB),
        sh_flags: u64v(0),
        sh_addr: u64v(0),
        sh_offset: u64v(shstrtab_offset as u64),
        sh_size: u64v(shstrtab.len() as u64),
        sh_link: u32v(0),
        sh_info: u32v(0),
        sh_addralign: u64v(1),
        sh_entsize: u64v(0),
    };
    out.extend_from_slice(bytes_of(&shstrtab_section));
    out
}

/// Writes `bytes` to `path`, creating parent directories, optionally with
/// the executable bit set.
pub fn write_object(path: &Path, bytes: &[u8], executable: bool) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
    if executable {
        let mut permissions = fs::metadata(path).unwrap().permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(path, permissions).unwrap();
    }
}

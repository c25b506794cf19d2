use std::io::{self, Read, Seek};

use byteorder::{ReadBytesExt, LE};

use crate::error::{FormatError, Result, SizeError};
use crate::format::ELF_MAGIC;
use crate::sections::{reserve_table, Section, MAX_SECTION_COUNT};
use crate::source::ByteSource;

/// Byte index of the class field inside `e_ident`.
pub const EI_CLASS: usize = 4;

/// Byte index of the data encoding field inside `e_ident`.
pub const EI_DATA: usize = 5;

/// `e_ident[EI_CLASS]` value for 32-bit objects.
pub const ELFCLASS32: u8 = 1;

/// `e_ident[EI_DATA]` value for little-endian objects.
pub const ELFDATA2LSB: u8 = 1;

/// Reserved section index meaning "no section".
pub const SHN_UNDEF: u16 = 0;

/// Upper bound on the section name string table this crate will load.
pub const MAX_NAME_TABLE_LEN: u32 = 1 << 20;

/// ELF header for a 32-bit object file.
///
/// This structure corresponds to the standard `Elf32_Ehdr` defined in the ELF
/// specification. It appears at the very beginning of every ELF file and
/// contains metadata describing the file's organization and layout.
///
/// Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Elf32Ehdr {
    /// ELF identification bytes (magic number and other information).
    ///
    /// The first 4 bytes should be `0x7F`, `'E'`, `'L'`, `'F'`.
    /// Byte 4 encodes the class (32/64-bit) and byte 5 the data encoding.
    pub e_ident: [u8; 16],

    /// Object file type (e.g. relocatable, executable, shared, core).
    ///
    /// Common values:
    /// - `ET_NONE` (0): No file type
    /// - `ET_REL` (1): Relocatable file
    /// - `ET_EXEC` (2): Executable file
    /// - `ET_DYN` (3): Shared object
    /// - `ET_CORE` (4): Core dump
    pub e_type: u16,

    /// Target architecture (e.g. x86, ARM).
    pub e_machine: u16,

    /// ELF version (usually set to `EV_CURRENT` = 1).
    pub e_version: u32,

    /// Virtual address of the program entry point.
    pub e_entry: u32,

    /// File offset of the program header table.
    pub e_phoff: u32,

    /// File offset of the section header table.
    ///
    /// Points to an array of `Elf32Shdr` entries.
    pub e_shoff: u32,

    /// Processor-specific flags.
    pub e_flags: u32,

    /// Size of this ELF header (52 bytes for ELF32).
    pub e_ehsize: u16,

    /// Size of one entry in the program header table.
    pub e_phentsize: u16,

    /// Number of entries in the program header table.
    pub e_phnum: u16,

    /// Size of one entry in the section header table.
    pub e_shentsize: u16,

    /// Number of entries in the section header table.
    pub e_shnum: u16,

    /// Index of the section header string table.
    ///
    /// This section contains the names of all other sections.
    pub e_shstrndx: u16,
}

impl Elf32Ehdr {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<Elf32Ehdr> {
        let mut e_ident = [0u8; 16];
        cur.read_exact(&mut e_ident)?;

        Ok(Elf32Ehdr {
            e_ident,
            e_type: cur.read_u16::<LE>()?,
            e_machine: cur.read_u16::<LE>()?,
            e_version: cur.read_u32::<LE>()?,
            e_entry: cur.read_u32::<LE>()?,
            e_phoff: cur.read_u32::<LE>()?,
            e_shoff: cur.read_u32::<LE>()?,
            e_flags: cur.read_u32::<LE>()?,
            e_ehsize: cur.read_u16::<LE>()?,
            e_phentsize: cur.read_u16::<LE>()?,
            e_phnum: cur.read_u16::<LE>()?,
            e_shentsize: cur.read_u16::<LE>()?,
            e_shnum: cur.read_u16::<LE>()?,
            e_shstrndx: cur.read_u16::<LE>()?,
        })
    }
}

/// Section header entry for a 32-bit object file, 40 bytes on disk.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Elf32Shdr {
    /// Offset of the section name in the section header string table.
    pub sh_name: u32,

    /// Section type (`SHT_PROGBITS`, `SHT_NOBITS`, ...).
    pub sh_type: u32,

    /// Section attribute flags.
    pub sh_flags: u32,

    /// Virtual address of the section in memory.
    pub sh_addr: u32,

    /// File offset of the section's data.
    pub sh_offset: u32,

    /// Size of the section in bytes.
    pub sh_size: u32,

    /// Section index link, meaning depends on the type.
    pub sh_link: u32,

    /// Extra information, meaning depends on the type.
    pub sh_info: u32,

    /// Required alignment of the section.
    pub sh_addralign: u32,

    /// Entry size for sections holding fixed-size records.
    pub sh_entsize: u32,
}

impl Elf32Shdr {
    /// On-disk size of one section header entry.
    pub const SIZE: u16 = 40;

    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<Elf32Shdr> {
        Ok(Elf32Shdr {
            sh_name: cur.read_u32::<LE>()?,
            sh_type: cur.read_u32::<LE>()?,
            sh_flags: cur.read_u32::<LE>()?,
            sh_addr: cur.read_u32::<LE>()?,
            sh_offset: cur.read_u32::<LE>()?,
            sh_size: cur.read_u32::<LE>()?,
            sh_link: cur.read_u32::<LE>()?,
            sh_info: cur.read_u32::<LE>()?,
            sh_addralign: cur.read_u32::<LE>()?,
            sh_entsize: cur.read_u32::<LE>()?,
        })
    }
}

/// Reads the ELF section header table and resolves section names.
///
/// Sections that occupy no file space (`SHT_NOBITS`) are reported with their
/// declared `sh_size`. Name resolution is best effort: a missing or malformed
/// string table leaves names empty instead of failing the parse.
pub fn read_section_table<R: Read + Seek>(src: &mut ByteSource<R>) -> Result<Vec<Section>> {
    src.rewind()?;
    let ehdr =
        Elf32Ehdr::from_reader(src).map_err(|e| SizeError::short_read("ELF header", e))?;

    if ehdr.e_ident[..4] != ELF_MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(&ehdr.e_ident[..4]);
        return Err(FormatError::BadElfMagic { found }.into());
    }

    let class = ehdr.e_ident[EI_CLASS];
    if class != ELFCLASS32 {
        return Err(FormatError::UnsupportedElfClass { class }.into());
    }

    let data = ehdr.e_ident[EI_DATA];
    if data != ELFDATA2LSB {
        return Err(FormatError::UnsupportedElfData { data }.into());
    }

    let count = ehdr.e_shnum as u32;
    if count > MAX_SECTION_COUNT {
        return Err(FormatError::SectionCountOutOfRange {
            count,
            limit: MAX_SECTION_COUNT,
        }
        .into());
    }
    if count == 0 {
        return Ok(Vec::new());
    }
    if ehdr.e_shoff == 0 {
        log::warn!(
            "e_shnum is {} but e_shoff is zero; treating as stripped",
            ehdr.e_shnum
        );
        return Ok(Vec::new());
    }

    let entsize = ehdr.e_shentsize;
    if entsize < Elf32Shdr::SIZE {
        return Err(FormatError::BadSectionEntrySize { entsize }.into());
    }

    let mut headers = reserve_table(count as usize)?;
    let shoff = ehdr.e_shoff as u64;
    let stride = entsize as u64;
    for i in 0..count as u64 {
        src.seek_to(shoff + i * stride)?;
        let shdr = Elf32Shdr::from_reader(src)
            .map_err(|e| SizeError::short_read("section header", e))?;
        headers.push(shdr);
    }

    let names = resolve_names(src, &ehdr, &headers);

    let mut sections = reserve_table(count as usize)?;
    for (shdr, name) in headers.iter().zip(names) {
        sections.push(Section::from_elf(shdr, name));
    }

    Ok(sections)
}

/// Resolves section names from the string table picked by `e_shstrndx`.
///
/// Any anomaly is logged and yields empty names; name resolution never fails
/// the parse.
fn resolve_names<R: Read + Seek>(
    src: &mut ByteSource<R>,
    ehdr: &Elf32Ehdr,
    headers: &[Elf32Shdr],
) -> Vec<String> {
    let mut names = vec![String::new(); headers.len()];

    let strndx = ehdr.e_shstrndx as usize;
    if strndx == SHN_UNDEF as usize {
        return names;
    }
    if strndx >= headers.len() {
        log::warn!(
            "e_shstrndx {} is out of range ({} sections); leaving names empty",
            strndx,
            headers.len()
        );
        return names;
    }

    let strtab = &headers[strndx];
    if strtab.sh_size == 0 {
        return names;
    }
    if strtab.sh_size > MAX_NAME_TABLE_LEN {
        log::warn!(
            "section name table is {} bytes, limit is {}; leaving names empty",
            strtab.sh_size,
            MAX_NAME_TABLE_LEN
        );
        return names;
    }

    let mut table = vec![0u8; strtab.sh_size as usize];
    if let Err(e) = src.seek_to(strtab.sh_offset as u64) {
        log::warn!("failed to seek to the section name table: {e}");
        return names;
    }
    if let Err(e) = src.read_exact(&mut table) {
        log::warn!("failed to read the section name table: {e}");
        return names;
    }

    for (shdr, name) in headers.iter().zip(names.iter_mut()) {
        let start = shdr.sh_name as usize;
        if start >= table.len() {
            continue;
        }
        let bytes = match table[start..].iter().position(|&b| b == 0) {
            Some(end) => &table[start..start + end],
            None => &table[start..],
        };
        *name = String::from_utf8_lossy(bytes).into_owned();
    }

    names
}

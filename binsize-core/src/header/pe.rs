use std::io::{self, Read, Seek};

use byteorder::{ReadBytesExt, LE};

use crate::error::{FormatError, Result, SizeError};
use crate::format::{DOS_MAGIC, PE_SIGNATURE};
use crate::sections::{reserve_table, Section, MAX_SECTION_COUNT};
use crate::source::ByteSource;

/// Optional header magic for 32-bit images.
pub const PE32_MAGIC: u16 = 0x10b;

/// Optional header magic for 64-bit images.
pub const PE32PLUS_MAGIC: u16 = 0x20b;

/// Legacy DOS header at the start of every PE image.
///
/// Only two fields still matter: the magic and the file offset of the PE
/// signature. The 58 bytes between them are legacy DOS fields treated here
/// as opaque padding.
#[derive(Debug, Clone, Copy)]
pub struct DosHeader {
    /// Magic bytes, `"MZ"` for a valid image.
    pub e_magic: [u8; 2],

    /// File offset of the PE signature.
    pub e_lfanew: u32,
}

impl DosHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<DosHeader> {
        let mut e_magic = [0u8; 2];
        cur.read_exact(&mut e_magic)?;

        let mut legacy = [0u8; 58];
        cur.read_exact(&mut legacy)?;

        Ok(DosHeader {
            e_magic,
            e_lfanew: cur.read_u32::<LE>()?,
        })
    }
}

/// COFF file header that follows the PE signature.
///
/// Reference: [PE Format](https://learn.microsoft.com/en-us/windows/win32/debug/pe-format)
#[derive(Debug, Clone, Copy)]
pub struct PeFileHeader {
    /// Target machine type.
    pub machine: u16,

    /// Number of entries in the section table.
    pub number_of_sections: u16,

    /// Link time as a Unix timestamp.
    pub time_date_stamp: u32,

    /// File offset of the COFF symbol table, zero for modern images.
    pub pointer_to_symbol_table: u32,

    /// Number of COFF symbols, zero for modern images.
    pub number_of_symbols: u32,

    /// Declared size of the optional header that follows this one.
    pub size_of_optional_header: u16,

    /// Image attribute flags.
    pub characteristics: u16,
}

impl PeFileHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<PeFileHeader> {
        Ok(PeFileHeader {
            machine: cur.read_u16::<LE>()?,
            number_of_sections: cur.read_u16::<LE>()?,
            time_date_stamp: cur.read_u32::<LE>()?,
            pointer_to_symbol_table: cur.read_u32::<LE>()?,
            number_of_symbols: cur.read_u32::<LE>()?,
            size_of_optional_header: cur.read_u16::<LE>()?,
            characteristics: cur.read_u16::<LE>()?,
        })
    }
}

/// One 40-byte record in the PE section table.
#[derive(Debug, Clone, Copy)]
pub struct PeSectionHeader {
    /// Section name, null-padded to 8 bytes.
    pub name: [u8; 8],

    /// Size of the section once mapped into memory.
    pub virtual_size: u32,

    /// RVA of the section in memory.
    pub virtual_address: u32,

    /// Size of the section's initialized data on disk.
    pub size_of_raw_data: u32,

    /// File offset of the section's data.
    pub pointer_to_raw_data: u32,

    /// File offset of relocation entries.
    pub pointer_to_relocations: u32,

    /// File offset of COFF line numbers, deprecated.
    pub pointer_to_linenumbers: u32,

    /// Number of relocation entries.
    pub number_of_relocations: u16,

    /// Number of COFF line numbers.
    pub number_of_linenumbers: u16,

    /// Section attribute flags.
    pub characteristics: u32,
}

impl PeSectionHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<PeSectionHeader> {
        let mut name = [0u8; 8];
        cur.read_exact(&mut name)?;

        Ok(PeSectionHeader {
            name,
            virtual_size: cur.read_u32::<LE>()?,
            virtual_address: cur.read_u32::<LE>()?,
            size_of_raw_data: cur.read_u32::<LE>()?,
            pointer_to_raw_data: cur.read_u32::<LE>()?,
            pointer_to_relocations: cur.read_u32::<LE>()?,
            pointer_to_linenumbers: cur.read_u32::<LE>()?,
            number_of_relocations: cur.read_u16::<LE>()?,
            number_of_linenumbers: cur.read_u16::<LE>()?,
            characteristics: cur.read_u32::<LE>()?,
        })
    }

    /// Section name with the trailing NUL padding stripped.
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .trim_end_matches('\0')
            .to_string()
    }
}

/// Walks the DOS header, PE signature, and COFF file header, then reads
/// the section table.
pub fn read_section_table<R: Read + Seek>(src: &mut ByteSource<R>) -> Result<Vec<Section>> {
    src.rewind()?;
    let dos =
        DosHeader::from_reader(src).map_err(|e| SizeError::short_read("DOS header", e))?;
    if dos.e_magic != DOS_MAGIC {
        return Err(FormatError::BadDosMagic { found: dos.e_magic }.into());
    }

    let pe_offset = dos.e_lfanew as u64;
    src.seek_to(pe_offset).map_err(|e| match e {
        SizeError::Format(FormatError::OffsetOutOfRange { .. }) => {
            FormatError::BadPeSignature { offset: pe_offset }.into()
        }
        other => other,
    })?;

    let mut signature = [0u8; 4];
    src.read_exact(&mut signature)
        .map_err(|e| SizeError::short_read("PE signature", e))?;
    if signature != PE_SIGNATURE {
        return Err(FormatError::BadPeSignature { offset: pe_offset }.into());
    }

    let file_header = PeFileHeader::from_reader(src)
        .map_err(|e| SizeError::short_read("COFF file header", e))?;

    let count = file_header.number_of_sections as u32;
    if count > MAX_SECTION_COUNT {
        return Err(FormatError::SectionCountOutOfRange {
            count,
            limit: MAX_SECTION_COUNT,
        }
        .into());
    }

    // 4-byte signature plus 20-byte file header.
    let optional_start = pe_offset + 24;
    let optional_size = file_header.size_of_optional_header as u64;
    if optional_size >= 2 {
        let magic = src
            .read_u16::<LE>()
            .map_err(|e| SizeError::short_read("optional header", e))?;
        if magic != PE32_MAGIC && magic != PE32PLUS_MAGIC {
            return Err(FormatError::UnsupportedOptionalHeaderMagic { magic }.into());
        }
    }

    // The section table sits at the declared end of the optional header.
    src.seek_to(optional_start + optional_size)?;

    let mut sections = reserve_table(count as usize)?;
    for _ in 0..count {
        let sh = PeSectionHeader::from_reader(src)
            .map_err(|e| SizeError::short_read("section header", e))?;
        sections.push(Section::from_pe(&sh));
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn dos_header_reads_magic_and_lfanew() {
        let mut image = vec![0u8; 64];
        image[..2].copy_from_slice(b"MZ");
        image[0x3c..0x40].copy_from_slice(&0x80u32.to_le_bytes());

        let dos = DosHeader::from_reader(&mut Cursor::new(image)).unwrap();
        assert_eq!(dos.e_magic, *b"MZ");
        assert_eq!(dos.e_lfanew, 0x80);
    }

    #[test]
    fn display_name_strips_padding() {
        let mut sh_name = [0u8; 8];
        sh_name[..5].copy_from_slice(b".text");
        let sh = PeSectionHeader {
            name: sh_name,
            virtual_size: 0,
            virtual_address: 0,
            size_of_raw_data: 0,
            pointer_to_raw_data: 0,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: 0,
        };
        assert_eq!(sh.display_name(), ".text");

        let full = PeSectionHeader {
            name: *b".textbss",
            ..sh
        };
        assert_eq!(full.display_name(), ".textbss");
    }
}

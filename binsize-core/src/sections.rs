use crate::error::{Result, SizeError};
use crate::header::elf::Elf32Shdr;
use crate::header::pe::PeSectionHeader;

/// Upper bound on the number of section records a header may declare.
pub const MAX_SECTION_COUNT: u32 = 4096;

/// One section record, normalized across container formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub addr: u64,
    pub raw_size: u64,
    pub file_offset: u64,
    pub flags: u64,
}

impl Section {
    pub(crate) fn from_pe(sh: &PeSectionHeader) -> Self {
        Section {
            name: sh.display_name(),
            addr: sh.virtual_address as u64,
            raw_size: sh.size_of_raw_data as u64,
            file_offset: sh.pointer_to_raw_data as u64,
            flags: sh.characteristics as u64,
        }
    }

    pub(crate) fn from_elf(sh: &Elf32Shdr, name: String) -> Self {
        Section {
            name,
            addr: sh.sh_addr as u64,
            raw_size: sh.sh_size as u64,
            file_offset: sh.sh_offset as u64,
            flags: sh.sh_flags as u64,
        }
    }
}

/// Sums the on-disk sizes of all sections, rejecting u64 overflow.
pub fn total_raw_size(sections: &[Section]) -> Result<u64> {
    sections.iter().try_fold(0u64, |total, s| {
        total.checked_add(s.raw_size).ok_or(SizeError::Overflow)
    })
}

/// Allocates an empty vector sized for a section table.
pub(crate) fn reserve_table<T>(count: usize) -> Result<Vec<T>> {
    let mut table = Vec::new();
    table
        .try_reserve_exact(count)
        .map_err(|source| SizeError::Allocation {
            requested: count,
            source,
        })?;
    Ok(table)
}

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = SizeError> = std::result::Result<T, E>;

/// Errors produced while sizing an executable image.
#[derive(Debug, Error)]
pub enum SizeError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("unexpected end of stream while reading {what}")]
    ShortRead {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to allocate room for {requested} section records")]
    Allocation {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("section sizes overflow u64")]
    Overflow,
}

impl SizeError {
    pub(crate) fn short_read(what: &'static str, source: io::Error) -> Self {
        SizeError::ShortRead { what, source }
    }
}

/// Structural problems with the container itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad DOS magic {found:?}, expected \"MZ\"")]
    BadDosMagic { found: [u8; 2] },

    #[error("no PE signature at offset {offset:#x}")]
    BadPeSignature { offset: u64 },

    #[error("bad ELF magic {found:?}")]
    BadElfMagic { found: [u8; 4] },

    #[error("unsupported ELF class {class}, only ELFCLASS32 is handled")]
    UnsupportedElfClass { class: u8 },

    #[error("unsupported ELF data encoding {data}, only little-endian is handled")]
    UnsupportedElfData { data: u8 },

    #[error("unsupported optional header magic {magic:#x}")]
    UnsupportedOptionalHeaderMagic { magic: u16 },

    #[error("section count {count} exceeds the limit of {limit}")]
    SectionCountOutOfRange { count: u32, limit: u32 },

    #[error("offset {offset:#x} lies outside the file ({len} bytes)")]
    OffsetOutOfRange { offset: u64, len: u64 },

    #[error("section header entry size {entsize} is too small")]
    BadSectionEntrySize { entsize: u16 },

    #[error("not a PE or ELF image")]
    Unrecognized,
}

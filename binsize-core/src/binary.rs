use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Result;
use crate::format::{self, BinaryFormat};
use crate::header::{elf, pe};
use crate::sections::{self, Section};
use crate::source::ByteSource;

/// A parsed executable image and its on-disk section footprint.
#[derive(Debug)]
pub struct Executable {
    pub format: BinaryFormat,
    pub sections: Vec<Section>,
    pub total_size: u64,
}

impl Executable {
    /// Opens and parses the image at `path`.
    ///
    /// The file handle is closed before this returns.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = ByteSource::<File>::open(path)?;
        Self::from_source(source)
    }

    /// Parses an image from an already-open stream.
    ///
    /// The stream is rewound first, so the caller's position does not matter.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let source = ByteSource::new(reader)?;
        Self::from_source(source)
    }

    fn from_source<R: Read + Seek>(mut src: ByteSource<R>) -> Result<Self> {
        let format = format::detect(&mut src)?;
        let sections = match format {
            BinaryFormat::Pe => pe::read_section_table(&mut src)?,
            BinaryFormat::Elf => elf::read_section_table(&mut src)?,
        };
        let total_size = sections::total_raw_size(&sections)?;

        log::info!(
            "{} image with {} sections, {} bytes of section data",
            format.name(),
            sections.len(),
            total_size
        );

        Ok(Self {
            format,
            sections,
            total_size,
        })
    }
}

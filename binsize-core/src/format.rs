use std::io::{self, Read, Seek};

use crate::error::{FormatError, Result, SizeError};
use crate::source::ByteSource;

/// First two bytes of every DOS/PE image.
pub const DOS_MAGIC: [u8; 2] = *b"MZ";

/// First four bytes of every ELF image.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Signature that follows the DOS stub in a PE image.
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

/// Container formats this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    Pe,
    Elf,
}

impl BinaryFormat {
    /// Returns a short human-readable name, e.g. "ELF" or "PE".
    pub fn name(&self) -> &'static str {
        match self {
            BinaryFormat::Pe => "PE",
            BinaryFormat::Elf => "ELF",
        }
    }
}

/// Sniffs the container format from the first bytes of the stream.
///
/// The stream is rewound before and after the probe. Streams too short to
/// hold any known magic are reported as unrecognized rather than truncated.
pub fn detect<R: Read + Seek>(src: &mut ByteSource<R>) -> Result<BinaryFormat> {
    src.rewind()?;
    let mut prefix = [0u8; 4];
    let got = read_up_to(src, &mut prefix).map_err(|e| SizeError::short_read("magic bytes", e))?;
    src.rewind()?;

    if got >= ELF_MAGIC.len() && prefix == ELF_MAGIC {
        return Ok(BinaryFormat::Elf);
    }
    if got >= DOS_MAGIC.len() && prefix[..2] == DOS_MAGIC {
        return Ok(BinaryFormat::Pe);
    }
    Err(FormatError::Unrecognized.into())
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn detect_bytes(bytes: &[u8]) -> Result<BinaryFormat> {
        let mut src = ByteSource::new(Cursor::new(bytes.to_vec())).unwrap();
        detect(&mut src)
    }

    #[test]
    fn recognizes_both_magics() {
        assert_eq!(detect_bytes(b"MZ\x90\x00rest").unwrap(), BinaryFormat::Pe);
        assert_eq!(detect_bytes(b"\x7fELF\x01\x01").unwrap(), BinaryFormat::Elf);
    }

    #[test]
    fn short_streams_are_unrecognized() {
        for bytes in [&b""[..], &b"M"[..], &b"\x7fEL"[..]] {
            match detect_bytes(bytes) {
                Err(SizeError::Format(FormatError::Unrecognized)) => {}
                other => panic!("unexpected result for {bytes:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_prefix_is_unrecognized() {
        match detect_bytes(b"\x7fELG\x01\x01") {
            Err(SizeError::Format(FormatError::Unrecognized)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn probe_leaves_stream_rewound() {
        let mut src = ByteSource::new(Cursor::new(b"MZ..".to_vec())).unwrap();
        detect(&mut src).unwrap();
        let mut buf = [0u8; 2];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"MZ");
    }
}

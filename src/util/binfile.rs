//! Tagged, sectioned binary container shared by the proving-key and
//! witness file formats.
//!
//! Layout: 4-byte ASCII tag, `u32` version, `u32` section count, then for
//! each section a `u32` id, a `u64` byte length and the payload. All
//! integers are little-endian.

use crate::Error;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct Span {
    offset: usize,
    len: usize,
}

/// Parsed view over a sectioned binary buffer. Section payloads are
/// borrowed, not copied.
#[derive(Debug)]
pub struct BinFile<'a> {
    data: &'a [u8],
    version: u32,
    sections: HashMap<u32, Vec<Span>>,
}

impl<'a> BinFile<'a> {
    pub fn new(data: &'a [u8], expected_tag: &str, max_version: u32) -> Result<Self, Error> {
        let mut reader = SectionReader::new(data);
        let tag = reader.read_bytes(4)?;
        if tag != expected_tag.as_bytes() {
            return Err(Error::InvalidFormat(format!(
                "invalid file tag, expected {expected_tag:?}"
            )));
        }
        let version = reader.read_u32_le()?;
        if version > max_version {
            return Err(Error::InvalidFormat(format!(
                "unsupported {expected_tag} version {version}, expected <= {max_version}"
            )));
        }
        let n_sections = reader.read_u32_le()?;

        let mut sections: HashMap<u32, Vec<Span>> = HashMap::new();
        for _ in 0..n_sections {
            let id = reader.read_u32_le()?;
            let len = reader.read_u64_le()?;
            let len = usize::try_from(len)
                .map_err(|_| Error::InvalidFormat(format!("section {id} length overflow")))?;
            let offset = reader.pos;
            if len > data.len() - offset {
                return Err(Error::InvalidFormat(format!(
                    "section {id} ends at {} but the file is {} bytes",
                    offset + len,
                    data.len()
                )));
            }
            reader.pos += len;
            sections.entry(id).or_default().push(Span { offset, len });
        }

        Ok(Self {
            data,
            version,
            sections,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Payload of the first section with the given id.
    pub fn section(&self, id: u32) -> Result<&'a [u8], Error> {
        let span = self
            .sections
            .get(&id)
            .and_then(|spans| spans.first())
            .ok_or_else(|| Error::InvalidFormat(format!("missing section {id}")))?;
        Ok(&self.data[span.offset..span.offset + span.len])
    }

    pub fn reader(&self, id: u32) -> Result<SectionReader<'a>, Error> {
        Ok(SectionReader::new(self.section(id)?))
    }
}

/// Bounds-checked cursor over a byte slice.
#[derive(Clone, Debug)]
pub struct SectionReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if len > self.remaining() {
            return Err(Error::InvalidFormat(format!(
                "read of {len} bytes past the end of a section ({} remaining)",
                self.remaining()
            )));
        }
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, Error> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// 32-byte little-endian field element block.
    pub fn read_fe_bytes(&mut self) -> Result<[u8; 32], Error> {
        Ok(self.read_bytes(32)?.try_into().unwrap())
    }

    pub fn expect_end(&self) -> Result<(), Error> {
        if self.remaining() != 0 {
            return Err(Error::InvalidFormat(format!(
                "{} trailing bytes in section",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(sections: &[(u32, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"test");
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&(sections.len() as u32).to_le_bytes());
        for (id, payload) in sections {
            out.extend_from_slice(&id.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            out.extend_from_slice(payload);
        }
        out
    }

    #[test]
    fn test_parse_sections() {
        let bytes = container(&[(1, &[0xaa, 0xbb]), (7, &42u32.to_le_bytes())]);
        let file = BinFile::new(&bytes, "test", 1).unwrap();
        assert_eq!(file.version(), 1);
        assert_eq!(file.section(1).unwrap(), &[0xaa, 0xbb]);
        let mut reader = file.reader(7).unwrap();
        assert_eq!(reader.read_u32_le().unwrap(), 42);
        reader.expect_end().unwrap();
        assert!(matches!(file.section(2), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_wrong_tag_and_version() {
        let bytes = container(&[]);
        assert!(BinFile::new(&bytes, "zkey", 1).is_err());
        assert!(BinFile::new(&bytes, "test", 0).is_err());
    }

    #[test]
    fn test_rejects_overrunning_section() {
        let mut bytes = container(&[(1, &[0u8; 16])]);
        bytes.truncate(bytes.len() - 1);
        let err = BinFile::new(&bytes, "test", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_reader_bounds() {
        let mut reader = SectionReader::new(&[1, 2, 3]);
        assert!(reader.read_u32_le().is_err());
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
        assert!(reader.read_bytes(1).is_err());
    }
}

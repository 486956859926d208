//! Little-endian helpers shared by the sketch encodings.
//!
//! Every payload starts with a one-byte family tag and a one-byte format
//! version, so a payload written for one sketch is never read as another.

use std::io::{Cursor, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{ProfileError, ProfileResult};

/// Append-only writer for sketch payloads.
#[derive(Debug, Default)]
pub(crate) struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub(crate) fn new(family: u8, version: u8) -> Self {
        let mut encoder = Self { buf: Vec::new() };
        encoder.put_u8(family);
        encoder.put_u8(version);
        encoder
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn put_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    pub(crate) fn put_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    pub(crate) fn put_u64(&mut self, value: u64) {
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    pub(crate) fn put_f64(&mut self, value: f64) {
        let mut bytes = [0u8; 8];
        LittleEndian::write_f64(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reader over a sketch payload. Short reads become deserialization errors.
pub(crate) struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
    what: &'static str,
}

impl<'a> Decoder<'a> {
    /// Checks the family tag and version and positions the reader after them.
    pub(crate) fn new(
        bytes: &'a [u8],
        what: &'static str,
        family: u8,
        version: u8,
    ) -> ProfileResult<Self> {
        let mut decoder = Self {
            cursor: Cursor::new(bytes),
            what,
        };
        let found_family = decoder.u8()?;
        if found_family != family {
            return Err(ProfileError::deserialization(format!(
                "{what}: unexpected family tag {found_family:#04x}, expected {family:#04x}"
            )));
        }
        let found_version = decoder.u8()?;
        if found_version != version {
            return Err(ProfileError::deserialization(format!(
                "{what}: unsupported format version {found_version}"
            )));
        }
        Ok(decoder)
    }

    pub(crate) fn u8(&mut self) -> ProfileResult<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub(crate) fn u16(&mut self) -> ProfileResult<u16> {
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub(crate) fn u32(&mut self) -> ProfileResult<u32> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub(crate) fn u64(&mut self) -> ProfileResult<u64> {
        Ok(self.cursor.read_u64::<LittleEndian>()?)
    }

    pub(crate) fn f64(&mut self) -> ProfileResult<f64> {
        Ok(self.cursor.read_f64::<LittleEndian>()?)
    }

    pub(crate) fn bytes(&mut self) -> ProfileResult<Vec<u8>> {
        let len = self.u32()? as usize;
        self.raw(len)
    }

    pub(crate) fn raw(&mut self, len: usize) -> ProfileResult<Vec<u8>> {
        if len > self.remaining() {
            return Err(self.corrupt(format!(
                "declared length {len} exceeds the {} remaining bytes",
                self.remaining()
            )));
        }
        let mut out = vec![0u8; len];
        self.cursor.read_exact(&mut out)?;
        Ok(out)
    }

    pub(crate) fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    /// Fails if bytes are left over after a complete payload.
    pub(crate) fn finish(self) -> ProfileResult<()> {
        let remaining = self.remaining();
        if remaining != 0 {
            return Err(self.corrupt(format!("{remaining} trailing bytes")));
        }
        Ok(())
    }

    pub(crate) fn corrupt(&self, msg: impl AsRef<str>) -> ProfileError {
        ProfileError::deserialization(format!("{}: {}", self.what, msg.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_primitives() {
        let mut encoder = Encoder::new(0x42, 1);
        encoder.put_u16(7);
        encoder.put_u64(u64::MAX);
        encoder.put_f64(-2.5);
        encoder.put_bytes(b"abc");
        let bytes = encoder.finish();

        let mut decoder = Decoder::new(&bytes, "test", 0x42, 1).unwrap();
        assert_eq!(decoder.u16().unwrap(), 7);
        assert_eq!(decoder.u64().unwrap(), u64::MAX);
        assert_eq!(decoder.f64().unwrap(), -2.5);
        assert_eq!(decoder.bytes().unwrap(), b"abc".to_vec());
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_rejects_wrong_header_and_truncation() {
        let bytes = Encoder::new(0x42, 1).finish();
        assert!(Decoder::new(&bytes, "test", 0x43, 1).is_err());
        assert!(Decoder::new(&bytes, "test", 0x42, 2).is_err());

        let mut decoder = Decoder::new(&bytes, "test", 0x42, 1).unwrap();
        let err = decoder.u64().unwrap_err();
        assert!(err.is_deserialization());
    }

    #[test]
    fn test_rejects_oversized_length_prefix() {
        let mut encoder = Encoder::new(0x42, 1);
        encoder.put_u32(1_000);
        let bytes = encoder.finish();
        let mut decoder = Decoder::new(&bytes, "test", 0x42, 1).unwrap();
        assert!(decoder.bytes().is_err());
    }
}

//! Binary field encoding.
//!
//! Every payload writes its own fields, in a fixed order, through a
//! [`PacketWriter`], and reads them back in the same order through a
//! [`PacketReader`]. All integers are big-endian.
//!
//! | type     | encoding                                   |
//! |----------|--------------------------------------------|
//! | `i32`    | 4 bytes                                    |
//! | `u32`    | 4 bytes                                    |
//! | `f32`    | 4 bytes, IEEE-754 bits                     |
//! | `bool`   | 1 byte, 0 or 1 (anything else is an error) |
//! | `String` | `u32` byte length, then UTF-8              |
//! | list     | `i32` count, then each element             |
//!
//! Nothing here checks that a payload's `write_to` and `read_from`
//! agree. That symmetry is each payload's own contract, and the
//! round-trip tests in `message.rs` are what hold it in place.

use crate::ProtocolError;

/// A value with a fixed binary field layout.
pub trait WireFormat: Sized {
    /// Appends this value's fields to `w`.
    fn write_to(&self, w: &mut PacketWriter);

    /// Reads a value back, consuming exactly the bytes `write_to` wrote.
    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Growable output buffer for field serialization.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, v: &str) {
        // Strings longer than 4 GiB can't fit in a frame anyway.
        self.write_u32(v.len() as u32);
        self.buf.extend_from_slice(v.as_bytes());
    }

    /// Writes an `i32` count followed by each element.
    pub fn write_list<T: WireFormat>(&mut self, items: &[T]) {
        self.write_i32(items.len() as i32);
        for item in items {
            item.write_to(self);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Cursor over a received payload.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let bytes = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_slice(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ProtocolError::Truncated {
                needed: n,
                remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.take().map(u16::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.take().map(i32::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.take().map(u32::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.take().map(|b| f32::from_bits(u32::from_be_bytes(b)))
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.take::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other)),
        }
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take_slice(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Reads an `i32` count followed by that many elements.
    pub fn read_list<T: WireFormat>(&mut self) -> Result<Vec<T>, ProtocolError> {
        let count = self.read_i32()?;
        let n = usize::try_from(count).map_err(|_| ProtocolError::InvalidCount(count))?;
        // Every element takes at least one byte; a bigger count is a lie
        // and would only make us over-allocate.
        if n > self.remaining() {
            return Err(ProtocolError::InvalidCount(count));
        }
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(T::read_from(self)?);
        }
        Ok(items)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fails if any bytes are left unread.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_is_big_endian() {
        let mut w = PacketWriter::new();
        w.write_i32(1);
        w.write_u16(0x0102);
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_string_layout() {
        let mut w = PacketWriter::new();
        w.write_str("hé");
        // 3 UTF-8 bytes
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 3, b'h', 0xc3, 0xa9]);
    }

    #[test]
    fn test_reader_reads_fields_back() {
        let mut w = PacketWriter::new();
        w.write_i32(-7);
        w.write_f32(1.5);
        w.write_bool(true);
        w.write_str("alice");
        let bytes = w.into_bytes();

        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_string().unwrap(), "alice");
        r.finish().unwrap();
    }

    #[test]
    fn test_reader_truncated() {
        let mut r = PacketReader::new(&[0, 0, 1]);
        let err = r.read_i32().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                needed: 4,
                remaining: 3
            }
        ));
    }

    #[test]
    fn test_reader_string_length_past_end() {
        let mut r = PacketReader::new(&[0, 0, 0, 9, b'a']);
        assert!(matches!(
            r.read_string().unwrap_err(),
            ProtocolError::Truncated { .. }
        ));
    }

    #[test]
    fn test_reader_invalid_bool() {
        let mut r = PacketReader::new(&[2]);
        assert!(matches!(
            r.read_bool().unwrap_err(),
            ProtocolError::InvalidBool(2)
        ));
    }

    #[test]
    fn test_reader_invalid_utf8() {
        let mut r = PacketReader::new(&[0, 0, 0, 1, 0xff]);
        assert!(matches!(
            r.read_string().unwrap_err(),
            ProtocolError::InvalidUtf8(_)
        ));
    }

    #[test]
    fn test_finish_reports_trailing_bytes() {
        let r = PacketReader::new(&[1, 2, 3]);
        assert!(matches!(
            r.finish().unwrap_err(),
            ProtocolError::TrailingBytes(3)
        ));
    }

    #[test]
    fn test_read_list_rejects_negative_and_oversized_counts() {
        #[derive(Debug)]
        struct Byte;
        impl WireFormat for Byte {
            fn write_to(&self, _w: &mut PacketWriter) {}
            fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
                r.take::<1>().map(|_| Byte)
            }
        }

        let mut r = PacketReader::new(&[0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(
            r.read_list::<Byte>().unwrap_err(),
            ProtocolError::InvalidCount(-1)
        ));

        let mut r = PacketReader::new(&[0, 0, 0, 5, 0]);
        assert!(matches!(
            r.read_list::<Byte>().unwrap_err(),
            ProtocolError::InvalidCount(5)
        ));
    }
}

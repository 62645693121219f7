//! Bounds-checked little-endian cursor over a byte slice.
//!
//! [`ByteReader`] is the only place that does position arithmetic. Every
//! header decoder and demultiplexer moves through the input with the named
//! [`seek`](ByteReader::seek), [`skip`](ByteReader::skip) and `read_*`
//! operations, and any read past the end is reported as
//! [`DataloggerError::TruncatedData`] instead of panicking.

use crate::{DataloggerError, Result};

/// Cursor over an in-memory byte slice.
///
/// # Example
///
/// ```
/// use datalogger_rs::reader::ByteReader;
///
/// let data = [0x34, 0x12, 0xff, 0xff, 0xff, 0xff];
/// let mut r = ByteReader::new(&data);
/// assert_eq!(r.read_u16().unwrap(), 0x1234);
/// assert_eq!(r.read_i32().unwrap(), -1);
/// assert!(r.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader positioned at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Bytes left between the cursor and the end of the slice.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(DataloggerError::TruncatedData {
                expected: offset,
                actual: self.data.len(),
            });
        }
        self.offset = offset;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.offset += n;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    /// Borrow everything from the cursor to the end.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.offset..];
        self.offset = self.data.len();
        bytes
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_array::<1>()?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Read a fixed-width text field.
    ///
    /// The field ends at the first NUL byte; surrounding spaces are trimmed
    /// and non-UTF-8 bytes are replaced.
    pub fn read_text(&mut self, width: usize) -> Result<String> {
        let raw = self.read_bytes(width)?;
        Ok(fixed_text(raw))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(DataloggerError::TruncatedData {
                expected: self.offset + n,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Decode a NUL-terminated, space-padded text field.
pub fn fixed_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

//! Cursor-based binary parser for module-manifest decoding.
//!
//! This module provides the [`Parser`] type, a bounds-checked cursor over one raw
//! metadata block. It covers the primitives the manifest layout is built from:
//! little-endian integers, 7-bit length-prefixed UTF-8 and UTF-16 strings, and raw
//! byte runs (public keys, opaque payloads).
//!
//! # Usage
//!
//! ```rust
//! use dotprobe::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//!
//! let value = parser.read_le::<u16>()?;
//! assert_eq!(value, 0x0201);
//! # Ok::<(), dotprobe::Error>(())
//! ```

use widestring::U16Str;

use crate::{file::io, Result};

/// A bounds-checked cursor over one metadata block's raw bytes.
///
/// `Parser` maintains an internal position and validates every access, so truncated
/// or hostile captures surface as [`crate::Error::OutOfBounds`] or
/// [`crate::Error::Malformed`] rather than panics. All multi-byte values are
/// little-endian; strings use the 7-bit encoded length prefix the capture shim
/// writes (the `BinaryWriter` convention).
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the current position within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the advance would pass the end of the data.
    pub fn advance_by(&mut self, count: usize) -> Result<()> {
        if self.position + count > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position += count;
        Ok(())
    }

    /// Read a primitive value in little-endian byte order, advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read would exceed the buffer.
    pub fn read_le<T: io::BlockIO>(&mut self) -> Result<T> {
        io::read_le_at(self.data, &mut self.position)
    }

    /// Read `count` raw bytes, advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.position + count > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a 7-bit encoded integer (the `BinaryWriter` length-prefix convention).
    ///
    /// Each byte contributes 7 payload bits, low group first; the high bit signals
    /// continuation. At most five bytes encode a `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncation or
    /// [`crate::Error::Malformed`] if the encoding exceeds five bytes.
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut result: u32 = 0;
        let mut shift = 0;

        loop {
            let byte = self.read_le::<u8>()?;
            result |= u32::from(byte & 0x7F) << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }

            shift += 7;
            if shift >= 35 {
                return Err(malformed_error!("Invalid 7-bit encoded integer"));
            }
        }
    }

    /// Read a length-prefixed UTF-8 string (length in bytes, 7-bit encoded).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncation or
    /// [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_7bit_encoded_int()? as usize;
        let bytes = self.read_bytes(length)?;

        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(malformed_error!(
                "Invalid UTF-8 str at {} - {} bytes",
                self.position - length,
                length
            )),
        }
    }

    /// Read a length-prefixed UTF-16 string (length in bytes, 7-bit encoded).
    ///
    /// Debugger captures store assembly and culture names in the debuggee's native
    /// UTF-16; decoding goes through [`widestring`] so unpaired surrogates are
    /// reported as malformed rather than silently replaced.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncation or
    /// [`crate::Error::Malformed`] for odd lengths or invalid UTF-16.
    pub fn read_prefixed_string_utf16(&mut self) -> Result<String> {
        let length = self.read_7bit_encoded_int()? as usize;

        if length % 2 != 0 {
            return Err(malformed_error!("Invalid UTF-16 length - {}", length));
        }

        let mut utf16_chars: Vec<u16> = Vec::with_capacity(length / 2);
        for _ in 0..length / 2 {
            utf16_chars.push(self.read_le::<u16>()?);
        }

        match U16Str::from_slice(&utf16_chars).to_string() {
            Ok(s) => Ok(s),
            Err(_) => Err(malformed_error!(
                "Invalid UTF-16 str at {} - {} bytes",
                self.position - length,
                length
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_le_sequential() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut parser = Parser::new(&data);

        let first = parser.read_le::<u32>().unwrap();
        assert_eq!(first, 0x0403_0201);

        parser.seek(6).unwrap();
        let last = parser.read_le::<u16>().unwrap();
        assert_eq!(last, 0x0807);
    }

    #[test]
    fn test_read_7bit_encoded_int() {
        let test_cases = vec![
            (vec![0x00], 0),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x01], 0x80),
            (vec![0xFF, 0x7F], 0x3FFF),
            (vec![0x80, 0x80, 0x01], 0x4000),
        ];

        for (bytes, expected) in test_cases {
            let mut parser = Parser::new(&bytes);
            assert_eq!(parser.read_7bit_encoded_int().unwrap(), expected);
        }
    }

    #[test]
    fn test_read_7bit_encoded_int_truncated() {
        let data = [0x80];
        let mut parser = Parser::new(&data);
        assert!(parser.read_7bit_encoded_int().is_err());
    }

    #[test]
    fn test_read_prefixed_string_utf8() {
        let data = [0x05, b'H', b'e', b'l', b'l', b'o'];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), "Hello");
    }

    #[test]
    fn test_read_prefixed_string_utf8_empty() {
        let data = [0x00];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), "");
    }

    #[test]
    fn test_read_prefixed_string_utf16() {
        let data = [0x0A, b'H', 0, b'e', 0, b'l', 0, b'l', 0, b'o', 0];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_prefixed_string_utf16().unwrap(), "Hello");
    }

    #[test]
    fn test_read_prefixed_string_utf16_odd_length() {
        let data = [0x03, 0x41, 0x00, 0x42];
        let mut parser = Parser::new(&data);
        assert!(parser.read_prefixed_string_utf16().is_err());
    }

    #[test]
    fn test_read_prefixed_string_utf16_unpaired_surrogate() {
        // 0xD800 is a lone high surrogate
        let data = [0x02, 0x00, 0xD8];
        let mut parser = Parser::new(&data);
        assert!(parser.read_prefixed_string_utf16().is_err());
    }

    #[test]
    fn test_read_bytes_and_advance() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut parser = Parser::new(&data);

        parser.advance_by(1).unwrap();
        let bytes = parser.read_bytes(2).unwrap();
        assert_eq!(bytes, &[0x02, 0x03]);
        assert!(parser.has_more_data());
        assert!(parser.advance_by(2).is_err());
    }
}

//! Offset-tracking reader over a byte buffer
//!
//! Used by the authenticator data parser to walk fixed-offset fields. Every
//! read is bounds-checked; a short buffer yields `MalformedAuthData` naming
//! the field that could not be read.

use crate::errors::{Result, WebAuthnError};

/// Reads consecutive big-endian fields from a borrowed buffer
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryCursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Unread bytes, without advancing
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Read exactly `len` bytes
    ///
    /// # Errors
    /// Returns `MalformedAuthData` if fewer than `len` bytes remain
    pub fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                WebAuthnError::MalformedAuthData(format!(
                    "{field} needs {len} bytes at offset {}, {} available",
                    self.pos,
                    self.remaining()
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read up to `len` bytes, stopping at the end of the buffer
    pub fn take_up_to(&mut self, len: usize) -> &'a [u8] {
        let end = self.pos.saturating_add(len).min(self.buf.len());
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        slice
    }

    /// Read a fixed-size array
    ///
    /// # Errors
    /// Returns `MalformedAuthData` if fewer than `N` bytes remain
    pub fn take_array<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    /// # Errors
    /// Returns `MalformedAuthData` if the buffer is exhausted
    pub fn read_u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take_array::<1>(field)?[0])
    }

    /// # Errors
    /// Returns `MalformedAuthData` if fewer than two bytes remain
    pub fn read_u16_be(&mut self, field: &str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array(field)?))
    }

    /// # Errors
    /// Returns `MalformedAuthData` if fewer than four bytes remain
    pub fn read_u32_be(&mut self, field: &str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array(field)?))
    }
}

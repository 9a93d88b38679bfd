//! Decodable trait & Decoder
//!
//! Unlike [`crate::encoder::Encoder`], the decoder tracks an absolute
//! position into the buffer rather than shrinking a slice as it reads.
//! Netlogon's DNS-label compression needs that: a pointer jumps backward
//! to an earlier absolute offset while the position the *caller* resumes
//! from afterwards must still advance past the pointer bytes.
use std::{convert::TryInto, mem, str};

use crate::error::{DecodeError, DecodeResult};

/// A trait for types which are decodable from one of this crate's binary formats.
pub trait Decodable<'r>: Sized {
    /// Read the type from the stream
    fn decode(decoder: &mut Decoder<'r>) -> DecodeResult<Self>;

    /// Returns the object in binary form
    fn from_bytes(bytes: &'r [u8]) -> DecodeResult<Self> {
        let mut decoder = Decoder::new(bytes);
        Self::decode(&mut decoder)
    }
}

/// Decoder type, holds a reference to the full buffer plus a read cursor.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buffer: &'a [u8],
    index: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new Decoder starting at offset 0.
    pub fn new(buffer: &'a [u8]) -> Self {
        Decoder { buffer, index: 0 }
    }

    /// Current absolute read position.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the cursor has consumed the whole buffer.
    pub fn is_empty(&self) -> bool {
        self.index >= self.buffer.len()
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.index)
    }

    /// Fork a decoder positioned at an arbitrary absolute offset into the
    /// same buffer, leaving `self`'s cursor untouched. Used to follow a
    /// label-compression pointer without disturbing the outer read.
    pub fn at(&self, offset: usize) -> DecodeResult<Decoder<'a>> {
        if offset > self.buffer.len() {
            return Err(DecodeError::EndOfBuffer { index: offset });
        }
        Ok(Decoder {
            buffer: self.buffer,
            index: offset,
        })
    }

    /// Peek `N` bytes at an absolute offset without moving the cursor.
    pub fn peek_at<const N: usize>(&self, offset: usize) -> DecodeResult<[u8; N]> {
        let end = offset
            .checked_add(N)
            .ok_or(DecodeError::AddOverflow)?;
        let bytes = self
            .buffer
            .get(offset..end)
            .ok_or(DecodeError::EndOfBuffer { index: end })?;
        Ok(bytes.try_into().expect("slice length matches N"))
    }

    /// Peek a runtime-length slice at an absolute offset without moving
    /// the cursor. Used by label-compression pointer chasing.
    pub fn slice_at(&self, offset: usize, len: usize) -> DecodeResult<&'a [u8]> {
        let end = offset.checked_add(len).ok_or(DecodeError::AddOverflow)?;
        self.buffer
            .get(offset..end)
            .ok_or(DecodeError::EndOfBuffer { index: end })
    }

    /// Move the cursor to an absolute offset. Used once label-compression
    /// pointer chasing has determined where the caller's read should
    /// resume, independent of how far the pointer target advanced.
    pub fn seek_to(&mut self, offset: usize) -> DecodeResult<()> {
        if offset > self.buffer.len() {
            return Err(DecodeError::EndOfBuffer { index: offset });
        }
        self.index = offset;
        Ok(())
    }

    /// read `N` bytes into an array, advancing the cursor
    pub fn read<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let end = self.index.checked_add(N).ok_or(DecodeError::AddOverflow)?;
        let bytes = self
            .buffer
            .get(self.index..end)
            .ok_or(DecodeError::EndOfBuffer { index: end })?;
        self.index = end;
        Ok(bytes.try_into().expect("slice length matches N"))
    }

    /// read a u8
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read::<{ mem::size_of::<u8>() }>()?[0])
    }

    /// read a big-endian u16
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.read()?))
    }

    /// read a big-endian u32
    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read()?))
    }

    /// read a little-endian u16
    pub fn read_u16_le(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_le_bytes(self.read()?))
    }

    /// read a little-endian u32
    pub fn read_u32_le(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.read()?))
    }

    /// read a little-endian i32
    pub fn read_i32_le(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_le_bytes(self.read()?))
    }

    /// read a slice of bytes determined at runtime, advancing the cursor
    pub fn read_slice(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        let end = self.index.checked_add(len).ok_or(DecodeError::AddOverflow)?;
        let slice = self
            .buffer
            .get(self.index..end)
            .ok_or(DecodeError::EndOfBuffer { index: end })?;
        self.index = end;
        Ok(slice)
    }

    /// read `len` bytes as a utf-8 `String`
    pub fn read_string(&mut self, len: usize) -> DecodeResult<String> {
        let slice = self.read_slice(len)?;
        Ok(str::from_utf8(slice)?.to_owned())
    }

    /// return the unread tail of the buffer
    pub fn remaining_buffer(&self) -> &'a [u8] {
        &self.buffer[self.index..]
    }
}

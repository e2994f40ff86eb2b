//! Byte-level reader and writer for packet payloads.
//!
//! Fixed-width integers are big-endian. VarInt/VarLong use 7 data bits per
//! byte, least significant group first, with the high bit marking
//! continuation. Length-prefixed sequences carry a VarInt count.
//!
//! NBT blobs are only walked, never materialized: [`PacketReader::skip_nbt`]
//! checks every tag and length and returns the bytes the blob spans.

use crate::error::DecodeError;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Nesting limit for compounds and lists.
pub const MAX_NBT_DEPTH: usize = 512;

/// Cursor over a packet payload.
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Starts reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fails if any bytes are left unread.
    pub fn expect_end(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array_of<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads one unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array_of::<1>()?[0])
    }

    /// Reads a boolean encoded as `0x00` or `0x01`.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array_of()?))
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array_of()?))
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array_of()?))
    }

    /// Reads a VarInt (at most 5 bytes).
    pub fn read_varint(&mut self) -> Result<i32, DecodeError> {
        let mut value: u32 = 0;
        for i in 0..5 {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(DecodeError::VarIntTooLong)
    }

    /// Reads a VarLong (at most 10 bytes).
    pub fn read_varlong(&mut self) -> Result<i64, DecodeError> {
        let mut value: u64 = 0;
        for i in 0..10 {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i64);
            }
        }
        Err(DecodeError::VarLongTooLong)
    }

    /// Reads a VarInt count and checks it against the bytes left.
    ///
    /// `min_element_size` is the smallest encoding of one element, so a
    /// hostile count cannot trigger a huge allocation.
    pub fn read_len(&mut self, min_element_size: usize) -> Result<usize, DecodeError> {
        let raw = self.read_varint()?;
        let len = usize::try_from(raw).map_err(|_| DecodeError::NegativeLength(raw))?;
        if len.saturating_mul(min_element_size) > self.remaining() {
            return Err(DecodeError::LengthOverrun {
                len,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    /// Reads a VarInt-prefixed byte array.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_len(1)?;
        self.read_bytes(len)
    }

    /// Reads a VarInt-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<&'a str, DecodeError> {
        let bytes = self.read_byte_array()?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Skips one named NBT tag (the root of a blob) and returns its bytes.
    ///
    /// A lone `End` tag stands for an absent blob and spans one byte.
    pub fn skip_nbt(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let tag = self.read_u8()?;
        if tag != TAG_END {
            self.skip_nbt_string()?;
            self.skip_nbt_payload(tag, 0)?;
        }
        Ok(&self.buf[start..self.pos])
    }

    fn skip_nbt_string(&mut self) -> Result<(), DecodeError> {
        let len = self.read_i16()? as u16;
        self.read_bytes(usize::from(len))?;
        Ok(())
    }

    /// Reads an NBT `Int` length and checks it against the bytes left.
    fn read_nbt_len(&mut self, element_size: usize) -> Result<usize, DecodeError> {
        let raw = self.read_i32()?;
        let len = usize::try_from(raw).map_err(|_| DecodeError::NegativeLength(raw))?;
        if len.saturating_mul(element_size) > self.remaining() {
            return Err(DecodeError::LengthOverrun {
                len,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    fn skip_nbt_payload(&mut self, tag: u8, depth: usize) -> Result<(), DecodeError> {
        if depth >= MAX_NBT_DEPTH {
            return Err(DecodeError::NbtTooDeep(MAX_NBT_DEPTH));
        }
        match tag {
            TAG_BYTE => self.skip(1),
            TAG_SHORT => self.skip(2),
            TAG_INT | TAG_FLOAT => self.skip(4),
            TAG_LONG | TAG_DOUBLE => self.skip(8),
            TAG_STRING => self.skip_nbt_string(),
            TAG_BYTE_ARRAY => {
                let len = self.read_nbt_len(1)?;
                self.skip(len)
            }
            TAG_INT_ARRAY => {
                let len = self.read_nbt_len(4)?;
                self.skip(len * 4)
            }
            TAG_LONG_ARRAY => {
                let len = self.read_nbt_len(8)?;
                self.skip(len * 8)
            }
            TAG_LIST => {
                let element = self.read_u8()?;
                let len = self.read_nbt_len(1)?;
                if element == TAG_END && len > 0 {
                    return Err(DecodeError::InvalidNbtTag(TAG_END));
                }
                for _ in 0..len {
                    self.skip_nbt_payload(element, depth + 1)?;
                }
                Ok(())
            }
            TAG_COMPOUND => loop {
                let child = self.read_u8()?;
                if child == TAG_END {
                    return Ok(());
                }
                self.skip_nbt_string()?;
                self.skip_nbt_payload(child, depth + 1)?;
            },
            other => Err(DecodeError::InvalidNbtTag(other)),
        }
    }

    fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads a VarInt-prefixed sequence, decoding each element with `read`.
    pub fn read_seq<T>(
        &mut self,
        min_element_size: usize,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let len = self.read_len(min_element_size)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(read(self)?);
        }
        Ok(out)
    }
}

/// Builds packet payloads in the layout [`PacketReader`] consumes.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends one byte.
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    /// Appends a boolean byte.
    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    /// Appends a big-endian `i16`.
    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Appends a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Appends a big-endian `i64`.
    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Appends a VarInt.
    pub fn write_varint(&mut self, value: i32) -> &mut Self {
        let mut v = value as u32;
        loop {
            if v & !0x7F == 0 {
                self.buf.push(v as u8);
                return self;
            }
            self.buf.push((v & 0x7F) as u8 | 0x80);
            v >>= 7;
        }
    }

    /// Appends a VarLong.
    pub fn write_varlong(&mut self, value: i64) -> &mut Self {
        let mut v = value as u64;
        loop {
            if v & !0x7F == 0 {
                self.buf.push(v as u8);
                return self;
            }
            self.buf.push((v & 0x7F) as u8 | 0x80);
            v >>= 7;
        }
    }

    /// Appends a VarInt-prefixed byte array.
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_varint(bytes.len() as i32);
        self.write_bytes(bytes)
    }

    /// Appends a VarInt-prefixed string.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.write_byte_array(value.as_bytes())
    }

    /// Appends an empty NBT compound with an empty root name.
    pub fn write_empty_nbt(&mut self) -> &mut Self {
        self.write_u8(TAG_COMPOUND).write_i16(0).write_u8(TAG_END)
    }
}

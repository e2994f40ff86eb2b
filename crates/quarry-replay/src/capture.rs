//! Capture file framing.
//!
//! A capture is a sequence of length-prefixed frames, each holding one
//! clientbound packet as it arrived after decompression:
//!
//! ```text
//! +-------------------+-------------------+------------------------+
//! | length (4 bytes)  | packet id         | packet body            |
//! | u32 little-endian | VarInt            | (rest of the frame)    |
//! +-------------------+-------------------+------------------------+
//! ```
//!
//! The length covers the packet id and body, not the prefix itself.

use std::io::{ErrorKind, Read, Write};

use quarry_world::DecodeError;
use quarry_world::wire::{PacketReader, PacketWriter};

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum allowed frame size in bytes. Default: 2 MiB.
    pub max_payload_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 2 * 1024 * 1024,
        }
    }
}

/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame size exceeds the configured maximum.
    #[error("frame size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// The actual frame size.
        size: u32,
        /// The configured maximum.
        max: u32,
    },

    /// The capture ended in the middle of a frame.
    #[error("capture truncated inside a frame")]
    Truncated,

    /// The frame does not start with a valid packet id.
    #[error("bad packet id: {0}")]
    PacketId(#[source] DecodeError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One captured packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol packet id.
    pub packet_id: i32,
    /// Packet body after the id.
    pub body: Vec<u8>,
}

impl Frame {
    /// Splits a frame payload into packet id and body.
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        let mut r = PacketReader::new(payload);
        let packet_id = r.read_varint().map_err(FrameError::PacketId)?;
        let body = r
            .read_bytes(r.remaining())
            .map_err(FrameError::PacketId)?
            .to_vec();
        Ok(Self { packet_id, body })
    }

    /// Packet id followed by body.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_varint(self.packet_id).write_bytes(&self.body);
        w.into_bytes()
    }
}

/// Reads the next frame payload.
///
/// Returns `Ok(None)` at a clean end of capture (no bytes before the length
/// prefix) and [`FrameError::Truncated`] if the capture ends mid-frame.
pub fn read_frame<R: Read>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(FrameError::Truncated),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(FrameError::Io(e)),
        }
    }

    let payload_len = u32::from_le_bytes(len_buf);
    if payload_len > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: config.max_payload_size,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(e)
        }
    })?;
    Ok(Some(payload))
}

/// Writes one length-prefixed frame.
pub fn write_frame<W: Write>(
    writer: &mut W,
    payload: &[u8],
    config: &FrameConfig,
) -> Result<(), FrameError> {
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    if len > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: config.max_payload_size,
        });
    }

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

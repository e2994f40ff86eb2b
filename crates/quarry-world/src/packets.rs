//! Clientbound packets that change the tracked world.
//!
//! Each packet type decodes from the payload that follows the packet id and
//! encodes back to the same layout, which the replay tool and tests use to
//! build captures.

use crate::addressing::{BlockPos, ColumnPos, LocalPos, SectionPos};
use crate::error::DecodeError;
use crate::section::BlockState;
use crate::wire::{PacketReader, PacketWriter};

// ---------------------------------------------------------------------------
// Packet ids
// ---------------------------------------------------------------------------

/// Join game. Carries the initial dimension.
pub const LOGIN: i32 = 0x28;
/// Respawn or dimension change.
pub const RESPAWN: i32 = 0x41;
/// Full column with light data.
pub const LEVEL_CHUNK_WITH_LIGHT: i32 = 0x24;
/// Column unload.
pub const FORGET_LEVEL_CHUNK: i32 = 0x1E;
/// Single block change.
pub const BLOCK_UPDATE: i32 = 0x0A;
/// Several block changes inside one section.
pub const SECTION_BLOCKS_UPDATE: i32 = 0x43;

// ---------------------------------------------------------------------------
// BlockChange
// ---------------------------------------------------------------------------

/// One record of a [`SectionBlocksUpdatePacket`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockChange {
    /// Cell inside the section.
    pub local: LocalPos,
    /// New block state.
    pub state: BlockState,
}

impl BlockChange {
    /// Creates a change record.
    pub fn new(local: LocalPos, state: BlockState) -> Self {
        Self { local, state }
    }

    /// Decodes a record: state in bits 12.., then z, x and y nibbles.
    pub fn unpack(value: i64) -> Result<Self, DecodeError> {
        let state = BlockState::from_wire(value >> 12)?;
        let z = ((value >> 8) & 0xF) as u8;
        let x = ((value >> 4) & 0xF) as u8;
        let y = (value & 0xF) as u8;
        Ok(Self::new(LocalPos::new(x, y, z), state))
    }

    /// Inverse of [`BlockChange::unpack`].
    pub fn pack(self) -> i64 {
        (i64::from(self.state.0) << 12)
            | (i64::from(self.local.z) << 8)
            | (i64::from(self.local.x) << 4)
            | i64::from(self.local.y)
    }
}

// ---------------------------------------------------------------------------
// Packets
// ---------------------------------------------------------------------------

/// Login or respawn: the client is now in `dimension_name`.
///
/// Only the fields up to the dimension type identifier are read; the rest of
/// the payload is not interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnPacket {
    /// Dimension type identifier, e.g. `minecraft:the_nether`.
    pub dimension_name: String,
}

impl SpawnPacket {
    /// Decodes a respawn payload, which leads with the dimension type.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        Ok(Self {
            dimension_name: r.read_string()?.to_string(),
        })
    }

    /// Decodes a login payload.
    ///
    /// ```text
    /// entity id (Int) | hardcore (Bool) | game mode (u8) | previous game mode (u8)
    /// | dimension names (VarInt count + Strings) | registry codec (NBT)
    /// | dimension type (String) | ...
    /// ```
    pub fn decode_login(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        r.read_i32()?;
        r.read_bool()?;
        r.read_u8()?;
        r.read_u8()?;
        r.read_seq(1, |r| r.read_string().map(|_| ()))?;
        r.skip_nbt()?;
        Ok(Self {
            dimension_name: r.read_string()?.to_string(),
        })
    }

    /// Encodes a respawn payload carrying only the dimension type.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_string(&self.dimension_name);
        w.into_bytes()
    }

    /// Encodes a login payload with a single world, an empty registry codec
    /// and the dimension type, in the layout [`SpawnPacket::decode_login`] reads.
    pub fn encode_login(&self, entity_id: i32) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_i32(entity_id)
            .write_bool(false)
            .write_u8(0)
            .write_u8(0xFF)
            .write_varint(1)
            .write_string(&self.dimension_name)
            .write_empty_nbt()
            .write_string(&self.dimension_name);
        w.into_bytes()
    }
}

/// A full column. `data` is the column body, decoded later against the
/// active dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelChunkPacket {
    pub pos: ColumnPos,
    pub data: Vec<u8>,
}

impl LevelChunkPacket {
    /// Reads the coordinate, skips the heightmaps NBT, and reads the body.
    /// Block entities and light data after the body are ignored.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        let x = r.read_i32()?;
        let z = r.read_i32()?;
        r.skip_nbt()?;
        let data = r.read_byte_array()?.to_vec();
        Ok(Self {
            pos: ColumnPos::new(x, z),
            data,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_i32(self.pos.x)
            .write_i32(self.pos.z)
            .write_empty_nbt()
            .write_byte_array(&self.data);
        w.into_bytes()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForgetLevelChunkPacket {
    pub pos: ColumnPos,
}

impl ForgetLevelChunkPacket {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        let x = r.read_i32()?;
        let z = r.read_i32()?;
        r.expect_end()?;
        Ok(Self {
            pos: ColumnPos::new(x, z),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_i32(self.pos.x).write_i32(self.pos.z);
        w.into_bytes()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockUpdatePacket {
    pub pos: BlockPos,
    pub state: BlockState,
}

impl BlockUpdatePacket {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        let pos = BlockPos::unpack(r.read_i64()?);
        let state = BlockState::from_wire(i64::from(r.read_varint()?))?;
        r.expect_end()?;
        Ok(Self { pos, state })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_i64(self.pos.pack())
            .write_varint(self.state.0 as i32);
        w.into_bytes()
    }
}

/// Several changes to one section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionBlocksUpdatePacket {
    pub section: SectionPos,
    /// Carried through; not interpreted.
    pub trust_edges: bool,
    pub changes: Vec<BlockChange>,
}

impl SectionBlocksUpdatePacket {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        let section = SectionPos::unpack(r.read_i64()?);
        let trust_edges = r.read_bool()?;
        let changes = r.read_seq(1, |r| BlockChange::unpack(r.read_varlong()?))?;
        r.expect_end()?;
        Ok(Self {
            section,
            trust_edges,
            changes,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_i64(self.section.pack())
            .write_bool(self.trust_edges)
            .write_varint(self.changes.len() as i32);
        for change in &self.changes {
            w.write_varlong(change.pack());
        }
        w.into_bytes()
    }
}

// ---------------------------------------------------------------------------
// ClientboundPacket
// ---------------------------------------------------------------------------

/// Every packet the world tracker consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientboundPacket {
    Spawn(SpawnPacket),
    LevelChunk(LevelChunkPacket),
    ForgetLevelChunk(ForgetLevelChunkPacket),
    BlockUpdate(BlockUpdatePacket),
    SectionBlocksUpdate(SectionBlocksUpdatePacket),
}

impl ClientboundPacket {
    /// Decodes `payload` according to `packet_id`. Returns `Ok(None)` for ids
    /// the tracker does not consume.
    pub fn decode(packet_id: i32, payload: &[u8]) -> Result<Option<Self>, DecodeError> {
        let packet = match packet_id {
            LOGIN => Self::Spawn(SpawnPacket::decode_login(payload)?),
            RESPAWN => Self::Spawn(SpawnPacket::decode(payload)?),
            LEVEL_CHUNK_WITH_LIGHT => Self::LevelChunk(LevelChunkPacket::decode(payload)?),
            FORGET_LEVEL_CHUNK => Self::ForgetLevelChunk(ForgetLevelChunkPacket::decode(payload)?),
            BLOCK_UPDATE => Self::BlockUpdate(BlockUpdatePacket::decode(payload)?),
            SECTION_BLOCKS_UPDATE => {
                Self::SectionBlocksUpdate(SectionBlocksUpdatePacket::decode(payload)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(packet))
    }

    /// Packet id this packet is sent under. Spawns encode as respawns.
    pub fn id(&self) -> i32 {
        match self {
            Self::Spawn(_) => RESPAWN,
            Self::LevelChunk(_) => LEVEL_CHUNK_WITH_LIGHT,
            Self::ForgetLevelChunk(_) => FORGET_LEVEL_CHUNK,
            Self::BlockUpdate(_) => BLOCK_UPDATE,
            Self::SectionBlocksUpdate(_) => SECTION_BLOCKS_UPDATE,
        }
    }

    /// Encodes the payload (without the packet id).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Spawn(p) => p.encode(),
            Self::LevelChunk(p) => p.encode(),
            Self::ForgetLevelChunk(p) => p.encode(),
            Self::BlockUpdate(p) => p.encode(),
            Self::SectionBlocksUpdate(p) => p.encode(),
        }
    }
}

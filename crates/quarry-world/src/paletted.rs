//! Wire format of the paletted containers inside a column body.
//!
//! ```text
//! +-----------+----------------------------+------------------------------+
//! | bits (u8) | palette                    | data                         |
//! +-----------+----------------------------+------------------------------+
//! | 0         | one VarInt value           | VarInt 0, no words           |
//! | indirect  | VarInt count, VarInt ids   | VarInt count, i64 words      |
//! | direct    | (none)                     | VarInt count, i64 words      |
//! +-----------+----------------------------+------------------------------+
//! ```
//!
//! Block-state containers hold 4096 entries and are indirect up to 8 bits.
//! Biome containers hold 64 entries and are indirect up to 3 bits.

use crate::bit_packed::{BitPackedArray, MAX_BITS};
use crate::error::DecodeError;
use crate::section::{BlockState, SECTION_VOLUME, Section};
use crate::wire::{PacketReader, PacketWriter};

/// Entries in a biome container (4×4×4 cells per section).
const BIOME_ENTRIES: usize = 64;

/// Widest indirect block-state container.
const MAX_INDIRECT_BLOCK_BITS: u8 = 8;

/// Widest indirect biome container.
const MAX_INDIRECT_BIOME_BITS: u8 = 3;

/// Reads one section: non-air count, block states, then biomes.
///
/// The non-air count is recomputed on demand and is not trusted. Biomes are
/// validated and discarded.
pub fn read_section(r: &mut PacketReader<'_>) -> Result<Section, DecodeError> {
    let _non_air = r.read_i16()?;
    let section = read_block_states(r)?;
    skip_biomes(r)?;
    Ok(section)
}

/// Reads a block-state container into a [`Section`].
pub fn read_block_states(r: &mut PacketReader<'_>) -> Result<Section, DecodeError> {
    let bits = r.read_u8()?;
    match bits {
        0 => {
            let state = BlockState::from_wire(i64::from(r.read_varint()?))?;
            read_words(r, 0, SECTION_VOLUME)?;
            Ok(Section::new(state))
        }
        1..=MAX_INDIRECT_BLOCK_BITS => {
            let palette = read_palette(r)?;
            let storage = read_words(r, bits, SECTION_VOLUME)?;
            check_indices(&storage, palette.len())?;
            Ok(Section::from_parts(palette, storage))
        }
        _ if bits <= MAX_BITS => {
            let storage = read_words(r, bits, SECTION_VOLUME)?;
            let states: Vec<BlockState> = (0..SECTION_VOLUME)
                .map(|i| BlockState(storage.get(i)))
                .collect();
            Ok(Section::from_states(&states))
        }
        _ => Err(DecodeError::InvalidBitsPerEntry(bits)),
    }
}

/// Reads and validates a biome container without keeping it.
pub fn skip_biomes(r: &mut PacketReader<'_>) -> Result<(), DecodeError> {
    let bits = r.read_u8()?;
    match bits {
        0 => {
            r.read_varint()?;
            read_words(r, 0, BIOME_ENTRIES)?;
        }
        1..=MAX_INDIRECT_BIOME_BITS => {
            let palette = r.read_seq(1, |r| r.read_varint())?;
            let storage = read_words(r, bits, BIOME_ENTRIES)?;
            check_indices(&storage, palette.len())?;
        }
        _ if bits <= MAX_BITS => {
            read_words(r, bits, BIOME_ENTRIES)?;
        }
        _ => return Err(DecodeError::InvalidBitsPerEntry(bits)),
    }
    Ok(())
}

/// Writes a section in the layout [`read_section`] accepts, with a single-biome container.
pub fn write_section(w: &mut PacketWriter, section: &Section) {
    w.write_i16(section.non_air_count() as i16);
    if section.is_uniform() {
        w.write_u8(0)
            .write_varint(section.get(0).0 as i32)
            .write_varint(0);
    } else if section.bits_per_entry() <= MAX_INDIRECT_BLOCK_BITS {
        w.write_u8(section.bits_per_entry());
        w.write_varint(section.palette().len() as i32);
        for state in section.palette() {
            w.write_varint(state.0 as i32);
        }
        write_words(w, section.storage().raw_data());
    } else {
        // Too many states for a palette on the wire: send ids directly.
        let widest = section.palette().iter().map(|s| s.0).max().unwrap_or(0);
        let bits = ((u32::BITS - widest.leading_zeros()) as u8).max(15);
        let mut direct = BitPackedArray::new(bits, SECTION_VOLUME);
        for i in 0..SECTION_VOLUME {
            direct.set(i, section.get(i).0);
        }
        w.write_u8(bits);
        write_words(w, direct.raw_data());
    }
    // Biomes: single value 0.
    w.write_u8(0).write_varint(0).write_varint(0);
}

fn read_palette(r: &mut PacketReader<'_>) -> Result<Vec<BlockState>, DecodeError> {
    let palette = r.read_seq(1, |r| BlockState::from_wire(i64::from(r.read_varint()?)))?;
    if palette.is_empty() {
        return Err(DecodeError::PaletteIndexOutOfRange { index: 0, len: 0 });
    }
    Ok(palette)
}

fn read_words(
    r: &mut PacketReader<'_>,
    bits: u8,
    entries: usize,
) -> Result<BitPackedArray, DecodeError> {
    let words = r.read_seq(8, |r| r.read_i64().map(|v| v as u64))?;
    BitPackedArray::from_raw(bits, entries, words)
}

fn write_words(w: &mut PacketWriter, words: &[u64]) {
    w.write_varint(words.len() as i32);
    for &word in words {
        w.write_i64(word as i64);
    }
}

fn check_indices(storage: &BitPackedArray, palette_len: usize) -> Result<(), DecodeError> {
    for i in 0..storage.len() {
        let index = storage.get(i);
        if index as usize >= palette_len {
            return Err(DecodeError::PaletteIndexOutOfRange {
                index,
                len: palette_len,
            });
        }
    }
    Ok(())
}

//! Palette-compressed storage for one 16×16×16 section.
//!
//! A section keeps a palette of the distinct [`BlockState`]s it contains and a
//! [`BitPackedArray`] of palette indices addressed by
//! [`section_local_index`](crate::addressing::section_local_index). A
//! uniform section stores no index words at all.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::bit_packed::BitPackedArray;
use crate::error::DecodeError;

/// Side length of a section in blocks.
pub const SECTION_SIZE: usize = 16;

/// Number of blocks in a section (16³).
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Identifies a block type and variant. Opaque to the world beyond equality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockState(pub u32);

impl BlockState {
    /// State id 0, the empty block.
    pub const AIR: Self = Self(0);

    /// Converts a wire integer into a state id, rejecting negative or over-wide values.
    pub fn from_wire(value: i64) -> Result<Self, DecodeError> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| DecodeError::InvalidBlockState(value))
    }
}

/// One 16³ slice of a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Palette mapping local indices to block states.
    palette: Vec<BlockState>,
    /// Packed palette indices, one per block.
    storage: BitPackedArray,
}

impl Section {
    /// Creates a section filled entirely with `fill`.
    pub fn new(fill: BlockState) -> Self {
        Self {
            palette: vec![fill],
            storage: BitPackedArray::new(0, SECTION_VOLUME),
        }
    }

    /// Creates an all-air section.
    pub fn empty() -> Self {
        Self::new(BlockState::AIR)
    }

    /// Builds a section from one state per local index.
    pub fn from_states(states: &[BlockState]) -> Self {
        debug_assert_eq!(states.len(), SECTION_VOLUME);
        let mut lookup: FxHashMap<BlockState, u32> = FxHashMap::default();
        let mut palette = Vec::new();
        let indices: Vec<u32> = states
            .iter()
            .map(|&state| {
                *lookup.entry(state).or_insert_with(|| {
                    palette.push(state);
                    (palette.len() - 1) as u32
                })
            })
            .collect();

        if palette.len() <= 1 {
            return Self::new(palette.first().copied().unwrap_or_default());
        }

        let mut storage =
            BitPackedArray::new(Self::bits_for_palette_size(palette.len()), SECTION_VOLUME);
        for (i, index) in indices.into_iter().enumerate() {
            storage.set(i, index);
        }
        Self { palette, storage }
    }

    /// Adopts a palette and index array decoded off the wire.
    ///
    /// The caller guarantees every stored index is inside `palette`.
    pub(crate) fn from_parts(palette: Vec<BlockState>, storage: BitPackedArray) -> Self {
        debug_assert!(!palette.is_empty());
        debug_assert_eq!(storage.len(), SECTION_VOLUME);
        if storage.bits() == 0 {
            return Self::new(palette[0]);
        }
        Self { palette, storage }
    }

    /// Returns the state at a section-local index.
    pub fn get(&self, index: usize) -> BlockState {
        debug_assert!(index < SECTION_VOLUME);
        self.palette[self.storage.get(index) as usize]
    }

    /// Writes the state at a section-local index and returns the previous one.
    pub fn set(&mut self, index: usize, state: BlockState) -> BlockState {
        debug_assert!(index < SECTION_VOLUME);
        let old = self.get(index);
        if old == state {
            return old;
        }
        let palette_index = self.palette_index_or_insert(state);
        self.storage.set(index, palette_index);
        old
    }

    /// Resets every block to `state`.
    pub fn fill(&mut self, state: BlockState) {
        self.palette = vec![state];
        self.storage = BitPackedArray::new(0, SECTION_VOLUME);
    }

    /// Returns `true` if every block holds the same state.
    pub fn is_uniform(&self) -> bool {
        self.storage.bits() == 0
    }

    /// Number of palette entries, including any no longer referenced.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// The palette, in index order.
    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    /// The packed palette indices.
    pub fn storage(&self) -> &BitPackedArray {
        &self.storage
    }

    /// Number of blocks that are not [`BlockState::AIR`].
    pub fn non_air_count(&self) -> usize {
        if self.is_uniform() {
            return if self.palette[0] == BlockState::AIR { 0 } else { SECTION_VOLUME };
        }
        (0..SECTION_VOLUME)
            .filter(|&i| self.get(i) != BlockState::AIR)
            .count()
    }

    /// Current width of each packed index.
    pub fn bits_per_entry(&self) -> u8 {
        self.storage.bits()
    }

    /// Drops palette entries no block references and narrows the storage.
    pub fn compact(&mut self) {
        if self.is_uniform() {
            return;
        }

        let mut used = vec![false; self.palette.len()];
        for i in 0..SECTION_VOLUME {
            used[self.storage.get(i) as usize] = true;
        }

        let mut remap = vec![0u32; self.palette.len()];
        let mut palette = Vec::new();
        for (old, &is_used) in used.iter().enumerate() {
            if is_used {
                remap[old] = palette.len() as u32;
                palette.push(self.palette[old]);
            }
        }

        if palette.len() == 1 {
            self.fill(palette[0]);
            return;
        }

        let mut storage =
            BitPackedArray::new(Self::bits_for_palette_size(palette.len()), SECTION_VOLUME);
        for i in 0..SECTION_VOLUME {
            storage.set(i, remap[self.storage.get(i) as usize]);
        }
        self.palette = palette;
        self.storage = storage;
    }

    /// Index width for a palette of `size` entries: 0 when uniform, else at least 4.
    fn bits_for_palette_size(size: usize) -> u8 {
        if size <= 1 {
            return 0;
        }
        let needed = usize::BITS - (size - 1).leading_zeros();
        needed.max(4) as u8
    }

    fn palette_index_or_insert(&mut self, state: BlockState) -> u32 {
        if let Some(idx) = self.palette.iter().position(|&s| s == state) {
            return idx as u32;
        }

        let mut new_bits = Self::bits_for_palette_size(self.palette.len() + 1);
        if new_bits != self.storage.bits() {
            // Reclaim stale entries before paying for a wider array.
            self.compact();
            if let Some(idx) = self.palette.iter().position(|&s| s == state) {
                return idx as u32;
            }
            new_bits = Self::bits_for_palette_size(self.palette.len() + 1);
            if new_bits != self.storage.bits() {
                self.storage = self.storage.repacked(new_bits);
            }
        }

        self.palette.push(state);
        (self.palette.len() - 1) as u32
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::section_local_index;

    #[test]
    fn test_empty_section_is_uniform_air() {
        let section = Section::empty();
        assert!(section.is_uniform());
        assert_eq!(section.palette_len(), 1);
        assert_eq!(section.get(0), BlockState::AIR);
        assert_eq!(section.get(SECTION_VOLUME - 1), BlockState::AIR);
    }

    #[test]
    fn test_set_returns_previous_state() {
        let mut section = Section::empty();
        let idx = section_local_index(3, 4, 5);
        assert_eq!(section.set(idx, BlockState(9)), BlockState::AIR);
        assert_eq!(section.set(idx, BlockState(10)), BlockState(9));
        assert_eq!(section.get(idx), BlockState(10));
        assert_eq!(section.get(section_local_index(4, 4, 5)), BlockState::AIR);
    }

    #[test]
    fn test_first_extra_state_uses_four_bits() {
        let mut section = Section::empty();
        section.set(0, BlockState(1));
        assert_eq!(section.bits_per_entry(), 4);
        assert_eq!(section.palette_len(), 2);
    }

    #[test]
    fn test_width_grows_past_sixteen_states() {
        let mut section = Section::empty();
        for i in 1..=16u32 {
            section.set(i as usize, BlockState(i));
        }
        assert_eq!(section.palette_len(), 17);
        assert_eq!(section.bits_per_entry(), 5);
        for i in 1..=16u32 {
            assert_eq!(section.get(i as usize), BlockState(i));
        }
        assert_eq!(section.get(0), BlockState::AIR);
    }

    #[test]
    fn test_stale_entries_are_reclaimed_before_widening() {
        let mut section = Section::empty();
        // Cycle one cell through many states: only two are ever live at once.
        for i in 1..=40u32 {
            section.set(0, BlockState(i));
        }
        assert_eq!(section.get(0), BlockState(40));
        assert_eq!(section.bits_per_entry(), 4);
    }

    #[test]
    fn test_from_states_round_trips() {
        let states: Vec<BlockState> = (0..SECTION_VOLUME)
            .map(|i| BlockState((i % 7) as u32 * 100))
            .collect();
        let section = Section::from_states(&states);
        assert_eq!(section.palette_len(), 7);
        for (i, &state) in states.iter().enumerate() {
            assert_eq!(section.get(i), state);
        }
    }

    #[test]
    fn test_from_uniform_states_stores_nothing() {
        let section = Section::from_states(&vec![BlockState(5); SECTION_VOLUME]);
        assert!(section.is_uniform());
        assert_eq!(section.get(1234), BlockState(5));
    }

    #[test]
    fn test_compact_collapses_to_uniform() {
        let mut section = Section::empty();
        section.set(17, BlockState(3));
        section.set(17, BlockState::AIR);
        section.compact();
        assert!(section.is_uniform());
        assert_eq!(section.get(17), BlockState::AIR);
    }

    #[test]
    fn test_block_state_from_wire_range() {
        assert_eq!(BlockState::from_wire(42).unwrap(), BlockState(42));
        assert!(matches!(
            BlockState::from_wire(-1),
            Err(DecodeError::InvalidBlockState(-1))
        ));
        assert!(BlockState::from_wire(i64::from(u32::MAX) + 1).is_err());
    }
}

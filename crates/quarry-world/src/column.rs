//! A vertical stack of sections sharing one [`ColumnPos`](crate::ColumnPos).

use crate::addressing::{BlockPos, section_index_in_column};
use crate::dimension::DimensionType;
use crate::error::DecodeError;
use crate::paletted;
use crate::section::{BlockState, Section};
use crate::wire::{PacketReader, PacketWriter};

/// The sections of one column, bottom to top.
///
/// The section count and floor are fixed by the dimension the column was
/// created for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    sections: Vec<Section>,
    min_y: i32,
}

impl Column {
    /// An all-air column sized for `dimension`.
    pub fn empty(dimension: &DimensionType) -> Self {
        Self {
            sections: vec![Section::empty(); dimension.section_count()],
            min_y: dimension.min_y,
        }
    }

    /// Wraps already-built sections. `sections[0]` starts at block `min_y`.
    pub fn from_sections(sections: Vec<Section>, min_y: i32) -> Self {
        Self { sections, min_y }
    }

    /// Decodes a column body holding exactly one section per section of `dimension`.
    pub fn decode(data: &[u8], dimension: &DimensionType) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(data);
        let mut sections = Vec::with_capacity(dimension.section_count());
        for _ in 0..dimension.section_count() {
            sections.push(paletted::read_section(&mut r)?);
        }
        r.expect_end()?;
        Ok(Self {
            sections,
            min_y: dimension.min_y,
        })
    }

    /// Encodes the column body in the layout [`Column::decode`] reads.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        for section in &self.sections {
            paletted::write_section(&mut w, section);
        }
        w.into_bytes()
    }

    /// Lowest block Y covered by this column.
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Number of sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// The section at `index` (0 = bottom), if in range.
    pub fn section(&self, index: i32) -> Option<&Section> {
        usize::try_from(index).ok().and_then(|i| self.sections.get(i))
    }

    /// Mutable access to the section at `index`, if in range.
    pub fn section_mut(&mut self, index: i32) -> Option<&mut Section> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.sections.get_mut(i))
    }

    /// Iterates sections bottom to top.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// The block at an absolute position, or `None` above or below the column.
    ///
    /// Only the low four bits of X and Z are used.
    pub fn block(&self, pos: BlockPos) -> Option<BlockState> {
        self.section(section_index_in_column(pos.y, self.min_y))
            .map(|section| section.get(pos.local().index()))
    }

    /// Writes a block at an absolute position and returns the previous state,
    /// or `None` (nothing written) above or below the column.
    pub fn set_block(&mut self, pos: BlockPos, state: BlockState) -> Option<BlockState> {
        let min_y = self.min_y;
        self.section_mut(section_index_in_column(pos.y, min_y))
            .map(|section| section.set(pos.local().index(), state))
    }
}

//! Coordinate types and the pure conversions between them.
//!
//! Absolute block coordinates map onto a [`ColumnPos`] (the block's 16×16
//! footprint in the XZ plane), a section index within that column, and a
//! local index in `[0, 4096)` inside the section. All shifts are arithmetic so
//! negative coordinates floor toward negative infinity.

use serde::{Deserialize, Serialize};

/// Identifies a column by its column-grid `(x, z)` coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnPos {
    /// Column-grid X (block X `>> 4`).
    pub x: i32,
    /// Column-grid Z (block Z `>> 4`).
    pub z: i32,
}

impl ColumnPos {
    /// Creates a column position.
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the column containing the absolute block position.
    pub fn of_block(pos: BlockPos) -> Self {
        column_of(pos.x, pos.z)
    }
}

/// An absolute block position in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Creates a block position.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Decodes a packed protocol position.
    ///
    /// Layout: 26 bits X (high), 26 bits Z, 12 bits Y (low). Every field is
    /// two's complement and sign-extended by the shifts.
    pub fn unpack(value: i64) -> Self {
        Self {
            x: (value >> 38) as i32,
            y: ((value << 52) >> 52) as i32,
            z: ((value << 26) >> 38) as i32,
        }
    }

    /// Encodes this position into the packed protocol layout.
    pub fn pack(self) -> i64 {
        ((i64::from(self.x) & 0x3FF_FFFF) << 38)
            | ((i64::from(self.z) & 0x3FF_FFFF) << 12)
            | (i64::from(self.y) & 0xFFF)
    }

    /// Returns the position of this block relative to its section.
    pub fn local(self) -> LocalPos {
        LocalPos {
            x: (self.x & 15) as u8,
            y: (self.y & 15) as u8,
            z: (self.z & 15) as u8,
        }
    }
}

/// Identifies one 16³ section: column X/Z plus the absolute section Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectionPos {
    /// Column-grid X.
    pub x: i32,
    /// Absolute section Y (block Y `>> 4`), not corrected for the dimension floor.
    pub y: i32,
    /// Column-grid Z.
    pub z: i32,
}

impl SectionPos {
    /// Creates a section position.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Decodes a packed section identifier.
    ///
    /// Layout: 22 bits X (high), 22 bits Z, 20 bits Y (low).
    pub fn unpack(value: i64) -> Self {
        Self {
            x: (value >> 42) as i32,
            y: ((value << 44) >> 44) as i32,
            z: ((value << 22) >> 42) as i32,
        }
    }

    /// Encodes this section position into the packed layout.
    pub fn pack(self) -> i64 {
        ((i64::from(self.x) & 0x3F_FFFF) << 42)
            | ((i64::from(self.z) & 0x3F_FFFF) << 20)
            | (i64::from(self.y) & 0xF_FFFF)
    }

    /// The column this section belongs to.
    pub fn column(self) -> ColumnPos {
        ColumnPos::new(self.x, self.z)
    }
}

/// A position inside a section, each component in `[0, 16)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalPos {
    /// Local X.
    pub x: u8,
    /// Local Y.
    pub y: u8,
    /// Local Z.
    pub z: u8,
}

impl LocalPos {
    /// Creates a local position. Components are masked to four bits.
    pub fn new(x: u8, y: u8, z: u8) -> Self {
        Self {
            x: x & 15,
            y: y & 15,
            z: z & 15,
        }
    }

    /// The section-local index of this position.
    pub fn index(self) -> usize {
        section_local_index(i32::from(self.x), i32::from(self.y), i32::from(self.z))
    }

    /// Inverse of [`LocalPos::index`].
    pub fn from_index(index: usize) -> Self {
        Self {
            x: (index & 15) as u8,
            y: ((index >> 8) & 15) as u8,
            z: ((index >> 4) & 15) as u8,
        }
    }
}

/// Column containing the block at `(x, z)`.
pub fn column_of(x: i32, z: i32) -> ColumnPos {
    ColumnPos { x: x >> 4, z: z >> 4 }
}

/// Packs a position inside a section into `[0, 4096)`: Y-major, then Z, then X.
///
/// Only the low four bits of each component are used.
pub fn section_local_index(x: i32, y: i32, z: i32) -> usize {
    (((y & 15) << 8) | ((z & 15) << 4) | (x & 15)) as usize
}

/// Index of the section holding block height `y` in a column whose floor is `min_y`.
///
/// May be negative or past the top of the column; callers bounds-check.
/// Defined for every `y` and `min_y`: the difference is taken in `i64`, and
/// after the shift it always fits back into `i32`.
pub fn section_index_in_column(y: i32, min_y: i32) -> i32 {
    ((i64::from(y) - i64::from(min_y)) >> 4) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_of_floors_negative_coordinates() {
        assert_eq!(column_of(0, 0), ColumnPos::new(0, 0));
        assert_eq!(column_of(15, 15), ColumnPos::new(0, 0));
        assert_eq!(column_of(16, -1), ColumnPos::new(1, -1));
        assert_eq!(column_of(-16, -17), ColumnPos::new(-1, -2));
        assert_eq!(column_of(i32::MIN, i32::MAX), ColumnPos::new(-134_217_728, 134_217_727));
    }

    #[test]
    fn test_local_index_matches_direct_computation_for_all_signs() {
        let coords: [(i32, i32, i32); 6] = [
            (0, 0, 0),
            (5, 70, 9),
            (-1, -1, -1),
            (-17, 3, 31),
            (1_000_003, -64, -999_999),
            (-30_000_000, 319, 30_000_000),
        ];
        for (x, y, z) in coords {
            let column = column_of(x, z);
            // Rebuild the block from its column origin plus a euclidean remainder.
            let (lx, ly, lz) = (x.rem_euclid(16), y.rem_euclid(16), z.rem_euclid(16));
            assert_eq!(column.x * 16 + lx, x, "x for ({x}, {y}, {z})");
            assert_eq!(column.z * 16 + lz, z, "z for ({x}, {y}, {z})");

            let direct = section_local_index(x, y, z);
            assert_eq!(section_local_index(lx, ly, lz), direct);
            assert_eq!(BlockPos::new(x, y, z).local().index(), direct);
        }
    }

    #[test]
    fn test_section_index_at_extreme_heights() {
        assert_eq!(section_index_in_column(-64, -64), 0);
        assert_eq!(section_index_in_column(-49, -64), 0);
        assert_eq!(section_index_in_column(-48, -64), 1);
        assert_eq!(section_index_in_column(-65, -64), -1);
        assert_eq!(section_index_in_column(i32::MAX, -64), 134_217_731);
        assert_eq!(section_index_in_column(i32::MIN, 0), -134_217_728);
        assert_eq!(section_index_in_column(i32::MIN, i32::MAX), -268_435_456);
        assert_eq!(section_index_in_column(i32::MAX, i32::MIN), 268_435_455);
    }

    #[test]
    fn test_local_index_is_a_bijection() {
        let mut seen = vec![false; 4096];
        for y in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    let idx = section_local_index(x, y, z);
                    assert!(!seen[idx]);
                    seen[idx] = true;
                    let local = LocalPos::from_index(idx);
                    assert_eq!(
                        (i32::from(local.x), i32::from(local.y), i32::from(local.z)),
                        (x, y, z)
                    );
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_section_index_relative_to_floor() {
        assert_eq!(section_index_in_column(-64, -64), 0);
        assert_eq!(section_index_in_column(-49, -64), 0);
        assert_eq!(section_index_in_column(-48, -64), 1);
        assert_eq!(section_index_in_column(0, -64), 4);
        assert_eq!(section_index_in_column(319, -64), 23);
        assert_eq!(section_index_in_column(-65, -64), -1);
    }

    #[test]
    fn test_section_pos_unpack_known_triple() {
        let value: i64 = (-1i64 << 42) | (5i64 << 20) | 3;
        let section = SectionPos::unpack(value);
        assert_eq!(section, SectionPos::new(-1, 3, 5));
        assert_eq!(section.pack(), value);
    }

    #[test]
    fn test_section_pos_negative_fields() {
        for (x, y, z) in [(-1, -4, -1), (123_456, -2, -654_321), (-2_097_152, 524_287, 2_097_151)] {
            let section = SectionPos::new(x, y, z);
            assert_eq!(SectionPos::unpack(section.pack()), section);
        }
    }

    #[test]
    fn test_block_pos_unpack() {
        // x = 18357644, y = 831, z = -20882616
        let value: i64 = 0b0100011000000111011000110010110000010101101101001000001100111111u64 as i64;
        assert_eq!(BlockPos::unpack(value), BlockPos::new(18_357_644, 831, -20_882_616));

        let negative = BlockPos::new(-1, -64, -300);
        assert_eq!(BlockPos::unpack(negative.pack()), negative);
    }
}

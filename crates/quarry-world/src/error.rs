//! Error types for packet decoding and world updates.

/// Error returned by a [`WorldListener`](crate::events::WorldListener).
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A payload could not be decoded. Nothing was applied to the world.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload ended before the field being read.
    #[error("payload truncated at offset {offset}: needed {needed} more bytes")]
    Truncated {
        /// Read position where the field started.
        offset: usize,
        /// Bytes missing to complete the field.
        needed: usize,
    },

    /// A VarInt ran past five bytes.
    #[error("VarInt is longer than 5 bytes")]
    VarIntTooLong,

    /// A VarLong ran past ten bytes.
    #[error("VarLong is longer than 10 bytes")]
    VarLongTooLong,

    /// A length prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A length prefix exceeds what the remaining payload could hold.
    #[error("length prefix {len} exceeds remaining {remaining} bytes")]
    LengthOverrun {
        /// Declared element count or byte length.
        len: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A string was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A block state identifier was negative or wider than 32 bits.
    #[error("block state id {0} out of range")]
    InvalidBlockState(i64),

    /// A paletted container declared an unsupported entry width.
    #[error("unsupported bits per entry: {0}")]
    InvalidBitsPerEntry(u8),

    /// A packed data array had the wrong number of words.
    #[error("expected {expected} packed words, got {actual}")]
    DataLengthMismatch {
        /// Words required for the container size and entry width.
        expected: usize,
        /// Words present on the wire.
        actual: usize,
    },

    /// A packed entry pointed past the end of its palette.
    #[error("palette index {index} out of range for palette of {len}")]
    PaletteIndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Palette length.
        len: usize,
    },

    /// An NBT blob held a tag id outside 0..=12, or a non-empty list of `End`.
    #[error("invalid NBT tag id {0}")]
    InvalidNbtTag(u8),

    /// An NBT blob nested compounds or lists past the limit.
    #[error("NBT nested deeper than {0} levels")]
    NbtTooDeep(usize),

    /// Bytes remained after a structure that must fill its buffer exactly.
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// Errors surfaced by [`World`](crate::World) and the packet decoders.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The message payload was malformed.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The active dimension has no registered metadata.
    #[error("dimension type {0} not found")]
    DimensionNotFound(String),

    /// A listener rejected an event. The state change it reported was kept.
    #[error("world listener failed: {0}")]
    Listener(#[source] ListenerError),
}

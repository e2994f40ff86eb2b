//! Client-side mirror of a remote voxel world: column/section storage, the
//! packet-driven [`World`] tracker, and the decoders that feed it.

pub mod addressing;
pub mod bit_packed;
pub mod column;
pub mod dimension;
pub mod error;
pub mod events;
pub mod handler;
pub mod packets;
pub mod paletted;
pub mod section;
pub mod wire;
pub mod world;

pub use addressing::{
    BlockPos, ColumnPos, LocalPos, SectionPos, column_of, section_index_in_column,
    section_local_index,
};
pub use column::Column;
pub use dimension::{DimensionRegistry, DimensionSource, DimensionType};
pub use error::{DecodeError, ListenerError, WorldError};
pub use events::{EventChannel, WorldEvent, WorldListener};
pub use handler::WorldPacketHandler;
pub use packets::{BlockChange, ClientboundPacket};
pub use section::{BlockState, SECTION_SIZE, SECTION_VOLUME, Section};
pub use world::World;

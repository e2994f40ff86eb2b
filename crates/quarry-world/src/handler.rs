//! Routes decoded packets to [`World`] mutations.
//!
//! Every payload is fully decoded before the world is touched, so a malformed
//! packet never leaves a partial change behind.

use std::sync::Arc;

use tracing::trace;

use crate::column::Column;
use crate::dimension::DimensionSource;
use crate::error::WorldError;
use crate::packets::ClientboundPacket;
use crate::world::World;

/// Applies world packets to a shared [`World`].
pub struct WorldPacketHandler {
    world: Arc<World>,
    dimensions: Arc<dyn DimensionSource>,
}

impl WorldPacketHandler {
    /// Creates a handler that resolves column heights through `dimensions`.
    pub fn new(world: Arc<World>, dimensions: Arc<dyn DimensionSource>) -> Self {
        Self { world, dimensions }
    }

    /// The world this handler mutates.
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Decodes and applies one packet.
    ///
    /// Returns `Ok(false)` for packet ids that do not concern the world.
    pub fn handle(&self, packet_id: i32, payload: &[u8]) -> Result<bool, WorldError> {
        let Some(packet) = ClientboundPacket::decode(packet_id, payload)? else {
            trace!("Ignoring packet 0x{:02X} ({} bytes)", packet_id, payload.len());
            return Ok(false);
        };
        self.apply(packet)?;
        Ok(true)
    }

    /// Applies an already decoded packet.
    pub fn apply(&self, packet: ClientboundPacket) -> Result<(), WorldError> {
        match packet {
            ClientboundPacket::Spawn(spawn) => {
                self.dimensions.enter_dimension(&spawn.dimension_name);
                self.world.reset();
            }
            ClientboundPacket::LevelChunk(chunk) => {
                let dimension = self.dimensions.active_dimension()?;
                let column = Column::decode(&chunk.data, &dimension)?;
                self.world.load_column(chunk.pos, column)?;
            }
            ClientboundPacket::ForgetLevelChunk(forget) => {
                self.world.unload_column(forget.pos)?;
            }
            ClientboundPacket::BlockUpdate(update) => {
                self.world.set_voxel(update.pos, update.state)?;
            }
            ClientboundPacket::SectionBlocksUpdate(batch) => {
                let dimension = self.dimensions.active_dimension()?;
                let index = batch.section.y - dimension.min_section_y();
                self.world
                    .set_voxel_batch(batch.section.column(), index, &batch.changes)?;
            }
        }
        Ok(())
    }
}

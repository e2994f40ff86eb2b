//! Drives a [`WorldPacketHandler`] from a capture and tallies what happened.

use std::io::Read;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use quarry_config::{ConfigError, WorldConfig};
use quarry_world::{
    DimensionRegistry, DimensionType, WorldError, WorldEvent, WorldPacketHandler,
};
use tracing::{debug, warn};

use crate::capture::{Frame, FrameConfig, FrameError, read_frame};

/// Errors that end a replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The capture file could not be opened.
    #[error("cannot open capture {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The capture stream itself is broken.
    #[error("frame {frame}: {source}")]
    Frame {
        frame: u64,
        #[source]
        source: FrameError,
    },

    /// A packet failed to apply and the replay was told to stop.
    #[error("frame {frame} (packet 0x{packet_id:02X}): {source}")]
    Packet {
        frame: u64,
        packet_id: i32,
        #[source]
        source: WorldError,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The event consumer thread could not be started.
    #[error("failed to spawn event consumer: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Counters for one replay run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Frames read from the capture.
    pub frames: u64,
    /// Packets that changed or reset the world.
    pub handled: u64,
    /// Packets with ids the world does not track.
    pub ignored: u64,
    /// Packets that failed to decode or apply.
    pub failed: u64,
}

/// Reads frames until the capture ends, applying each through `handler`.
///
/// A packet that fails is logged and counted; with `stop_on_error` it ends
/// the replay instead. A broken frame always ends it.
pub fn replay<R: Read>(
    reader: &mut R,
    handler: &WorldPacketHandler,
    frame_config: &FrameConfig,
    stop_on_error: bool,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    loop {
        let frame_no = summary.frames;
        let payload = match read_frame(reader, frame_config) {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(source) => {
                return Err(ReplayError::Frame {
                    frame: frame_no,
                    source,
                });
            }
        };
        summary.frames += 1;

        let frame = match Frame::parse(&payload) {
            Ok(frame) => frame,
            Err(source) => {
                if stop_on_error {
                    return Err(ReplayError::Frame {
                        frame: frame_no,
                        source,
                    });
                }
                warn!("Frame {}: {}", frame_no, source);
                summary.failed += 1;
                continue;
            }
        };

        match handler.handle(frame.packet_id, &frame.body) {
            Ok(true) => summary.handled += 1,
            Ok(false) => summary.ignored += 1,
            Err(source) if stop_on_error => {
                return Err(ReplayError::Packet {
                    frame: frame_no,
                    packet_id: frame.packet_id,
                    source,
                });
            }
            Err(e) => {
                warn!(
                    "Frame {} (packet 0x{:02X}) failed: {}",
                    frame_no, frame.packet_id, e
                );
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// Builds the dimension registry described by `config`.
pub fn registry_from_config(config: &WorldConfig) -> DimensionRegistry {
    let mut registry = DimensionRegistry::new(config.initial_dimension.clone());
    for entry in &config.dimensions {
        registry.register(DimensionType::new(
            entry.name.clone(),
            entry.min_y,
            entry.height,
        ));
    }
    registry
}

// ---------------------------------------------------------------------------
// Event consumer
// ---------------------------------------------------------------------------

/// Events received, by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventTally {
    pub columns_loaded: u64,
    pub columns_unloaded: u64,
    pub voxels_changed: u64,
    pub batch_voxels_changed: u64,
}

impl EventTally {
    fn record(&mut self, event: &WorldEvent) {
        match event {
            WorldEvent::ColumnLoaded(_) => self.columns_loaded += 1,
            WorldEvent::ColumnUnloaded(_) => self.columns_unloaded += 1,
            WorldEvent::VoxelChanged { .. } => self.voxels_changed += 1,
            WorldEvent::BatchVoxelChanged { .. } => self.batch_voxels_changed += 1,
        }
    }

    /// Total events received.
    pub fn total(&self) -> u64 {
        self.columns_loaded + self.columns_unloaded + self.voxels_changed + self.batch_voxels_changed
    }
}

/// Drains `events` on a named thread until every sender is gone.
pub fn spawn_event_consumer(
    events: Receiver<WorldEvent>,
) -> Result<JoinHandle<EventTally>, ReplayError> {
    thread::Builder::new()
        .name("world-events".to_string())
        .spawn(move || {
            let mut tally = EventTally::default();
            for event in events {
                debug!("{:?}", event);
                tally.record(&event);
            }
            tally
        })
        .map_err(ReplayError::Spawn)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use quarry_world::packets::{
        self, BlockUpdatePacket, ForgetLevelChunkPacket, LevelChunkPacket, SpawnPacket,
    };
    use quarry_world::{
        BlockPos, BlockState, Column, ColumnPos, DimensionSource, EventChannel, World,
    };

    use super::*;
    use crate::capture::write_frame;

    fn push(capture: &mut Vec<u8>, packet_id: i32, body: Vec<u8>) {
        let frame = Frame { packet_id, body };
        write_frame(capture, &frame.to_payload(), &FrameConfig::default()).unwrap();
    }

    fn handler_with_events() -> (WorldPacketHandler, Receiver<WorldEvent>) {
        let (channel, events) = EventChannel::bounded(256);
        let world = Arc::new(World::with_listener(Arc::new(channel)));
        let dimensions = Arc::new(registry_from_config(&WorldConfig::default()));
        (WorldPacketHandler::new(world, dimensions), events)
    }

    fn sample_capture() -> Vec<u8> {
        let end = DimensionType::new("minecraft:the_end", 0, 256);
        let mut capture = Vec::new();
        push(
            &mut capture,
            packets::LOGIN,
            SpawnPacket {
                dimension_name: "minecraft:the_end".into(),
            }
            .encode_login(1),
        );
        for x in 0..3 {
            push(
                &mut capture,
                packets::LEVEL_CHUNK_WITH_LIGHT,
                LevelChunkPacket {
                    pos: ColumnPos::new(x, 0),
                    data: Column::empty(&end).encode(),
                }
                .encode(),
            );
        }
        push(&mut capture, 0x2C, vec![1, 2, 3]);
        push(
            &mut capture,
            packets::BLOCK_UPDATE,
            BlockUpdatePacket {
                pos: BlockPos::new(17, 64, 2),
                state: BlockState(42),
            }
            .encode(),
        );
        push(
            &mut capture,
            packets::FORGET_LEVEL_CHUNK,
            ForgetLevelChunkPacket {
                pos: ColumnPos::new(0, 0),
            }
            .encode(),
        );
        capture
    }

    #[test]
    fn test_replay_applies_capture() {
        let (handler, events) = handler_with_events();
        let summary = replay(
            &mut Cursor::new(sample_capture()),
            &handler,
            &FrameConfig::default(),
            false,
        )
        .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                frames: 7,
                handled: 6,
                ignored: 1,
                failed: 0,
            }
        );
        let world = handler.world();
        assert_eq!(world.loaded_count(), 2);
        assert_eq!(world.block_at(BlockPos::new(17, 64, 2)), Some(BlockState(42)));

        let mut tally = EventTally::default();
        for event in events.try_iter() {
            tally.record(&event);
        }
        assert_eq!(tally.columns_loaded, 3);
        assert_eq!(tally.columns_unloaded, 1);
        assert_eq!(tally.voxels_changed, 1);
    }

    #[test]
    fn test_failed_packet_counted_or_fatal() {
        let mut capture = Vec::new();
        push(&mut capture, packets::FORGET_LEVEL_CHUNK, vec![0; 3]);
        push(
            &mut capture,
            packets::FORGET_LEVEL_CHUNK,
            ForgetLevelChunkPacket {
                pos: ColumnPos::new(5, 5),
            }
            .encode(),
        );

        let (handler, _events) = handler_with_events();
        let summary = replay(
            &mut Cursor::new(capture.clone()),
            &handler,
            &FrameConfig::default(),
            false,
        )
        .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.handled, 1);

        let err = replay(
            &mut Cursor::new(capture),
            &handler,
            &FrameConfig::default(),
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Packet {
                frame: 0,
                packet_id: packets::FORGET_LEVEL_CHUNK,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_capture_is_fatal() {
        let mut capture = sample_capture();
        capture.truncate(capture.len() - 1);
        let (handler, _events) = handler_with_events();
        let err = replay(
            &mut Cursor::new(capture),
            &handler,
            &FrameConfig::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Frame {
                frame: 6,
                source: FrameError::Truncated
            }
        ));
    }

    #[test]
    fn test_registry_uses_configured_dimensions() {
        let mut config = WorldConfig::default();
        config.initial_dimension = "minecraft:the_nether".to_string();
        let registry = registry_from_config(&config);
        assert_eq!(registry.len(), 3);
        let active = registry.active_dimension().unwrap();
        assert_eq!(active.section_count(), 16);
    }

    #[test]
    fn test_consumer_drains_until_world_dropped() {
        let (handler, events) = handler_with_events();
        let consumer = spawn_event_consumer(events).unwrap();
        replay(
            &mut Cursor::new(sample_capture()),
            &handler,
            &FrameConfig::default(),
            false,
        )
        .unwrap();
        drop(handler);

        let tally = consumer.join().unwrap();
        assert_eq!(tally.total(), 5);
    }
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;

use quarry_world::{
    BlockPos, BlockState, Column, ColumnPos, ListenerError, Section, World, WorldEvent,
};

const COLUMNS: i32 = 32;
const ROUNDS: usize = 200;
const READERS: usize = 4;
const SECTIONS: usize = 24;
const MIN_Y: i32 = -64;

fn marker_for(pos: ColumnPos, round: usize) -> BlockState {
    BlockState(((round as u32) << 8) | (pos.x as u32 + 1))
}

/// Every section filled with the same marker, so a reader can tell a whole
/// column from a mixed one.
fn marked_column(marker: BlockState) -> Column {
    Column::from_sections(vec![Section::new(marker); SECTIONS], MIN_Y)
}

#[test]
fn test_readers_never_see_partial_columns() {
    let world = Arc::new(World::new());
    let stop = Arc::new(AtomicBool::new(false));
    let observed = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let world = world.clone();
            let stop = stop.clone();
            let observed = observed.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    for x in 0..COLUMNS {
                        let pos = ColumnPos::new(x, 0);
                        let whole = world.read_column(pos, |column| {
                            let first = column.section(0).map(|s| s.get(0));
                            column.section_count() == SECTIONS
                                && column
                                    .sections()
                                    .all(|s| s.is_uniform() && Some(s.get(4095)) == first)
                                && first.is_some_and(|m| m.0 & 0xFF == x as u32 + 1)
                        });
                        if let Some(whole) = whole {
                            assert!(whole, "column {x} observed partially built");
                            observed.fetch_add(1, Ordering::Relaxed);
                        }
                        let _ = world.is_loaded(BlockPos::new(x * 16, 0, 3));
                    }
                }
            })
        })
        .collect();

    for round in 0..ROUNDS {
        for x in 0..COLUMNS {
            let pos = ColumnPos::new(x, 0);
            world
                .load_column(pos, marked_column(marker_for(pos, round)))
                .unwrap();
        }
        for x in (0..COLUMNS).step_by(2) {
            world.unload_column(ColumnPos::new(x, 0)).unwrap();
        }
    }

    stop.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(world.loaded_count(), COLUMNS as usize / 2);
    assert!(observed.load(Ordering::Relaxed) > 0);
}

#[test]
fn test_listener_reading_world_does_not_deadlock_under_contention() {
    let handle: Arc<OnceLock<Weak<World>>> = Arc::new(OnceLock::new());
    let world_ref = handle.clone();
    let listener = move |event: &WorldEvent| -> Result<(), ListenerError> {
        if let Some(world) = world_ref.get().and_then(Weak::upgrade) {
            match event {
                WorldEvent::ColumnLoaded(pos) => assert!(world.is_column_loaded(*pos)),
                WorldEvent::VoxelChanged { pos, state } => {
                    assert_eq!(world.block_at(*pos), Some(*state))
                }
                _ => {}
            }
        }
        Ok(())
    };
    let world = Arc::new(World::with_listener(Arc::new(listener)));
    let _ = handle.set(Arc::downgrade(&world));

    let stop = Arc::new(AtomicBool::new(false));
    let reader = {
        let world = world.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                let _ = world.loaded_count();
                let _ = world.block_at(BlockPos::new(1, 1, 1));
            }
        })
    };

    for i in 0..500u32 {
        let pos = ColumnPos::new(0, 0);
        world
            .load_column(pos, marked_column(BlockState::AIR))
            .unwrap();
        assert!(world
            .set_voxel(BlockPos::new(1, 1, 1), BlockState(i + 1))
            .unwrap());
    }

    stop.store(true, Ordering::Release);
    reader.join().unwrap();
}

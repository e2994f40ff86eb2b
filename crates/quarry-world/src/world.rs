//! The client's mirror of the remote world.
//!
//! [`World`] owns every loaded [`Column`], keyed by [`ColumnPos`], behind a
//! single reader/writer lock. One update path mutates it while any number of
//! threads query it. Columns are built completely before the write lock is
//! taken, so a reader sees either no column or a whole one.
//!
//! Listener notifications are sent after the lock is released. A listener
//! error is returned to the caller, but the change it reports stays applied.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::addressing::{BlockPos, ColumnPos};
use crate::column::Column;
use crate::error::WorldError;
use crate::events::{WorldEvent, WorldListener};
use crate::packets::BlockChange;
use crate::section::BlockState;

/// Loaded columns plus the optional listener told about every change.
pub struct World {
    columns: RwLock<FxHashMap<ColumnPos, Column>>,
    listener: Option<Arc<dyn WorldListener>>,
}

impl World {
    /// Creates an empty world with no listener.
    pub fn new() -> Self {
        Self {
            columns: RwLock::new(FxHashMap::default()),
            listener: None,
        }
    }

    /// Creates an empty world that reports changes to `listener`.
    pub fn with_listener(listener: Arc<dyn WorldListener>) -> Self {
        Self {
            columns: RwLock::new(FxHashMap::default()),
            listener: Some(listener),
        }
    }

    /// Forgets every column. Used when the client changes dimension.
    pub fn reset(&self) {
        let discarded = std::mem::take(&mut *self.columns.write());
        debug!("World reset, discarded {} columns", discarded.len());
    }

    /// Returns `true` if the column containing `pos` is loaded.
    pub fn is_loaded(&self, pos: BlockPos) -> bool {
        self.is_column_loaded(ColumnPos::of_block(pos))
    }

    /// Returns `true` if the column at `pos` is loaded.
    pub fn is_column_loaded(&self, pos: ColumnPos) -> bool {
        self.columns.read().contains_key(&pos)
    }

    /// Number of loaded columns.
    pub fn loaded_count(&self) -> usize {
        self.columns.read().len()
    }

    /// Positions of all loaded columns, in no particular order.
    pub fn loaded_columns(&self) -> Vec<ColumnPos> {
        self.columns.read().keys().copied().collect()
    }

    /// The block at `pos`, or `None` if its column is not loaded or `pos`
    /// lies above or below it.
    pub fn block_at(&self, pos: BlockPos) -> Option<BlockState> {
        self.columns
            .read()
            .get(&ColumnPos::of_block(pos))
            .and_then(|column| column.block(pos))
    }

    /// Runs `f` against the column at `pos` while holding the read lock.
    ///
    /// Keep `f` short: the writer waits for it.
    pub fn read_column<R>(&self, pos: ColumnPos, f: impl FnOnce(&Column) -> R) -> Option<R> {
        self.columns.read().get(&pos).map(f)
    }

    /// Inserts `column` at `pos`, replacing any column already there.
    pub fn load_column(&self, pos: ColumnPos, column: Column) -> Result<(), WorldError> {
        let replaced = self.columns.write().insert(pos, column).is_some();
        if replaced {
            debug!("Reloaded column ({}, {})", pos.x, pos.z);
        } else {
            debug!("Loaded column ({}, {})", pos.x, pos.z);
        }
        self.notify(&WorldEvent::ColumnLoaded(pos))
    }

    /// Removes the column at `pos`. Unloading an absent column does nothing.
    ///
    /// The listener hears about the unload while the column is still
    /// present. The column is removed even if the listener fails.
    pub fn unload_column(&self, pos: ColumnPos) -> Result<(), WorldError> {
        if !self.is_column_loaded(pos) {
            trace!("Unload of absent column ({}, {}) ignored", pos.x, pos.z);
            return Ok(());
        }
        let notified = self.notify(&WorldEvent::ColumnUnloaded(pos));
        self.columns.write().remove(&pos);
        debug!("Unloaded column ({}, {})", pos.x, pos.z);
        notified
    }

    /// Writes one block. Returns `Ok(false)` without touching anything if the
    /// column is not loaded or `pos` lies above or below it.
    pub fn set_voxel(&self, pos: BlockPos, state: BlockState) -> Result<bool, WorldError> {
        let applied = self
            .columns
            .write()
            .get_mut(&ColumnPos::of_block(pos))
            .and_then(|column| column.set_block(pos, state))
            .is_some();
        if !applied {
            trace!("Dropped block update at {:?}: column not loaded or height out of range", pos);
            return Ok(false);
        }
        self.notify(&WorldEvent::VoxelChanged { pos, state })?;
        Ok(true)
    }

    /// Applies `changes` to one section, all under a single write lock.
    ///
    /// If the column or section is missing nothing is applied and
    /// `Ok(false)` is returned. Otherwise every change is written and then
    /// reported in input order; the first listener error stops reporting.
    pub fn set_voxel_batch(
        &self,
        column: ColumnPos,
        section: i32,
        changes: &[BlockChange],
    ) -> Result<bool, WorldError> {
        {
            let mut columns = self.columns.write();
            let Some(target) = columns
                .get_mut(&column)
                .and_then(|c| c.section_mut(section))
            else {
                trace!(
                    "Dropped {} block updates for section {} of ({}, {}): not loaded",
                    changes.len(),
                    section,
                    column.x,
                    column.z
                );
                return Ok(false);
            };
            for change in changes {
                target.set(change.local.index(), change.state);
            }
        }

        for change in changes {
            self.notify(&WorldEvent::BatchVoxelChanged {
                column,
                section,
                local: change.local,
                state: change.state,
            })?;
        }
        Ok(true)
    }

    fn notify(&self, event: &WorldEvent) -> Result<(), WorldError> {
        let Some(listener) = &self.listener else {
            return Ok(());
        };
        listener.on_event(event).map_err(|e| {
            warn!("Listener rejected {:?}: {}", event, e);
            WorldError::Listener(e)
        })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

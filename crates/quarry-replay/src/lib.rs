//! Capture replay: frames on disk to [`quarry_world::World`] mutations.

pub mod capture;
pub mod replay;

//! Dimension metadata: vertical extent of the world the client is in.
//!
//! Column height and the floor used for section indexing come from the
//! active dimension. The session layer switches the active dimension on
//! spawn and respawn; decoders resolve it through [`DimensionSource`].

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Vertical extent of one dimension type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionType {
    /// Registry name, e.g. `minecraft:overworld`.
    pub name: String,
    /// Lowest block Y. A multiple of 16.
    pub min_y: i32,
    /// Total height in blocks. A multiple of 16.
    pub height: u32,
}

impl DimensionType {
    /// Creates a dimension type.
    pub fn new(name: impl Into<String>, min_y: i32, height: u32) -> Self {
        Self {
            name: name.into(),
            min_y,
            height,
        }
    }

    /// Number of sections in every column of this dimension.
    pub fn section_count(&self) -> usize {
        (self.height / 16) as usize
    }

    /// Absolute section Y of the lowest section.
    pub fn min_section_y(&self) -> i32 {
        self.min_y >> 4
    }
}

/// Resolves the dimension the client is currently in.
pub trait DimensionSource: Send + Sync {
    /// Metadata of the active dimension, or
    /// [`WorldError::DimensionNotFound`] naming it.
    fn active_dimension(&self) -> Result<DimensionType, WorldError>;

    /// Makes `name` the active dimension.
    fn enter_dimension(&self, name: &str);
}

/// Name-keyed dimension types plus the currently active name.
pub struct DimensionRegistry {
    types: FxHashMap<String, DimensionType>,
    active: RwLock<String>,
}

impl DimensionRegistry {
    /// Creates an empty registry whose active dimension is `active`.
    pub fn new(active: impl Into<String>) -> Self {
        Self {
            types: FxHashMap::default(),
            active: RwLock::new(active.into()),
        }
    }

    /// Registry with the three vanilla dimension types, starting in the overworld.
    pub fn vanilla() -> Self {
        let mut registry = Self::new("minecraft:overworld");
        registry.register(DimensionType::new("minecraft:overworld", -64, 384));
        registry.register(DimensionType::new("minecraft:the_nether", 0, 256));
        registry.register(DimensionType::new("minecraft:the_end", 0, 256));
        registry
    }

    /// Adds or replaces a dimension type.
    pub fn register(&mut self, dimension: DimensionType) {
        self.types.insert(dimension.name.clone(), dimension);
    }

    /// Looks up a dimension type by name.
    pub fn find(&self, name: &str) -> Option<&DimensionType> {
        self.types.get(name)
    }

    /// Name of the active dimension.
    pub fn active_name(&self) -> String {
        self.active.read().clone()
    }

    /// Number of registered dimension types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no dimension types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DimensionSource for DimensionRegistry {
    fn active_dimension(&self) -> Result<DimensionType, WorldError> {
        let active = self.active.read();
        self.types
            .get(active.as_str())
            .cloned()
            .ok_or_else(|| WorldError::DimensionNotFound(active.clone()))
    }

    fn enter_dimension(&self, name: &str) {
        tracing::debug!("Entering dimension {}", name);
        *self.active.write() = name.to_string();
    }
}

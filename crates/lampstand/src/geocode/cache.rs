use std::sync::{Arc, PoisonError, RwLock};

use ahash::AHashMap as HashMap;
use lampstand_directory::Coordinate;

/// Session-scoped geocoding results keyed by the exact address string.
///
/// Clones share the same storage. Entries are only ever inserted; a second
/// insert for the same address overwrites the first, which is harmless because
/// the service returns the same coordinate for the same address.
#[derive(Debug, Clone, Default)]
pub struct GeocodeCache {
    entries: Arc<RwLock<HashMap<String, Coordinate>>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<Coordinate> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .copied()
    }

    pub fn insert(&self, address: &str, coordinate: Coordinate) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string(), coordinate);
    }

    pub fn contains(&self, address: &str) -> bool {
        self.get(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

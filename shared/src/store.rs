//! Resident chunk bookkeeping.

use std::collections::HashMap;

use crate::terrain::ChunkCoord;

/// Map from chunk coordinate to whatever represents a resident chunk.
///
/// The store owns its entries. Evicting one hands it back to the caller, who
/// is responsible for freeing the chunk's resources right away.
#[derive(Debug)]
pub struct ChunkStore<T> {
    chunks: HashMap<ChunkCoord, T>,
}

impl<T> Default for ChunkStore<T> {
    fn default() -> Self {
        Self {
            chunks: HashMap::new(),
        }
    }
}

impl<T> ChunkStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk. An existing entry at `coord` is returned, never dropped silently.
    pub fn insert(&mut self, coord: ChunkCoord, chunk: T) -> Option<T> {
        self.chunks.insert(coord, chunk)
    }

    pub fn get(&self, coord: &ChunkCoord) -> Option<&T> {
        self.chunks.get(coord)
    }

    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.chunks.contains_key(coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ChunkCoord> {
        self.chunks.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &T)> {
        self.chunks.iter()
    }

    /// Remove every entry whose coordinate fails `keep`, passing each to `on_evict`.
    /// Returns how many were evicted.
    pub fn evict_unless(
        &mut self,
        mut keep: impl FnMut(&ChunkCoord) -> bool,
        mut on_evict: impl FnMut(ChunkCoord, T),
    ) -> usize {
        let stale: Vec<ChunkCoord> = self.chunks.keys().filter(|c| !keep(c)).copied().collect();
        for coord in &stale {
            if let Some(chunk) = self.chunks.remove(coord) {
                on_evict(*coord, chunk);
            }
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evict_unless_hands_back_stale_entries() {
        let mut store = ChunkStore::new();
        for x in -2..=2 {
            store.insert(ChunkCoord::new(x, 0), x * 10);
        }

        let mut evicted = Vec::new();
        let count = store.evict_unless(|c| c.x.abs() <= 1, |coord, value| evicted.push((coord, value)));

        evicted.sort_by_key(|(c, _)| c.x);
        assert_eq!(count, 2);
        assert_eq!(evicted, vec![(ChunkCoord::new(-2, 0), -20), (ChunkCoord::new(2, 0), 20)]);
        assert_eq!(store.len(), 3);
        assert!(!store.contains(&ChunkCoord::new(2, 0)));
    }

    #[test]
    fn test_insert_returns_replaced_entry() {
        let mut store = ChunkStore::new();
        assert_eq!(store.insert(ChunkCoord::new(0, 0), "a"), None);
        assert_eq!(store.insert(ChunkCoord::new(0, 0), "b"), Some("a"));
        assert_eq!(store.get(&ChunkCoord::new(0, 0)), Some(&"b"));
        assert_eq!(store.len(), 1);
    }
}

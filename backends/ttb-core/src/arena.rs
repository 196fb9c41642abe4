// this_file: backends/ttb-core/src/arena.rs

//! Handle bookkeeping for host implementations.

use std::collections::HashMap;

/// Map from host-minted handle identifiers to open resources.
///
/// Identifiers start at 1 and are never reused within one table, so a stale
/// handle can never resolve to a newer resource.
#[derive(Debug)]
pub struct HandleTable<T> {
    entries: HashMap<u32, T>,
    next_id: u32,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its fresh identifier.
    pub fn insert(&mut self, value: T) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.entries.insert(id, value);
        id
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry, in ascending identifier order.
    pub fn drain(&mut self) -> Vec<(u32, T)> {
        let mut drained: Vec<_> = self.entries.drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
    }
}

//! Generation-tagged object storage with snapshots and rollback.
//!
//! Every insertion or removal commits a new generation. Removed objects stay in place as
//! tombstones, so a reader that started before the removal still sees them, until
//! `compact` drops the tombstones no open snapshot can reach any more.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    hash::Hash,
};

use thiserror::Error;

pub trait Storable {
    type Key: Copy + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UndoError {
    #[error("generation {0} has been pruned and can no longer be restored")]
    PrunedGeneration(u64),
    #[error("generation {0} has not been committed yet")]
    UnknownGeneration(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

/// Position of a reader, bound to the generation current when it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCursor {
    position: usize,
    generation: u64,
}

/// Changes a restore applied to the store, for callers that index its contents.
#[derive(Debug, Clone)]
pub enum RestoreChange<T> {
    /// The object was inserted after the restored generation and is gone.
    Discarded(T),
    /// The object was removed after the restored generation and is live again.
    Reinstated(T),
}

#[derive(Debug, Clone)]
struct UndoableNode<T> {
    object: T,
    created: u64,
    removed: Option<u64>,
}

impl<T> UndoableNode<T> {
    fn is_visible_at(&self, generation: u64) -> bool {
        self.created <= generation && self.removed.map_or(true, |removed| removed > generation)
    }

    fn is_live(&self) -> bool {
        self.removed.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct UndoableObjects<T: Storable> {
    nodes: Vec<Option<UndoableNode<T>>>,
    slots: HashMap<T::Key, usize>,
    generation: u64,
    snapshots: BTreeMap<u64, usize>,
    /// Generations below this floor lost tombstones to compaction.
    pruned_floor: u64,
    /// Ranges `(target, last]` of generations a restore rolled back. Their objects are gone.
    discarded: Vec<(u64, u64)>,
    live_count: usize,
}

impl<T: Storable + Clone> Default for UndoableObjects<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Storable + Clone> UndoableObjects<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            slots: HashMap::new(),
            generation: 0,
            snapshots: BTreeMap::new(),
            pruned_floor: 0,
            discarded: vec![],
            live_count: 0,
        }
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Inserts `object` in a new generation. An object with the same key must not be live.
    pub fn insert(&mut self, object: T) {
        self.generation += 1;

        let key = object.key();
        self.nodes.push(Some(UndoableNode {
            object,
            created: self.generation,
            removed: None,
        }));
        self.slots.insert(key, self.nodes.len() - 1);
        self.live_count += 1;
    }

    /// Removes the live object with `key` in a new generation. Returns the removed object,
    /// or `None` if no such object is live.
    pub fn remove(&mut self, key: T::Key) -> Option<&T> {
        let slot = *self.slots.get(&key)?;
        let generation = self.generation + 1;
        let node = self.nodes[slot].as_mut()?;

        if !node.is_live() {
            return None;
        }

        node.removed = Some(generation);
        self.generation = generation;
        self.live_count -= 1;
        Some(&node.object)
    }

    pub fn get(&self, key: T::Key) -> Option<&T> {
        let slot = *self.slots.get(&key)?;

        self.nodes[slot]
            .as_ref()
            .filter(|node| node.is_live())
            .map(|node| &node.object)
    }

    pub fn contains(&self, key: T::Key) -> bool {
        self.get(key).is_some()
    }

    /// Live objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.nodes
            .iter()
            .flatten()
            .filter(|node| node.is_live())
            .map(|node| &node.object)
    }

    pub fn start_read(&self) -> ReadCursor {
        ReadCursor {
            position: 0,
            generation: self.generation,
        }
    }

    /// Next object visible to `cursor`: inserted before the reader started and not removed
    /// by then. Objects inserted later are skipped; objects removed later are still
    /// returned until compaction drops them.
    pub fn read_next(&self, cursor: &mut ReadCursor) -> Option<&T> {
        while cursor.position < self.nodes.len() {
            let position = cursor.position;
            cursor.position += 1;

            if let Some(node) = &self.nodes[position] {
                if node.is_visible_at(cursor.generation) {
                    return Some(&node.object);
                }
            }
        }

        None
    }

    /// Registers a snapshot of the current generation. Tombstones it can reach are kept
    /// until `release` is called for it.
    pub fn snapshot(&mut self) -> Generation {
        *self.snapshots.entry(self.generation).or_insert(0) += 1;
        Generation(self.generation)
    }

    pub fn release(&mut self, generation: Generation) {
        if let Some(count) = self.snapshots.get_mut(&generation.0) {
            *count -= 1;

            if *count == 0 {
                self.snapshots.remove(&generation.0);
            }
        }
    }

    /// Rolls the store back to `generation`: objects inserted after it are dropped and
    /// objects removed after it are live again. Generations an earlier restore rolled back
    /// fail with `PrunedGeneration`.
    pub fn restore(
        &mut self,
        generation: Generation,
    ) -> Result<Vec<RestoreChange<T>>, UndoError> {
        if generation.0 < self.pruned_floor {
            return Err(UndoError::PrunedGeneration(generation.0));
        }

        if generation.0 > self.generation {
            return Err(UndoError::UnknownGeneration(generation.0));
        }

        if self.is_discarded(generation.0) {
            return Err(UndoError::PrunedGeneration(generation.0));
        }

        let mut changes = vec![];

        for slot in 0..self.nodes.len() {
            let Some(node) = &mut self.nodes[slot] else {
                continue;
            };

            if node.created > generation.0 {
                let was_live = node.is_live();
                let Some(node) = self.nodes[slot].take() else {
                    continue;
                };

                if was_live {
                    self.live_count -= 1;
                    changes.push(RestoreChange::Discarded(node.object.clone()));
                }

                if self.slots.get(&node.object.key()) == Some(&slot) {
                    self.slots.remove(&node.object.key());
                }
            } else if node.removed.map_or(false, |removed| removed > generation.0) {
                node.removed = None;
                self.live_count += 1;
                changes.push(RestoreChange::Reinstated(node.object.clone()));
                self.slots.insert(node.object.key(), slot);
            }
        }

        if generation.0 < self.generation {
            self.discarded.push((generation.0, self.generation));
        }

        self.generation += 1;
        self.snapshots.retain(|&snapshot, _| snapshot <= generation.0);
        Ok(changes)
    }

    fn is_discarded(&self, generation: u64) -> bool {
        self.discarded
            .iter()
            .any(|&(target, last)| target < generation && generation <= last)
    }

    /// Permanently drops tombstones no open snapshot can reach. Invalidates outstanding read
    /// cursors, so only call this between passes.
    pub fn compact(&mut self) {
        let oldest_snapshot = self.snapshots.keys().next().copied();

        for slot in 0..self.nodes.len() {
            let Some(node) = &self.nodes[slot] else {
                continue;
            };

            let Some(removed) = node.removed else {
                continue;
            };

            if oldest_snapshot.map_or(true, |oldest| removed <= oldest) {
                self.pruned_floor = self.pruned_floor.max(removed);

                if let Some(node) = self.nodes[slot].take() {
                    if self.slots.get(&node.object.key()) == Some(&slot) {
                        self.slots.remove(&node.object.key());
                    }
                }
            }
        }

        let pruned_floor = self.pruned_floor;
        self.discarded.retain(|&(_, last)| last >= pruned_floor);
        self.nodes.retain(|node| node.is_some());
        self.slots = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|node| (node.object.key(), slot)))
            .collect();
    }

    /// Number of stored nodes, tombstones included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }
}

//! Bounded working memory of the parser.

use std::collections::VecDeque;

use crate::error::{ChunkError, Result};
use crate::graph::NodeId;

/// Sliding window of node handles, oldest first.
#[derive(Clone, Debug)]
pub struct MemoryWindow {
    slots: VecDeque<NodeId>,
    capacity: usize,
}

impl MemoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append to the right. Fails if the window is already full.
    pub fn push(&mut self, id: NodeId) -> Result<()> {
        if self.is_full() {
            return Err(ChunkError::WindowFull {
                capacity: self.capacity,
            });
        }
        self.slots.push_back(id);
        Ok(())
    }

    /// Remove and return the oldest slot.
    pub fn evict(&mut self) -> Option<NodeId> {
        self.slots.pop_front()
    }

    /// Replace slots `i` and `i + 1` with `chunk`.
    pub fn merge(&mut self, i: usize, chunk: NodeId) {
        debug_assert!(i + 1 < self.slots.len(), "merge needs two adjacent slots");
        self.slots[i] = chunk;
        self.slots.remove(i + 1);
    }

    pub fn get(&self, i: usize) -> Option<NodeId> {
        self.slots.get(i).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current slots, oldest first.
    pub fn to_vec(&self) -> Vec<NodeId> {
        self.slots.iter().copied().collect()
    }
}

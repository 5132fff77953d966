//! Indexed max-priority structure
//!
//! Binary max-heap over `(key, magnitude)` items. Every insert returns a
//! [`HeapHandle`] that stays valid until the item is extracted, so an item's
//! magnitude can be changed in place with [`IndexedMaxHeap::update`].
//!
//! Equal magnitudes are ordered by insertion sequence (earlier first), which
//! makes extraction order deterministic for a given insertion order.

use crate::{Error, Result};

/// Stable reference to an item inserted into an [`IndexedMaxHeap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle(usize);

#[derive(Debug)]
struct Node<K> {
    key: K,
    magnitude: i64,
    sequence: u64,
    handle: usize,
}

impl<K> Node<K> {
    fn outranks(&self, other: &Self) -> bool {
        self.magnitude > other.magnitude
            || (self.magnitude == other.magnitude && self.sequence < other.sequence)
    }
}

/// Max-heap with handle-based priority updates
#[derive(Debug)]
pub struct IndexedMaxHeap<K> {
    nodes: Vec<Node<K>>,
    /// handle -> index into `nodes`, `None` once extracted
    positions: Vec<Option<usize>>,
    next_sequence: u64,
}

impl<K> Default for IndexedMaxHeap<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            positions: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<K> IndexedMaxHeap<K> {
    /// Create empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty heap with room for `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            next_sequence: 0,
        }
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no items remain
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert an item, O(log n)
    pub fn insert(&mut self, key: K, magnitude: i64) -> HeapHandle {
        let handle = self.positions.len();
        let index = self.nodes.len();

        self.positions.push(Some(index));
        self.nodes.push(Node {
            key,
            magnitude,
            sequence: self.next_sequence,
            handle,
        });
        self.next_sequence += 1;

        self.sift_up(index);
        HeapHandle(handle)
    }

    /// Largest item without removing it, O(1)
    pub fn peek_max(&self) -> Option<(HeapHandle, &K, i64)> {
        self.nodes
            .first()
            .map(|node| (HeapHandle(node.handle), &node.key, node.magnitude))
    }

    /// Remove and return the largest item, O(log n)
    pub fn extract_max(&mut self) -> Result<(K, i64)> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyStructure);
        }

        let last = self.nodes.len() - 1;
        self.swap(0, last);

        let node = self.nodes.pop().ok_or(Error::EmptyStructure)?;
        self.positions[node.handle] = None;

        if !self.nodes.is_empty() {
            self.sift_down(0);
        }

        Ok((node.key, node.magnitude))
    }

    /// Change an item's magnitude and restore heap order, O(log n)
    pub fn update(&mut self, handle: HeapHandle, magnitude: i64) -> Result<()> {
        let index = self
            .positions
            .get(handle.0)
            .copied()
            .flatten()
            .ok_or(Error::StaleHandle(handle.0))?;

        let previous = std::mem::replace(&mut self.nodes[index].magnitude, magnitude);
        if magnitude > previous {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }

        Ok(())
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.nodes.swap(a, b);
        self.positions[self.nodes[a].handle] = Some(a);
        self.positions[self.nodes[b].handle] = Some(b);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.nodes[index].outranks(&self.nodes[parent]) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.nodes.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut largest = index;

            if left < len && self.nodes[left].outranks(&self.nodes[largest]) {
                largest = left;
            }
            if right < len && self.nodes[right].outranks(&self.nodes[largest]) {
                largest = right;
            }
            if largest == index {
                break;
            }

            self.swap(index, largest);
            index = largest;
        }
    }
}

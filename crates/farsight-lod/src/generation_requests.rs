//! Bounded, distance-ordered set of nodes that still need generating.
//!
//! Traversals push every missing node they discover; the set keeps only the
//! `capacity` nearest to the viewer so the worker pool always picks up the
//! most visible gaps first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::level_pos::LevelPos;

/// One node that needs a freshly generated record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationRequest {
    /// Node to generate.
    pub pos: LevelPos,
    /// Nearest-point distance from the viewer, in columns.
    pub distance: f64,
}

/// Heap entry ordered so that the least urgent request is the maximum.
#[derive(Clone, Copy, Debug)]
struct Entry(GenerationRequest);

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        a.distance
            .total_cmp(&b.distance)
            // Coarser nodes are more urgent at equal distance.
            .then_with(|| b.pos.detail.cmp(&a.pos.detail))
            .then_with(|| (a.pos.x, a.pos.z).cmp(&(b.pos.x, b.pos.z)))
    }
}

/// Collects generation requests, keeping the nearest `capacity` of them.
#[derive(Clone, Debug)]
pub struct GenerationRequests {
    heap: BinaryHeap<Entry>,
    capacity: usize,
    player_x: i32,
    player_z: i32,
}

impl GenerationRequests {
    /// Create an empty set for a viewer at the given world column.
    pub fn new(capacity: usize, player_x: i32, player_z: i32) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.min(4096)),
            capacity,
            player_x,
            player_z,
        }
    }

    /// Offer a node. Returns `false` when it was dropped because the set is
    /// full of nearer requests.
    pub fn push(&mut self, detail: u8, x: i32, z: i32) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let pos = LevelPos::new(detail, x, z);
        let entry = Entry(GenerationRequest {
            pos,
            distance: pos.min_distance(self.player_x, self.player_z),
        });
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if entry < *worst => {
                self.heap.pop();
                self.heap.push(entry);
                true
            }
            _ => false,
        }
    }

    /// Viewer column the distances are measured from.
    pub fn player(&self) -> (i32, i32) {
        (self.player_x, self.player_z)
    }

    /// Maximum number of requests retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of requests retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no requests are retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether a request for this node is retained.
    pub fn contains(&self, detail: u8, x: i32, z: i32) -> bool {
        let pos = LevelPos::new(detail, x, z);
        self.heap.iter().any(|e| e.0.pos == pos)
    }

    /// Retained requests in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &GenerationRequest> {
        self.heap.iter().map(|e| &e.0)
    }

    /// Consume the set, nearest request first.
    pub fn into_sorted_vec(self) -> Vec<GenerationRequest> {
        self.heap.into_sorted_vec().into_iter().map(|e| e.0).collect()
    }

    /// Drop every request.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

//! The set of quadtree nodes chosen for drawing.

use rustc_hash::FxHashSet;

use crate::level_pos::{DETAIL_LEVEL_COUNT, LevelPos, REGION_DETAIL_LEVEL};

/// Nodes selected by a render traversal, in discovery order, with an index
/// for membership queries from the renderer.
#[derive(Clone, Debug, Default)]
pub struct RenderSelection {
    positions: Vec<LevelPos>,
    index: FxHashSet<LevelPos>,
}

impl RenderSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns `false` if it was already selected.
    pub fn push(&mut self, detail: u8, x: i32, z: i32) -> bool {
        let pos = LevelPos::new(detail, x, z);
        if self.index.insert(pos) {
            self.positions.push(pos);
            true
        } else {
            false
        }
    }

    /// Whether the node is selected.
    pub fn contains(&self, detail: u8, x: i32, z: i32) -> bool {
        self.index.contains(&LevelPos::new(detail, x, z))
    }

    /// The selected node covering a world column, searching finest first.
    pub fn covering_node(&self, column_x: i32, column_z: i32) -> Option<LevelPos> {
        let column = LevelPos::new(0, column_x, column_z);
        (0..=REGION_DETAIL_LEVEL)
            .map(|detail| column.convert(detail))
            .find(|pos| self.index.contains(pos))
    }

    /// Number of selected nodes covering a world column.
    pub fn coverage_count(&self, column_x: i32, column_z: i32) -> usize {
        let column = LevelPos::new(0, column_x, column_z);
        (0..=REGION_DETAIL_LEVEL)
            .filter(|&detail| self.index.contains(&column.convert(detail)))
            .count()
    }

    /// Total world columns covered, counting overlaps twice.
    pub fn covered_area(&self) -> u64 {
        self.positions
            .iter()
            .map(|p| {
                let w = p.width() as u64;
                w * w
            })
            .sum()
    }

    /// Number of selected nodes per detail level.
    pub fn detail_histogram(&self) -> [usize; DETAIL_LEVEL_COUNT] {
        let mut histogram = [0; DETAIL_LEVEL_COUNT];
        for pos in &self.positions {
            histogram[pos.detail as usize] += 1;
        }
        histogram
    }

    /// Number of selected nodes.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Selected nodes in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &LevelPos> {
        self.positions.iter()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.index.clear();
    }
}

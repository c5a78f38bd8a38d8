//! Top-down walks that turn a viewer position into generation requests and a
//! render selection.
//!
//! Both walks start at the root and recurse one level at a time, so depth is
//! bounded by [`REGION_DETAIL_LEVEL`]. Each step decides from a snapshot of
//! its children's existence bits taken before recursing.

use super::{ALL_CHILDREN, CHILD_OFFSETS, Region};
use crate::detail_distance::DetailDistancePolicy;
use crate::generation_requests::GenerationRequests;
use crate::level_pos::{CHUNK_DETAIL_LEVEL, REGION_DETAIL_LEVEL, max_distance, to_absolute};
use crate::render_selection::RenderSelection;

/// Viewer position and policy shared by every step of a walk.
struct Walk<'a> {
    policy: &'a DetailDistancePolicy,
    player_x: i32,
    player_z: i32,
}

impl Region {
    /// Push every node that must be generated for a viewer at the given
    /// world column.
    ///
    /// Above chunk granularity a node's missing children are all requested
    /// and the walk only descends once all four exist. At or below chunk
    /// granularity only the `(2x, 2z)` child is followed, so a chunk never
    /// has more than one request outstanding per pass.
    pub fn data_to_generate(
        &self,
        policy: &DetailDistancePolicy,
        requests: &mut GenerationRequests,
        player_x: i32,
        player_z: i32,
    ) {
        let walk = Walk {
            policy,
            player_x,
            player_z,
        };
        self.generate_node(&walk, requests, REGION_DETAIL_LEVEL, 0, 0);
    }

    fn generate_node(
        &self,
        walk: &Walk<'_>,
        requests: &mut GenerationRequests,
        detail: u8,
        lx: usize,
        lz: usize,
    ) {
        let x = to_absolute(detail, lx as i32, self.pos.x);
        let z = to_absolute(detail, lz as i32, self.pos.z);
        let distance = max_distance(detail, x, z, walk.player_x, walk.player_z);
        let required = walk.policy.required_generation_level(distance);
        if required > detail {
            return;
        }
        let exists = self.exists_local(detail, lx, lz);
        // A node must exist before its children are worth requesting.
        if required == detail || !exists {
            if !exists {
                requests.push(detail, x, z);
            }
            return;
        }

        let child_detail = detail - 1;
        if child_detail < walk.policy.min_generation_detail().max(self.min_detail_level) {
            return;
        }
        let mask = self.child_mask(detail, lx, lz);

        if detail > CHUNK_DETAIL_LEVEL {
            if mask == ALL_CHILDREN {
                for &(dx, dz) in &CHILD_OFFSETS {
                    self.generate_node(walk, requests, child_detail, 2 * lx + dx, 2 * lz + dz);
                }
            } else {
                for (i, &(dx, dz)) in CHILD_OFFSETS.iter().enumerate() {
                    if mask & (1 << i) == 0 {
                        requests.push(
                            child_detail,
                            to_absolute(child_detail, (2 * lx + dx) as i32, self.pos.x),
                            to_absolute(child_detail, (2 * lz + dz) as i32, self.pos.z),
                        );
                    }
                }
            }
        } else if mask & 1 == 0 {
            requests.push(
                child_detail,
                to_absolute(child_detail, (2 * lx) as i32, self.pos.x),
                to_absolute(child_detail, (2 * lz) as i32, self.pos.z),
            );
        } else {
            self.generate_node(walk, requests, child_detail, 2 * lx, 2 * lz);
        }
    }

    /// Push the nodes to draw for a viewer at the given world column.
    ///
    /// A node is drawn when it is already as fine as the distance requires,
    /// or when finer detail is required but not all four children exist yet.
    /// The selection therefore tiles the whole region without overlap.
    pub fn data_to_render(
        &self,
        policy: &DetailDistancePolicy,
        selection: &mut RenderSelection,
        player_x: i32,
        player_z: i32,
    ) {
        let walk = Walk {
            policy,
            player_x,
            player_z,
        };
        self.render_node(&walk, selection, REGION_DETAIL_LEVEL, 0, 0);
    }

    fn render_node(
        &self,
        walk: &Walk<'_>,
        selection: &mut RenderSelection,
        detail: u8,
        lx: usize,
        lz: usize,
    ) {
        let x = to_absolute(detail, lx as i32, self.pos.x);
        let z = to_absolute(detail, lz as i32, self.pos.z);
        let distance = max_distance(detail, x, z, walk.player_x, walk.player_z);
        let required = walk.policy.required_render_level(distance);
        if required >= detail || self.child_mask(detail, lx, lz) != ALL_CHILDREN {
            selection.push(detail, x, z);
            return;
        }
        for &(dx, dz) in &CHILD_OFFSETS {
            self.render_node(walk, selection, detail - 1, 2 * lx + dx, 2 * lz + dz);
        }
    }
}

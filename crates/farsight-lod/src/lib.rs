//! Hierarchical level-of-detail terrain store.
//!
//! The world is split into 512x512-column regions. Each [`Region`] holds a
//! quadtree of packed [`DataPoint`] records from detail level 0 (one column
//! per record) up to level 9 (one record for the whole region). Coarse records
//! are always the aggregate of the finer ones below them. Given a viewer
//! position and a [`DetailDistancePolicy`], a region reports which nodes still
//! need generating and which nodes to draw.
//!
//! [`LodDimension`] manages the loaded regions around the viewer, with
//! optional persistence through [`RegionFileStore`].

mod builder;
mod data_point;
mod detail_distance;
mod dimension;
mod error;
mod generation_mode;
mod generation_requests;
mod level_container;
mod level_pos;
mod memory_budget;
mod region;
mod region_file;
mod render_selection;

pub use builder::{ColumnSample, build_chunk_level};
pub use data_point::{
    DataPoint, DecodedPoint, MAX_HEIGHT, MIN_HEIGHT, PointState, TerrainSample, VOID_DEPTH,
    VOID_HEIGHT, merge_points,
};
pub use detail_distance::{
    DetailDistancePolicy, DetailDistanceSettings, HorizontalQuality, HorizontalResolution,
};
pub use dimension::{LodDimension, MoveSummary, RegionHandle};
pub use error::LodError;
pub use generation_mode::GenerationMode;
pub use generation_requests::{GenerationRequest, GenerationRequests};
pub use level_container::LevelContainer;
pub use level_pos::{
    CHUNK_DETAIL_LEVEL, CHUNK_WIDTH, DETAIL_LEVEL_COUNT, LevelPos, REGION_DETAIL_LEVEL,
    REGION_WIDTH, RegionPos, convert, level_size, max_distance, min_distance, node_width,
    region_modulo, region_of, to_absolute,
};
pub use memory_budget::{MemoryBudgetConfig, MemoryBudgetTracker, select_evictions};
pub use region::Region;
pub use region_file::{RegionFileError, RegionFileStore, decode_region, encode_region};
pub use render_selection::RenderSelection;

use super::*;
use crate::data_point::TerrainSample;
use crate::detail_distance::DetailDistancePolicy;
use crate::generation_requests::GenerationRequests;
use crate::level_pos::{CHUNK_DETAIL_LEVEL, REGION_WIDTH, level_size};
use crate::render_selection::RenderSelection;

fn point(height: i16) -> DataPoint {
    DataPoint::from_sample(TerrainSample::new(height, height - 4, 10, 20, 30))
}

fn empty_region() -> Region {
    Region::new(0, RegionPos::new(0, 0), GenerationMode::Surface).unwrap()
}

fn requests_at(region: &Region, x: i32, z: i32) -> Vec<LevelPos> {
    let mut requests = GenerationRequests::new(usize::MAX, x, z);
    region.data_to_generate(&DetailDistancePolicy::default(), &mut requests, x, z);
    let mut out: Vec<_> = requests.iter().map(|r| r.pos).collect();
    out.sort();
    out
}

fn render_at(region: &Region, x: i32, z: i32) -> RenderSelection {
    let mut selection = RenderSelection::new();
    region.data_to_render(&DetailDistancePolicy::default(), &mut selection, x, z);
    selection
}

/// Region with every chunk-level node written.
fn chunk_complete_region() -> Region {
    let mut region = empty_region();
    let size = level_size(CHUNK_DETAIL_LEVEL);
    for x in 0..size {
        for z in 0..size {
            region
                .write(CHUNK_DETAIL_LEVEL, x, z, point(64), false)
                .unwrap();
        }
    }
    region
}

#[test]
fn test_new_allocates_levels_from_minimum() {
    let region = Region::new(4, RegionPos::new(2, -3), GenerationMode::Surface).unwrap();
    assert_eq!(region.min_detail_level(), 4);
    assert!(region.level(4).is_ok());
    assert!(region.level(9).is_ok());
    assert!(matches!(
        region.level(3),
        Err(LodError::LevelBelowMinimum { requested: 3, minimum: 4 })
    ));
    assert_eq!(region.pos(), RegionPos::new(2, -3));
}

#[test]
fn test_new_rejects_bad_detail() {
    assert!(matches!(
        Region::new(10, RegionPos::default(), GenerationMode::Surface),
        Err(LodError::DetailLevelOutOfRange(10))
    ));
}

#[test]
fn test_write_then_read_back() {
    let mut region = empty_region();
    assert!(region.write(0, 100, 200, point(70), false).unwrap());
    assert_eq!(region.get_data(0, 100, 200).unwrap(), point(70));
    assert!(region.does_data_exist(0, 100, 200));
    assert!(!region.does_data_exist(0, 101, 200));
    // Reads wrap modulo the level size.
    assert_eq!(region.get_data(0, 100 + REGION_WIDTH, 200).unwrap(), point(70));
}

#[test]
fn test_write_aggregates_mean_of_children() {
    let mut region = empty_region();
    region.write(0, 0, 0, point(10), false).unwrap();
    region.write(0, 0, 1, point(11), false).unwrap();
    region.write(0, 1, 0, point(12), false).unwrap();
    region.write(0, 1, 1, point(13), false).unwrap();

    let parent = region.get_data(1, 0, 0).unwrap();
    assert_eq!(parent.height(), 11);
    assert_eq!(parent.depth(), 7);
    assert_eq!(parent.red(), 10);
    // Only one node exists per coarser level, so the mean carries up to the root.
    for detail in 1..=REGION_DETAIL_LEVEL {
        assert_eq!(region.get_data(detail, 0, 0).unwrap().height(), 11);
    }
}

#[test]
fn test_partial_children_aggregate_over_existing_only() {
    let mut region = empty_region();
    region.write(0, 0, 0, point(20), false).unwrap();
    region.write(0, 1, 1, point(30), false).unwrap();
    assert_eq!(region.get_data(1, 0, 0).unwrap().height(), 25);
}

#[test]
fn test_void_propagates_until_real_data_arrives() {
    let mut region = empty_region();
    region.write(0, 0, 0, DataPoint::void(), false).unwrap();
    assert!(region.get_data(1, 0, 0).unwrap().is_void());
    assert!(region.get_data(REGION_DETAIL_LEVEL, 0, 0).unwrap().is_void());

    region.write(0, 0, 1, point(40), false).unwrap();
    let parent = region.get_data(1, 0, 0).unwrap();
    assert!(!parent.is_void());
    assert_eq!(parent.height(), 40);
}

#[test]
fn test_existing_record_not_replaced_without_higher_quality() {
    let mut region = empty_region();
    assert!(region.write(0, 5, 5, point(10), false).unwrap());
    assert!(!region.write(0, 5, 5, point(99), false).unwrap());
    assert_eq!(region.get_data(0, 5, 5).unwrap(), point(10));

    assert!(region.write(0, 5, 5, point(99), true).unwrap());
    assert_eq!(region.get_data(0, 5, 5).unwrap(), point(99));
    assert_eq!(region.get_data(1, 2, 2).unwrap().height(), 99);
}

#[test]
fn test_write_below_minimum_is_rejected() {
    let mut region = Region::new(4, RegionPos::new(0, 0), GenerationMode::Surface).unwrap();
    assert_eq!(
        region.write(2, 0, 0, point(1), false),
        Err(LodError::LevelBelowMinimum { requested: 2, minimum: 4 })
    );
    assert_eq!(region.get_data(2, 0, 0).unwrap(), DataPoint::EMPTY);
}

#[test]
fn test_write_outside_region_is_rejected() {
    let mut region = empty_region();
    let err = region.write(0, REGION_WIDTH, 0, point(1), false).unwrap_err();
    assert_eq!(
        err,
        LodError::OutsideRegion {
            pos: LevelPos::new(0, REGION_WIDTH, 0),
            region: RegionPos::new(0, 0),
        }
    );
    assert_eq!(
        region.add_data(10, 0, 0, point(1), false),
        Err(LodError::DetailLevelOutOfRange(10))
    );
}

#[test]
fn test_negative_region_coordinates() {
    let mut region = Region::new(0, RegionPos::new(-1, -1), GenerationMode::Surface).unwrap();
    region.write(0, -1, -1, point(50), false).unwrap();
    assert!(region.does_data_exist(CHUNK_DETAIL_LEVEL, -1, -1));
    assert_eq!(region.get_data(REGION_DETAIL_LEVEL, -1, -1).unwrap().height(), 50);
    assert!(region.write(0, 0, 0, point(1), false).is_err());
}

#[test]
fn test_coarse_record_without_children_is_kept() {
    let mut region = empty_region();
    region.write(5, 3, 3, point(77), false).unwrap();
    assert_eq!(region.get_data(5, 3, 3).unwrap(), point(77));
    assert_eq!(region.get_data(REGION_DETAIL_LEVEL, 0, 0).unwrap().height(), 77);
}

#[test]
fn test_update_recomputes_single_node() {
    let mut region = empty_region();
    region.add_data(0, 2, 2, point(8), false).unwrap();
    region.add_data(0, 3, 3, point(12), false).unwrap();
    assert!(!region.does_data_exist(1, 1, 1));

    region.update(1, 1, 1).unwrap();
    assert_eq!(region.get_data(1, 1, 1).unwrap().height(), 10);
    // Ancestors are only touched by update_area.
    assert!(!region.does_data_exist(2, 0, 0));

    region.update_area(0, 2, 2).unwrap();
    assert!(region.does_data_exist(REGION_DETAIL_LEVEL, 0, 0));

    assert!(matches!(
        region.update(0, 0, 0),
        Err(LodError::LevelBelowMinimum { requested: 0, minimum: 1 })
    ));
}

#[test]
fn test_update_area_covers_footprint() {
    let mut region = empty_region();
    // Fill a whole chunk of columns without aggregating.
    for x in 0..16 {
        for z in 0..16 {
            region.add_data(0, x, z, point(30), false).unwrap();
        }
    }
    region.update_area(CHUNK_DETAIL_LEVEL, 0, 0).unwrap();
    assert_eq!(region.existing_count(1), 64);
    assert_eq!(region.existing_count(3), 4);
    assert_eq!(region.get_data(CHUNK_DETAIL_LEVEL, 0, 0).unwrap().height(), 30);
    assert!(region.does_data_exist(REGION_DETAIL_LEVEL, 0, 0));
}

#[test]
fn test_generation_mode_only_rises() {
    let mut region = empty_region();
    region.raise_generation_mode(GenerationMode::Server);
    region.raise_generation_mode(GenerationMode::BiomeOnly);
    assert_eq!(region.generation_mode(), GenerationMode::Server);
}

#[test]
fn test_cut_tree_and_expand() {
    let mut region = empty_region();
    region.write(0, 0, 0, point(10), false).unwrap();
    let full = region.min_memory_needed();

    region.cut_tree(CHUNK_DETAIL_LEVEL).unwrap();
    assert_eq!(region.min_detail_level(), CHUNK_DETAIL_LEVEL);
    assert!(region.min_memory_needed() < full);
    assert_eq!(region.get_data(0, 0, 0).unwrap(), DataPoint::EMPTY);
    assert!(region.does_data_exist(CHUNK_DETAIL_LEVEL, 0, 0));

    // Cutting to a finer level is a no-op.
    region.cut_tree(2).unwrap();
    assert_eq!(region.min_detail_level(), CHUNK_DETAIL_LEVEL);

    region.expand(2).unwrap();
    assert_eq!(region.min_detail_level(), 2);
    assert_eq!(region.existing_count(2), 0);
    assert!(region.does_data_exist(CHUNK_DETAIL_LEVEL, 0, 0));
}

#[test]
fn test_add_level_lowers_minimum_and_aggregates() {
    let mut region = Region::new(4, RegionPos::new(0, 0), GenerationMode::Surface).unwrap();
    let size = level_size(3) as usize;
    let container = LevelContainer::from_points(3, vec![point(12); size * size]).unwrap();
    region.add_level(container).unwrap();
    assert_eq!(region.min_detail_level(), 3);
    assert_eq!(region.existing_count(CHUNK_DETAIL_LEVEL), 32 * 32);
    assert_eq!(region.get_data(REGION_DETAIL_LEVEL, 0, 0).unwrap().height(), 12);

    let too_fine = LevelContainer::new(1).unwrap();
    assert!(matches!(
        region.add_level(too_fine),
        Err(LodError::LevelBelowMinimum { requested: 1, minimum: 3 })
    ));
}

#[test]
fn test_from_level_builds_every_coarser_level() {
    let size = level_size(2) as usize;
    let container = LevelContainer::from_points(2, vec![point(5); size * size]).unwrap();
    let region = Region::from_level(container, RegionPos::new(3, 3), GenerationMode::Features).unwrap();
    assert_eq!(region.min_detail_level(), 2);
    for detail in 2..=REGION_DETAIL_LEVEL {
        let size = level_size(detail) as usize;
        assert_eq!(region.existing_count(detail), size * size);
    }
}

#[test]
fn test_empty_region_requests_only_root() {
    let region = empty_region();
    assert_eq!(requests_at(&region, 0, 0), vec![LevelPos::new(REGION_DETAIL_LEVEL, 0, 0)]);

    let offset = Region::new(0, RegionPos::new(1, -1), GenerationMode::Surface).unwrap();
    assert_eq!(
        requests_at(&offset, 600, -20),
        vec![LevelPos::new(REGION_DETAIL_LEVEL, 1, -1)]
    );
}

#[test]
fn test_complete_region_renders_root_for_far_viewer() {
    let size = level_size(0) as usize;
    let container = LevelContainer::from_points(0, vec![point(64); size * size]).unwrap();
    let region = Region::from_level(container, RegionPos::new(0, 0), GenerationMode::Surface).unwrap();

    let selection = render_at(&region, 100_000, 100_000);
    assert_eq!(selection.len(), 1);
    assert!(selection.contains(REGION_DETAIL_LEVEL, 0, 0));
    assert!(requests_at(&region, 100_000, 100_000).is_empty());
}

#[test]
fn test_missing_child_requested_and_parent_rendered() {
    let mut region = empty_region();
    region.write(8, 0, 0, point(10), false).unwrap();
    region.write(8, 0, 1, point(10), false).unwrap();
    region.write(8, 1, 0, point(10), false).unwrap();

    assert_eq!(requests_at(&region, 0, 0), vec![LevelPos::new(8, 1, 1)]);

    let selection = render_at(&region, 0, 0);
    assert_eq!(selection.len(), 1);
    assert!(selection.contains(REGION_DETAIL_LEVEL, 0, 0));
}

#[test]
fn test_empty_region_renders_root() {
    let selection = render_at(&empty_region(), 0, 0);
    assert_eq!(selection.iter().copied().collect::<Vec<_>>(), vec![RegionPos::new(0, 0).root()]);
}

#[test]
fn test_one_request_per_chunk_below_chunk_level() {
    let region = chunk_complete_region();
    let requests = requests_at(&region, 0, 0);
    let chunks = level_size(CHUNK_DETAIL_LEVEL) as usize;
    assert_eq!(requests.len(), chunks * chunks);

    let mut seen = rustc_hash::FxHashSet::default();
    for pos in &requests {
        assert_eq!(pos.detail, CHUNK_DETAIL_LEVEL - 1);
        // The anchor child sits at even coordinates.
        assert_eq!((pos.x % 2, pos.z % 2), (0, 0));
        assert!(seen.insert(pos.convert(CHUNK_DETAIL_LEVEL)), "two requests in {pos}");
    }
}

#[test]
fn test_generation_follows_anchor_child_only() {
    let mut region = chunk_complete_region();
    // Anchor child of chunk (0, 0) exists, a sibling too; the walk continues
    // down the anchor and never asks for the siblings.
    region.write(3, 0, 0, point(64), false).unwrap();
    region.write(3, 1, 1, point(64), false).unwrap();
    let requests = requests_at(&region, 0, 0);
    assert!(requests.contains(&LevelPos::new(2, 0, 0)));
    assert!(!requests.contains(&LevelPos::new(3, 0, 1)));
    assert!(!requests.contains(&LevelPos::new(3, 1, 0)));
}

#[test]
fn test_generation_respects_minimum_detail() {
    let mut region = Region::new(CHUNK_DETAIL_LEVEL, RegionPos::new(0, 0), GenerationMode::Surface).unwrap();
    let size = level_size(CHUNK_DETAIL_LEVEL);
    for x in 0..size {
        for z in 0..size {
            region.write(CHUNK_DETAIL_LEVEL, x, z, point(1), false).unwrap();
        }
    }
    assert!(requests_at(&region, 0, 0).is_empty());
}

#[test]
fn test_render_selection_tiles_region_without_gaps() {
    let mut region = chunk_complete_region();
    for x in 0..16 {
        for z in 0..16 {
            region.write(0, x, z, point(64), false).unwrap();
        }
    }
    // Partial data in a far chunk must not leave holes either.
    region.write(0, 300, 300, point(64), false).unwrap();

    let selection = render_at(&region, 0, 0);
    assert_eq!(selection.covered_area(), (REGION_WIDTH as u64).pow(2));
    for x in 0..REGION_WIDTH {
        for z in 0..REGION_WIDTH {
            assert_eq!(selection.coverage_count(x, z), 1, "column ({x}, {z})");
        }
    }
    assert_eq!(selection.covering_node(0, 0), Some(LevelPos::new(0, 0, 0)));
    let far = selection.covering_node(300, 300).unwrap();
    assert!(far.detail >= CHUNK_DETAIL_LEVEL);
}

#[test]
fn test_render_detail_does_not_increase_toward_viewer() {
    let size = level_size(0) as usize;
    let container = LevelContainer::from_points(0, vec![point(64); size * size]).unwrap();
    let region = Region::from_level(container, RegionPos::new(0, 0), GenerationMode::Surface).unwrap();
    let selection = render_at(&region, 0, 0);
    let near = selection.covering_node(1, 1).unwrap();
    let far = selection.covering_node(500, 500).unwrap();
    assert!(near.detail <= far.detail);
    assert_eq!(near.detail, 0);
}

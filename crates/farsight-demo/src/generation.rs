//! Background LOD generation on a worker pool.
//!
//! Requests go out over a bounded channel; workers sample terrain and write
//! straight into the shared [`LodDimension`], then report back. A request
//! that has already been satisfied by the time a worker picks it up is
//! skipped.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use farsight_lod::{CHUNK_DETAIL_LEVEL, GenerationMode, LevelPos, LodDimension};
use tracing::warn;

use crate::heightmap::HeightmapSampler;

/// What a worker did with one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Records were written.
    Stored(usize),
    /// The data already existed or its region is gone.
    Stale,
    /// The write was rejected.
    Failed,
}

/// A finished request.
#[derive(Clone, Copy, Debug)]
pub struct Generated {
    /// Requested node.
    pub pos: LevelPos,
    /// Result.
    pub outcome: Outcome,
    /// Time spent in microseconds.
    pub elapsed_us: u64,
}

/// Worker pool filling a dimension with generated terrain.
pub struct LodGenerator {
    task_sender: Sender<LevelPos>,
    result_receiver: Receiver<Generated>,
    pending: Arc<DashMap<LevelPos, ()>>,
}

impl LodGenerator {
    /// Spawn `thread_count` workers writing into `dimension`.
    pub fn new(
        thread_count: usize,
        queue_capacity: usize,
        dimension: Arc<LodDimension>,
        sampler: Arc<HeightmapSampler>,
        mode: GenerationMode,
    ) -> std::io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<LevelPos>(queue_capacity.max(1));
        let (result_sender, result_receiver) = bounded::<Generated>(queue_capacity.max(1));
        let pending: Arc<DashMap<LevelPos, ()>> = Arc::new(DashMap::new());

        for i in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let dimension = Arc::clone(&dimension);
            let sampler = Arc::clone(&sampler);
            let pending = Arc::clone(&pending);

            std::thread::Builder::new()
                .name(format!("lod-gen-{i}"))
                .spawn(move || {
                    while let Ok(pos) = receiver.recv() {
                        let start = Instant::now();
                        let outcome = generate(&dimension, &sampler, pos, mode);
                        pending.remove(&pos);
                        let done = Generated {
                            pos,
                            outcome,
                            elapsed_us: start.elapsed().as_micros() as u64,
                        };
                        if sender.send(done).is_err() {
                            break;
                        }
                    }
                })?;
        }

        Ok(Self {
            task_sender,
            result_receiver,
            pending,
        })
    }

    /// Default worker count: all cores but one.
    pub fn default_threads() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }

    /// Queue a node. Returns `false` if it is already pending or the queue
    /// is full.
    pub fn submit(&self, pos: LevelPos) -> bool {
        if self.pending.insert(pos, ()).is_some() {
            return false;
        }
        if self.task_sender.try_send(pos).is_err() {
            self.pending.remove(&pos);
            return false;
        }
        true
    }

    /// Whether a node is queued or being generated.
    pub fn is_pending(&self, pos: &LevelPos) -> bool {
        self.pending.contains_key(pos)
    }

    /// Number of nodes queued or being generated.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Block until `count` results have arrived.
    pub fn wait_for(&self, count: usize) -> Vec<Generated> {
        self.result_receiver.iter().take(count).collect()
    }

    /// Every result available right now.
    pub fn drain_results(&self) -> Vec<Generated> {
        self.result_receiver.try_iter().collect()
    }
}

/// Produce and store the data for one request.
///
/// Chunk-granularity and finer requests generate the whole chunk at the
/// finest level its region keeps; coarser requests get a single sample.
pub fn generate(
    dimension: &LodDimension,
    sampler: &HeightmapSampler,
    pos: LevelPos,
    mode: GenerationMode,
) -> Outcome {
    if dimension.does_data_exist(pos.detail, pos.x, pos.z) {
        return Outcome::Stale;
    }
    let result = if pos.detail <= CHUNK_DETAIL_LEVEL {
        let chunk = pos.convert(CHUNK_DETAIL_LEVEL);
        let samples = sampler.chunk(chunk.x, chunk.z);
        dimension.write_chunk(chunk.x, chunk.z, &samples, mode)
    } else {
        dimension
            .write(pos.detail, pos.x, pos.z, sampler.node(pos), mode)
            .map(usize::from)
    };
    match result {
        Ok(0) => Outcome::Stale,
        Ok(n) => Outcome::Stored(n),
        Err(e) => {
            warn!(%pos, error = %e, "generation write rejected");
            Outcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::HeightmapParams;
    use farsight_lod::{DetailDistancePolicy, REGION_DETAIL_LEVEL, RegionPos};

    fn setup() -> (Arc<LodDimension>, Arc<HeightmapSampler>) {
        let dimension = Arc::new(LodDimension::new(DetailDistancePolicy::default(), 0));
        dimension.move_to(0, 0).unwrap();
        let sampler = Arc::new(HeightmapSampler::new(HeightmapParams::default()));
        (dimension, sampler)
    }

    #[test]
    fn test_generate_coarse_node() {
        let (dimension, sampler) = setup();
        let root = RegionPos::new(0, 0).root();
        assert_eq!(
            generate(&dimension, &sampler, root, GenerationMode::Surface),
            Outcome::Stored(1)
        );
        assert!(dimension.does_data_exist(REGION_DETAIL_LEVEL, 0, 0));
        // Second time around the data is already there.
        assert_eq!(
            generate(&dimension, &sampler, root, GenerationMode::Surface),
            Outcome::Stale
        );
    }

    #[test]
    fn test_generate_chunk_fills_columns() {
        let (dimension, sampler) = setup();
        let outcome = generate(&dimension, &sampler, LevelPos::new(3, 2, 2), GenerationMode::Surface);
        assert_eq!(outcome, Outcome::Stored(256));
        assert!(dimension.does_data_exist(0, 16, 16));
        assert!(dimension.does_data_exist(CHUNK_DETAIL_LEVEL, 1, 1));
    }

    #[test]
    fn test_generate_outside_loaded_regions_is_stale() {
        let (dimension, sampler) = setup();
        let far = LevelPos::new(6, 1000, 1000);
        assert_eq!(generate(&dimension, &sampler, far, GenerationMode::Surface), Outcome::Stale);
    }

    #[test]
    fn test_pool_generates_requests() {
        let (dimension, sampler) = setup();
        let generator = LodGenerator::new(
            2,
            16,
            Arc::clone(&dimension),
            sampler,
            GenerationMode::Surface,
        )
        .unwrap();

        let requests = dimension.data_to_generate(0, 0, 16).into_sorted_vec();
        assert_eq!(requests.len(), 1);
        let root = requests[0].pos;
        assert!(generator.submit(root));

        let results = generator.wait_for(1);
        assert_eq!(results[0].pos, root);
        assert_eq!(results[0].outcome, Outcome::Stored(1));
        assert!(dimension.does_data_exist(root.detail, root.x, root.z));
        assert!(!generator.is_pending(&root));
        assert!(generator.drain_results().is_empty());
    }

    #[test]
    fn test_submit_deduplicates_pending() {
        let (dimension, sampler) = setup();
        let generator =
            LodGenerator::new(1, 4, dimension, sampler, GenerationMode::Surface).unwrap();
        let pos = LevelPos::new(8, 0, 0);
        // Pending but never queued.
        generator.pending.insert(pos, ());
        assert!(!generator.submit(pos));
        assert_eq!(generator.pending_count(), 1);
    }
}

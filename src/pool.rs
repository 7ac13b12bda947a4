//! Worker pools that run batches of matching tasks.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::*;

use crate::{MappingError, MatchingSolution, MatchingTask};

/// Runs tasks and hands back one result per task, in submission order. A
/// failed task never affects its siblings.
pub trait WorkerPool {
    fn run_all(&self, tasks: Vec<MatchingTask>) -> Vec<Result<MatchingSolution, MappingError>>;
}

/// Runs every task on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn run_all(&self, tasks: Vec<MatchingTask>) -> Vec<Result<MatchingSolution, MappingError>> {
        tasks.iter().map(MatchingTask::execute).collect()
    }
}

/// A fixed-size rayon thread pool.
#[derive(Debug)]
pub struct RayonPool {
    pool: ThreadPool,
}

impl RayonPool {
    /// A pool of `threads` workers, or one per available core.
    pub fn new(threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("mcs-worker-{i}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        info!("Started matching pool with {} workers", pool.current_num_threads());
        Ok(RayonPool { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl WorkerPool for RayonPool {
    fn run_all(&self, tasks: Vec<MatchingTask>) -> Vec<Result<MatchingSolution, MappingError>> {
        self.pool
            .install(|| tasks.par_iter().map(MatchingTask::execute).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_smiles, MatchOrigin, MatcherFlags, MolecularGraph, ResultCache, Theory};
    use std::sync::Arc;

    fn named(smiles: &str, id: &str) -> MolecularGraph {
        let mut graph = parse_smiles(smiles).unwrap();
        graph.set_id(id);
        graph
    }

    fn batch(cache: &Arc<ResultCache>) -> Vec<MatchingTask> {
        let pairs = [
            ("CCO", "CC(C)O"),
            ("CCCCOCC", "CCCCSCC"),
            ("CCCCOCC", "CCCCSCC"),
            ("N#N", "CCC"),
            ("CCCCOCC", "CCCCSCC"),
        ];
        pairs
            .iter()
            .enumerate()
            .map(|(i, (query, target))| {
                MatchingTask::new(
                    &named(query, query),
                    &named(target, target),
                    i,
                    i,
                    MatcherFlags::default(),
                    Theory::Default,
                    Arc::clone(cache),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_inline_pool_preserves_order() {
        let cache = Arc::new(ResultCache::new());
        let results = InlinePool.run_all(batch(&cache));
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.as_ref().unwrap().query_position, i);
        }
        assert_eq!(results[0].as_ref().unwrap().origin, MatchOrigin::Embedding);
        assert_eq!(results[2].as_ref().unwrap().origin, MatchOrigin::Cache);
    }

    #[test]
    fn test_rayon_pool_matches_inline_pool() {
        let inline = InlinePool.run_all(batch(&Arc::new(ResultCache::new())));
        let cache = Arc::new(ResultCache::new());
        let pool = RayonPool::new(Some(3)).unwrap();
        assert_eq!(pool.threads(), 3);
        let parallel = pool.run_all(batch(&cache));
        assert_eq!(parallel.len(), inline.len());
        for (a, b) in inline.iter().zip(&parallel) {
            let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
            assert_eq!(a.query_position, b.query_position);
            assert_eq!(a.mapping, b.mapping);
            assert_eq!(a.scores, b.scores);
        }
        // Racing tasks may both compute, but only one entry is kept per key.
        assert_eq!(cache.len(), 2);
    }
}

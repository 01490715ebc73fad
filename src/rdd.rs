//! The dataset graph vertex ("RDD" in the original nomenclature).
//!
//! `Transform` is a closed, tagged union where each variant owns its own
//! callback and dependency handles, replacing a cast `void* fn` plus an
//! enum tag with a type that can't desynchronize from its payload.
//! Dispatch on it (see `kernels::run`) is exhaustive.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::latch::Latch;
use crate::seq::Seq;
use crate::types::{Context, Element, FilterFn, JoinerFn, MapperFn, PartitionerFn, SourceHandle};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One output partition: an element sequence behind its own lock. Every
/// non-source node's partitions are uniformly locked, even though only
/// `PartitionBy` ever has more than one task contending for the same
/// partition — the uniformity is what lets each kernel share one locking
/// discipline regardless of which transform produced its output.
pub type OutputPartition = Mutex<Seq<Element>>;

pub enum Transform {
    Source {
        handles: Vec<SourceHandle>,
    },
    Map {
        parent: Arc<Dataset>,
        mapper: MapperFn,
    },
    Filter {
        parent: Arc<Dataset>,
        pred: FilterFn,
        ctx: Context,
    },
    Join {
        left: Arc<Dataset>,
        right: Arc<Dataset>,
        joiner: JoinerFn,
        ctx: Context,
    },
    PartitionBy {
        parent: Arc<Dataset>,
        partitioner: PartitionerFn,
        ctx: Context,
        partition_count: usize,
    },
}

impl Transform {
    /// Short name used in log lines and task dispatch, mirroring the
    /// original's `Trans %d` field but human-readable.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Source { .. } => "SOURCE",
            Transform::Map { .. } => "MAP",
            Transform::Filter { .. } => "FILTER",
            Transform::Join { .. } => "JOIN",
            Transform::PartitionBy { .. } => "PARTITIONBY",
        }
    }

    pub fn dependencies(&self) -> Vec<&Arc<Dataset>> {
        match self {
            Transform::Source { .. } => vec![],
            Transform::Map { parent, .. }
            | Transform::Filter { parent, .. }
            | Transform::PartitionBy { parent, .. } => vec![parent],
            Transform::Join { left, right, .. } => vec![left, right],
        }
    }
}

/// A vertex in the transformation DAG.
pub struct Dataset {
    pub id: u64,
    pub transform: Transform,
    /// 0 until derived during planning.
    partition_count: AtomicUsize,
    /// Lazily allocated on first execution. `None` forever for `Source`.
    partitions: Mutex<Option<Arc<Vec<OutputPartition>>>>,
    pub latch: Latch,
}

impl Dataset {
    pub fn new(transform: Transform) -> Arc<Self> {
        let partition_count = match &transform {
            Transform::Source { handles } => handles.len(),
            Transform::PartitionBy {
                partition_count, ..
            } => *partition_count,
            _ => 0, // inherited from a dependency during planning
        };
        let dataset = Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            transform,
            partition_count: AtomicUsize::new(partition_count),
            partitions: Mutex::new(None),
            latch: Latch::new(),
        });
        if matches!(dataset.transform, Transform::Source { .. }) {
            dataset.latch.set_goal(0);
        }
        dataset
    }

    pub fn is_source(&self) -> bool {
        matches!(self.transform, Transform::Source { .. })
    }

    pub fn partition_count(&self) -> usize {
        self.partition_count.load(Ordering::Acquire)
    }

    pub fn set_partition_count(&self, n: usize) {
        self.partition_count.store(n, Ordering::Release);
    }

    /// Source handles for a `Source` node. Panics (a programmer error, not
    /// a runtime contract violation) if called on a non-source node; the
    /// driver and kernels never do so.
    pub fn source_handles(&self) -> &[SourceHandle] {
        match &self.transform {
            Transform::Source { handles } => handles,
            _ => unreachable!("source_handles() called on a non-source dataset"),
        }
    }

    /// The materialized output partitions, if planning has run.
    pub fn partitions(&self) -> Option<Arc<Vec<OutputPartition>>> {
        self.partitions.lock().clone()
    }

    /// Allocate `n` empty output partitions if not already allocated.
    /// Idempotent: a second call after allocation is a no-op.
    pub fn ensure_partitions(&self, n: usize) -> Arc<Vec<OutputPartition>> {
        let mut guard = self.partitions.lock();
        if let Some(existing) = guard.as_ref() {
            return existing.clone();
        }
        let allocated: Vec<OutputPartition> = (0..n).map(|_| Mutex::new(Seq::new())).collect();
        let arc = Arc::new(allocated);
        *guard = Some(arc.clone());
        arc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_dataset_is_complete_on_construction() {
        let ds = Dataset::new(Transform::Source { handles: vec![] });
        assert!(ds.latch.is_complete());
        assert_eq!(ds.partition_count(), 0);
    }

    #[test]
    fn ensure_partitions_is_idempotent() {
        let ds = Dataset::new(Transform::Source { handles: vec![] });
        let a = ds.ensure_partitions(4);
        let b = ds.ensure_partitions(99); // ignored — already allocated
        assert_eq!(a.len(), 4);
        assert_eq!(b.len(), 4);
        assert!(Arc::ptr_eq(&a, &b));
    }
}

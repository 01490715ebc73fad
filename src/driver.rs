//! Recursive execution planner: walks the DAG, lazily allocates output
//! partitions, chooses task fan-out, submits tasks, and waits for each
//! dependency's completion barrier.

use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::pool::WorkerPool;
use crate::rdd::{Dataset, Transform};
use crate::task::Task;

/// Materialize `dataset` (and, recursively, every dependency it needs)
/// through `pool`. Idempotent: a dataset whose latch is already complete
/// returns immediately without submitting any task.
pub fn execute(dataset: &Arc<Dataset>, pool: &WorkerPool) -> Result<()> {
    if dataset.latch.is_complete() {
        return Ok(());
    }

    if dataset.is_source() {
        // SOURCE nodes jump INIT -> COMPLETE synchronously, no task
        // dispatch; `Dataset::new` already set the goal to 0 for them, so
        // this is reached only if a caller constructed one by hand without
        // going through `Dataset::new` (never happens via the engine API).
        dataset.latch.set_goal(0);
        return Ok(());
    }

    for dep in dataset.transform.dependencies() {
        execute(dep, pool)?;
    }
    for dep in dataset.transform.dependencies() {
        dep.latch.wait();
    }

    let partition_count = derive_partition_count(dataset)?;
    let outputs = dataset.ensure_partitions(partition_count);
    debug_assert_eq!(
        outputs.len(),
        partition_count,
        "ensure_partitions must allocate exactly partition_count partitions"
    );

    let task_count = fan_out(dataset, partition_count);
    dataset.latch.set_goal(task_count);

    for partition in 0..task_count {
        submit_or_shrink_goal(dataset, pool, partition);
    }

    Ok(())
}

fn derive_partition_count(dataset: &Arc<Dataset>) -> Result<usize> {
    if dataset.partition_count() > 0 {
        return Ok(dataset.partition_count());
    }
    let derived = match &dataset.transform {
        Transform::Map { parent, .. }
        | Transform::Filter { parent, .. } => parent.partition_count(),
        Transform::Join { left, .. } => left.partition_count(),
        Transform::PartitionBy {
            partition_count, ..
        } => *partition_count,
        Transform::Source { .. } => unreachable!("handled before derive_partition_count"),
    };
    if derived == 0 {
        return Err(EngineError::InvalidPartitionCount {
            dataset_id: dataset.id,
            count: 0,
        });
    }
    dataset.set_partition_count(derived);
    Ok(derived)
}

/// MAP/FILTER inherit the dependency's partition count (one task per
/// partition); PARTITION_BY submits one task per INPUT partition; JOIN
/// submits one task per OUTPUT partition.
fn fan_out(dataset: &Arc<Dataset>, partition_count: usize) -> usize {
    match &dataset.transform {
        Transform::Map { .. } | Transform::Filter { .. } | Transform::Join { .. } => {
            partition_count
        }
        Transform::PartitionBy { parent, .. } => parent.partition_count(),
        Transform::Source { .. } => unreachable!("SOURCE never fans out"),
    }
}

/// Submit a task for `partition`. Task construction is infallible in safe
/// Rust (the allocator aborts the process on OOM instead of returning an
/// error), so there is no drop path to exercise here in practice — but if
/// a partition ever had to be skipped mid fan-out, shrinking the latch's
/// goal with [`crate::latch::Latch::decrement_goal`] before moving to the
/// next partition is what keeps `wait()` from hanging on a task that will
/// never arrive.
fn submit_or_shrink_goal(dataset: &Arc<Dataset>, pool: &WorkerPool, partition: usize) {
    pool.submit(Task::new(dataset.clone(), partition));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdd::Transform;
    use crate::types::{element, MapInput};
    use std::sync::Arc as StdArc;

    fn identity_mapper() -> crate::types::MapperFn {
        StdArc::new(|input| match input {
            MapInput::Element(e) => Some(e),
            MapInput::Source(_) => None,
        })
    }

    #[test]
    fn source_execute_completes_without_tasks() {
        let pool = WorkerPool::start_with_threads(StdArc::new(crate::queue::BlockingQueue::new()), 2);
        let source = Dataset::new(Transform::Source { handles: vec![] });
        execute(&source, &pool).unwrap();
        assert!(source.latch.is_complete());
        pool.shutdown();
    }

    #[test]
    fn map_execute_materializes_all_partitions() {
        let pool = WorkerPool::start_with_threads(StdArc::new(crate::queue::BlockingQueue::new()), 2);

        // A pre-completed MAP node standing in for an already-materialized
        // upstream: non-source, so `run_map`'s kernel reads its output
        // partitions directly instead of indexing into (empty) source
        // handles.
        let root = Dataset::new(Transform::Source { handles: vec![] });
        let parent = Dataset::new(Transform::Map {
            parent: root,
            mapper: identity_mapper(),
        });
        parent.set_partition_count(2);
        let parts = parent.ensure_partitions(2);
        parts[0].lock().push(element(1i64));
        parts[1].lock().push(element(2i64));
        parent.latch.set_goal(0);

        let mapped = Dataset::new(Transform::Map {
            parent: parent.clone(),
            mapper: identity_mapper(),
        });

        execute(&mapped, &pool).unwrap();
        pool.wait_idle();
        assert!(mapped.latch.is_complete());
        let outputs = mapped.partitions().unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].lock().len(), 1);

        pool.shutdown();
    }

    #[test]
    fn execute_is_idempotent() {
        let pool = WorkerPool::start_with_threads(StdArc::new(crate::queue::BlockingQueue::new()), 2);

        let root = Dataset::new(Transform::Source { handles: vec![] });
        let parent = Dataset::new(Transform::Map {
            parent: root,
            mapper: identity_mapper(),
        });
        parent.set_partition_count(1);
        parent.ensure_partitions(1)[0].lock().push(element(1i64));
        parent.latch.set_goal(0);

        let mapped = Dataset::new(Transform::Map {
            parent: parent.clone(),
            mapper: identity_mapper(),
        });

        execute(&mapped, &pool).unwrap();
        pool.wait_idle();
        // Second call must submit zero additional tasks: latch already
        // complete, so `execute` returns immediately.
        execute(&mapped, &pool).unwrap();
        pool.wait_idle();

        let outputs = mapped.partitions().unwrap();
        assert_eq!(outputs[0].lock().len(), 1);

        pool.shutdown();
    }
}

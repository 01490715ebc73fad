//! Per-transform worker kernels. Each is invoked by a pool worker for one
//! `(dataset, partition)` task. Kernels only ever write into the task's
//! own dataset's output partitions; dependency partitions are read-only
//! borrows.

use crate::rdd::{Dataset, Transform};
use crate::types::MapInput;

/// Run the kernel matching `dataset.transform` for `partition`, appending
/// results into `dataset`'s own (already-allocated) output partition.
pub fn run(dataset: &Dataset, partition: usize) {
    match &dataset.transform {
        Transform::Source { .. } => {
            unreachable!("SOURCE nodes complete synchronously, never dispatched as a task")
        }
        Transform::Map { parent, mapper } => run_map(dataset, parent, mapper, partition),
        Transform::Filter { parent, pred, ctx } => run_filter(dataset, parent, pred, ctx, partition),
        Transform::Join {
            left,
            right,
            joiner,
            ctx,
        } => run_join(dataset, left, right, joiner, ctx, partition),
        Transform::PartitionBy {
            parent,
            partitioner,
            ctx,
            partition_count,
        } => run_partition_by(dataset, parent, partitioner, ctx, *partition_count, partition),
    }
}

fn run_map(
    dataset: &Dataset,
    parent: &std::sync::Arc<Dataset>,
    mapper: &crate::types::MapperFn,
    partition: usize,
) {
    let outputs = dataset
        .partitions()
        .expect("output partitions allocated before task dispatch");
    let mut out = outputs[partition].lock();

    if parent.is_source() {
        let handle = parent.source_handles()[partition].clone();
        loop {
            match mapper(MapInput::Source(handle.clone())) {
                Some(value) => out.push(value),
                None => break,
            }
        }
    } else {
        let parents = parent
            .partitions()
            .expect("parent output partitions present once complete");
        let input = parents[partition].lock();
        for element in input.iter() {
            if let Some(value) = mapper(MapInput::Element(element.clone())) {
                out.push(value);
            }
        }
    }
}

fn run_filter(
    dataset: &Dataset,
    parent: &std::sync::Arc<Dataset>,
    pred: &crate::types::FilterFn,
    ctx: &crate::types::Context,
    partition: usize,
) {
    let outputs = dataset
        .partitions()
        .expect("output partitions allocated before task dispatch");
    let mut out = outputs[partition].lock();

    let parents = parent
        .partitions()
        .expect("parent output partitions present once complete");
    let input = parents[partition].lock();
    for element in input.iter() {
        if pred(element, ctx) {
            out.push(element.clone());
        }
    }
}

fn run_join(
    dataset: &Dataset,
    left: &std::sync::Arc<Dataset>,
    right: &std::sync::Arc<Dataset>,
    joiner: &crate::types::JoinerFn,
    ctx: &crate::types::Context,
    partition: usize,
) {
    let outputs = dataset
        .partitions()
        .expect("output partitions allocated before task dispatch");
    let mut out = outputs[partition].lock();

    let lefts = left
        .partitions()
        .expect("left parent output partitions present once complete");

    // Joining an RDD against itself would otherwise lock the same
    // non-reentrant partition mutex twice; fetch both sides' elements
    // through whichever single guard(s) are actually distinct.
    if std::sync::Arc::ptr_eq(left, right) {
        let left_in = lefts[partition].lock();
        for a in left_in.iter() {
            for b in left_in.iter() {
                if let Some(joined) = joiner(a, b, ctx) {
                    out.push(joined);
                }
            }
        }
        return;
    }

    let rights = right
        .partitions()
        .expect("right parent output partitions present once complete");
    let left_in = lefts[partition].lock();
    let right_in = rights[partition].lock();

    // Outer loop over the left input, inner over the right — the
    // observable ordering contract (§4.4).
    for a in left_in.iter() {
        for b in right_in.iter() {
            if let Some(joined) = joiner(a, b, ctx) {
                out.push(joined);
            }
        }
    }
}

fn run_partition_by(
    dataset: &Dataset,
    parent: &std::sync::Arc<Dataset>,
    partitioner: &crate::types::PartitionerFn,
    ctx: &crate::types::Context,
    partition_count: usize,
    partition: usize,
) {
    let outputs = dataset
        .partitions()
        .expect("output partitions allocated before task dispatch");

    let parents = parent
        .partitions()
        .expect("parent output partitions present once complete");
    let input = parents[partition].lock();

    for element in input.iter() {
        let target = partitioner(element, partition_count, ctx);
        if target < 0 || target as usize >= partition_count {
            tracing::warn!(
                dataset_id = dataset.id,
                source_partition = partition,
                target,
                "partitioner returned an out-of-range index; dropping element"
            );
            continue;
        }
        // Direct, un-nested acquisition of exactly one sibling partition's
        // lock — the sole mechanism preserving integrity when multiple
        // source-partition tasks target the same output partition.
        outputs[target as usize].lock().push(element.clone());
    }
}

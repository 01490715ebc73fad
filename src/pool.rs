//! Fixed-size worker pool. Sized to `num_cpus::get()` at construction;
//! no configuration knob overrides it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::kernels;
use crate::queue::BlockingQueue;
use crate::task::Task;

pub struct WorkerPool {
    queue: Arc<BlockingQueue<Task>>,
    metrics: Arc<BlockingQueue<crate::task::Metric>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    outstanding: Mutex<usize>,
    idle: Condvar,
}

impl WorkerPool {
    /// Start `num_cpus::get()` worker threads draining a shared task
    /// queue, handing completed metrics to `metrics`.
    pub fn start(metrics: Arc<BlockingQueue<crate::task::Metric>>) -> Arc<Self> {
        Self::start_with_threads(metrics, num_cpus::get())
    }

    /// Testing hook: start with an explicit thread count.
    pub fn start_with_threads(
        metrics: Arc<BlockingQueue<crate::task::Metric>>,
        thread_count: usize,
    ) -> Arc<Self> {
        let pool = Arc::new(Self {
            queue: Arc::new(BlockingQueue::new()),
            metrics,
            handles: Mutex::new(Vec::with_capacity(thread_count)),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(thread_count);
        for worker_id in 0..thread_count.max(1) {
            let pool = pool.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("minispark-worker-{worker_id}"))
                    .spawn(move || pool.worker_loop())
                    .expect("failed to spawn worker thread"),
            );
        }
        *pool.handles.lock() = handles;
        pool
    }

    fn worker_loop(self: Arc<Self>) {
        loop {
            let Some(mut task) = self.queue.pop() else {
                break;
            };
            task.metric.mark_scheduled();
            kernels::run(&task.dataset, task.partition);
            task.metric.mark_finished();

            let completed = task.dataset.latch.arrive();
            if completed {
                tracing::debug!(dataset_id = task.dataset.id, "dataset materialized");
            }

            self.metrics.push(task.metric);

            let mut outstanding = self.outstanding.lock();
            *outstanding -= 1;
            if *outstanding == 0 {
                self.idle.notify_all();
            }
        }
    }

    /// Submit one task. Only ever called from the driver thread.
    pub fn submit(&self, task: Task) {
        *self.outstanding.lock() += 1;
        self.queue.push(task);
    }

    /// Block until no task is queued or in flight.
    pub fn wait_idle(&self) {
        let mut outstanding = self.outstanding.lock();
        self.idle.wait_while(&mut outstanding, |n| *n != 0);
    }

    /// Stop accepting work, join every worker, and drain (logging, never
    /// panicking on) any residual tasks — defensive, expected to be empty.
    pub fn shutdown(&self) {
        self.queue.shutdown();
        for handle in self.handles.lock().drain(..) {
            if let Err(err) = handle.join() {
                tracing::error!(?err, "worker thread panicked during shutdown");
            }
        }
        let leftover = self.queue.drain();
        if !leftover.is_empty() {
            tracing::warn!(count = leftover.len(), "dropped residual tasks at shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdd::{Dataset, Transform};
    use crate::types::{element, MapInput};
    use std::sync::Arc as StdArc;

    #[test]
    fn wait_idle_blocks_until_all_tasks_finish() {
        let metrics = StdArc::new(BlockingQueue::new());
        let pool = WorkerPool::start_with_threads(metrics.clone(), 2);

        let identity: crate::types::MapperFn = StdArc::new(|input| match input {
            MapInput::Element(e) => Some(e),
            MapInput::Source(_) => None,
        });

        // A pre-completed MAP node standing in for an already-materialized
        // upstream: non-source, so `run_map` reads its output partitions
        // directly instead of indexing into (empty) source handles.
        let root = Dataset::new(Transform::Source { handles: vec![] });
        let parent = Dataset::new(Transform::Map {
            parent: root,
            mapper: identity.clone(),
        });
        parent.set_partition_count(3);
        let parent_partitions = parent.ensure_partitions(3);
        for (i, part) in parent_partitions.iter().enumerate() {
            part.lock().push(element(i as i64));
        }
        parent.latch.set_goal(0);

        let mapped = Dataset::new(Transform::Map {
            parent: parent.clone(),
            mapper: identity,
        });
        mapped.set_partition_count(3);
        mapped.ensure_partitions(3);
        mapped.latch.set_goal(3);

        for p in 0..3 {
            pool.submit(Task::new(mapped.clone(), p));
        }
        pool.wait_idle();
        assert!(mapped.latch.is_complete());

        let outputs = mapped.partitions().unwrap();
        for (i, part) in outputs.iter().enumerate() {
            assert_eq!(part.lock().len(), 1);
            assert_eq!(
                *part.lock().get(0).unwrap().downcast_ref::<i64>().unwrap(),
                i as i64
            );
        }

        pool.shutdown();
    }
}

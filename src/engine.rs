//! Engine facade: graph construction API, terminal actions, and lifecycle.

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::driver;
use crate::error::Result;
use crate::pool::WorkerPool;
use crate::queue::BlockingQueue;
use crate::rdd::{Dataset, Transform};
use crate::task::Metric;
use crate::types::{Context, FilterFn, JoinerFn, MapperFn, PartitionerFn, PrinterFn, SourceHandle};

/// The running engine: worker pool, metrics queue, and monitor thread.
pub struct Engine {
    pool: Arc<WorkerPool>,
    metrics_queue: Arc<BlockingQueue<Metric>>,
    monitor: Option<JoinHandle<()>>,
    epoch: Instant,
}

impl Engine {
    /// Initialize the pool (thread count = CPU count), the metrics queue,
    /// and the monitor thread, opening the configured log file.
    pub fn start(config: EngineConfig) -> Result<Self> {
        let epoch = Instant::now();
        let metrics_queue = Arc::new(BlockingQueue::new());
        let pool = WorkerPool::start(metrics_queue.clone());

        let file = File::create(&config.log_path)?;
        let monitor = crate::metrics::spawn_monitor(metrics_queue.clone(), BufWriter::new(file), epoch);

        Ok(Self {
            pool,
            metrics_queue,
            monitor: Some(monitor),
            epoch,
        })
    }

    /// Set the shutdown flag, drain workers and monitor, and free owned
    /// resources. Consumes the engine: it cannot be used afterward.
    pub fn stop(mut self) {
        self.pool.shutdown();
        self.metrics_queue.shutdown();
        if let Some(monitor) = self.monitor.take() {
            if let Err(err) = monitor.join() {
                tracing::error!(?err, "metrics monitor thread panicked during shutdown");
            }
        }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    // ---- graph construction ----

    pub fn source(&self, handles: Vec<SourceHandle>) -> Arc<Dataset> {
        Dataset::new(Transform::Source { handles })
    }

    pub fn map(&self, parent: &Arc<Dataset>, mapper: MapperFn) -> Arc<Dataset> {
        Dataset::new(Transform::Map {
            parent: parent.clone(),
            mapper,
        })
    }

    pub fn filter(&self, parent: &Arc<Dataset>, pred: FilterFn, ctx: Context) -> Arc<Dataset> {
        Dataset::new(Transform::Filter {
            parent: parent.clone(),
            pred,
            ctx,
        })
    }

    pub fn join(
        &self,
        left: &Arc<Dataset>,
        right: &Arc<Dataset>,
        joiner: JoinerFn,
        ctx: Context,
    ) -> Arc<Dataset> {
        Dataset::new(Transform::Join {
            left: left.clone(),
            right: right.clone(),
            joiner,
            ctx,
        })
    }

    pub fn partition_by(
        &self,
        parent: &Arc<Dataset>,
        partitioner: PartitionerFn,
        partition_count: usize,
        ctx: Context,
    ) -> Result<Arc<Dataset>> {
        if partition_count == 0 {
            return Err(crate::error::EngineError::InvalidPartitionCount {
                dataset_id: parent.id,
                count: 0,
            });
        }
        Ok(Dataset::new(Transform::PartitionBy {
            parent: parent.clone(),
            partitioner,
            ctx,
            partition_count,
        }))
    }

    // ---- actions ----

    /// Materialize `dataset` and return the total element count across all
    /// of its output partitions.
    pub fn count(&self, dataset: &Arc<Dataset>) -> Result<usize> {
        driver::execute(dataset, &self.pool)?;
        self.pool.wait_idle();
        let Some(partitions) = dataset.partitions() else {
            return Ok(0); // a SOURCE node has no materialized elements
        };
        Ok(partitions.iter().map(|p| p.lock().len()).sum())
    }

    /// Materialize `dataset` and invoke `printer` once per element, in
    /// partition order then within-partition order.
    pub fn print(&self, dataset: &Arc<Dataset>, printer: PrinterFn) -> Result<()> {
        driver::execute(dataset, &self.pool)?;
        self.pool.wait_idle();
        if let Some(partitions) = dataset.partitions() {
            for partition in partitions.iter() {
                for element in partition.lock().iter() {
                    printer(element);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{element, MapInput};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn temp_log_path(dir: &TempDir, name: &str) -> std::path::PathBuf {
        dir.path().join(format!("{name}.log"))
    }

    fn source_handle(values: Vec<i64>) -> SourceHandle {
        Arc::new(parking_lot::Mutex::new(StdMutex::new(values.into_iter())))
    }

    fn identity_mapper() -> MapperFn {
        Arc::new(|input| match input {
            MapInput::Source(handle) => {
                let any = handle.lock();
                let iter = any.downcast_ref::<StdMutex<std::vec::IntoIter<i64>>>().unwrap();
                iter.lock().unwrap().next().map(element)
            }
            MapInput::Element(e) => Some(e),
        })
    }

    #[test]
    fn start_creates_log_file_even_with_no_metrics() {
        let tmp = TempDir::new().unwrap();
        let log_path = temp_log_path(&tmp, "empty");
        let engine = Engine::start(EngineConfig {
            log_path: log_path.clone(),
        })
        .unwrap();
        engine.stop();
        assert!(log_path.exists());
    }

    #[test]
    fn count_on_a_bare_source_is_zero() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::start(EngineConfig {
            log_path: temp_log_path(&tmp, "bare-source"),
        })
        .unwrap();
        let source = engine.source(vec![source_handle(vec![1, 2, 3])]);
        assert_eq!(engine.count(&source).unwrap(), 0);
        engine.stop();
    }

    #[test]
    fn partition_by_rejects_zero_partition_count() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::start(EngineConfig {
            log_path: temp_log_path(&tmp, "zero-partitions"),
        })
        .unwrap();
        let source = engine.source(vec![source_handle(vec![1])]);
        let mapped = engine.map(&source, identity_mapper());
        let partitioner: PartitionerFn = Arc::new(|e, _count, _ctx| *crate::types::downcast_ref::<i64>(e).unwrap());
        let result = engine.partition_by(&mapped, partitioner, 0, crate::types::context(()));
        assert!(result.is_err());
        engine.stop();
    }
}

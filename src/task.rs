use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::rdd::Dataset;

/// Three timestamps plus identity, used only for formatted logging.
/// Ownership transfers worker -> metrics queue -> monitor thread.
#[derive(Debug, Clone)]
pub struct Metric {
    pub dataset_id: u64,
    pub transform: &'static str,
    pub partition: usize,
    pub created: Instant,
    pub scheduled: Option<Instant>,
    pub duration: Option<Duration>,
}

impl Metric {
    pub fn new(dataset_id: u64, transform: &'static str, partition: usize) -> Self {
        Self {
            dataset_id,
            transform,
            partition,
            created: Instant::now(),
            scheduled: None,
            duration: None,
        }
    }

    pub fn mark_scheduled(&mut self) {
        self.scheduled = Some(Instant::now());
    }

    pub fn mark_finished(&mut self) {
        if let Some(scheduled) = self.scheduled {
            self.duration = Some(scheduled.elapsed());
        }
    }
}

/// A unit of work: one dataset bound to one partition index, plus the
/// metric record that will travel with it through the pool.
pub struct Task {
    pub dataset: Arc<Dataset>,
    pub partition: usize,
    pub metric: Metric,
}

impl Task {
    pub fn new(dataset: Arc<Dataset>, partition: usize) -> Self {
        let transform = dataset.transform.name();
        let dataset_id = dataset.id;
        Self {
            dataset,
            partition,
            metric: Metric::new(dataset_id, transform, partition),
        }
    }
}

//! Metrics pipeline: a single monitor thread draining a dedicated
//! `BlockingQueue<Metric>` and appending one formatted line per completed
//! task to a log writer.

use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::queue::BlockingQueue;
use crate::task::Metric;

/// Format one metric as a fixed-width log line, timestamps expressed as
/// seconds.microseconds since `epoch`.
pub fn format_metric(metric: &Metric, epoch: Instant) -> String {
    let created = metric.created.saturating_duration_since(epoch);
    let scheduled = metric
        .scheduled
        .map(|t| t.saturating_duration_since(epoch))
        .unwrap_or_default();
    let duration_usec = metric.duration.map(|d| d.as_micros()).unwrap_or(0);

    format!(
        "RDD {:>6} Part {:>4} Trans {:<11} -- creation {:>10}.{:06}, scheduled {:>10}.{:06}, execution (usec) {:>8}",
        metric.dataset_id,
        metric.partition,
        metric.transform,
        created.as_secs(),
        created.subsec_micros(),
        scheduled.as_secs(),
        scheduled.subsec_micros(),
        duration_usec,
    )
}

/// Spawns the monitor thread. Draining stops once `queue.shutdown()` has
/// been called and the queue is empty; the writer is flushed before the
/// thread exits. Errors writing a single line are logged and swallowed —
/// metrics logging must never stall or fail a worker.
pub fn spawn_monitor<W: Write + Send + 'static>(
    queue: Arc<BlockingQueue<Metric>>,
    mut writer: W,
    epoch: Instant,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("minispark-monitor".to_string())
        .spawn(move || {
            while let Some(metric) = queue.pop() {
                let line = format_metric(&metric, epoch);
                if let Err(err) = writeln!(writer, "{line}") {
                    tracing::error!(?err, "failed to write metrics log line");
                }
            }
            if let Err(err) = writer.flush() {
                tracing::error!(?err, "failed to flush metrics log on shutdown");
            }
        })
        .expect("failed to spawn monitor thread")
}

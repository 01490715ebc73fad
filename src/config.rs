use std::path::PathBuf;

/// Engine-wide configuration. Thread count is deliberately absent: the
/// worker pool is always sized to `num_cpus::get()`, never overridden.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where the metrics monitor appends formatted task-completion lines.
    pub log_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("minispark.log"),
        }
    }
}
